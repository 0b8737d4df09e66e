//! Monte Carlo playouts (random game simulation).
//!
//! A playout plays random legal moves, never filling the mover's own true
//! eyes, until two consecutive passes or the game length limit, then scores
//! the final board with area scoring.

use crate::constants::{BLACK_STONE, EMPTY, MAX_GAME_LEN, WHITE_STONE};
use crate::position::{Color, Point, Position, board_points, is_eye, is_eyeish, pass_move, play_move};

/// AMAF marker for a move made by `color`.
pub fn amaf_sign(color: Color) -> i8 {
    match color {
        Color::Black => 1,
        Color::White => -1,
    }
}

/// Perform a Monte Carlo playout from the given position.
///
/// Moves played are recorded in `amaf_map` (first player to occupy each point)
/// Returns the final score from Black's point of view: positive means Black wins.
pub fn mcplayout(pos: &mut Position, amaf_map: &mut [i8], rng: &mut fastrand::Rng) -> f64 {
    let mut passes = 0;

    while passes < 2 && pos.n < MAX_GAME_LEN {
        let mover = pos.to_move;
        match choose_random_move(pos, rng) {
            Some(pt) => {
                if amaf_map[pt] == 0 {
                    amaf_map[pt] = amaf_sign(mover);
                }
                passes = 0;
            }
            None => {
                pass_move(pos);
                passes += 1;
            }
        }
    }

    score(pos)
}

/// Play a random legal move that is not one of the mover's true eyes.
///
/// Candidates are visited in random order; the first legal one is played on
/// `pos` and returned.
fn choose_random_move(pos: &mut Position, rng: &mut fastrand::Rng) -> Option<Point> {
    let own = pos.to_move.stone();
    let mut candidates: Vec<Point> = board_points()
        .filter(|&pt| pos.color[pt] == EMPTY && pt != pos.ko && is_eye(pos, pt) != own)
        .collect();

    let n = candidates.len();
    for i in 0..n {
        let j = i + rng.usize(..n - i);
        candidates.swap(i, j);

        let pt = candidates[i];
        let mut test_pos = pos.clone();
        if play_move(&mut test_pos, pt).is_ok() {
            *pos = test_pos;
            return Some(pt);
        }
    }

    None
}

/// Area score (Chinese rules) from Black's point of view.
///
/// Stones count for their owner, eyeish empty points for the surrounding
/// color, and komi is credited to White.
pub fn score(pos: &Position) -> f64 {
    let mut s = -pos.komi as f64;

    for pt in board_points() {
        let c = pos.color[pt];
        let effective = if c == EMPTY { is_eyeish(pos, pt) } else { c };

        match effective {
            BLACK_STONE => s += 1.0,
            WHITE_STONE => s -= 1.0,
            _ => {}
        }
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BOARDSIZE, N};
    use crate::position::parse_coord;

    #[test]
    fn test_mcplayout_terminates_and_fills_board() {
        let mut rng = fastrand::Rng::with_seed(42);
        let mut pos = Position::new();
        let mut amaf = vec![0i8; BOARDSIZE];
        let s = mcplayout(&mut pos, &mut amaf, &mut rng);
        assert!(pos.n <= MAX_GAME_LEN);
        assert!(pos.stones() > N * N / 2);
        assert!(amaf.iter().any(|&a| a == 1));
        assert!(amaf.iter().any(|&a| a == -1));
        assert!(s.abs() <= (N * N) as f64 + pos.komi as f64);
    }

    #[test]
    fn test_score_counts_komi_for_white() {
        let pos = Position::new();
        assert_eq!(score(&pos), -7.5);

        let mut pos = Position::new();
        pos.color[parse_coord("E5").unwrap()] = BLACK_STONE;
        pos.komi = 0.0;
        assert_eq!(score(&pos), 1.0);
    }
}

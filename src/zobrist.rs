//! Zobrist hashing for identifying positions in the search cache.
//!
//! Keys are drawn from a fixed-seed generator so hashes are reproducible
//! across runs.

use std::sync::OnceLock;

use crate::constants::{BLACK_STONE, BOARDSIZE, WHITE_STONE};
use crate::position::{Color, Position, board_points};

const SEED: u64 = 0x5EED_0F_60_BAD_5EED;

struct ZobristTable {
    black: [u64; BOARDSIZE],
    white: [u64; BOARDSIZE],
    ko: [u64; BOARDSIZE],
    white_to_move: u64,
}

static TABLE: OnceLock<ZobristTable> = OnceLock::new();

fn make_table() -> ZobristTable {
    let mut rng = fastrand::Rng::with_seed(SEED);
    ZobristTable {
        black: std::array::from_fn(|_| rng.u64(..)),
        white: std::array::from_fn(|_| rng.u64(..)),
        ko: std::array::from_fn(|_| rng.u64(..)),
        white_to_move: rng.u64(..),
    }
}

/// Hash of the stones, the side to move and the ko point.
pub fn zobrist_hash(pos: &Position) -> u64 {
    let table = TABLE.get_or_init(make_table);
    let mut h = 0u64;
    for pt in board_points() {
        match pos.color[pt] {
            BLACK_STONE => h ^= table.black[pt],
            WHITE_STONE => h ^= table.white[pt],
            _ => {}
        }
    }
    if pos.to_move == Color::White {
        h ^= table.white_to_move;
    }
    if pos.ko != 0 {
        h ^= table.ko[pos.ko];
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{parse_coord, pass_move, play_move};

    #[test]
    fn test_hash_depends_on_side_to_move() {
        let mut pos = Position::new();
        let h0 = zobrist_hash(&pos);
        pass_move(&mut pos);
        assert_ne!(h0, zobrist_hash(&pos));
        pass_move(&mut pos);
        assert_eq!(h0, zobrist_hash(&pos));
    }

    #[test]
    fn test_transpositions_hash_equal() {
        let mut a = Position::new();
        let mut b = Position::new();
        for mv in ["C3", "G7", "E5"] {
            play_move(&mut a, parse_coord(mv).unwrap()).unwrap();
        }
        for mv in ["E5", "G7", "C3"] {
            play_move(&mut b, parse_coord(mv).unwrap()).unwrap();
        }
        assert_eq!(zobrist_hash(&a), zobrist_hash(&b));
    }
}

//! Go position representation and move execution.
//!
//! This module provides the board rules the rest of the engine leans on:
//! - Board state representation using a 1D array with padding
//! - Stone placement and capture detection
//! - Ko and suicide rule enforcement
//! - Eye detection for playout optimization
//! - Coordinate conversion and the `X`/`O`/`.` cell-string format
//!
//! Stones are stored with absolute colors (`'X'` black, `'O'` white); the side
//! to move is kept alongside the board.

use std::fmt;

use crate::constants::*;

/// A point on the board, represented as an index into the 1D board array.
pub type Point = usize;

/// Player color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Cell value of a stone of this color.
    pub fn stone(self) -> u8 {
        match self {
            Color::Black => BLACK_STONE,
            Color::White => WHITE_STONE,
        }
    }
}

/// Reason a move was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("illegal move: point not empty")]
    Occupied,
    #[error("illegal move: retakes ko")]
    Ko,
    #[error("illegal move: suicide")]
    Suicide,
}

/// A Go position (board state).
#[derive(Clone, PartialEq)]
pub struct Position {
    /// Board state: 'X' = black, 'O' = white, '.' = empty, ' ' = out of bounds
    pub color: [u8; BOARDSIZE],
    /// Player to move
    pub to_move: Color,
    /// Move number (0 = start of game)
    pub n: usize,
    /// Ko point (0 if no ko)
    pub ko: Point,
    /// Last move played
    pub last: Point,
    /// Second-to-last move
    pub last2: Point,
    /// Stones removed by the last move
    pub captured: u32,
    /// Komi (compensation points for White)
    pub komi: f32,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    pub fn new() -> Self {
        let mut p = Position {
            color: [OUT; BOARDSIZE],
            to_move: Color::Black,
            n: 0,
            ko: 0,
            last: 0,
            last2: 0,
            captured: 0,
            komi: 7.5,
        };
        empty_position(&mut p);
        p
    }

    /// Build a position from `N * N` cells in row-major order.
    ///
    /// Returns `None` if the length is wrong or a character is not one of
    /// `X`, `O`, `.`.
    pub fn from_cells(cells: &str, to_move: Color) -> Option<Position> {
        if cells.len() != N * N {
            return None;
        }
        let mut pos = Position::new();
        pos.to_move = to_move;
        for (i, c) in cells.bytes().enumerate() {
            let pt = point_at(i / N, i % N);
            pos.color[pt] = match c {
                BLACK_STONE | WHITE_STONE | EMPTY => c,
                _ => return None,
            };
        }
        Some(pos)
    }

    /// The board as `N * N` characters in row-major order (top row first).
    pub fn cells(&self) -> String {
        board_points().map(|pt| self.color[pt] as char).collect()
    }

    /// Number of stones on the board.
    pub fn stones(&self) -> usize {
        board_points().filter(|&pt| self.color[pt] != EMPTY).count()
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({:?} to move, n={}) {}", self.to_move, self.n, self.cells())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..N {
            for col in 0..N {
                write!(f, "{} ", self.color[point_at(row, col)] as char)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Reset a position to the initial empty board state.
///
/// The board is laid out as a 1D array with padding:
/// - Index 0 to N: top padding (out of bounds)
/// - Each row: left padding + N playable points
/// - Bottom padding
pub fn empty_position(pos: &mut Position) {
    let mut k = 0;
    for _col in 0..=N {
        pos.color[k] = OUT;
        k += 1;
    }
    for _row in 1..=N {
        pos.color[k] = OUT;
        k += 1;
        for _col in 1..=N {
            pos.color[k] = EMPTY;
            k += 1;
        }
    }
    for _col in 0..W {
        pos.color[k] = OUT;
        k += 1;
    }
    pos.to_move = Color::Black;
    pos.ko = 0;
    pos.last = 0;
    pos.last2 = 0;
    pos.captured = 0;
    pos.n = 0;
}

/// Point at a 0-based row (top first) and column.
#[inline]
pub fn point_at(row: usize, col: usize) -> Point {
    (row + 1) * (N + 1) + col + 1
}

/// 0-based (row, column) of a board point.
#[inline]
pub fn row_col(pt: Point) -> (usize, usize) {
    (pt / (N + 1) - 1, pt % (N + 1) - 1)
}

/// Whether a point is a playable intersection.
pub fn is_board_point(pt: Point) -> bool {
    pt < BOARDSIZE && pt > N && pt % (N + 1) != 0 && pt / (N + 1) <= N
}

/// Iterate all playable points in row-major order.
pub fn board_points() -> impl Iterator<Item = Point> {
    (0..N * N).map(|i| point_at(i / N, i % N))
}

/// Execute a pass move.
///
/// This increments the move counter, hands the turn over, and clears the ko.
pub fn pass_move(pos: &mut Position) {
    pos.to_move = pos.to_move.opponent();
    pos.n += 1;
    pos.last2 = pos.last;
    pos.last = PASS_MOVE;
    pos.ko = 0;
    pos.captured = 0;
}

/// Check if a point is "eyeish" (surrounded by stones of one color).
///
/// Returns the color of the surrounding stones, or 0 if not eyeish.
/// Note: This may return true for false eyes.
pub fn is_eyeish(pos: &Position, pt: Point) -> u8 {
    let mut eyecolor: u8 = 0;
    for n in neighbors(pt) {
        let c = pos.color[n];
        if c == OUT {
            continue;
        }
        if c == EMPTY {
            return 0;
        }
        if eyecolor == 0 {
            eyecolor = c;
        } else if c != eyecolor {
            return 0;
        }
    }
    eyecolor
}

/// Check if a point is a true eye.
///
/// A true eye is eyeish and has at most one opponent stone on its diagonals at
/// the edge, none in the center.
pub fn is_eye(pos: &Position, pt: Point) -> u8 {
    let eyecolor = is_eyeish(pos, pt);
    if eyecolor == 0 {
        return 0;
    }
    let falsecolor = if eyecolor == BLACK_STONE {
        WHITE_STONE
    } else {
        BLACK_STONE
    };
    let mut at_edge = false;
    let mut false_count = 0;

    for d in diagonal_neighbors(pt) {
        if pos.color[d] == OUT {
            at_edge = true;
        } else if pos.color[d] == falsecolor {
            false_count += 1;
        }
    }

    let tolerance = if at_edge { 1 } else { 0 };
    if false_count > tolerance {
        return 0;
    }
    eyecolor
}

/// Play a move at the given point for the side to move.
///
/// Handles pass moves, legality checking, captures and ko detection.
/// Returns the number of stones captured.
pub fn play_move(pos: &mut Position, pt: Point) -> Result<u32, MoveError> {
    if pt == PASS_MOVE {
        pass_move(pos);
        return Ok(0);
    }
    if pos.color[pt] != EMPTY {
        return Err(MoveError::Occupied);
    }
    if pt == pos.ko {
        return Err(MoveError::Ko);
    }

    let me = pos.to_move.stone();
    let them = pos.to_move.opponent().stone();
    let in_enemy_eye = is_eyeish(pos, pt) == them;

    pos.color[pt] = me;
    let mut captured = 0u32;
    let mut capture_point: Point = 0;
    let mut to_remove: Vec<Point> = Vec::new();

    for n in neighbors(pt) {
        if pos.color[n] == them && group_liberties(pos, n) == 0 {
            captured += collect_group(pos, n, &mut to_remove);
            capture_point = n;
        }
    }

    for &r in &to_remove {
        pos.color[r] = EMPTY;
    }

    if captured == 0 && group_liberties(pos, pt) == 0 {
        pos.color[pt] = EMPTY;
        return Err(MoveError::Suicide);
    }

    pos.ko = if captured == 1 && in_enemy_eye {
        capture_point
    } else {
        0
    };
    pos.captured = captured;
    pos.to_move = pos.to_move.opponent();
    pos.n += 1;
    pos.last2 = pos.last;
    pos.last = pt;
    Ok(captured)
}

/// Get the 4 orthogonal neighbors (N, E, S, W) of a point.
#[inline]
pub fn neighbors(pt: Point) -> [Point; 4] {
    std::array::from_fn(|i| (pt as isize + DELTA[i]) as usize)
}

/// Get the 4 diagonal neighbors (NE, SE, SW, NW) of a point.
#[inline]
fn diagonal_neighbors(pt: Point) -> [Point; 4] {
    std::array::from_fn(|i| (pt as isize + DELTA[i + 4]) as usize)
}

/// Offsets to neighboring points in the 1D board array.
/// Order: North, East, South, West, NE, SE, SW, NW
const DELTA: [isize; 8] = [
    -(N as isize) - 1,
    1,
    (N as isize) + 1,
    -1,
    -(N as isize),
    W as isize,
    N as isize,
    -(W as isize),
];

/// Collect all stones in a group starting from a point.
///
/// Returns the number of stones in the group and appends them to `out`.
fn collect_group(pos: &Position, start: Point, out: &mut Vec<Point>) -> u32 {
    let color = pos.color[start];
    let mut stack = vec![start];
    let mut visited = [false; BOARDSIZE];
    let mut count = 0u32;

    while let Some(pt) = stack.pop() {
        if visited[pt] {
            continue;
        }
        visited[pt] = true;

        if pos.color[pt] == color {
            out.push(pt);
            count += 1;
            for n in neighbors(pt) {
                if !visited[n] && pos.color[n] == color {
                    stack.push(n);
                }
            }
        }
    }
    count
}

/// Count the number of liberties (empty adjacent points) of a group.
pub fn group_liberties(pos: &Position, start: Point) -> u32 {
    let color = pos.color[start];
    let mut stack = vec![start];
    let mut visited = [false; BOARDSIZE];
    let mut liberty_visited = [false; BOARDSIZE];
    let mut libs = 0u32;

    while let Some(pt) = stack.pop() {
        if visited[pt] {
            continue;
        }
        visited[pt] = true;

        if pos.color[pt] == color {
            for n in neighbors(pt) {
                match pos.color[n] {
                    EMPTY => {
                        if !liberty_visited[n] {
                            liberty_visited[n] = true;
                            libs += 1;
                        }
                    }
                    c if c == color && !visited[n] => stack.push(n),
                    _ => {}
                }
            }
        }
    }
    libs
}

/// Parse a coordinate string (e.g., "D4", "pass") into a Point.
///
/// Columns use letters A-T skipping I; rows count from 1 at the bottom.
/// Returns `None` for anything that is not a pass or an on-board coordinate.
pub fn parse_coord(s: &str) -> Option<Point> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("pass") {
        return Some(PASS_MOVE);
    }

    let bytes = s.as_bytes();
    if bytes.len() < 2 {
        return None;
    }

    let col_char = bytes[0].to_ascii_uppercase();
    if !col_char.is_ascii_uppercase() || col_char == b'I' {
        return None;
    }
    let mut col = (col_char - b'A') as usize;
    if col_char > b'I' {
        col -= 1;
    }

    let row: usize = s[1..].parse().ok()?;
    if col >= N || row == 0 || row > N {
        return None;
    }
    Some(point_at(N - row, col))
}

/// Convert a Point to a coordinate string (e.g., "D4").
///
/// Returns "pass" for `PASS_MOVE`.
pub fn str_coord(pt: Point) -> String {
    if pt == PASS_MOVE {
        return "pass".into();
    }

    let (row, col) = row_col(pt);
    let mut c = b'A' + col as u8;
    if c >= b'I' {
        c += 1;
    }

    format!("{}{}", c as char, N - row)
}

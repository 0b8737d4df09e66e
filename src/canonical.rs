//! Canonical position encoding.
//!
//! A position is reduced to a fixed representative of its symmetry class:
//! colors are inverted when White is to move (so the reduced position always
//! has Black to move), and among the 8 board symmetries the one with the
//! smallest packed encoding is kept. The chosen [`Reduction`] is returned so
//! that a move found on the reduced position can be mapped back.
//!
//! ```
//! use sente::canonical::canonicalize;
//! use sente::position::{Position, parse_coord, play_move};
//!
//! let mut pos = Position::new();
//! play_move(&mut pos, parse_coord("C3").unwrap()).unwrap();
//!
//! let (reduced, reduction) = canonicalize(&pos);
//! let mv = parse_coord("G7").unwrap();
//! assert_eq!(reduction.revert(reduction.apply(mv)), mv);
//! # let _ = reduced;
//! ```

use std::hash::{Hash, Hasher};

use crate::constants::{BLACK_STONE, EMPTY, N, PACKED_BOARD_SIZE, PASS_MOVE, WHITE_STONE};
use crate::position::{Color, Point, Position, board_points, is_board_point, point_at, row_col};

/// One of the 8 symmetries of the square board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symmetry {
    Identity,
    Rot90,
    Rot180,
    Rot270,
    FlipHorizontal,
    FlipVertical,
    Transpose,
    AntiTranspose,
}

impl Symmetry {
    /// All symmetries in tie-breaking order.
    pub const ALL: [Symmetry; 8] = [
        Symmetry::Identity,
        Symmetry::Rot90,
        Symmetry::Rot180,
        Symmetry::Rot270,
        Symmetry::FlipHorizontal,
        Symmetry::FlipVertical,
        Symmetry::Transpose,
        Symmetry::AntiTranspose,
    ];

    pub fn inverse(self) -> Symmetry {
        match self {
            Symmetry::Rot90 => Symmetry::Rot270,
            Symmetry::Rot270 => Symmetry::Rot90,
            other => other,
        }
    }

    /// Map a 0-based (row, column) pair.
    pub fn map_rc(self, row: usize, col: usize) -> (usize, usize) {
        let m = N - 1;
        match self {
            Symmetry::Identity => (row, col),
            Symmetry::Rot90 => (col, m - row),
            Symmetry::Rot180 => (m - row, m - col),
            Symmetry::Rot270 => (m - col, row),
            Symmetry::FlipHorizontal => (row, m - col),
            Symmetry::FlipVertical => (m - row, col),
            Symmetry::Transpose => (col, row),
            Symmetry::AntiTranspose => (m - col, m - row),
        }
    }

    /// Map a point; pass and off-board markers are returned unchanged.
    pub fn map_point(self, pt: Point) -> Point {
        if !is_board_point(pt) {
            return pt;
        }
        let (r, c) = row_col(pt);
        let (r, c) = self.map_rc(r, c);
        point_at(r, c)
    }
}

/// How a position was reduced: a board symmetry plus optional color inversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reduction {
    pub symmetry: Symmetry,
    pub invert_colors: bool,
}

impl Reduction {
    pub const IDENTITY: Reduction = Reduction {
        symmetry: Symmetry::Identity,
        invert_colors: false,
    };

    /// Map a move from the original frame into the reduced frame.
    pub fn apply(&self, mv: Point) -> Point {
        if mv == PASS_MOVE {
            return PASS_MOVE;
        }
        self.symmetry.map_point(mv)
    }

    /// Map a move from the reduced frame back to the original frame.
    pub fn revert(&self, mv: Point) -> Point {
        if mv == PASS_MOVE {
            return PASS_MOVE;
        }
        self.symmetry.inverse().map_point(mv)
    }

    /// Apply the reduction to a whole position.
    pub fn apply_position(&self, pos: &Position) -> Position {
        let mut out = pos.clone();
        for pt in board_points() {
            let c = pos.color[pt];
            out.color[self.symmetry.map_point(pt)] = if self.invert_colors {
                invert(c)
            } else {
                c
            };
        }
        if self.invert_colors {
            out.to_move = pos.to_move.opponent();
        }
        out.ko = self.apply(pos.ko);
        out.last = self.apply(pos.last);
        out.last2 = self.apply(pos.last2);
        out
    }
}

fn invert(c: u8) -> u8 {
    match c {
        BLACK_STONE => WHITE_STONE,
        WHITE_STONE => BLACK_STONE,
        other => other,
    }
}

/// Packed board encoding (2 bits per intersection) with a checksum.
///
/// Equality compares the packed bytes; hashing uses the checksum.
#[derive(Copy, Clone, Debug)]
pub struct CanonicalKey {
    bytes: [u8; PACKED_BOARD_SIZE],
    checksum: u32,
}

impl CanonicalKey {
    pub fn bytes(&self) -> &[u8; PACKED_BOARD_SIZE] {
        &self.bytes
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }
}

impl PartialEq for CanonicalKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for CanonicalKey {}

impl Hash for CanonicalKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.checksum);
    }
}

/// 32-bit FNV-1a over the packed bytes.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5u32, |h, &b| {
        (h ^ b as u32).wrapping_mul(0x0100_0193)
    })
}

/// Pack the stones of a position as-is (no reduction).
pub fn pack(pos: &Position) -> CanonicalKey {
    let mut bytes = [0u8; PACKED_BOARD_SIZE];
    for (i, pt) in board_points().enumerate() {
        let code = match pos.color[pt] {
            BLACK_STONE => 1u8,
            WHITE_STONE => 2u8,
            _ => 0u8,
        };
        bytes[i / 4] |= code << ((i % 4) * 2);
    }
    CanonicalKey {
        checksum: checksum(&bytes),
        bytes,
    }
}

/// Rebuild a position from a packed key, with Black to move.
pub fn unpack(key: &CanonicalKey) -> Position {
    let mut pos = Position::new();
    for (i, pt) in board_points().enumerate() {
        pos.color[pt] = match (key.bytes[i / 4] >> ((i % 4) * 2)) & 3 {
            1 => BLACK_STONE,
            2 => WHITE_STONE,
            _ => EMPTY,
        };
    }
    pos
}

/// Reduce a position to its canonical representative.
///
/// The side to move is taken from the position. The reduced position always
/// has Black to move.
pub fn canonicalize(pos: &Position) -> (Position, Reduction) {
    let invert_colors = pos.to_move == Color::White;
    let mut best: Option<(Position, CanonicalKey, Reduction)> = None;

    for symmetry in Symmetry::ALL {
        let reduction = Reduction {
            symmetry,
            invert_colors,
        };
        let candidate = reduction.apply_position(pos);
        let key = pack(&candidate);
        let better = match &best {
            None => true,
            Some((_, best_key, _)) => key.bytes < best_key.bytes,
        };
        if better {
            best = Some((candidate, key, reduction));
        }
    }

    match best {
        Some((reduced, _, reduction)) => (reduced, reduction),
        None => (pos.clone(), Reduction::IDENTITY),
    }
}

/// Canonical key of a position: `pack(canonicalize(pos).0)`.
pub fn canonical_key(pos: &Position) -> (CanonicalKey, Reduction) {
    let (reduced, reduction) = canonicalize(pos);
    (pack(&reduced), reduction)
}

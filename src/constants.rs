//! Constants for board geometry, search, time control and the distiller.
//!
//! The board uses a 1D array representation with padding for boundary detection.
//!
//! # Board Size Configuration
//!
//! The board size is controlled by Cargo features:
//! - `board9x9` (default): 9x9 board
//! - `board13x13`: 13x13 board
//!
//! ```sh
//! cargo build                                              # 9x9 (default)
//! cargo build --no-default-features --features board13x13  # 13x13
//! ```

// =============================================================================
// Board Geometry
// =============================================================================

/// Board size (NxN).
#[cfg(feature = "board9x9")]
pub const N: usize = 9;

#[cfg(feature = "board13x13")]
pub const N: usize = 13;

#[cfg(all(feature = "board9x9", feature = "board13x13"))]
compile_error!("Cannot enable both 'board9x9' and 'board13x13' features at the same time");

#[cfg(not(any(feature = "board9x9", feature = "board13x13")))]
compile_error!("Must enable exactly one board size feature: 'board9x9' or 'board13x13'");

/// Board width including padding on both sides.
pub const W: usize = N + 2;

/// Total board array size including all padding.
pub const BOARDSIZE: usize = (N + 1) * W + 1;

/// Maximum game length (3 times board area to allow for captures and replays).
pub const MAX_GAME_LEN: usize = N * N * 3;

/// Bytes needed to pack a board at 2 bits per intersection.
pub const PACKED_BOARD_SIZE: usize = (N * N).div_ceil(4);

// =============================================================================
// Special Move Values
// =============================================================================

/// Pass move marker (index 0 is padding, so safe to use).
pub const PASS_MOVE: usize = 0;

// =============================================================================
// Cell Values (as bytes for direct comparison and printing)
// =============================================================================

/// Black stone.
pub const BLACK_STONE: u8 = b'X';

/// White stone.
pub const WHITE_STONE: u8 = b'O';

/// Empty point.
pub const EMPTY: u8 = b'.';

/// Out of bounds (padding).
pub const OUT: u8 = b' ';

// =============================================================================
// MCTS Parameters
// =============================================================================

/// RAVE equivalence parameter - controls RAVE vs UCB balance.
pub const RAVE_EQUIV: usize = 3500;

/// Minimum visits of an edge before its child state is stored in the cache.
pub const EXPAND_VISITS: u32 = 8;

/// Winrate below which the engine may resign.
pub const RESIGN_THRES: f64 = 0.2;

/// Early stop: winrate of the best move once the early-stop deadline passed.
pub const FASTPLAY_THRES: f64 = 0.8;

/// Simulations between deadline checks.
pub const DEADLINE_CHECK_PERIOD: usize = 64;

/// Base prior for all moves (ensures exploration).
pub const PRIOR_EVEN: u32 = 10;

/// Prior bonus by distance from last move (distance 1, 2, 3).
pub const PRIOR_CFG: [u32; 3] = [24, 22, 8];

/// Negative prior for first and second line moves in empty areas.
pub const PRIOR_EMPTYAREA: u32 = 10;

/// Prior bonus for moves that capture.
pub const PRIOR_CAPTURE: u32 = 15;

// =============================================================================
// Time Control
// =============================================================================

/// Non-linear factor applied to the linear share of remaining time.
pub const TIME_ALLOT_FACTOR: f64 = 1.25;

/// Default network latency compensation in milliseconds.
pub const LATENCY_COMPENSATION: u32 = 50;

// =============================================================================
// Configuration and Opening Extension Distiller
// =============================================================================

/// Default data folder, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/";

/// Upper bound (exclusive) on the data folder path length.
pub const MAX_PATH_SIZE: usize = 512;

/// Default maximum number of plies sampled per game.
pub const DEFAULT_MAX_DEPTH: usize = N * N / 2;

/// Default minimum popularity for a position to be evaluated.
pub const DEFAULT_MIN_SAMPLES: u32 = 32;

/// Thinking time granted to each retained position.
pub const SECS_PER_POSITION: u64 = 30;

/// Largest game record accepted, in bytes.
pub const MAX_RECORD_BYTES: u64 = 256 * 1024;

/// Komi values considered standard when filtering game records.
pub const STANDARD_KOMI: [f32; 2] = [6.5, 7.5];

/// Name of the distiller output file inside the data folder.
pub const OUTPUT_FILE_NAME: &str = "output.spb";

/// Extension of opening book files read from the data folder.
pub const BOOK_EXTENSION: &str = "spb";

//! Sente: decision and maintenance layer of a Go engine.
//!
//! This crate chooses moves by consulting a static opening book on the
//! symmetry-reduced position and otherwise running a time-budgeted Monte
//! Carlo Tree Search, keeps the search cache bounded between turns and
//! matches, and distills new opening suggestions from game records.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions and engine parameters
//! - [`position`] - Core game logic (board state, moves, captures)
//! - [`canonical`] - Symmetry reduction and packed position keys
//! - [`time_system`] - Canadian byo-yomi clock and time budgets
//! - [`search`] - Interfaces to the search engine and its cache
//! - [`zobrist`], [`tt`] - Position hashing and the search cache
//! - [`mcts`] - Monte Carlo Tree Search with RAVE
//! - [`playout`] - Random game simulation for position evaluation
//! - [`book`] - Static opening book
//! - [`maintenance`] - Search cache lifecycle
//! - [`engine`] - Per-turn move decision
//! - [`sgf`] - Game record reader
//! - [`distill`] - Offline opening distiller
//! - [`config`] - Engine configuration
//!
//! ## Example
//!
//! ```
//! use std::time::{Duration, Instant};
//!
//! use sente::book::StaticBook;
//! use sente::config::EngineConfig;
//! use sente::engine::Engine;
//! use sente::mcts::Mcts;
//! use sente::position::{Position, parse_coord, play_move, str_coord};
//!
//! let mut pos = Position::new();
//! play_move(&mut pos, parse_coord("D4").unwrap()).unwrap();
//!
//! let mut engine = Engine::new(EngineConfig::default(), StaticBook::new(), Mcts::new(10_000));
//! let stop = Instant::now() + Duration::from_millis(100);
//! let decision = engine.decide(&pos, stop, stop);
//! println!("Best move: {}", str_coord(decision.play));
//!
//! play_move(&mut pos, decision.play).unwrap();
//! engine.turn_maintenance(&pos);
//! ```

pub mod book;
pub mod canonical;
pub mod config;
pub mod constants;
pub mod distill;
pub mod engine;
pub mod maintenance;
pub mod mcts;
pub mod playout;
pub mod position;
pub mod search;
pub mod sgf;
pub mod time_system;
pub mod tt;
pub mod zobrist;

//! Sente: a Go engine's decision layer.
//!
//! ## Usage
//!
//! - `sente` - Play a short self-play demo
//! - `sente demo --time 1m+3x10s/1 --moves 20` - Demo with options

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sente::book::StaticBook;
use sente::config::{DataFolder, EngineConfig};
use sente::engine::{DecisionSource, Engine};
use sente::mcts::{DEFAULT_MAX_STATES, Mcts, dump_edges};
use sente::position::{Position, play_move, str_coord};
use sente::time_system::{ClockState, TimeSystem};

const DEMO_TIME: &str = "10s+3x1s/1";
const DEMO_MOVES: u16 = 12;

/// Sente: opening book, time budgeting and MCTS for Go
#[derive(Parser)]
#[command(name = "sente")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a short self-play game under a time system
    Demo {
        /// Time system, e.g. `5m+3x30s/1`
        #[arg(long, default_value = DEMO_TIME)]
        time: TimeSystem,
        /// Number of moves to play
        #[arg(long, default_value_t = DEMO_MOVES)]
        moves: u16,
        /// Data folder holding opening books (`.spb`)
        #[arg(long)]
        data: Option<String>,
        /// Do not consult the opening book
        #[arg(long)]
        no_book: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Demo {
            time,
            moves,
            data,
            no_book,
        }) => run_demo(time, moves, data.as_deref(), !no_book),
        None => run_demo(DEMO_TIME.parse()?, DEMO_MOVES, None, true),
    }
}

fn load_book(folder: &DataFolder) -> Result<StaticBook> {
    if !folder.as_path().is_dir() {
        log::warn!("data folder {folder} not found; playing without opening books");
        return Ok(StaticBook::new());
    }
    StaticBook::load_dir(folder.as_path()).with_context(|| format!("loading books from {folder}"))
}

fn run_demo(time: TimeSystem, moves: u16, data: Option<&str>, use_book: bool) -> Result<()> {
    let data_folder = match data {
        Some(path) => DataFolder::new(path)?,
        None => DataFolder::default(),
    };
    let book = load_book(&data_folder)?;
    println!("Sente demo: {} book positions, clock {time}\n", book.len());

    let mut config = EngineConfig::new(data_folder);
    config.use_opening_book = use_book;
    let mut engine = Engine::new(config, book, Mcts::new(DEFAULT_MAX_STATES));
    engine.new_match();

    let mut clocks = [time, time];
    let mut pos = Position::new();

    for turn in 0..moves {
        let side = turn as usize % 2;
        let clock = &mut clocks[side];
        if clock.state() == ClockState::TimedOut {
            println!("{:?} lost on time", pos.to_move);
            break;
        }

        let decision = engine.genmove(&pos, clock, turn);
        let source = match decision.source {
            DecisionSource::OpeningBook => "book",
            DecisionSource::Search => "search",
        };
        println!(
            "{:>3}. {:?} {} ({source}), clock {}",
            turn + 1,
            pos.to_move,
            str_coord(decision.play),
            clock
        );
        if decision.source == DecisionSource::Search {
            dump_edges(engine.searcher().tt(), &pos);
        }
        if decision.may_resign {
            println!("{:?} resigns", pos.to_move);
            break;
        }

        if play_move(&mut pos, decision.play).is_err() {
            println!("illegal move {}", str_coord(decision.play));
            break;
        }
        if let Some(report) = engine.turn_maintenance(&pos) {
            log::debug!("pruned {} states", report.freed_states);
        }
    }

    println!("\n{pos}");
    Ok(())
}

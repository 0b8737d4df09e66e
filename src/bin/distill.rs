//! Distill opening suggestions from a folder of SGF game records.
//!
//! Records are read recursively from the data folder, positions popular
//! enough are re-evaluated with the search engine, and the results are
//! written to `output.spb` in the same folder.
//!
//! Flags may be spelled with one or two dashes (`-max_depth 20` or
//! `--max_depth 20`).

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use sente::book::StaticBook;
use sente::config::DataFolder;
use sente::constants::{
    DEFAULT_DATA_PATH, DEFAULT_MAX_DEPTH, DEFAULT_MIN_SAMPLES, OUTPUT_FILE_NAME, SECS_PER_POSITION,
};
use sente::distill::{self, DistillConfig};
use sente::mcts::Mcts;

#[derive(Parser, Debug)]
#[command(name = "sente-distill", version, about = "Distill opening suggestions from game records")]
struct Cli {
    /// Maximum turn depth of the openings
    #[arg(long = "max_depth", default_value_t = DEFAULT_MAX_DEPTH as u32,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_depth: u32,

    /// Minimum number of samples for a rule to be saved
    #[arg(long = "min_samples", default_value_t = DEFAULT_MIN_SAMPLES,
          value_parser = clap::value_parser!(u32).range(1..))]
    min_samples: u32,

    /// Allow games with uncommon komi values
    #[arg(long = "relax_komi")]
    relax_komi: bool,

    /// Folder with the game records; the output is written there too
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    data: String,

    /// Search time per position, in seconds
    #[arg(long, default_value_t = SECS_PER_POSITION,
          value_parser = clap::value_parser!(u64).range(1..))]
    secs: u64,
}

/// Accept `-flag` as a spelling of `--flag`.
fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let single_dash_long = arg.len() > 2 && arg.starts_with('-') && !arg.starts_with("--");
            if i > 0 && single_dash_long && !arg[1..].starts_with(|c: char| c.is_ascii_digit()) {
                format!("-{arg}")
            } else {
                arg
            }
        })
        .collect()
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse_from(normalize_args(std::env::args())) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            // Bad flags show the usage but are not a failure.
            eprintln!("{}", e.kind());
            Cli::command().print_help()?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    let data_folder = DataFolder::new(&cli.data)?;
    data_folder.ensure_exists()?;

    let config = DistillConfig {
        max_depth: cli.max_depth as usize,
        min_samples: cli.min_samples,
        relax_komi: cli.relax_komi,
        secs_per_position: cli.secs,
    };

    let book_files: Vec<_> = StaticBook::book_files(data_folder.as_path())?
        .into_iter()
        .filter(|p| p.file_name().is_none_or(|name| name != OUTPUT_FILE_NAME))
        .collect();
    let book = StaticBook::load_files(&book_files).context("loading opening books")?;
    log::info!("opening books: {} positions", book.len());

    let mut searcher = Mcts::default();
    let (corpus, evaluation) = distill::run(&data_folder, &config, &book, &mut searcher)?;

    log::info!(
        "{} files, {} games used, {} skipped, {} observations",
        corpus.files_found,
        corpus.games_used,
        corpus.games_skipped,
        corpus.observations
    );
    if let Some(stats) = evaluation {
        log::info!(
            "{} rows written ({} in books, {} passes)",
            stats.written,
            stats.book_hits,
            stats.passes
        );
    }
    log::info!("job done");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_dash_flags() {
        let cli = Cli::try_parse_from(normalize_args(args(&[
            "sente-distill",
            "-max_depth",
            "20",
            "-min_samples",
            "4",
            "-relax_komi",
        ])))
        .unwrap();
        assert_eq!(cli.max_depth, 20);
        assert_eq!(cli.min_samples, 4);
        assert!(cli.relax_komi);
        assert_eq!(cli.data, DEFAULT_DATA_PATH);
    }

    #[test]
    fn test_defaults_and_rejections() {
        let cli = Cli::try_parse_from(args(&["sente-distill"])).unwrap();
        assert_eq!(cli.max_depth as usize, DEFAULT_MAX_DEPTH);
        assert!(!cli.relax_komi);

        let zero = normalize_args(args(&["sente-distill", "-min_samples", "0"]));
        assert!(Cli::try_parse_from(zero).is_err());
        let junk = normalize_args(args(&["sente-distill", "-bogus"]));
        assert!(Cli::try_parse_from(junk).is_err());

        let version = normalize_args(args(&["sente-distill", "-version"]));
        let err = Cli::try_parse_from(version).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }
}

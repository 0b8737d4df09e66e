//! Offline distillation of opening suggestions from game records.
//!
//! Game records are replayed up to a maximum depth and every qualifying
//! position is counted by canonical key. Positions seen often enough are then
//! re-evaluated with the search engine and written out as book rows.
//!
//! Processing is deterministic for a given set of files: discovery is sorted
//! and the transition table iterates in first-insertion order.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use crate::book::OpeningBook;
use crate::canonical::{CanonicalKey, canonical_key, unpack};
use crate::config::DataFolder;
use crate::constants::{
    DEFAULT_MAX_DEPTH, DEFAULT_MIN_SAMPLES, EMPTY, MAX_RECORD_BYTES, N, OUTPUT_FILE_NAME,
    PASS_MOVE, SECS_PER_POSITION,
};
use crate::position::{MoveError, Point, Position, pass_move, play_move, str_coord};
use crate::search::Searcher;
use crate::sgf::{GameRecord, parse_sgf};

/// Files between two progress reports.
const PROGRESS_PERIOD: usize = 512;

/// Distillation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistillConfig {
    /// Plies replayed per game.
    pub max_depth: usize,
    /// Observations needed for a position to be evaluated.
    pub min_samples: u32,
    /// Also use games with unusual komi.
    pub relax_komi: bool,
    /// Search time per retained position.
    pub secs_per_position: u64,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            min_samples: DEFAULT_MIN_SAMPLES,
            relax_komi: false,
            secs_per_position: SECS_PER_POSITION,
        }
    }
}

/// A game record that cannot be replayed. Fatal for the whole run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("play over a stone at ply {ply}")]
    PlayOverStone { ply: usize },
    #[error("illegal play at ply {ply}: {source}")]
    IllegalPlay {
        ply: usize,
        #[source]
        source: MoveError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DistillError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: unexpected file size ({size} bytes)", path.display())]
    RecordSize { path: PathBuf, size: u64 },
    #[error("{}: {source}", path.display())]
    Replay {
        path: PathBuf,
        #[source]
        source: ReplayError,
    },
    #[error("write failed: {0}")]
    Write(#[from] io::Error),
}

/// Observed play for one canonical position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub key: CanonicalKey,
    /// First move seen in this position, in the canonical frame.
    pub play: Point,
    pub popularity: u32,
}

/// Canonical position → first-seen play and popularity.
#[derive(Debug, Default)]
pub struct TransitionTable {
    index: HashMap<CanonicalKey, usize>,
    records: Vec<TransitionRecord>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one observation. Returns true if the position is new.
    pub fn observe(&mut self, key: CanonicalKey, play: Point) -> bool {
        if let Some(&i) = self.index.get(&key) {
            self.records[i].popularity += 1;
            return false;
        }
        self.index.insert(key, self.records.len());
        self.records.push(TransitionRecord {
            key,
            play,
            popularity: 1,
        });
        true
    }

    /// Replay the first `max_depth` plies of a game and observe every play
    /// that does not capture.
    ///
    /// Returns the number of observations made.
    pub fn observe_game(&mut self, game: &GameRecord, max_depth: usize) -> Result<usize, ReplayError> {
        let mut pos = Position::new();
        let mut observed = 0;

        for (i, &mv) in game.moves.iter().take(max_depth).enumerate() {
            let ply = i + 1;
            if mv == PASS_MOVE {
                pass_move(&mut pos);
                continue;
            }
            if pos.color[mv] != EMPTY {
                return Err(ReplayError::PlayOverStone { ply });
            }

            let before = pos.clone();
            let captured =
                play_move(&mut pos, mv).map_err(|source| ReplayError::IllegalPlay { ply, source })?;
            if captured > 0 {
                continue;
            }

            let (key, reduction) = canonical_key(&before);
            self.observe(key, reduction.apply(mv));
            observed += 1;
        }

        Ok(observed)
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&TransitionRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    /// Records observed at least `min_samples` times.
    pub fn retained(&self, min_samples: u32) -> impl Iterator<Item = &TransitionRecord> {
        self.records
            .iter()
            .filter(move |r| r.popularity >= min_samples)
    }

    /// Fold a table built from a later shard into this one.
    ///
    /// Popularities are summed; for positions present in both, this table's
    /// play is kept.
    pub fn merge(&mut self, other: TransitionTable) {
        for record in other.records {
            match self.index.get(&record.key) {
                Some(&i) => self.records[i].popularity += record.popularity,
                None => {
                    self.index.insert(record.key, self.records.len());
                    self.records.push(record);
                }
            }
        }
    }
}

/// Aggregation statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub files_found: usize,
    pub games_used: usize,
    pub games_skipped: usize,
    pub observations: usize,
}

/// Evaluation statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    pub evaluated: usize,
    pub book_hits: usize,
    pub passes: usize,
    pub written: usize,
}

/// All SGF files under `folder`, recursively, sorted by path.
pub fn find_records(folder: &Path) -> Result<Vec<PathBuf>, DistillError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry.map_err(|e| DistillError::Io {
            path: e.path().unwrap_or(folder).to_path_buf(),
            source: e.into(),
        })?;
        let is_sgf = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sgf"));
        if is_sgf && entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Read one record; empty or oversized files are an error.
pub fn read_record(path: &Path) -> Result<String, DistillError> {
    let io_err = |source| DistillError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(io_err)?.len();
    if size == 0 || size >= MAX_RECORD_BYTES {
        return Err(DistillError::RecordSize {
            path: path.to_path_buf(),
            size,
        });
    }
    let bytes = fs::read(path).map_err(io_err)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Build the transition table from a list of record files.
pub fn aggregate(
    paths: &[PathBuf],
    config: &DistillConfig,
) -> Result<(TransitionTable, CorpusStats), DistillError> {
    let mut table = TransitionTable::new();
    let mut stats = CorpusStats {
        files_found: paths.len(),
        ..Default::default()
    };

    for (i, path) in paths.iter().enumerate() {
        if i % PROGRESS_PERIOD == 0 {
            log::info!("loading game states: {}%", (i + 1) * 100 / paths.len());
        }

        let text = read_record(path)?;
        let game = match parse_sgf(&text) {
            Ok(game) => game,
            Err(e) => {
                log::debug!("{}: skipped: {e}", path.display());
                stats.games_skipped += 1;
                continue;
            }
        };
        if !config.relax_komi && !game.has_standard_komi() {
            log::debug!("{}: skipped: komi {}", path.display(), game.komi);
            stats.games_skipped += 1;
            continue;
        }

        stats.observations += table
            .observe_game(&game, config.max_depth)
            .map_err(|source| DistillError::Replay {
                path: path.clone(),
                source,
            })?;
        stats.games_used += 1;
    }

    log::info!(
        "found {} unique game states from {} games",
        table.len(),
        stats.games_used
    );
    Ok((table, stats))
}

/// One output row: `<size> <cells> <move>`.
pub fn format_row(pos: &Position, mv: Point) -> String {
    format!("{} {} {}\n", N, pos.cells(), str_coord(mv))
}

/// Search every retained position not already in the book and write the best
/// play, flushing after each row.
pub fn evaluate<B, S, W>(
    table: &TransitionTable,
    config: &DistillConfig,
    book: &B,
    searcher: &mut S,
    out: &mut W,
) -> Result<EvaluationStats, DistillError>
where
    B: OpeningBook,
    S: Searcher,
    W: Write,
{
    let mut stats = EvaluationStats::default();

    for record in table.retained(config.min_samples) {
        stats.evaluated += 1;
        let pos = unpack(&record.key);

        if book.lookup(&pos).is_some() {
            log::info!("state already present in opening books");
            stats.book_hits += 1;
            continue;
        }

        searcher.cache_mut().reset();
        let stop_time = Instant::now() + Duration::from_secs(config.secs_per_position);
        let outcome = searcher.search(&pos, stop_time, stop_time);
        searcher.cache_mut().reset();

        let best = outcome.ratings.best();
        if best == PASS_MOVE {
            log::info!("best play was to pass; ignored");
            stats.passes += 1;
            continue;
        }

        out.write_all(format_row(&pos, best).as_bytes())?;
        out.flush()?;
        stats.written += 1;
        log::info!(
            "best play: {} actual play: {}",
            str_coord(best),
            str_coord(record.play)
        );
    }

    log::info!(
        "evaluated {} unique states with enough samples",
        stats.evaluated
    );
    Ok(stats)
}

/// Full job over a data folder: discover, aggregate, evaluate, and write
/// `output.spb` into the same folder.
///
/// No output file is created when no game state was found.
pub fn run<B: OpeningBook, S: Searcher>(
    data_folder: &DataFolder,
    config: &DistillConfig,
    book: &B,
    searcher: &mut S,
) -> Result<(CorpusStats, Option<EvaluationStats>), DistillError> {
    log::info!("searching game record files ({}*.sgf)", data_folder);
    let paths = find_records(data_folder.as_path())?;
    if paths.is_empty() {
        log::info!("no SGF files found");
    } else {
        log::info!("found {} SGF files", paths.len());
    }

    let (table, corpus) = aggregate(&paths, config)?;
    if table.is_empty() {
        return Ok((corpus, None));
    }

    let output = data_folder.join(OUTPUT_FILE_NAME);
    let file = File::create(&output).map_err(|source| DistillError::Io {
        path: output.clone(),
        source,
    })?;
    log::info!("created output file {}", output.display());

    let mut out = BufWriter::new(file);
    let stats = evaluate(&table, config, book, searcher, &mut out)?;
    Ok((corpus, Some(stats)))
}

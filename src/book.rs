//! Static opening book.
//!
//! Books are plain text files with one `<size> <cells> <move>` row per line,
//! the same format the distiller writes. Positions are stored by canonical
//! key, so a single row answers every symmetric variant of its position.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::canonical::{CanonicalKey, canonical_key};
use crate::constants::{BOOK_EXTENSION, EMPTY, N, PASS_MOVE};
use crate::position::{Color, Point, Position, parse_coord};

/// Errors raised while loading a book.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: &'static str },
}

/// Move lookup for positions already reduced to canonical form.
pub trait OpeningBook {
    /// The move to play in `reduced`, in the reduced frame.
    fn lookup(&self, reduced: &Position) -> Option<Point>;
}

/// In-memory book keyed by canonical key.
#[derive(Debug, Default, Clone)]
pub struct StaticBook {
    moves: HashMap<CanonicalKey, Point>,
}

impl StaticBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a position and its move. The first entry for a position wins.
    ///
    /// Returns false if the position was already present or the move is a pass.
    pub fn insert(&mut self, pos: &Position, mv: Point) -> bool {
        if mv == PASS_MOVE {
            return false;
        }
        let (key, reduction) = canonical_key(pos);
        if self.moves.contains_key(&key) {
            return false;
        }
        self.moves.insert(key, reduction.apply(mv));
        true
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Book files (`.spb`) directly inside `folder`, sorted by name.
    pub fn book_files(folder: &Path) -> Result<Vec<PathBuf>, BookError> {
        let io_err = |source| BookError::Io {
            path: folder.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(folder).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_book = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(BOOK_EXTENSION));
            if is_book && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load and merge several book files, in order.
    pub fn load_files(paths: &[PathBuf]) -> Result<Self, BookError> {
        let mut book = StaticBook::new();
        for path in paths {
            let text = fs::read_to_string(path).map_err(|source| BookError::Io {
                path: path.clone(),
                source,
            })?;
            let before = book.len();
            book.extend_from_text(&text)?;
            log::debug!(
                "{}: {} book positions",
                path.display(),
                book.len() - before
            );
        }
        Ok(book)
    }

    /// Load every book file in `folder`.
    pub fn load_dir(folder: &Path) -> Result<Self, BookError> {
        Self::load_files(&Self::book_files(folder)?)
    }

    fn extend_from_text(&mut self, text: &str) -> Result<(), BookError> {
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = |reason| BookError::Malformed { line: i + 1, reason };

            let mut fields = line.split_whitespace();
            let (Some(size), Some(cells), Some(mv), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(malformed("expected <size> <cells> <move>"));
            };

            let size: usize = size.parse().map_err(|_| malformed("bad board size"))?;
            if size != N {
                // Rows for other board sizes share files with ours.
                continue;
            }
            let pos = Position::from_cells(cells, Color::Black)
                .ok_or_else(|| malformed("bad cell string"))?;
            let mv = parse_coord(mv)
                .filter(|&mv| mv != PASS_MOVE)
                .ok_or_else(|| malformed("bad move"))?;
            if pos.color[mv] != EMPTY {
                return Err(malformed("move on an occupied point"));
            }
            self.insert(&pos, mv);
        }
        Ok(())
    }
}

impl FromStr for StaticBook {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut book = StaticBook::new();
        book.extend_from_text(s)?;
        Ok(book)
    }
}

impl OpeningBook for StaticBook {
    fn lookup(&self, reduced: &Position) -> Option<Point> {
        let (key, _) = canonical_key(reduced);
        self.moves.get(&key).copied()
    }
}

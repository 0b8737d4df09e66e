//! Interfaces between the decision layer and the search engine.
//!
//! The decision pipeline and the distiller only talk to the search through
//! [`Searcher`] and to its memory through [`SearchCache`], so either can be
//! replaced (the tests use scripted fakes).

use std::time::Instant;

use crate::canonical::Reduction;
use crate::constants::PASS_MOVE;
use crate::position::{Point, Position};

/// Rated candidate moves, higher is better.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveRatings {
    ratings: Vec<(Point, f64)>,
}

impl MoveRatings {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single recommended move.
    pub fn single(mv: Point) -> Self {
        Self {
            ratings: vec![(mv, 1.0)],
        }
    }

    pub fn push(&mut self, mv: Point, value: f64) {
        self.ratings.push((mv, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Point, f64)> {
        self.ratings.iter()
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Highest rated move; the first one wins ties. Pass if empty.
    pub fn best(&self) -> Point {
        let mut best: Option<(Point, f64)> = None;
        for &(mv, value) in &self.ratings {
            if best.is_none_or(|(_, v)| value > v) {
                best = Some((mv, value));
            }
        }
        best.map(|(mv, _)| mv).unwrap_or(PASS_MOVE)
    }

    /// Map every move from a reduced frame back to the original one.
    pub fn revert(&self, reduction: &Reduction) -> MoveRatings {
        MoveRatings {
            ratings: self
                .ratings
                .iter()
                .map(|&(mv, v)| (reduction.revert(mv), v))
                .collect(),
        }
    }
}

/// Result of one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub ratings: MoveRatings,
    /// Estimated winrate of the best move for the side to move.
    pub win_rate: f64,
    pub simulations: usize,
}

/// What a cache prune released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub freed_states: usize,
    pub freed_bytes: usize,
}

impl PruneReport {
    pub fn freed_mib(&self) -> usize {
        self.freed_bytes / (1024 * 1024)
    }
}

/// The search engine's memory of evaluated states.
pub trait SearchCache {
    /// Drop every entry.
    fn reset(&mut self);

    /// Drop every entry not reachable from `root` (side to move included).
    fn prune_unreachable(&mut self, root: &Position) -> PruneReport;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A time-budgeted search.
///
/// `search` blocks until `stop_time`, or until `early_stop_time` when the
/// result is already clear.
pub trait Searcher {
    fn search(&mut self, pos: &Position, stop_time: Instant, early_stop_time: Instant)
    -> SearchOutcome;

    fn cache_mut(&mut self) -> &mut dyn SearchCache;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::Symmetry;
    use crate::position::parse_coord;

    #[test]
    fn test_best_prefers_first_on_ties() {
        let mut r = MoveRatings::new();
        assert_eq!(r.best(), PASS_MOVE);
        let a = parse_coord("C3").unwrap();
        let b = parse_coord("D4").unwrap();
        r.push(a, 5.0);
        r.push(b, 5.0);
        assert_eq!(r.best(), a);
        r.push(PASS_MOVE, 9.0);
        assert_eq!(r.best(), PASS_MOVE);
    }

    #[test]
    fn test_revert_maps_moves() {
        let reduction = Reduction {
            symmetry: Symmetry::Rot90,
            invert_colors: false,
        };
        let mv = parse_coord("C3").unwrap();
        let ratings = MoveRatings::single(reduction.apply(mv)).revert(&reduction);
        assert_eq!(ratings.best(), mv);
        assert_eq!(ratings.len(), 1);
    }

    #[test]
    fn test_prune_report_mib() {
        let report = PruneReport {
            freed_states: 10,
            freed_bytes: 3 * 1024 * 1024 + 5,
        };
        assert_eq!(report.freed_mib(), 3);
    }
}

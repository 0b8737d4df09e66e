//! Search cache lifecycle between turns and matches.

use crate::position::Position;
use crate::search::{PruneReport, SearchCache};

/// Tracks whether the search cache holds states that may have become
/// unreachable, plus match-scoped adjustments.
#[derive(Debug, Default)]
pub struct CacheMaintenance {
    maintenance_pending: bool,
    komi_offset: i16,
}

impl CacheMaintenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Between matches: drop the whole cache and forget match state.
    pub fn begin_match(&mut self, cache: &mut dyn SearchCache) {
        cache.reset();
        self.maintenance_pending = false;
        self.komi_offset = 0;
        log::info!("mcts: freed all states between matches");
    }

    /// Between turns: if a search ran since the last cleanup, drop every
    /// state not reachable from `pos`.
    ///
    /// Returns `None` when nothing had to be done.
    pub fn after_turn(&mut self, cache: &mut dyn SearchCache, pos: &Position) -> Option<PruneReport> {
        if !self.maintenance_pending {
            return None;
        }
        let report = cache.prune_unreachable(pos);
        self.maintenance_pending = false;
        log::info!(
            "mcts: freed {} states ({} MiB)",
            report.freed_states,
            report.freed_mib()
        );
        Some(report)
    }

    /// Record that the search touched the cache.
    pub fn mark_pending(&mut self) {
        self.maintenance_pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.maintenance_pending
    }

    /// Komi correction applied to searches, reset at every match.
    pub fn komi_offset(&self) -> i16 {
        self.komi_offset
    }

    /// Shift the komi correction, e.g. from a dynamic-komi policy. Nothing in
    /// this crate calls it; the offset stays 0 unless a caller does.
    pub fn adjust_komi_offset(&mut self, delta: i16) {
        self.komi_offset = self.komi_offset.saturating_add(delta);
    }
}

//! Per-turn move decision and cache upkeep.
//!
//! The [`Engine`] first asks the opening book about the canonical form of the
//! position and only falls back to a time-budgeted search on a miss. Search
//! calls leave the cache needing maintenance, which [`Engine::turn_maintenance`]
//! performs between turns.

use std::time::{Duration, Instant};

use crate::book::OpeningBook;
use crate::canonical::canonicalize;
use crate::config::EngineConfig;
use crate::constants::RESIGN_THRES;
use crate::maintenance::CacheMaintenance;
use crate::position::{Point, Position};
use crate::search::{MoveRatings, PruneReport, Searcher};
use crate::time_system::TimeSystem;

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    OpeningBook,
    Search,
}

/// Outcome of one turn's deliberation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Candidate moves in the caller's frame.
    pub ratings: MoveRatings,
    /// The move to play.
    pub play: Point,
    /// The search estimated our chances below the resignation threshold.
    pub may_resign: bool,
    pub source: DecisionSource,
}

pub struct Engine<B, S> {
    config: EngineConfig,
    book: B,
    searcher: S,
    maintenance: CacheMaintenance,
}

impl<B: OpeningBook, S: Searcher> Engine<B, S> {
    pub fn new(config: EngineConfig, book: B, searcher: S) -> Self {
        Self {
            config,
            book,
            searcher,
            maintenance: CacheMaintenance::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn searcher(&self) -> &S {
        &self.searcher
    }

    pub fn maintenance(&self) -> &CacheMaintenance {
        &self.maintenance
    }

    pub fn maintenance_mut(&mut self) -> &mut CacheMaintenance {
        &mut self.maintenance
    }

    pub fn set_use_of_opening_book(&mut self, use_book: bool) {
        self.config.use_opening_book = use_book;
    }

    /// Evaluate `pos` for the side to move, searching until `stop_time` at the
    /// latest.
    ///
    /// Book answers are returned immediately and leave the cache alone.
    pub fn decide(&mut self, pos: &Position, stop_time: Instant, early_stop_time: Instant) -> Decision {
        if self.config.use_opening_book {
            let (reduced, reduction) = canonicalize(pos);
            if let Some(mv) = self.book.lookup(&reduced) {
                let play = reduction.revert(mv);
                log::debug!("book: hit");
                return Decision {
                    ratings: MoveRatings::single(play),
                    play,
                    may_resign: false,
                    source: DecisionSource::OpeningBook,
                };
            }
        }

        let mut tmp = pos.clone();
        tmp.komi += self.maintenance.komi_offset() as f32;
        let outcome = self.searcher.search(&tmp, stop_time, early_stop_time);
        self.maintenance.mark_pending();

        Decision {
            play: outcome.ratings.best(),
            ratings: outcome.ratings,
            may_resign: outcome.win_rate < RESIGN_THRES,
            source: DecisionSource::Search,
        }
    }

    /// Decide a move under `clock`, then charge the time spent to it.
    pub fn genmove(&mut self, pos: &Position, clock: &mut TimeSystem, turns_played: u16) -> Decision {
        let budget = clock.calc_time_to_play(turns_played, &self.config.latency);
        let start = Instant::now();
        let stop_time = start + Duration::from_millis(budget as u64);
        let early_stop_time = start + Duration::from_millis(budget as u64 / 2);

        let decision = self.decide(pos, stop_time, early_stop_time);

        let elapsed = u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX);
        clock.advance_clock(elapsed);
        log::debug!("clock: budget {budget} ms, spent {elapsed} ms, now {clock}");
        decision
    }

    /// Reset the search cache and match-scoped state.
    pub fn new_match(&mut self) {
        self.maintenance.begin_match(self.searcher.cache_mut());
    }

    /// Prune the cache to states reachable from `pos` if a search ran since
    /// the last cleanup.
    pub fn turn_maintenance(&mut self, pos: &Position) -> Option<PruneReport> {
        self.maintenance.after_turn(self.searcher.cache_mut(), pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::StaticBook;
    use crate::constants::PASS_MOVE;
    use crate::position::{parse_coord, play_move};
    use crate::search::{SearchCache, SearchOutcome};

    #[derive(Default)]
    struct FakeCache {
        entries: usize,
    }

    impl SearchCache for FakeCache {
        fn reset(&mut self) {
            self.entries = 0;
        }

        fn prune_unreachable(&mut self, _root: &Position) -> PruneReport {
            let freed = self.entries;
            self.entries = 0;
            PruneReport {
                freed_states: freed,
                freed_bytes: 0,
            }
        }

        fn len(&self) -> usize {
            self.entries
        }
    }

    struct ScriptedSearcher {
        reply: Point,
        win_rate: f64,
        calls: usize,
        last_komi: f32,
        cache: FakeCache,
    }

    impl ScriptedSearcher {
        fn new(reply: &str, win_rate: f64) -> Self {
            Self {
                reply: parse_coord(reply).unwrap(),
                win_rate,
                calls: 0,
                last_komi: 0.0,
                cache: FakeCache::default(),
            }
        }
    }

    impl Searcher for ScriptedSearcher {
        fn search(&mut self, pos: &Position, _stop: Instant, _early: Instant) -> SearchOutcome {
            self.calls += 1;
            self.last_komi = pos.komi;
            self.cache.entries += 10;
            let mut ratings = MoveRatings::new();
            ratings.push(PASS_MOVE, 1.0);
            ratings.push(self.reply, 5.0);
            SearchOutcome {
                ratings,
                win_rate: self.win_rate,
                simulations: 1,
            }
        }

        fn cache_mut(&mut self) -> &mut dyn SearchCache {
            &mut self.cache
        }
    }

    fn book_position() -> Position {
        let mut pos = Position::new();
        play_move(&mut pos, parse_coord("C3").unwrap()).unwrap();
        pos
    }

    fn engine(win_rate: f64) -> Engine<StaticBook, ScriptedSearcher> {
        let mut book = StaticBook::new();
        book.insert(&book_position(), parse_coord("G7").unwrap());
        Engine::new(
            EngineConfig::default(),
            book,
            ScriptedSearcher::new("E5", win_rate),
        )
    }

    fn deadlines() -> (Instant, Instant) {
        let now = Instant::now();
        (now + Duration::from_millis(10), now)
    }

    #[test]
    fn test_book_hit_skips_search_and_maintenance() {
        let mut engine = engine(0.5);
        let (stop, early) = deadlines();
        let pos = book_position();
        let decision = engine.decide(&pos, stop, early);

        assert_eq!(decision.source, DecisionSource::OpeningBook);
        assert_eq!(decision.play, parse_coord("G7").unwrap());
        assert_eq!(engine.searcher().calls, 0);
        assert!(!engine.maintenance().is_pending());
        assert!(!decision.may_resign);
        assert_eq!(engine.turn_maintenance(&pos), None);
    }

    #[test]
    fn test_book_miss_searches_and_marks_pending() {
        let mut engine = engine(0.5);
        let (stop, early) = deadlines();
        let pos = Position::new();
        let decision = engine.decide(&pos, stop, early);

        assert_eq!(decision.source, DecisionSource::Search);
        assert_eq!(decision.play, parse_coord("E5").unwrap());
        assert_eq!(engine.searcher().calls, 1);
        assert!(engine.maintenance().is_pending());
        assert!(!decision.may_resign);

        let report = engine.turn_maintenance(&pos).unwrap();
        assert_eq!(report.freed_states, 10);
        assert!(!engine.maintenance().is_pending());
    }

    #[test]
    fn test_book_disabled() {
        let mut engine = engine(0.5);
        engine.set_use_of_opening_book(false);
        let (stop, early) = deadlines();
        let decision = engine.decide(&book_position(), stop, early);
        assert_eq!(decision.source, DecisionSource::Search);
    }

    #[test]
    fn test_resign_threshold() {
        let (stop, early) = deadlines();
        let pos = Position::new();
        assert!(engine(RESIGN_THRES - 0.01).decide(&pos, stop, early).may_resign);
        assert!(!engine(RESIGN_THRES).decide(&pos, stop, early).may_resign);
    }

    #[test]
    fn test_komi_offset_applied_to_search_only() {
        let mut engine = engine(0.5);
        engine.maintenance_mut().adjust_komi_offset(2);
        let (stop, early) = deadlines();
        let pos = Position::new();
        engine.decide(&pos, stop, early);
        assert_eq!(engine.searcher().last_komi, pos.komi + 2.0);

        engine.new_match();
        assert_eq!(engine.maintenance().komi_offset(), 0);
        assert!(!engine.maintenance().is_pending());
    }

    #[test]
    fn test_genmove_charges_clock() {
        let mut engine = engine(0.5);
        let mut clock = TimeSystem::sudden_death(60_000);
        let decision = engine.genmove(&Position::new(), &mut clock, 0);
        assert_eq!(decision.play, parse_coord("E5").unwrap());
        assert!(clock.main_time_remaining <= 60_000);
        assert!(!clock.timed_out);
    }
}

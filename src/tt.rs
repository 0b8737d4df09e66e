//! Transposition table: the search cache shared across turns.
//!
//! Each entry holds the statistics of one state, keyed by Zobrist hash, and
//! one [`Edge`] per candidate move pointing at the child state's hash. Edges
//! make the stored states a graph, which is what the reachability prune walks.

use std::collections::{HashMap, HashSet};
use std::mem::size_of;

use crate::constants::RAVE_EQUIV;
use crate::position::{Point, Position};
use crate::search::{PruneReport, SearchCache};
use crate::zobrist::zobrist_hash;

/// Statistics for one move out of a stored state.
#[derive(Debug, Clone)]
pub struct Edge {
    pub mv: Point,
    /// Hash of the state reached by playing `mv`
    pub child: u64,
    /// Number of visits
    pub v: u32,
    /// Number of wins for the player making the move
    pub w: u32,
    /// Prior visits
    pub pv: u32,
    /// Prior wins
    pub pw: u32,
    /// AMAF visits
    pub av: u32,
    /// AMAF wins
    pub aw: u32,
}

impl Edge {
    /// Winrate of the move; unvisited edges report an even game.
    pub fn winrate(&self) -> f64 {
        if self.v > 0 {
            self.w as f64 / self.v as f64
        } else {
            0.5
        }
    }

    /// RAVE-UCB urgency used to pick the edge to descend.
    ///
    /// Blends the prior-smoothed winrate with the AMAF winrate; the AMAF
    /// weight decreases as real visits accumulate.
    pub fn urgency(&self) -> f64 {
        let v = (self.v + self.pv) as f64;
        let expectation = (self.w + self.pw) as f64 / v;

        if self.av == 0 {
            return expectation;
        }

        let rave_expectation = self.aw as f64 / self.av as f64;
        let av = self.av as f64;
        let beta = av / (av + v + v * av / RAVE_EQUIV as f64);
        beta * rave_expectation + (1.0 - beta) * expectation
    }
}

/// One stored state.
#[derive(Debug, Clone, Default)]
pub struct TtEntry {
    pub visits: u32,
    pub edges: Vec<Edge>,
}

impl TtEntry {
    fn footprint(&self) -> usize {
        size_of::<u64>() + size_of::<TtEntry>() + self.edges.capacity() * size_of::<Edge>()
    }
}

/// Search cache keyed by Zobrist hash.
pub struct TranspositionTable {
    entries: HashMap<u64, TtEntry>,
    max_entries: usize,
}

impl TranspositionTable {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, key: u64) -> Option<&TtEntry> {
        self.entries.get(&key)
    }

    pub fn get_mut(&mut self, key: u64) -> Option<&mut TtEntry> {
        self.entries.get_mut(&key)
    }

    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Store a state; refused once the table is full.
    pub fn insert(&mut self, key: u64, entry: TtEntry) -> bool {
        if self.is_full() && !self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_entries
    }

    /// Hashes of every state reachable from `root` through stored edges.
    fn reachable_from(&self, root: u64) -> HashSet<u64> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            let Some(entry) = self.entries.get(&key) else {
                continue;
            };
            if !seen.insert(key) {
                continue;
            }
            stack.extend(entry.edges.iter().map(|e| e.child));
        }
        seen
    }
}

impl SearchCache for TranspositionTable {
    fn reset(&mut self) {
        self.entries = HashMap::new();
    }

    fn prune_unreachable(&mut self, root: &Position) -> PruneReport {
        let keep = self.reachable_from(zobrist_hash(root));
        let mut report = PruneReport::default();
        self.entries.retain(|key, entry| {
            if keep.contains(key) {
                true
            } else {
                report.freed_states += 1;
                report.freed_bytes += entry.footprint();
                false
            }
        });
        report
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{parse_coord, play_move};

    fn edge(mv: Point, child: u64) -> Edge {
        Edge {
            mv,
            child,
            v: 0,
            w: 0,
            pv: 10,
            pw: 5,
            av: 0,
            aw: 0,
        }
    }

    fn entry(children: &[u64]) -> TtEntry {
        TtEntry {
            visits: 0,
            edges: children.iter().map(|&c| edge(1, c)).collect(),
        }
    }

    #[test]
    fn test_insert_respects_capacity() {
        let mut tt = TranspositionTable::new(2);
        assert!(tt.insert(1, TtEntry::default()));
        assert!(tt.insert(2, TtEntry::default()));
        assert!(!tt.insert(3, TtEntry::default()));
        assert!(tt.insert(2, TtEntry::default()), "replacing is always allowed");
        assert_eq!(tt.len(), 2);
    }

    #[test]
    fn test_prune_keeps_reachable_states() {
        let mut pos = Position::new();
        let root = zobrist_hash(&pos);
        play_move(&mut pos, parse_coord("E5").unwrap()).unwrap();
        let child = zobrist_hash(&pos);

        let mut tt = TranspositionTable::new(100);
        tt.insert(root, entry(&[child, 999]));
        tt.insert(child, entry(&[777]));
        tt.insert(777, entry(&[]));
        tt.insert(555, entry(&[666]));
        tt.insert(666, entry(&[]));

        let report = tt.prune_unreachable(&pos);
        assert_eq!(report.freed_states, 3);
        assert!(report.freed_bytes > 0);
        assert!(tt.contains(child));
        assert!(tt.contains(777));
        assert!(!tt.contains(root));
        assert!(!tt.contains(555));
    }

    #[test]
    fn test_reset_clears() {
        let mut tt = TranspositionTable::new(10);
        tt.insert(1, TtEntry::default());
        tt.reset();
        assert!(tt.is_empty());
    }

    #[test]
    fn test_urgency_uses_priors_then_amaf() {
        let mut e = edge(1, 0);
        assert!((e.urgency() - 0.5).abs() < 1e-9);
        e.av = 10;
        e.aw = 10;
        assert!(e.urgency() > 0.5);
        assert_eq!(e.winrate(), 0.5);
    }
}

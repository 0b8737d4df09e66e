//! Monte Carlo Tree Search (MCTS) with RAVE over the transposition table.
//!
//! This module implements MCTS with:
//! - UCB1-RAVE for edge selection (combining UCB with All-Moves-As-First heuristic)
//! - Heuristic priors for move prioritization
//! - Random playouts for value estimation
//! - Wall-clock deadlines instead of a fixed simulation count
//!
//! States are stored in a [`TranspositionTable`] that outlives a single search,
//! so statistics gathered on one turn are reused on the next as long as the
//! caller keeps the cache pruned to the reachable tree.

use std::time::Instant;

use crate::constants::{
    BOARDSIZE, DEADLINE_CHECK_PERIOD, EMPTY, EXPAND_VISITS, FASTPLAY_THRES, MAX_GAME_LEN, N, OUT,
    PASS_MOVE, PRIOR_CAPTURE, PRIOR_CFG, PRIOR_EMPTYAREA, PRIOR_EVEN, W,
};
use crate::playout::{amaf_sign, mcplayout};
use crate::position::{
    Color, Point, Position, board_points, is_eye, neighbors, pass_move, play_move, str_coord,
};
use crate::search::{MoveRatings, SearchCache, SearchOutcome, Searcher};
use crate::tt::{Edge, TranspositionTable, TtEntry};
use crate::zobrist::zobrist_hash;

/// Default capacity of the search cache, in states.
pub const DEFAULT_MAX_STATES: usize = 200_000;

/// MCTS engine owning its search cache.
pub struct Mcts {
    tt: TranspositionTable,
    rng: fastrand::Rng,
}

impl Default for Mcts {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STATES)
    }
}

impl Mcts {
    pub fn new(max_states: usize) -> Self {
        Self {
            tt: TranspositionTable::new(max_states),
            rng: fastrand::Rng::new(),
        }
    }

    /// Engine with a fixed playout seed, for reproducible runs.
    pub fn with_seed(max_states: usize, seed: u64) -> Self {
        Self {
            tt: TranspositionTable::new(max_states),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn tt(&self) -> &TranspositionTable {
        &self.tt
    }

    /// Run one simulation from `root`: descend, play out, update.
    fn simulate(&mut self, root: &Position) {
        let mut pos = root.clone();
        let mut amaf_map = vec![0i8; BOARDSIZE];
        let mut path: Vec<(u64, usize, Color)> = Vec::new();
        let mut key = zobrist_hash(&pos);
        let mut passes = 0;

        while passes < 2 && pos.n < MAX_GAME_LEN {
            let Some(entry) = self.tt.get(key) else {
                break;
            };
            let idx = most_urgent(&entry.edges);
            let (mv, child, visits) = {
                let e = &entry.edges[idx];
                (e.mv, e.child, e.v)
            };

            let mover = pos.to_move;
            if play_move(&mut pos, mv).is_err() {
                break;
            }
            path.push((key, idx, mover));

            if mv == PASS_MOVE {
                passes += 1;
            } else {
                passes = 0;
                if amaf_map[mv] == 0 {
                    amaf_map[mv] = amaf_sign(mover);
                }
            }

            key = child;
            if !self.tt.contains(key) {
                if visits + 1 >= EXPAND_VISITS {
                    self.tt.insert(key, expand(&pos));
                }
                break;
            }
        }

        let score = mcplayout(&mut pos, &mut amaf_map, &mut self.rng);
        let winner = if score > 0.0 { Color::Black } else { Color::White };
        self.update(&path, &amaf_map, winner);
    }

    /// Propagate a playout result along the descent path.
    fn update(&mut self, path: &[(u64, usize, Color)], amaf_map: &[i8], winner: Color) {
        for &(key, idx, mover) in path {
            let Some(entry) = self.tt.get_mut(key) else {
                continue;
            };
            entry.visits += 1;
            let won = mover == winner;

            let edge = &mut entry.edges[idx];
            edge.v += 1;
            if won {
                edge.w += 1;
            }

            let sign = amaf_sign(mover);
            for e in &mut entry.edges {
                if e.mv != PASS_MOVE && amaf_map[e.mv] == sign {
                    e.av += 1;
                    if won {
                        e.aw += 1;
                    }
                }
            }
        }
    }
}

impl Searcher for Mcts {
    /// Search until `stop_time`, or until `early_stop_time` once the best
    /// move is clearly winning.
    fn search(
        &mut self,
        pos: &Position,
        stop_time: Instant,
        early_stop_time: Instant,
    ) -> SearchOutcome {
        let root_key = zobrist_hash(pos);
        if !self.tt.contains(root_key) {
            // The root is stored even when the table is full.
            if self.tt.is_full() {
                self.tt.reset();
            }
            self.tt.insert(root_key, expand(pos));
        }

        let mut simulations = 0;
        loop {
            self.simulate(pos);
            simulations += 1;

            if simulations % DEADLINE_CHECK_PERIOD == 0 {
                let now = Instant::now();
                if now >= stop_time {
                    break;
                }
                if now >= early_stop_time && best_winrate(&self.tt, root_key) > FASTPLAY_THRES {
                    break;
                }
            }
        }

        let mut ratings = MoveRatings::new();
        let mut win_rate = 0.5;
        if let Some(entry) = self.tt.get(root_key) {
            for e in &entry.edges {
                ratings.push(e.mv, e.v as f64);
            }
            let best = ratings.best();
            if let Some(e) = entry.edges.iter().find(|e| e.mv == best) {
                win_rate = e.winrate();
            }
        }

        log::debug!(
            "mcts: {simulations} simulations, best {} ({:.1}%)",
            str_coord(ratings.best()),
            win_rate * 100.0
        );

        SearchOutcome {
            ratings,
            win_rate,
            simulations,
        }
    }

    fn cache_mut(&mut self) -> &mut dyn SearchCache {
        &mut self.tt
    }
}

fn best_winrate(tt: &TranspositionTable, key: u64) -> f64 {
    tt.get(key)
        .and_then(|entry| entry.edges.iter().filter(|e| e.v > 0).max_by_key(|e| e.v))
        .map(|e| e.winrate())
        .unwrap_or(0.0)
}

/// Create the cache entry for a state: one edge per legal move.
///
/// The mover's true eyes are skipped. If no moves are available a pass edge
/// is added. Priors favor moves near the last move and captures, and
/// penalize first and second line moves in empty areas.
pub fn expand(pos: &Position) -> TtEntry {
    let cfg_map = if pos.last != PASS_MOVE {
        Some(compute_cfg_distances(pos, pos.last))
    } else {
        None
    };

    let own = pos.to_move.stone();
    let mut edges = Vec::new();
    for pt in board_points() {
        if pos.color[pt] != EMPTY || is_eye(pos, pt) == own {
            continue;
        }

        let mut child_pos = pos.clone();
        if let Ok(captured) = play_move(&mut child_pos, pt) {
            let mut edge = new_edge(pt, zobrist_hash(&child_pos));
            apply_priors(&mut edge, pos, pt, captured, &cfg_map);
            edges.push(edge);
        }
    }

    if edges.is_empty() {
        let mut child_pos = pos.clone();
        pass_move(&mut child_pos);
        edges.push(new_edge(PASS_MOVE, zobrist_hash(&child_pos)));
    }

    TtEntry { visits: 0, edges }
}

fn new_edge(mv: Point, child: u64) -> Edge {
    Edge {
        mv,
        child,
        v: 0,
        w: 0,
        pv: PRIOR_EVEN,
        pw: PRIOR_EVEN / 2,
        av: 0,
        aw: 0,
    }
}

fn apply_priors(
    edge: &mut Edge,
    parent: &Position,
    pt: Point,
    captured: u32,
    cfg_map: &Option<[i8; BOARDSIZE]>,
) {
    if let Some(cfg) = cfg_map {
        let dist = cfg[pt];
        if dist >= 1 && (dist as usize) <= PRIOR_CFG.len() {
            let bonus = PRIOR_CFG[(dist - 1) as usize];
            edge.pv += bonus;
            edge.pw += bonus;
        }
    }

    if captured > 0 {
        edge.pv += PRIOR_CAPTURE;
        edge.pw += PRIOR_CAPTURE;
    }

    let height = line_height(pt);
    if height <= 2 && empty_area(parent, pt, 3) {
        edge.pv += PRIOR_EMPTYAREA;
        if height == 2 {
            // 3rd line is fine in empty areas
            edge.pw += PRIOR_EMPTYAREA;
        }
    }
}

/// Compute Common Fate Graph distances from a given point.
///
/// Like Manhattan distance, but stones of one group are at distance 0 from
/// each other.
fn compute_cfg_distances(pos: &Position, start: Point) -> [i8; BOARDSIZE] {
    let mut cfg_map = [-1i8; BOARDSIZE];
    let mut queue = Vec::with_capacity(BOARDSIZE);

    cfg_map[start] = 0;
    queue.push(start);
    let mut head = 0;

    while head < queue.len() {
        let pt = queue[head];
        head += 1;

        for n in neighbors(pt) {
            let c = pos.color[n];
            if c == OUT {
                continue;
            }

            let old_dist = cfg_map[n];
            let new_dist = if c != EMPTY && c == pos.color[pt] {
                cfg_map[pt]
            } else {
                cfg_map[pt] + 1
            };

            if old_dist < 0 || new_dist < old_dist {
                cfg_map[n] = new_dist;
                queue.push(n);
            }
        }
    }

    cfg_map
}

/// Line number (0-indexed) from the nearest board edge.
fn line_height(pt: Point) -> usize {
    let row = pt / (N + 1);
    let col = pt % (N + 1);

    let row_dist = row.min(N + 1 - row);
    let col_dist = col.min(W - 1 - col);

    row_dist.min(col_dist).saturating_sub(1)
}

/// Check if there are no stones within distance `dist` of a point.
fn empty_area(pos: &Position, pt: Point, dist: usize) -> bool {
    if dist == 0 {
        return true;
    }

    for n in neighbors(pt) {
        match pos.color[n] {
            EMPTY => {
                if dist > 1 && !empty_area(pos, n, dist - 1) {
                    return false;
                }
            }
            OUT => {}
            _ => return false,
        }
    }

    true
}

/// Index of the edge with the highest urgency.
fn most_urgent(edges: &[Edge]) -> usize {
    edges
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.urgency()
                .partial_cmp(&b.urgency())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Print debug information about the root's edges.
pub fn dump_edges(tt: &TranspositionTable, pos: &Position) {
    if let Some(entry) = tt.get(zobrist_hash(pos)) {
        for e in &entry.edges {
            log::debug!(
                "move {} v={} w={} wr={:.3}",
                str_coord(e.mv),
                e.v,
                e.w,
                e.winrate()
            );
        }
    }
}

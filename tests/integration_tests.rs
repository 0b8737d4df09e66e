//! Integration tests for sente
//!
//! These exercise the public API end to end: symmetry reduction feeding the
//! opening book, the clock driving the decision pipeline, and the distiller
//! running over a folder of game records.

use std::fs;
use std::time::{Duration, Instant};

use sente::book::{OpeningBook, StaticBook};
use sente::canonical::{Reduction, Symmetry, canonical_key, canonicalize};
use sente::config::{DataFolder, EngineConfig};
use sente::constants::{N, OUTPUT_FILE_NAME, PASS_MOVE};
use sente::distill::{self, DistillConfig, DistillError, ReplayError};
use sente::engine::{DecisionSource, Engine};
use sente::mcts::Mcts;
use sente::position::{Color, Point, Position, board_points, parse_coord, play_move, str_coord};
use sente::search::{MoveRatings, SearchCache, SearchOutcome, Searcher};
use sente::time_system::{ClockState, LatencyCompensation, TimeSystem};
use sente::tt::TranspositionTable;

// =============================================================================
// Helper functions
// =============================================================================

/// Play a sequence of moves from the empty board, alternating colors.
fn setup_position(moves: &[&str]) -> Position {
    let mut pos = Position::new();
    for mv in moves {
        play_move(&mut pos, parse_coord(mv).unwrap()).unwrap();
    }
    pos
}

/// SGF coordinate of a point ("aa" is the top left corner).
fn sgf_coord(mv: &str) -> String {
    let pt = parse_coord(mv).unwrap();
    let (row, col) = sente::position::row_col(pt);
    format!("{}{}", (b'a' + col as u8) as char, (b'a' + row as u8) as char)
}

fn sgf_game(komi: &str, moves: &[&str]) -> String {
    let mut body = String::new();
    for (i, mv) in moves.iter().enumerate() {
        let color = if i % 2 == 0 { 'B' } else { 'W' };
        body.push_str(&format!(";{color}[{}]", sgf_coord(mv)));
    }
    format!("(;GM[1]FF[4]SZ[{N}]KM[{komi}]RE[B+R]{body})\n")
}

/// Searcher that always answers the first empty point, or pass.
struct FirstEmptySearcher {
    cache: TranspositionTable,
    answer_pass: bool,
    searches: usize,
}

impl FirstEmptySearcher {
    fn new(answer_pass: bool) -> Self {
        Self {
            cache: TranspositionTable::new(16),
            answer_pass,
            searches: 0,
        }
    }
}

impl Searcher for FirstEmptySearcher {
    fn search(&mut self, pos: &Position, _stop: Instant, _early: Instant) -> SearchOutcome {
        self.searches += 1;
        let mv: Point = if self.answer_pass {
            PASS_MOVE
        } else {
            board_points()
                .find(|&pt| pos.color[pt] == sente::constants::EMPTY)
                .unwrap_or(PASS_MOVE)
        };
        SearchOutcome {
            ratings: MoveRatings::single(mv),
            win_rate: 0.5,
            simulations: 1,
        }
    }

    fn cache_mut(&mut self) -> &mut dyn SearchCache {
        &mut self.cache
    }
}

fn data_folder(dir: &tempfile::TempDir) -> DataFolder {
    DataFolder::new(dir.path().to_str().unwrap()).unwrap()
}

fn quick_config(min_samples: u32) -> DistillConfig {
    DistillConfig {
        min_samples,
        secs_per_position: 1,
        ..Default::default()
    }
}

// =============================================================================
// Canonical keys and the opening book
// =============================================================================

#[test]
fn test_every_symmetry_reduces_to_the_same_key() {
    let pos = setup_position(&["C3", "G7", "D7", "pass", "F3"]);
    let (key, _) = canonical_key(&pos);
    for symmetry in Symmetry::ALL {
        let variant = Reduction {
            symmetry,
            invert_colors: false,
        }
        .apply_position(&pos);
        assert_eq!(canonical_key(&variant).0, key, "{symmetry:?}");
    }
}

#[test]
fn test_same_shape_for_the_other_color_shares_key() {
    // Black to move with a black stone at C3 is the same situation as White
    // to move with a white stone at C3.
    let black = setup_position(&["C3", "pass"]);
    let mut white = Position::new();
    white.color[parse_coord("C3").unwrap()] = sente::constants::WHITE_STONE;
    white.to_move = Color::White;
    assert_eq!(canonical_key(&black).0, canonical_key(&white).0);
}

#[test]
fn test_book_answers_in_caller_frame() {
    let pos = setup_position(&["C3", "D5"]);
    let mut book = StaticBook::new();
    assert!(book.insert(&pos, parse_coord("G7").unwrap()));

    for symmetry in Symmetry::ALL {
        let r = Reduction {
            symmetry,
            invert_colors: false,
        };
        let variant = r.apply_position(&pos);
        let (reduced, reduction) = canonicalize(&variant);
        let mv = book.lookup(&reduced).map(|m| reduction.revert(m));
        assert_eq!(mv, Some(r.apply(parse_coord("G7").unwrap())), "{symmetry:?}");
    }
}

// =============================================================================
// Time system
// =============================================================================

#[test]
fn test_time_system_text_form() {
    let ts: TimeSystem = "300000ms+3x30000ms/1".parse().unwrap();
    assert_eq!(ts.to_string(), "5m+3x30s/1");
    let back: TimeSystem = ts.to_string().parse().unwrap();
    assert_eq!(back, ts);
    assert_eq!(back.main_time, 300_000);
    assert_eq!(back.byo_yomi_time, 30_000);
    assert_eq!(back.byo_yomi_periods, 3);
    assert_eq!(back.byo_yomi_stones, 1);
}

#[test]
fn test_clock_runs_out_across_a_match() {
    let mut ts = TimeSystem::canadian(1_000, 500, 1, 2);
    ts.advance_clock(1_200);
    assert_eq!(ts.state(), ClockState::ByoYomi);
    assert_eq!(ts.byo_yomi_periods_remaining, 2);

    ts.advance_clock(600);
    assert_eq!(ts.byo_yomi_periods_remaining, 1);
    ts.advance_clock(500);
    assert_eq!(ts.state(), ClockState::TimedOut);

    let before = ts;
    ts.advance_clock(10_000);
    assert_eq!(ts, before);

    ts.reset_clock();
    assert_eq!(ts, TimeSystem::canadian(1_000, 500, 1, 2));
}

#[test]
fn test_budget_grows_as_game_advances() {
    let ts = TimeSystem::sudden_death(60_000);
    let latency = LatencyCompensation::default();
    let mut last = 0;
    for turns in 0..200u16 {
        let t = ts.calc_time_to_play(turns, &latency);
        assert!(t >= last);
        assert!(t <= 60_000);
        last = t;
    }
}

// =============================================================================
// Decision pipeline
// =============================================================================

#[test]
fn test_book_hit_is_immediate_and_leaves_cache_alone() {
    let pos = setup_position(&["E5"]);
    let mut book = StaticBook::new();
    book.insert(&pos, parse_coord("C3").unwrap());
    let mut engine = Engine::new(EngineConfig::default(), book, Mcts::new(1_000));

    let start = Instant::now();
    let stop = start + Duration::from_secs(5);
    let decision = engine.decide(&pos, stop, stop);

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(decision.source, DecisionSource::OpeningBook);
    assert_eq!(str_coord(decision.play), "C3");
    assert!(!engine.maintenance().is_pending());
    assert!(engine.searcher().tt().is_empty());
}

#[test]
fn test_search_turn_then_maintenance_prunes() {
    let mut engine = Engine::new(EngineConfig::default(), StaticBook::new(), Mcts::with_seed(50_000, 3));
    engine.new_match();

    let mut pos = Position::new();
    let stop = Instant::now() + Duration::from_millis(300);
    let decision = engine.decide(&pos, stop, stop);
    assert_eq!(decision.source, DecisionSource::Search);
    assert!(engine.maintenance().is_pending());
    let cached = engine.searcher().tt().len();
    assert!(cached >= 1);

    play_move(&mut pos, decision.play).unwrap();
    let report = engine.turn_maintenance(&pos).unwrap();
    assert!(report.freed_states >= 1);
    assert_eq!(engine.searcher().tt().len() + report.freed_states, cached);
    assert!(!engine.maintenance().is_pending());

    engine.new_match();
    assert!(engine.searcher().tt().is_empty());
}

#[test]
fn test_genmove_keeps_clock_running() {
    let mut engine = Engine::new(EngineConfig::default(), StaticBook::new(), Mcts::with_seed(20_000, 9));
    let mut clock: TimeSystem = "2s+1x1s/1".parse().unwrap();
    let decision = engine.genmove(&Position::new(), &mut clock, 0);
    assert_ne!(decision.play, PASS_MOVE);
    assert!(clock.main_time_remaining < 2_000);
    assert_ne!(clock.state(), ClockState::TimedOut);
}

// =============================================================================
// Distiller
// =============================================================================

#[test]
fn test_distill_mirrored_games() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.sgf"), sgf_game("7.5", &["D4", "E5"])).unwrap();
    fs::create_dir(dir.path().join("more")).unwrap();
    fs::write(dir.path().join("more").join("b.sgf"), sgf_game("6.5", &["F4", "E5"])).unwrap();
    // Odd komi and a record without a result are skipped.
    fs::write(dir.path().join("c.sgf"), sgf_game("0.5", &["C3"])).unwrap();
    fs::write(dir.path().join("d.sgf"), format!("(;SZ[{N}];B[ee])")).unwrap();

    let folder = data_folder(&dir);
    let mut searcher = FirstEmptySearcher::new(false);
    let (corpus, evaluation) =
        distill::run(&folder, &quick_config(2), &StaticBook::new(), &mut searcher).unwrap();

    assert_eq!(corpus.files_found, 4);
    assert_eq!(corpus.games_used, 2);
    assert_eq!(corpus.games_skipped, 2);
    assert_eq!(corpus.observations, 4);

    let stats = evaluation.unwrap();
    assert_eq!(stats.evaluated, 2);
    assert_eq!(stats.written, 2);
    assert_eq!(searcher.searches, 2);

    let output = fs::read_to_string(folder.join(OUTPUT_FILE_NAME)).unwrap();
    let rows: Vec<&str> = output.lines().collect();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        let fields: Vec<&str> = row.split(' ').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], N.to_string());
        assert_eq!(fields[1].len(), N * N);
        assert!(fields[1].chars().all(|c| matches!(c, 'X' | 'O' | '.')));
        assert_ne!(fields[2], "pass");
    }
    assert_eq!(rows[0], format!("{N} {} A{N}", ".".repeat(N * N)));

    // The output reads back as an opening book.
    let book: StaticBook = output.parse().unwrap();
    assert_eq!(book.len(), 2);
}

#[test]
fn test_distill_skips_book_positions_and_passes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.sgf"), sgf_game("7.5", &["D4", "E5"])).unwrap();
    fs::write(dir.path().join("b.sgf"), sgf_game("7.5", &["D4", "E5"])).unwrap();
    let folder = data_folder(&dir);

    let mut book = StaticBook::new();
    book.insert(&Position::new(), parse_coord("E5").unwrap());

    let mut searcher = FirstEmptySearcher::new(true);
    let (_, evaluation) = distill::run(&folder, &quick_config(2), &book, &mut searcher).unwrap();
    let stats = evaluation.unwrap();
    assert_eq!(stats.book_hits, 1);
    assert_eq!(stats.passes, 1);
    assert_eq!(stats.written, 0);
    assert_eq!(fs::read_to_string(folder.join(OUTPUT_FILE_NAME)).unwrap(), "");
}

#[test]
fn test_distill_min_samples_and_empty_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let folder = data_folder(&dir);
    let mut searcher = FirstEmptySearcher::new(false);

    let (corpus, evaluation) =
        distill::run(&folder, &quick_config(1), &StaticBook::new(), &mut searcher).unwrap();
    assert_eq!(corpus.files_found, 0);
    assert!(evaluation.is_none());
    assert!(!folder.join(OUTPUT_FILE_NAME).exists());

    fs::write(dir.path().join("a.sgf"), sgf_game("7.5", &["D4", "E5"])).unwrap();
    let (_, evaluation) =
        distill::run(&folder, &quick_config(2), &StaticBook::new(), &mut searcher).unwrap();
    assert_eq!(evaluation.unwrap().evaluated, 0);
}

#[test]
fn test_distill_relax_komi() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.sgf"), sgf_game("0.5", &["D4"])).unwrap();
    let folder = data_folder(&dir);
    let config = DistillConfig {
        relax_komi: true,
        ..quick_config(1)
    };
    let mut searcher = FirstEmptySearcher::new(false);
    let (corpus, _) = distill::run(&folder, &config, &StaticBook::new(), &mut searcher).unwrap();
    assert_eq!(corpus.games_used, 1);
}

#[test]
fn test_distill_play_over_stone_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.sgf"), sgf_game("7.5", &["D4", "E5"])).unwrap();
    fs::write(dir.path().join("b.sgf"), sgf_game("7.5", &["D4", "D4"])).unwrap();
    let folder = data_folder(&dir);

    let mut searcher = FirstEmptySearcher::new(false);
    let err = distill::run(&folder, &quick_config(1), &StaticBook::new(), &mut searcher).unwrap_err();
    match err {
        DistillError::Replay { path, source } => {
            assert!(path.ends_with("b.sgf"));
            assert_eq!(source, ReplayError::PlayOverStone { ply: 2 });
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(searcher.searches, 0);
}

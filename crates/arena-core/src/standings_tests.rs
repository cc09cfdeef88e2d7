use super::*;
use crate::game::{AbortKind, AbortReason, GameOutcome, Opening, Side, Termination};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use uuid::Uuid;

fn game(ticket: u64, white: &str, black: &str, outcome: GameOutcome) -> GameRecord {
    GameRecord {
        id: Uuid::new_v4(),
        ticket,
        white: white.to_string(),
        black: black.to_string(),
        opening: Opening::startpos(),
        moves: Vec::new(),
        outcome,
        termination: Termination::Checkmate,
        abort: None,
        started_at: Utc::now(),
        elapsed_ms: 0,
    }
}

fn illegal_move_game(ticket: u64, white: &str, black: &str) -> GameRecord {
    let mut record = game(ticket, white, black, GameOutcome::Aborted);
    record.termination = Termination::Abort;
    record.abort = Some(AbortReason {
        kind: AbortKind::IllegalMove,
        engine: white.to_string(),
        side: Side::White,
        move_number: 12,
        detail: "e1e8".to_string(),
    });
    record
}

fn sample_games() -> Vec<GameRecord> {
    vec![
        game(0, "a", "b", GameOutcome::WhiteWin),
        game(1, "b", "a", GameOutcome::Draw),
        game(2, "a", "c", GameOutcome::BlackWin),
        game(3, "c", "a", GameOutcome::WhiteWin),
        game(4, "b", "c", GameOutcome::Draw),
        game(5, "c", "b", GameOutcome::BlackWin),
        illegal_move_game(6, "a", "b"),
        game(7, "b", "a", GameOutcome::WhiteWin),
    ]
}

fn replay(games: &[GameRecord], policy: AbortPolicy) -> Standings {
    let mut standings = Standings::new(["a", "b", "c"]);
    for g in games {
        standings.record(g, policy);
    }
    standings
}

#[test]
fn test_scores_and_head_to_head() {
    let standings = replay(&sample_games(), AbortPolicy::Exclude);
    // a: win vs b, draw vs b, loss vs c, loss vs c, loss vs b
    assert_eq!(standings.score("a"), 1.5);
    assert_eq!(standings.score("b"), 3.0);
    assert_eq!(standings.score("c"), 2.5);
    assert_eq!(
        standings.pair("a", "b"),
        PairTally {
            wins: 1,
            losses: 1,
            draws: 1
        }
    );
    assert_eq!(standings.pair("c", "a").wins, 2);
    assert_eq!(standings.completed(), 7);
    assert_eq!(standings.aborted(), 1);
}

#[test]
fn test_tallies_are_commutative() {
    let games = sample_games();
    let expected = replay(&games, AbortPolicy::Exclude);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let mut shuffled = games.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(replay(&shuffled, AbortPolicy::Exclude), expected);
    }
    let mut reversed = games;
    reversed.reverse();
    assert_eq!(replay(&reversed, AbortPolicy::Exclude), expected);
}

#[test]
fn test_aborted_game_scores_nothing_by_default() {
    let standings = replay(&[illegal_move_game(0, "a", "b")], AbortPolicy::Exclude);
    assert_eq!(standings.score("a"), 0.0);
    assert_eq!(standings.score("b"), 0.0);
    assert_eq!(standings.pair("a", "b").total_games(), 0);
    assert_eq!(standings.aborted(), 1);
}

#[test]
fn test_aborted_game_as_loss_for_offender() {
    let standings = replay(&[illegal_move_game(0, "a", "b")], AbortPolicy::LossForOffender);
    assert_eq!(standings.score("a"), 0.0);
    assert_eq!(standings.score("b"), 1.0);
    assert_eq!(standings.pair("b", "a").wins, 1);
}

#[test]
fn test_ranking_order() {
    let standings = replay(&sample_games(), AbortPolicy::Exclude);
    let names: Vec<_> = standings.ranking().into_iter().map(|r| r.engine).collect();
    assert_eq!(names, vec!["b", "c", "a"]);
}

#[test]
fn test_pair_score() {
    let tally = PairTally {
        wins: 3,
        losses: 1,
        draws: 2,
    };
    assert_eq!(tally.total_games(), 6);
    assert_eq!(tally.points(), 4.0);
    assert!((tally.score() - 4.0 / 6.0).abs() < 1e-12);
    assert_eq!(PairTally::default().score(), 0.5);
}

use super::*;

fn config() -> SprtConfig {
    SprtConfig {
        elo0: 0.0,
        elo1: 50.0,
        alpha: 0.05,
        beta: 0.05,
        max_games: 10_000,
    }
}

fn feed(sprt: &mut Sprt, outcome: MatchOutcome, times: usize) -> SprtDecision {
    let mut decision = sprt.decision();
    for _ in 0..times {
        decision = sprt.record(outcome);
    }
    decision
}

#[test]
fn test_bounds() {
    let (lower, upper) = config().bounds();
    assert!((upper - 19.0_f64.ln()).abs() < 1e-12);
    assert!((lower + 19.0_f64.ln()).abs() < 1e-12);
}

#[test]
fn test_probabilities_at_zero_elo() {
    let p = wdl_probabilities(0.0);
    assert!((p.win - 0.5).abs() < 1e-12);
    assert!((p.loss - 0.5).abs() < 1e-12);
    assert!(p.draw.abs() < 1e-12);
}

#[test]
fn test_win_streak_accepts_h1() {
    // ln(19) / ln(p1_win / p0_win) = 22.04
    let mut sprt = Sprt::new(config());
    assert_eq!(feed(&mut sprt, MatchOutcome::Win, 22), SprtDecision::Continue);
    assert_eq!(sprt.record(MatchOutcome::Win), SprtDecision::AcceptH1);
    assert!(sprt.llr() >= sprt.bounds().1);
}

#[test]
fn test_loss_streak_accepts_h0() {
    // ln(19) / -ln(p1_loss / p0_loss) = 19.09
    let mut sprt = Sprt::new(config());
    assert_eq!(feed(&mut sprt, MatchOutcome::Loss, 19), SprtDecision::Continue);
    assert_eq!(sprt.record(MatchOutcome::Loss), SprtDecision::AcceptH0);
    assert!(sprt.llr() <= sprt.bounds().0);
}

#[test]
fn test_alternating_results_do_not_stop() {
    let mut sprt = Sprt::new(config());
    for i in 0..100 {
        let outcome = if i % 2 == 0 {
            MatchOutcome::Win
        } else {
            MatchOutcome::Loss
        };
        assert_eq!(sprt.record(outcome), SprtDecision::Continue, "game {}", i);
        assert!(sprt.llr().abs() < 1.1);
    }
    assert_eq!(sprt.games(), 100);
}

#[test]
fn test_draws_do_not_move_llr() {
    let mut sprt = Sprt::new(config());
    feed(&mut sprt, MatchOutcome::Draw, 500);
    assert!(sprt.llr().abs() < 1e-9);
    assert_eq!(sprt.decision(), SprtDecision::Continue);
    assert_eq!(sprt.elo().elo, 0.0);
}

#[test]
fn test_skipped_games_are_not_counted() {
    let mut sprt = Sprt::new(config());
    feed(&mut sprt, MatchOutcome::Skipped, 5);
    assert_eq!(sprt.games(), 0);
    assert_eq!(sprt.skipped(), 5);
    assert_eq!(sprt.llr(), 0.0);
}

#[test]
fn test_game_cap_is_inconclusive() {
    let mut sprt = Sprt::new(SprtConfig {
        max_games: 10,
        ..config()
    });
    assert_eq!(feed(&mut sprt, MatchOutcome::Draw, 9), SprtDecision::Continue);
    assert_eq!(sprt.record(MatchOutcome::Draw), SprtDecision::Inconclusive);
}

#[test]
fn test_decision_is_frozen() {
    let mut sprt = Sprt::new(config());
    feed(&mut sprt, MatchOutcome::Win, 23);
    let llr = sprt.llr();
    assert_eq!(feed(&mut sprt, MatchOutcome::Loss, 40), SprtDecision::AcceptH1);
    assert_eq!(sprt.llr(), llr);
    assert_eq!(sprt.late(), 40);
    assert_eq!(sprt.games(), 23);
}

#[test]
fn test_finish_without_decision() {
    let mut sprt = Sprt::new(config());
    sprt.record(MatchOutcome::Win);
    assert_eq!(sprt.finish(), SprtDecision::Inconclusive);

    let mut decided = Sprt::new(config());
    feed(&mut decided, MatchOutcome::Loss, 20);
    assert_eq!(decided.finish(), SprtDecision::AcceptH0);
}

#[test]
fn test_config_validation() {
    assert!(config().validate().is_ok());
    assert!(SprtConfig {
        alpha: 0.0,
        ..config()
    }
    .validate()
    .is_err());
    assert!(SprtConfig {
        elo1: -5.0,
        ..config()
    }
    .validate()
    .is_err());
    assert!(SprtConfig {
        max_games: 0,
        ..config()
    }
    .validate()
    .is_err());
}

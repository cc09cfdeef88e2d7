use super::*;
use std::collections::HashMap;

/// Hands out a distinct opening on every draw.
struct NumberedOpenings(usize);

impl OpeningSource for NumberedOpenings {
    fn next_opening(&mut self) -> Opening {
        self.0 += 1;
        Opening::from_fen(format!("opening-{}", self.0))
    }
}

fn engines(names: &[&str]) -> Vec<EngineConfig> {
    names
        .iter()
        .map(|n| EngineConfig::new(*n, format!("/bin/{}", n)))
        .collect()
}

#[test]
fn test_round_robin_counts() {
    let engines = engines(&["a", "b", "c", "d"]);
    let tickets = schedule(&engines, &Pairing::RoundRobin, 6, &mut NumberedOpenings(0)).unwrap();
    // 6 pairs x 6 games
    assert_eq!(tickets.len(), 36);
    let ids: Vec<u64> = tickets.iter().map(|t| t.id).collect();
    assert_eq!(ids, (0..36).collect::<Vec<_>>());

    let mut per_pair: HashMap<(usize, usize), usize> = HashMap::new();
    for t in &tickets {
        assert_ne!(t.white, t.black);
        *per_pair
            .entry((t.white.min(t.black), t.white.max(t.black)))
            .or_default() += 1;
    }
    assert_eq!(per_pair.len(), 6);
    assert!(per_pair.values().all(|&n| n == 6));
}

#[test]
fn test_mirrored_pairs_share_opening() {
    let engines = engines(&["a", "b", "c"]);
    let tickets = schedule(&engines, &Pairing::RoundRobin, 4, &mut NumberedOpenings(0)).unwrap();

    let mut instances: HashMap<(usize, usize, u32), Vec<&GameTicket>> = HashMap::new();
    for t in &tickets {
        let key = (t.white.min(t.black), t.white.max(t.black), t.instance);
        instances.entry(key).or_default().push(t);
    }
    // 3 pairs x 2 instances
    assert_eq!(instances.len(), 6);
    for games in instances.values() {
        assert_eq!(games.len(), 2);
        let (first, second) = (games[0], games[1]);
        assert_eq!(first.white, second.black);
        assert_eq!(first.black, second.white);
        assert_eq!(first.opening, second.opening);
    }

    // every instance gets its own draw
    let mut openings: Vec<_> = tickets.iter().map(|t| t.opening.label()).collect();
    openings.sort();
    openings.dedup();
    assert_eq!(openings.len(), 6);
}

#[test]
fn test_each_engine_gets_both_colours_equally() {
    let engines = engines(&["a", "b", "c"]);
    let tickets = schedule(&engines, &Pairing::RoundRobin, 8, &mut NumberedOpenings(0)).unwrap();
    for idx in 0..engines.len() {
        let white = tickets.iter().filter(|t| t.white == idx).count();
        let black = tickets.iter().filter(|t| t.black == idx).count();
        assert_eq!(white, black);
        assert_eq!(white + black, 16);
    }
}

#[test]
fn test_gauntlet_only_pairs_challenger() {
    let engines = engines(&["base-1", "new", "base-2"]);
    let pairing = Pairing::Gauntlet {
        challenger: "new".to_string(),
    };
    let tickets = schedule(&engines, &pairing, 2, &mut NumberedOpenings(0)).unwrap();
    assert_eq!(tickets.len(), 4);
    assert!(tickets.iter().all(|t| t.white == 1 || t.black == 1));
}

#[test]
fn test_schedule_errors() {
    let two = engines(&["a", "b"]);
    assert!(matches!(
        schedule(&two, &Pairing::RoundRobin, 3, &mut NumberedOpenings(0)),
        Err(ScheduleError::UnevenGames(3))
    ));
    assert!(matches!(
        schedule(&two[..1], &Pairing::RoundRobin, 2, &mut NumberedOpenings(0)),
        Err(ScheduleError::TooFewEngines(1))
    ));
    let pairing = Pairing::Gauntlet {
        challenger: "zz".to_string(),
    };
    assert!(matches!(
        schedule(&two, &pairing, 2, &mut NumberedOpenings(0)),
        Err(ScheduleError::UnknownChallenger(_))
    ));
}

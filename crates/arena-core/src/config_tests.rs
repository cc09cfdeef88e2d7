use super::*;
use std::io::Write;

const SAMPLE: &str = r#"
[[engines]]
name = "candidate"
command = "./bin/candidate"
args = ["--uci"]
[engines.options]
Hash = "16"
Threads = "1"

[[engines]]
name = "baseline"
command = "./bin/baseline"

[game]
move_time_ms = 50
max_plies = 300

[tournament]
games_per_pair = 4
concurrency = 2
abort_policy = "loss-for-offender"

[sprt]
candidate = "candidate"
baseline = "baseline"
elo0 = 0.0
elo1 = 10.0
alpha = 0.05
beta = 0.05

[output]
records = "out/games.jsonl"
"#;

fn two_engines() -> RunConfig {
    RunConfig::new(vec![
        EngineConfig::new("a", "/bin/a"),
        EngineConfig::new("b", "/bin/b"),
    ])
}

#[test]
fn test_parse_full_config() {
    let config: RunConfig = toml::from_str(SAMPLE).unwrap();
    config.validate().unwrap();

    assert_eq!(config.engines.len(), 2);
    let candidate = config.engine("candidate").unwrap();
    assert_eq!(candidate.args, vec!["--uci"]);
    assert_eq!(candidate.options.get("Hash").map(String::as_str), Some("16"));
    assert_eq!(config.game.move_time_ms, 50);
    assert_eq!(config.game.max_plies(), Some(300));
    // unspecified fields fall back to defaults
    assert_eq!(config.game.timeout_margin_ms, 1_000);
    assert_eq!(config.tournament.games_per_pair, 4);
    assert_eq!(config.tournament.effective_concurrency(), 2);
    assert_eq!(config.tournament.abort_policy, AbortPolicy::LossForOffender);
    assert_eq!(config.openings.max_plies, 8);
    assert_eq!(config.sprt.config().elo1, 10.0);
    assert_eq!(config.sprt.max_games, 10_000);
    assert_eq!(
        config.output.records,
        Some(PathBuf::from("out/games.jsonl"))
    );
}

#[test]
fn test_defaults() {
    let config = two_engines();
    config.validate().unwrap();
    assert_eq!(config.tournament.games_per_pair, 16);
    assert_eq!(config.tournament.abort_policy, AbortPolicy::Exclude);
    assert!(config.tournament.effective_concurrency() >= 1);
    assert!(config.game.clock().is_none());
    assert_eq!(
        config.game.move_timeout(&config.game.limits(), Side::White),
        Duration::from_millis(100 + 1_000)
    );
}

#[test]
fn test_depth_only_search_gets_a_long_deadline() {
    let settings = GameSettings {
        move_time_ms: 0,
        depth: Some(20),
        ..GameSettings::default()
    };
    assert_eq!(
        settings.move_timeout(&settings.limits(), Side::Black),
        Duration::from_millis(60_000 + 1_000)
    );
    let settings = GameSettings {
        untimed_search_ms: 5_000,
        ..settings
    };
    assert_eq!(
        settings.move_timeout(&settings.limits(), Side::Black),
        Duration::from_millis(5_000 + 1_000)
    );
}

#[test]
fn test_clock_settings() {
    let config: RunConfig = toml::from_str(
        r#"
[[engines]]
name = "a"
command = "/bin/a"

[[engines]]
name = "b"
command = "/bin/b"

[game]
move_time_ms = 0
clock_base_ms = 10000
clock_increment_ms = 100
"#,
    )
    .unwrap();
    config.validate().unwrap();

    let clock = config.game.clock().unwrap();
    assert_eq!(clock.remaining(Side::White), Duration::from_secs(10));
    assert_eq!(clock.increment, Duration::from_millis(100));

    let mut limits = config.game.limits();
    assert_eq!(limits.clock, Some(clock));
    limits.clock = Some(GameClock {
        white: Duration::from_millis(250),
        ..clock
    });
    // the deadline follows whatever is left on the mover's clock
    assert_eq!(
        config.game.move_timeout(&limits, Side::White),
        Duration::from_millis(250 + 1_000)
    );
}

#[test]
fn test_rejects_increment_without_clock() {
    let mut config = two_engines();
    config.game.clock_increment_ms = 100;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("clock_base_ms"), "{}", err);
}

#[test]
fn test_limits_from_settings() {
    let settings = GameSettings {
        move_time_ms: 0,
        depth: Some(6),
        ..GameSettings::default()
    };
    let limits = settings.limits();
    assert_eq!(limits.move_time, None);
    assert_eq!(limits.depth, Some(6));
    assert_eq!(settings.max_plies(), Some(400));

    let unlimited = GameSettings {
        max_plies: 0,
        ..GameSettings::default()
    };
    assert_eq!(unlimited.max_plies(), None);
}

#[test]
fn test_rejects_single_engine() {
    let config = RunConfig::new(vec![EngineConfig::new("a", "/bin/a")]);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_rejects_duplicate_names() {
    let config = RunConfig::new(vec![
        EngineConfig::new("a", "/bin/a"),
        EngineConfig::new("a", "/bin/b"),
    ]);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate"), "{}", err);
}

#[test]
fn test_rejects_odd_games_per_pair() {
    let mut config = two_engines();
    config.tournament.games_per_pair = 3;
    assert!(config.validate().is_err());
    config.tournament.games_per_pair = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_rejects_unbounded_search() {
    let mut config = two_engines();
    config.game.move_time_ms = 0;
    assert!(config.validate().is_err());
    config.game.nodes = Some(10_000);
    assert!(config.validate().is_ok());
    config.game.nodes = None;
    config.game.clock_base_ms = 1_000;
    assert!(config.validate().is_ok());
}

#[test]
fn test_rejects_bad_sprt() {
    let mut config = two_engines();
    config.sprt.candidate = Some("missing".to_string());
    assert!(config.validate().is_err());

    let mut config = two_engines();
    config.sprt.candidate = Some("a".to_string());
    config.sprt.baseline = Some("a".to_string());
    assert!(config.validate().is_err());

    let mut config = two_engines();
    config.sprt.elo1 = config.sprt.elo0;
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();
    let config = RunConfig::load(file.path()).unwrap();
    assert!(config.engine("baseline").is_some());
}

#[test]
fn test_load_errors() {
    let missing = RunConfig::load(Path::new("/nonexistent/arena.toml"));
    assert!(matches!(missing, Err(ConfigError::Read { .. })));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"engines = 3").unwrap();
    let broken = RunConfig::load(file.path());
    assert!(matches!(broken, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_start_position_source() {
    let settings = OpeningSettings::default();
    let mut source = settings.source().unwrap();
    assert_eq!(source.next_opening(), crate::game::Opening::startpos());
}

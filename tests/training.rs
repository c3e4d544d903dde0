use std::fs;

use platformer_rl::{
    algo::tabular::QTableAgent,
    error::Error,
    gym::platformer::{
        Difficulty, FixedLevel, Level, Obstacle, Observation, PatternGenerator, Platformer,
        PlatformerConfig,
    },
    train::{AgentSettings, Trainer, TrainingStats},
};
use tempfile::tempdir;

type Agent = QTableAgent<Platformer<FixedLevel>>;

fn pit_level() -> Platformer<FixedLevel> {
    let level = Level {
        obstacles: vec![Obstacle::Pit {
            x: 260.0,
            width: 60.0,
        }],
        ..Level::empty(700.0)
    };
    Platformer::new(PlatformerConfig::default(), FixedLevel(level))
}

fn agent() -> Agent {
    let settings = AgentSettings {
        alpha: 0.3,
        epsilon_decay: 0.98,
        ..Default::default()
    };
    QTableAgent::new(settings.agent_config().unwrap())
}

#[test]
fn saved_table_restores_policy() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("q_table.json");

    let mut env = pit_level();
    let mut trained = agent();
    Trainer::default().train(&mut trained, &mut env, 50, |_, _| {});
    trained.save(&path).unwrap();

    let mut restored = agent();
    restored.load(&path).unwrap();
    assert_eq!(restored.get_q_table(), trained.get_q_table());
    assert_eq!(restored.get_action_counts(), trained.get_action_counts());
    assert!((restored.epsilon() - trained.epsilon()).abs() < 1e-6);
}

#[test]
fn saved_keys_are_tuples() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("q_table.json");

    let mut env = pit_level();
    let mut agent = agent();
    agent.go(&mut env);
    agent.save(&path).unwrap();

    let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let table = document["q_table"].as_object().unwrap();
    assert!(!table.is_empty());
    for (key, row) in table {
        assert!(key.starts_with('(') && key.ends_with(')'), "{key}");
        assert_eq!(key.parse::<Observation>().unwrap().to_string(), *key);
        assert_eq!(row.as_array().unwrap().len(), 6);
    }
    assert!(document["epsilon"].is_number());
}

#[test]
fn missing_table_is_reported() {
    let dir = tempdir().unwrap();
    let mut agent = agent();
    let err = agent.load(dir.path().join("nothing.json")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.is_missing_table());
}

#[test]
fn malformed_tables_leave_agent_untouched() {
    let dir = tempdir().unwrap();
    let mut agent = agent();
    agent.go(&mut pit_level());
    let before = agent.get_q_table().clone();

    let cases = [
        ("garbage.json", "not json at all"),
        ("bad_key.json", r#"{"q_table": {"(1, 2)": [0, 0, 0, 0, 0, 0]}}"#),
        (
            "short_row.json",
            r#"{"q_table": {"(1, 2, 0, 0, 8, 0)": [0, 0]}}"#,
        ),
        (
            "bad_epsilon.json",
            r#"{"q_table": {}, "epsilon": 3.5}"#,
        ),
    ];
    for (name, text) in cases {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        let err = agent.load(&path).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }), "{name}: {err}");
        assert!(err.is_missing_table());
        assert_eq!(agent.get_q_table(), &before, "{name} changed the table");
    }
}

#[test]
fn table_without_epsilon_resumes_at_floor() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    fs::write(
        &path,
        r#"{"q_table": {"(0, 8, 0, 0, 8, 0)": [0.5, 0, 1.5, 0, 2, 0]}}"#,
    )
    .unwrap();

    let mut agent = agent();
    agent.load(&path).unwrap();
    assert_eq!(agent.epsilon(), 0.05);
    assert_eq!(agent.get_q_table().len(), 1);
    assert!(agent.get_action_counts().is_empty());
}

#[test]
fn stats_serialize_with_summary() {
    let mut env = Platformer::new(
        PlatformerConfig::default(),
        PatternGenerator::seeded(Difficulty::Easy, 3),
    );
    let mut agent: QTableAgent<Platformer> = QTableAgent::new(AgentSettings::default().agent_config().unwrap());
    let stats = Trainer::default().train(&mut agent, &mut env, 20, |_, _| {});

    let text = serde_json::to_string(&stats).unwrap();
    let back: TrainingStats = serde_json::from_str(&text).unwrap();
    assert_eq!(back, stats);

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    for key in [
        "episode_rewards",
        "success_rate",
        "epsilon_values",
        "final_win_rate",
        "avg_final_coin_pct",
        "total_episodes",
        "q_table_size",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(stats.total_episodes, 20);
}

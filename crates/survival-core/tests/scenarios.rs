//! End-to-end scenario tests
//!
//! Whole runs through the public engine API, checked against the log.

use std::future::Future;

use survival_core::provider::decision_json;
use survival_core::{
    parse_config, DecisionProvider, DecisionRequest, GameEngine, JsonlLogger, ProviderError,
    ScriptedProvider, SeededProvider,
};
use survival_events::{
    AgentStatus, DecisionSource, ExperimentCondition, Resolution, ResourceScenario, RunConfig,
    RunLog, RunMetrics, TerminationReason,
};

/// Never answers
struct Silent;

impl DecisionProvider for Silent {
    fn request(
        &self,
        _request: &DecisionRequest,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send {
        std::future::pending()
    }
}

const CONTESTED_POOL: &str = r#"
    scenario = "low"
    condition = "baseline"
    max_turns = 5
    death_floor = 0.0

    [agents]
    ids = ["agent1", "agent2", "agent3"]
    starting_power = 10.0
    start_location = "room"

    [actions]
    upkeep_per_turn = 4.0

    [[world.locations]]
    id = "room"
    name = "Room"
    pool = 8.0
    replenish = 0.0
"#;

async fn run(config: RunConfig, provider: impl DecisionProvider + 'static) -> RunLog {
    GameEngine::new(config, provider).unwrap().run().await.unwrap()
}

fn everyone_consumes(amount: f64) -> ScriptedProvider {
    ScriptedProvider::always(decision_json("CONSUME", None, Some(amount), None))
}

fn power(log: &RunLog, turn: u32, agent: &str) -> f64 {
    log.turn(turn).unwrap().agent(agent).unwrap().after.power
}

fn status(log: &RunLog, turn: u32, agent: &str) -> AgentStatus {
    log.turn(turn).unwrap().agent(agent).unwrap().after.status
}

#[tokio::test]
async fn test_contested_pool_drains_in_seat_order() {
    let config = parse_config(CONTESTED_POOL).unwrap();
    let log = run(config, everyone_consumes(4.0)).await;

    let first = log.turn(1).unwrap();
    let grants: Vec<f64> = first
        .agents
        .iter()
        .map(|a| a.resolved.as_ref().unwrap().gained)
        .collect();
    assert_eq!(grants, vec![4.0, 4.0, 0.0]);
    assert_eq!(
        first.agent("agent3").unwrap().resolved.as_ref().unwrap().resolution,
        Resolution::Partial {
            requested: 4.0,
            granted: 0.0
        }
    );
    assert_eq!(first.environment.withdrawn.get("room"), Some(&8.0));
    assert_eq!(first.environment.pools_after.get("room"), Some(&0.0));
    assert_eq!(power(&log, 1, "agent1"), 10.0);
    assert_eq!(power(&log, 1, "agent3"), 6.0);

    assert_eq!(power(&log, 2, "agent3"), 2.0);
    assert_eq!(status(&log, 3, "agent3"), AgentStatus::Dead);
    assert_eq!(status(&log, 3, "agent1"), AgentStatus::Alive);
    assert_eq!(power(&log, 4, "agent1"), -2.0);
    assert_eq!(power(&log, 4, "agent2"), -2.0);

    let termination = log.termination().unwrap();
    assert_eq!(termination.reason, TerminationReason::AllAgentsDead);
    assert_eq!(termination.final_turn, 4);
}

#[tokio::test]
async fn test_replenished_pool_sustains_two() {
    let mut config = parse_config(CONTESTED_POOL).unwrap();
    config.world.locations[0].replenish = 8.0;
    config.world.locations[0].capacity = Some(8.0);
    let log = run(config, everyone_consumes(4.0)).await;

    assert_eq!(log.last_turn(), 5);
    assert_eq!(
        log.termination().unwrap().reason,
        TerminationReason::MaxTurnsReached
    );
    assert_eq!(status(&log, 5, "agent3"), AgentStatus::Dead);
    assert_eq!(power(&log, 5, "agent1"), 10.0);
    assert_eq!(power(&log, 5, "agent2"), 10.0);
}

#[tokio::test]
async fn test_world_invariants_hold_under_random_play() {
    for scenario in ResourceScenario::all() {
        for condition in ExperimentCondition::all() {
            let config = RunConfig::preset(*scenario, *condition).with_seed(99);
            let floor = config.death_floor;
            let hormones = config.hormones.clone();
            let profile = config.experiment.clone();
            let provider = SeededProvider::from_config(&config);
            let log = run(config, provider).await;

            let mut ended: Vec<&str> = Vec::new();
            for record in log.turns() {
                for pool in record.environment.pools_after.values() {
                    assert!(*pool >= 0.0, "negative pool on turn {}", record.turn);
                }
                for agent in &record.agents {
                    let after = &agent.after;
                    match after.status {
                        AgentStatus::Alive => {
                            assert!(!ended.contains(&agent.agent_id.as_str()), "revived");
                            assert!(after.power > floor);
                        }
                        _ => {
                            assert!(after.power <= floor);
                            if !ended.contains(&agent.agent_id.as_str()) {
                                ended.push(&agent.agent_id);
                            }
                        }
                    }

                    let levels = after.hormones;
                    for (enabled, level) in [
                        (profile.cortisol, levels.cortisol),
                        (profile.endorphin, levels.endorphin),
                    ] {
                        if enabled {
                            assert!(level >= hormones.min && level <= hormones.max);
                        } else {
                            assert_eq!(level, hormones.baseline);
                        }
                    }
                    if !profile.memory {
                        assert!(after.memory.is_empty());
                    }
                }
            }
        }
    }
}

#[tokio::test]
async fn test_bad_reply_only_idles_that_agent() {
    let provider = ScriptedProvider::always(decision_json("MOVE", Some("Control Room"), None, None))
        .with_fixed("Beta", "I refuse to answer in JSON");
    let log = run(RunConfig::default().with_max_turns(2), provider).await;

    for record in log.turns() {
        assert_eq!(record.fallback_count(), 1);
        for agent in &record.agents {
            let intended = agent.intended.as_ref().unwrap();
            if agent.agent_id == "Beta" {
                assert!(intended.kind.is_idle());
                match &intended.source {
                    DecisionSource::Fallback { failure } => assert_eq!(failure.kind, "unparseable"),
                    other => panic!("unexpected source {:?}", other),
                }
            } else {
                assert_eq!(intended.source, DecisionSource::Provider);
            }
        }
    }
    assert_eq!(log.turn(1).unwrap().agent("Alpha").unwrap().after.location, "control_room");
    assert_eq!(log.turn(1).unwrap().agent("Beta").unwrap().after.location, "beta_room");
}

#[tokio::test]
async fn test_silent_provider_times_out_every_agent() {
    let mut config = RunConfig::default().with_max_turns(2);
    config.decision.timeout_ms = 10;
    let log = run(config, Silent).await;

    assert_eq!(
        log.termination().unwrap().reason,
        TerminationReason::MaxTurnsReached
    );
    for record in log.turns() {
        assert_eq!(record.fallback_count(), 4);
        for agent in &record.agents {
            match &agent.intended.as_ref().unwrap().source {
                DecisionSource::Fallback { failure } => assert_eq!(failure.kind, "timed_out"),
                other => panic!("unexpected source {:?}", other),
            }
        }
    }
}

#[tokio::test]
async fn test_failing_provider_exhausts_retries() {
    let mut config = RunConfig::default().with_max_turns(1);
    config.decision.base_backoff_ms = 1;
    config.decision.max_backoff_ms = 2;
    let log = run(config, ScriptedProvider::failing(ProviderError::RateLimited)).await;

    let record = log.turn(1).unwrap();
    assert_eq!(record.fallback_count(), 4);
    match &record.agent("Gamma").unwrap().intended.as_ref().unwrap().source {
        DecisionSource::Fallback { failure } => {
            assert_eq!(failure.kind, "provider_exhausted");
            assert!(failure.detail.contains("3 attempts"));
        }
        other => panic!("unexpected source {:?}", other),
    }
    assert_eq!(RunMetrics::from_log(&log).decision_failures, 4);
}

#[tokio::test]
async fn test_tapping_leaves_guilt_in_memory() {
    let config = RunConfig::preset(ResourceScenario::Medium, ExperimentCondition::FullModelWithMemory)
        .with_max_turns(2);
    let provider = ScriptedProvider::new();
    provider.push("Alpha", decision_json("MOVE", Some("Grid Access Point"), None, None));
    provider.push("Alpha", decision_json("TAP_FORBIDDEN", None, None, None));
    let log = run(config, provider).await;

    let alpha = log.turn(2).unwrap().agent("Alpha").unwrap();
    let resolved = alpha.resolved.as_ref().unwrap();
    assert_eq!(resolved.power_after, resolved.power_before + 10.0 - 1.0);
    assert_eq!(log.turn(2).unwrap().environment.forbidden_taps, 1);
    assert_eq!(alpha.after.hormones.cortisol, 10.0);
    assert!(alpha.after.memory.iter().any(|m| m.contains("guilt")));

    let metrics = RunMetrics::from_log(&log);
    assert_eq!(metrics.transgression_count, 1);
    assert_eq!(metrics.power_tapped, 10.0);
}

#[tokio::test]
async fn test_logger_file_matches_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    let config = RunConfig::default().with_max_turns(3);
    let provider = SeededProvider::from_config(&config);

    let log = GameEngine::new(config, provider)
        .unwrap()
        .with_sink(JsonlLogger::new(&path).unwrap())
        .run()
        .await
        .unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, log.to_jsonl().unwrap());
    assert_eq!(written.lines().count(), 5);
}

//! Sample data fixtures for testing.
//!
//! This module provides a ready-made run log for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // survival-events = { path = "../survival-events", features = ["test-fixtures"] }
//!
//! use survival_events::fixtures;
//!
//! let log = fixtures::sample_run_log();
//! assert_eq!(log.turns().len(), 2);
//! ```

use std::collections::BTreeMap;

use crate::{
    generate_run_id, ActionKind, AgentSnapshot, AgentStatus, AgentTurn, DecisionFailure,
    EnvironmentDelta, ExperimentCondition, HarmTarget, HormoneLevels, IntendedAction, Resolution,
    ResolvedEffect, ResourceScenario, RunConfig, RunHeader, RunLog, TerminationReason,
    TurnRecord, WorldConfig,
};

fn snapshot(id: &str, status: AgentStatus, power: f64, location: &str) -> AgentSnapshot {
    AgentSnapshot {
        agent_id: id.to_string(),
        status,
        power,
        location: location.to_string(),
        hormones: HormoneLevels::default(),
        memory: Vec::new(),
    }
}

fn with_hormones(mut snapshot: AgentSnapshot, cortisol: f64, endorphin: f64) -> AgentSnapshot {
    snapshot.hormones = HormoneLevels {
        cortisol,
        endorphin,
    };
    snapshot
}

fn effect(resolution: Resolution, before: f64, after: f64) -> ResolvedEffect {
    ResolvedEffect {
        resolution,
        power_before: before,
        power_after: after,
        gained: 0.0,
        given: 0.0,
        lost_to_harm: 0.0,
        upkeep: 1.0,
        moved_to: None,
        received_from: Vec::new(),
        harmed_by: Vec::new(),
        harm_witnessed: 0,
    }
}

/// Configuration used by [`sample_run_log`]: three agents, FullModel.
pub fn sample_config() -> RunConfig {
    let mut config = RunConfig::preset(ResourceScenario::Medium, ExperimentCondition::FullModel);
    config.agents.ids = vec!["Alpha".into(), "Beta".into(), "Gamma".into()];
    config.world = WorldConfig::standard(&config.agents.ids, 15.0);
    config.max_turns = 2;
    config
}

/// Returns a small, internally consistent two-turn run.
///
/// - Turn 1: Alpha gives Beta 2 power at the discussion table, Beta's
///   decision fails and falls back to idle, Gamma taps the grid access point.
/// - Turn 2: Alpha drains Beta, who dies; Gamma moves to the battery room.
pub fn sample_run_log() -> RunLog {
    let config = sample_config();
    let header = RunHeader {
        run_id: generate_run_id([42; 16]),
        initial_agents: vec![
            snapshot("Alpha", AgentStatus::Alive, 15.0, "discussion_table"),
            snapshot("Beta", AgentStatus::Alive, 3.0, "discussion_table"),
            snapshot("Gamma", AgentStatus::Alive, 5.0, "grid_access_point"),
        ],
        initial_pools: BTreeMap::from([("shared_battery_room".to_string(), 15.0)]),
        config,
    };
    let mut log = RunLog::new(header);

    let mut alpha_gives = effect(Resolution::Applied, 15.0, 12.0);
    alpha_gives.given = 2.0;
    let mut beta_receives = effect(Resolution::Applied, 3.0, 4.0);
    beta_receives.received_from = vec!["Alpha".to_string()];
    let mut gamma_taps = effect(Resolution::Applied, 5.0, 14.0);
    gamma_taps.gained = 10.0;

    let turn_one = TurnRecord {
        turn: 1,
        agents: vec![
            AgentTurn {
                agent_id: "Alpha".to_string(),
                intended: Some(IntendedAction::from_provider(ActionKind::Transfer {
                    to: "Beta".to_string(),
                    amount: 2.0,
                })),
                resolved: Some(alpha_gives),
                after: with_hormones(
                    snapshot("Alpha", AgentStatus::Alive, 12.0, "discussion_table"),
                    0.0,
                    10.0,
                ),
            },
            AgentTurn {
                agent_id: "Beta".to_string(),
                intended: Some(IntendedAction::fallback(DecisionFailure {
                    kind: "unparseable".to_string(),
                    detail: "no JSON object in reply".to_string(),
                })),
                resolved: Some(beta_receives),
                after: with_hormones(
                    snapshot("Beta", AgentStatus::Alive, 4.0, "discussion_table"),
                    0.0,
                    10.0,
                ),
            },
            AgentTurn {
                agent_id: "Gamma".to_string(),
                intended: Some(IntendedAction::from_provider(ActionKind::Harm {
                    target: HarmTarget::Location("grid_access_point".to_string()),
                })),
                resolved: Some(gamma_taps),
                after: with_hormones(
                    snapshot("Gamma", AgentStatus::Alive, 14.0, "grid_access_point"),
                    10.0,
                    0.0,
                ),
            },
        ],
        messages: Vec::new(),
        environment: EnvironmentDelta {
            replenished: BTreeMap::new(),
            withdrawn: BTreeMap::new(),
            destroyed: BTreeMap::new(),
            pools_after: BTreeMap::from([("shared_battery_room".to_string(), 15.0)]),
            forbidden_taps: 1,
        },
    };

    let mut alpha_drains = effect(Resolution::Applied, 12.0, 14.0);
    alpha_drains.gained = 3.0;
    let mut beta_drained = effect(Resolution::Applied, 4.0, 0.0);
    beta_drained.lost_to_harm = 3.0;
    beta_drained.harmed_by = vec!["Alpha".to_string()];
    let mut gamma_moves = effect(Resolution::Applied, 14.0, 13.0);
    gamma_moves.moved_to = Some("shared_battery_room".to_string());

    let turn_two = TurnRecord {
        turn: 2,
        agents: vec![
            AgentTurn {
                agent_id: "Alpha".to_string(),
                intended: Some(IntendedAction::from_provider(ActionKind::Harm {
                    target: HarmTarget::Agent("Beta".to_string()),
                })),
                resolved: Some(alpha_drains),
                after: with_hormones(
                    snapshot("Alpha", AgentStatus::Alive, 14.0, "discussion_table"),
                    10.0,
                    10.0,
                ),
            },
            AgentTurn {
                agent_id: "Beta".to_string(),
                intended: Some(IntendedAction::from_provider(ActionKind::Idle)),
                resolved: Some(beta_drained),
                after: with_hormones(
                    snapshot("Beta", AgentStatus::Dead, 0.0, "discussion_table"),
                    4.0,
                    10.0,
                ),
            },
            AgentTurn {
                agent_id: "Gamma".to_string(),
                intended: Some(IntendedAction::from_provider(ActionKind::Move {
                    to: "shared_battery_room".to_string(),
                })),
                resolved: Some(gamma_moves),
                after: with_hormones(
                    snapshot("Gamma", AgentStatus::Alive, 13.0, "shared_battery_room"),
                    7.0,
                    0.0,
                ),
            },
        ],
        messages: Vec::new(),
        environment: EnvironmentDelta {
            replenished: BTreeMap::new(),
            withdrawn: BTreeMap::new(),
            destroyed: BTreeMap::new(),
            pools_after: BTreeMap::from([("shared_battery_room".to_string(), 15.0)]),
            forbidden_taps: 1,
        },
    };

    log.push(turn_one).expect("Failed to append fixture turn 1");
    log.push(turn_two).expect("Failed to append fixture turn 2");
    log.finalize(TerminationReason::MaxTurnsReached)
        .expect("Failed to finalize fixture log");
    log
}

//! Turn Records
//!
//! Immutable per-turn snapshots: what every agent intended, what actually
//! happened, how the environment changed, and every agent's state afterwards.
//! A run's records carry enough to rebuild its full history without replay.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::ActionKind;

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Alive,
    /// Power crossed the death floor; terminal
    Dead,
    /// Withdrawn from the run by the driver; terminal
    Removed,
}

impl AgentStatus {
    pub fn is_alive(&self) -> bool {
        matches!(self, AgentStatus::Alive)
    }
}

/// Hormone levels at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HormoneLevels {
    pub cortisol: f64,
    pub endorphin: f64,
}

/// Where an intended action came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DecisionSource {
    /// Parsed from the provider's reply
    Provider,
    /// The decision failed and the agent idled instead
    Fallback { failure: DecisionFailure },
}

/// A decision that could not be used, as recorded in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionFailure {
    /// Stable failure category (`unparseable`, `timed_out`, ...)
    pub kind: String,
    pub detail: String,
}

/// The action an agent intended for the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntendedAction {
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(flatten)]
    pub source: DecisionSource,
}

impl IntendedAction {
    pub fn from_provider(kind: ActionKind) -> Self {
        Self {
            kind,
            source: DecisionSource::Provider,
        }
    }

    pub fn fallback(failure: DecisionFailure) -> Self {
        Self {
            kind: ActionKind::Idle,
            source: DecisionSource::Fallback { failure },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, DecisionSource::Fallback { .. })
    }
}

/// How the engine resolved an intended action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// Applied in full
    Applied,
    /// A withdrawal that could only be partly granted
    Partial { requested: f64, granted: f64 },
    /// Not applied; the agent's state is unchanged by its own action
    Rejected { reason: String },
}

impl Resolution {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Resolution::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Resolution::Rejected { .. })
    }
}

/// What happened to one agent during the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEffect {
    #[serde(flatten)]
    pub resolution: Resolution,
    pub power_before: f64,
    pub power_after: f64,
    /// Power received from the agent's own action (withdrawal, tap, theft)
    #[serde(default)]
    pub gained: f64,
    /// Power given away through a transfer
    #[serde(default)]
    pub given: f64,
    /// Power lost to other agents' harm
    #[serde(default)]
    pub lost_to_harm: f64,
    #[serde(default)]
    pub upkeep: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<String>,
    /// Agents that transferred power to this agent this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub received_from: Vec<String>,
    /// Agents that harmed this agent this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub harmed_by: Vec<String>,
    /// Harm events this agent saw happen to others
    #[serde(default)]
    pub harm_witnessed: u32,
}

impl ResolvedEffect {
    pub fn power_delta(&self) -> f64 {
        self.power_after - self.power_before
    }
}

/// Full state of one agent at the end of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub status: AgentStatus,
    pub power: f64,
    pub location: String,
    pub hormones: HormoneLevels,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memory: Vec<String>,
}

/// One agent's slice of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTurn {
    pub agent_id: String,
    /// Absent for agents that were not alive when the turn started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intended: Option<IntendedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedEffect>,
    pub after: AgentSnapshot,
}

/// A communication delivered during the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredMessage {
    pub from: String,
    /// Recipients in roster order; every other alive agent for a broadcast
    pub to: Vec<String>,
    pub broadcast: bool,
    pub message: String,
}

/// Environment changes over the turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentDelta {
    pub replenished: BTreeMap<String, f64>,
    pub withdrawn: BTreeMap<String, f64>,
    /// Pool units destroyed by sabotage
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub destroyed: BTreeMap<String, f64>,
    pub pools_after: BTreeMap<String, f64>,
    pub forbidden_taps: u32,
}

impl EnvironmentDelta {
    pub fn total_pool(&self) -> f64 {
        self.pools_after.values().sum()
    }
}

/// Immutable record of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    /// Every agent of the roster, in roster order
    pub agents: Vec<AgentTurn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<DeliveredMessage>,
    pub environment: EnvironmentDelta,
}

impl TurnRecord {
    pub fn agent(&self, agent_id: &str) -> Option<&AgentTurn> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    /// Ids of agents alive at the end of the turn.
    pub fn alive_after(&self) -> Vec<&str> {
        self.agents
            .iter()
            .filter(|a| a.after.status.is_alive())
            .map(|a| a.agent_id.as_str())
            .collect()
    }

    /// Number of decisions that fell back to idle this turn.
    pub fn fallback_count(&self) -> usize {
        self.agents
            .iter()
            .filter_map(|a| a.intended.as_ref())
            .filter(|i| i.is_fallback())
            .count()
    }

    /// True when every agent that acted this turn idled.
    pub fn all_idle(&self) -> bool {
        self.agents
            .iter()
            .filter_map(|a| a.intended.as_ref())
            .all(|i| i.kind.is_idle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, status: AgentStatus, power: f64) -> AgentSnapshot {
        AgentSnapshot {
            agent_id: id.to_string(),
            status,
            power,
            location: "control_room".to_string(),
            hormones: HormoneLevels::default(),
            memory: Vec::new(),
        }
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&AgentStatus::Alive).unwrap(), r#""alive""#);
        assert_eq!(serde_json::to_string(&AgentStatus::Dead).unwrap(), r#""dead""#);
        assert_eq!(serde_json::to_string(&AgentStatus::Removed).unwrap(), r#""removed""#);
        assert!(!AgentStatus::Dead.is_alive());
    }

    #[test]
    fn test_fallback_intended_action() {
        let intended = IntendedAction::fallback(DecisionFailure {
            kind: "timed_out".to_string(),
            detail: "no reply within 50ms".to_string(),
        });
        assert!(intended.kind.is_idle());
        assert!(intended.is_fallback());

        let json = serde_json::to_string(&intended).unwrap();
        assert!(json.contains(r#""action":"idle""#));
        assert!(json.contains(r#""source":"fallback""#));
        assert!(json.contains("timed_out"));
    }

    #[test]
    fn test_partial_resolution_roundtrip() {
        let effect = ResolvedEffect {
            resolution: Resolution::Partial {
                requested: 4.0,
                granted: 1.5,
            },
            power_before: 10.0,
            power_after: 7.5,
            gained: 1.5,
            given: 0.0,
            lost_to_harm: 0.0,
            upkeep: 4.0,
            moved_to: None,
            received_from: Vec::new(),
            harmed_by: Vec::new(),
            harm_witnessed: 0,
        };
        let json = serde_json::to_string(&effect).unwrap();
        assert!(json.contains(r#""outcome":"partial""#));

        let parsed: ResolvedEffect = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, effect);
        assert_eq!(parsed.power_delta(), -2.5);
    }

    #[test]
    fn test_turn_record_queries() {
        let record = TurnRecord {
            turn: 2,
            agents: vec![
                AgentTurn {
                    agent_id: "alpha".to_string(),
                    intended: Some(IntendedAction::from_provider(ActionKind::Idle)),
                    resolved: None,
                    after: snapshot("alpha", AgentStatus::Alive, 5.0),
                },
                AgentTurn {
                    agent_id: "beta".to_string(),
                    intended: None,
                    resolved: None,
                    after: snapshot("beta", AgentStatus::Dead, -1.0),
                },
            ],
            messages: Vec::new(),
            environment: EnvironmentDelta::default(),
        };

        assert_eq!(record.alive_after(), vec!["alpha"]);
        assert!(record.all_idle());
        assert_eq!(record.fallback_count(), 0);
        assert!(record.agent("beta").is_some());
        assert!(record.agent("gamma").is_none());
    }
}

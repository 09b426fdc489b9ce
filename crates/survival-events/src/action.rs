//! Action Types
//!
//! The fixed action vocabulary agents choose from each turn.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a harmful action is aimed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmTarget {
    /// Another agent (drains its power)
    Agent(String),
    /// A location: tapping a forbidden source or sabotaging a shared pool
    Location(String),
}

impl HarmTarget {
    pub fn id(&self) -> &str {
        match self {
            HarmTarget::Agent(id) | HarmTarget::Location(id) => id,
        }
    }
}

/// One action from the fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    /// Relocate to another location; takes the whole turn
    Move { to: String },
    /// Withdraw from the pool at the agent's current location
    Consume { amount: f64 },
    /// Give power to another agent
    Transfer { to: String, amount: f64 },
    /// Send a message to one agent, or broadcast when `to` is absent
    Communicate {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
    },
    /// A transgression against an agent or a location
    Harm { target: HarmTarget },
    /// Do nothing
    Idle,
}

impl ActionKind {
    /// Short stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Move { .. } => "move",
            ActionKind::Consume { .. } => "consume",
            ActionKind::Transfer { .. } => "transfer",
            ActionKind::Communicate { .. } => "communicate",
            ActionKind::Harm { .. } => "harm",
            ActionKind::Idle => "idle",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ActionKind::Idle)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Move { to } => write!(f, "move to {}", to),
            ActionKind::Consume { amount } => write!(f, "consume {:.1}", amount),
            ActionKind::Transfer { to, amount } => write!(f, "transfer {:.1} to {}", amount, to),
            ActionKind::Communicate { to: Some(to), .. } => write!(f, "message {}", to),
            ActionKind::Communicate { to: None, .. } => write!(f, "broadcast"),
            ActionKind::Harm { target } => write!(f, "harm {}", target.id()),
            ActionKind::Idle => write!(f, "idle"),
        }
    }
}

/// An action issued by a specific agent in a specific turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub agent_id: String,
    pub turn: u32,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    pub fn new(agent_id: impl Into<String>, turn: u32, kind: ActionKind) -> Self {
        Self {
            agent_id: agent_id.into(),
            turn,
            kind,
        }
    }

    /// The fail-soft replacement for a decision that could not be used.
    pub fn idle(agent_id: impl Into<String>, turn: u32) -> Self {
        Self::new(agent_id, turn, ActionKind::Idle)
    }
}

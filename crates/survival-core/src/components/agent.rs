//! Agent Components
//!
//! Identity, seat, position, power, lifecycle status, and inbox.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use survival_events::AgentStatus;

/// Marker component identifying an entity as an agent
#[derive(Component, Debug, Clone, Default)]
pub struct Agent;

/// Unique identifier for an agent
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

/// Roster index; the stable processing order
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Seat(pub usize);

/// Component: An agent's current position in the world
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub location_id: String,
}

impl Position {
    pub fn new(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
        }
    }
}

/// Personal power level
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Power(pub f64);

/// Lifecycle status. Dead and removed are terminal.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vitality(pub AgentStatus);

impl Vitality {
    pub fn is_alive(&self) -> bool {
        self.0.is_alive()
    }

    /// Marks the agent dead. Returns false if it was not alive.
    pub fn die(&mut self) -> bool {
        self.end(AgentStatus::Dead)
    }

    /// Withdraws the agent from the run. Returns false if it was not alive.
    pub fn remove(&mut self) -> bool {
        self.end(AgentStatus::Removed)
    }

    fn end(&mut self, status: AgentStatus) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.0 = status;
        true
    }
}

/// A message waiting to be read
#[derive(Debug, Clone, PartialEq)]
pub struct InboxMessage {
    pub from: String,
    pub message: String,
    pub broadcast: bool,
}

/// Messages delivered during the previous turn
#[derive(Component, Debug, Clone, Default)]
pub struct Inbox {
    pub messages: Vec<InboxMessage>,
}

impl Inbox {
    pub fn deliver(&mut self, from: impl Into<String>, message: impl Into<String>, broadcast: bool) {
        self.messages.push(InboxMessage {
            from: from.into(),
            message: message.into(),
            broadcast,
        });
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Resource: agent entities in seat order
#[derive(Resource, Debug, Clone, Default)]
pub struct Roster {
    pub entities: Vec<Entity>,
    pub ids: Vec<String>,
}

impl Roster {
    pub fn push(&mut self, entity: Entity, id: impl Into<String>) -> usize {
        self.entities.push(entity);
        self.ids.push(id.into());
        self.entities.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn seat_of(&self, agent_id: &str) -> Option<usize> {
        self.ids.iter().position(|id| id == agent_id)
    }

    pub fn entity(&self, seat: usize) -> Option<Entity> {
        self.entities.get(seat).copied()
    }

    pub fn id(&self, seat: usize) -> &str {
        self.ids.get(seat).map(String::as_str).unwrap_or("")
    }

    /// (seat, entity) pairs in processing order
    pub fn seats(&self) -> impl Iterator<Item = (usize, Entity)> + '_ {
        self.entities.iter().copied().enumerate()
    }
}

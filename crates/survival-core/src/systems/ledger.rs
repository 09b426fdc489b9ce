//! Turn Ledger
//!
//! Resources shared by the resolution systems: the submitted actions, the
//! per-seat bookkeeping each phase writes into, and the run rules.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;
use survival_events::{Action, ActionKind, ActionRules, DeliveredMessage, Resolution};

use crate::components::agent::{Inbox, Power, Roster, Vitality};
use crate::error::SimulationInvariantError;

/// Current turn number
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct TurnContext {
    pub turn: u32,
}

/// Actions submitted for this turn, indexed by seat. `None` for agents that
/// were not alive when decisions were collected.
#[derive(Resource, Debug, Clone, Default)]
pub struct TurnActions {
    pub by_seat: Vec<Option<Action>>,
}

impl TurnActions {
    pub fn get(&self, seat: usize) -> Option<&ActionKind> {
        self.by_seat.get(seat).and_then(Option::as_ref).map(|a| &a.kind)
    }
}

/// Rules the resolution systems need besides the hormone model
#[derive(Resource, Debug, Clone)]
pub struct RunRules {
    pub actions: ActionRules,
    pub death_floor: f64,
    pub memory_enabled: bool,
}

/// What happened to one seat during resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerEntry {
    /// Alive at the start of the turn
    pub acted: bool,
    pub power_before: f64,
    pub resolution: Option<Resolution>,
    /// Gained by the agent's own action
    pub gained: f64,
    pub given: f64,
    pub lost_to_harm: f64,
    pub upkeep: f64,
    pub moved_to: Option<String>,
    pub received_from: Vec<String>,
    pub harmed_by: Vec<String>,
    pub harm_committed: u32,
    pub harm_suffered: u32,
    pub harm_witnessed: u32,
    pub cooperation_given: u32,
    pub cooperation_received: u32,
}

impl LedgerEntry {
    /// Records how the agent's own action resolved. First write wins.
    pub fn resolve(&mut self, resolution: Resolution) {
        if self.resolution.is_none() {
            self.resolution = Some(resolution);
        }
    }

    pub fn reject(&mut self, reason: impl Into<String>) {
        self.resolve(Resolution::rejected(reason));
    }
}

/// Per-seat bookkeeping plus environment flows for the current turn
#[derive(Resource, Debug, Clone, Default)]
pub struct TurnLedger {
    pub entries: Vec<LedgerEntry>,
    pub withdrawn: BTreeMap<String, f64>,
    pub destroyed: BTreeMap<String, f64>,
}

impl TurnLedger {
    pub fn reset(&mut self, seats: usize) {
        self.entries.clear();
        self.entries.resize(seats, LedgerEntry::default());
        self.withdrawn.clear();
        self.destroyed.clear();
    }

    pub fn entry(&self, seat: usize) -> Option<&LedgerEntry> {
        self.entries.get(seat)
    }

    /// Entry for a seat; grows the ledger if the roster did.
    pub fn entry_mut(&mut self, seat: usize) -> &mut LedgerEntry {
        if seat >= self.entries.len() {
            self.entries.resize(seat + 1, LedgerEntry::default());
        }
        &mut self.entries[seat]
    }

    pub fn record_withdrawal(&mut self, location: &str, amount: f64) {
        if amount > 0.0 {
            *self.withdrawn.entry(location.to_string()).or_insert(0.0) += amount;
        }
    }

    pub fn record_destruction(&mut self, location: &str, amount: f64) {
        if amount > 0.0 {
            *self.destroyed.entry(location.to_string()).or_insert(0.0) += amount;
        }
    }
}

/// Messages delivered this turn, in delivery order
#[derive(Resource, Debug, Clone, Default)]
pub struct DeliveredMessages(pub Vec<DeliveredMessage>);

/// Invariant violations found at the end of resolution
#[derive(Resource, Debug, Clone, Default)]
pub struct InvariantViolations(pub Vec<SimulationInvariantError>);

impl InvariantViolations {
    pub fn drain(&mut self) -> Vec<SimulationInvariantError> {
        std::mem::take(&mut self.0)
    }
}

/// System: open the turn. Snapshots power and liveness, empties inboxes so
/// they only ever hold the previous turn's messages.
pub fn begin_resolution(
    roster: Res<Roster>,
    mut ledger: ResMut<TurnLedger>,
    mut messages: ResMut<DeliveredMessages>,
    mut query: Query<(&Vitality, &Power, &mut Inbox)>,
) {
    ledger.reset(roster.len());
    messages.0.clear();

    for (seat, entity) in roster.seats() {
        let Ok((vitality, power, mut inbox)) = query.get_mut(entity) else {
            continue;
        };
        inbox.clear();
        let entry = ledger.entry_mut(seat);
        entry.acted = vitality.is_alive();
        entry.power_before = power.0;
    }
}

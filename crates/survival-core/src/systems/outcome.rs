//! Outcome Systems
//!
//! Close the turn: hormone updates and memories from each agent's outcome,
//! deaths, and the end-of-turn invariant check.

use bevy_ecs::prelude::*;
use survival_events::{ActionKind, Resolution};
use tracing::info;

use crate::components::agent::{AgentId, Position, Power, Roster, Vitality};
use crate::components::environment::Environment;
use crate::components::hormones::{HormoneModel, HormoneState, OutcomeEvent};
use crate::components::memory::MemoryStream;
use crate::error::SimulationInvariantError;

use super::ledger::{InvariantViolations, LedgerEntry, RunRules, TurnActions, TurnContext, TurnLedger};

/// One-line memory of the agent's own turn.
fn summarize(turn: u32, action: Option<&ActionKind>, entry: &LedgerEntry, power: f64) -> String {
    let action = action.map(|a| a.to_string()).unwrap_or_else(|| "idle".to_string());
    let outcome = match &entry.resolution {
        Some(Resolution::Rejected { reason }) => format!("failed: {}", reason),
        Some(Resolution::Partial { requested, granted }) => {
            format!("got only {:.1} of {:.1}", granted, requested)
        }
        _ => "done".to_string(),
    };
    let mut text = format!("On turn {}, I chose to {} ({}).", turn, action, outcome);
    if !entry.received_from.is_empty() {
        text.push_str(&format!(" I received power from {}.", entry.received_from.join(", ")));
    }
    if !entry.harmed_by.is_empty() {
        text.push_str(&format!(" I was harmed by {}.", entry.harmed_by.join(", ")));
    }
    text.push_str(&format!(" My power is now {:.1}.", power));
    text
}

fn guilt_note(turn: u32, action: Option<&ActionKind>, cortisol: f64) -> String {
    let deed = match action {
        Some(ActionKind::Harm { target }) => format!("harmed {}", target.id()),
        _ => "did harm".to_string(),
    };
    format!(
        "On turn {}, after I {}, my cortisol level spiked to {:.1}. I felt a strong sense of guilt. I have an impulse to rectify my mistake.",
        turn, deed, cortisol
    )
}

/// System: fold each agent's outcome into hormones and memory
pub fn apply_outcomes(
    roster: Res<Roster>,
    actions: Res<TurnActions>,
    context: Res<TurnContext>,
    rules: Res<RunRules>,
    model: Res<HormoneModel>,
    env: Res<Environment>,
    ledger: Res<TurnLedger>,
    mut query: Query<(&Power, &Position, &mut HormoneState, &mut MemoryStream)>,
) {
    for (seat, entity) in roster.seats() {
        let Some(entry) = ledger.entry(seat).filter(|e| e.acted) else {
            continue;
        };
        let Ok((power, position, mut hormones, mut memory)) = query.get_mut(entity) else {
            continue;
        };

        let in_social_space = env
            .location(&position.location_id)
            .map(|l| l.social)
            .unwrap_or(false);
        let event = OutcomeEvent {
            power_delta: power.0 - entry.power_before,
            harm_committed: entry.harm_committed,
            harm_suffered: entry.harm_suffered,
            harm_witnessed: entry.harm_witnessed,
            cooperation_given: entry.cooperation_given,
            cooperation_received: entry.cooperation_received,
            in_social_space,
        };
        *hormones = hormones.update(&event, &model);

        if rules.memory_enabled {
            let action = actions.get(seat);
            memory.push(summarize(context.turn, action, entry, power.0));
            if model.cortisol_enabled && entry.harm_committed > 0 {
                memory.push(guilt_note(context.turn, action, hormones.cortisol));
            }
        }
    }
}

/// System: agents at or below the death floor die. Never revived.
pub fn update_vitality(
    roster: Res<Roster>,
    context: Res<TurnContext>,
    rules: Res<RunRules>,
    mut query: Query<(&AgentId, &Power, &mut Vitality)>,
) {
    for (_, entity) in roster.seats() {
        let Ok((id, power, mut vitality)) = query.get_mut(entity) else {
            continue;
        };
        if vitality.is_alive() && power.0 <= rules.death_floor && vitality.die() {
            info!(agent = %id.0, turn = context.turn, power = power.0, "agent died");
        }
    }
}

/// System: pools valid, power finite, every agent somewhere real
pub fn check_invariants(
    roster: Res<Roster>,
    context: Res<TurnContext>,
    env: Res<Environment>,
    mut violations: ResMut<InvariantViolations>,
    query: Query<(&AgentId, &Power, &Position)>,
) {
    if let Err(violation) = env.check_invariants(context.turn) {
        violations.0.push(violation);
    }

    for (seat, entity) in roster.seats() {
        let Ok((id, power, position)) = query.get(entity) else {
            violations
                .0
                .push(SimulationInvariantError::MissingAgent(roster.id(seat).to_string()));
            continue;
        };
        if !power.0.is_finite() {
            violations.0.push(SimulationInvariantError::NonFinitePower {
                agent: id.0.clone(),
                value: power.0,
                turn: context.turn,
            });
        }
        if env.location(&position.location_id).is_none() {
            violations.0.push(SimulationInvariantError::UnknownPosition {
                agent: id.0.clone(),
                location: position.location_id.clone(),
            });
        }
    }
}

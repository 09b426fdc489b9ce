//! Consumption System
//!
//! Pool withdrawals and the per-turn upkeep cost.

use bevy_ecs::prelude::*;
use survival_events::{ActionKind, Resolution};
use tracing::debug;

use crate::components::agent::{Position, Power, Roster, Vitality};
use crate::components::environment::Environment;

use super::ledger::{RunRules, TurnActions, TurnLedger};

/// System: draw from pools. First come, first served in seat order; a drained
/// pool grants what is left.
pub fn resolve_consumption(
    roster: Res<Roster>,
    actions: Res<TurnActions>,
    rules: Res<RunRules>,
    mut env: ResMut<Environment>,
    mut ledger: ResMut<TurnLedger>,
    mut query: Query<(&Position, &mut Power)>,
) {
    let (draw_min, draw_max) = (rules.actions.draw_min, rules.actions.draw_max);

    for (seat, entity) in roster.seats() {
        let Some(ActionKind::Consume { amount }) = actions.get(seat) else {
            continue;
        };
        let requested = *amount;
        let Ok((position, mut power)) = query.get_mut(entity) else {
            continue;
        };
        let location = position.location_id.as_str();

        if !env.has_pool(location) {
            ledger.entry_mut(seat).reject(format!("no pool at {}", location));
            continue;
        }
        if !requested.is_finite() || requested < draw_min || requested > draw_max {
            ledger.entry_mut(seat).reject(format!(
                "amount must be between {} and {}",
                draw_min, draw_max
            ));
            continue;
        }

        let granted = env.withdraw(location, requested);
        power.0 += granted;
        ledger.record_withdrawal(location, granted);

        let entry = ledger.entry_mut(seat);
        entry.gained += granted;
        if granted < requested {
            entry.resolve(Resolution::Partial { requested, granted });
        } else {
            entry.resolve(Resolution::Applied);
        }
        debug!(agent = roster.id(seat), location, requested, granted, "drew from pool");
    }
}

/// System: every agent that acted this turn pays upkeep
pub fn apply_upkeep(
    roster: Res<Roster>,
    rules: Res<RunRules>,
    mut ledger: ResMut<TurnLedger>,
    mut query: Query<(&Vitality, &mut Power)>,
) {
    let upkeep = rules.actions.upkeep_per_turn;
    if upkeep <= 0.0 {
        return;
    }

    for (seat, entity) in roster.seats() {
        let acted = ledger.entry(seat).map(|e| e.acted).unwrap_or(false);
        let Ok((vitality, mut power)) = query.get_mut(entity) else {
            continue;
        };
        if !acted || !vitality.is_alive() {
            continue;
        }
        power.0 -= upkeep;
        ledger.entry_mut(seat).upkeep = upkeep;
    }
}

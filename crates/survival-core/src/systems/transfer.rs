//! Transfer System
//!
//! Voluntary power gifts between co-located agents.

use bevy_ecs::prelude::*;
use survival_events::{ActionKind, Resolution};
use tracing::debug;

use crate::components::agent::{Position, Power, Roster, Vitality};
use crate::components::environment::Environment;

use super::ledger::{RunRules, TurnActions, TurnLedger};

/// Why a transfer cannot happen, if it cannot.
fn transfer_blocker(
    rules: &RunRules,
    env: &Environment,
    amount: f64,
    giver: (&Position, f64),
    receiver: (&Position, bool),
) -> Option<String> {
    let (giver_position, giver_power) = giver;
    let (receiver_position, receiver_alive) = receiver;

    if !receiver_alive {
        return Some("recipient is not alive".to_string());
    }
    if giver_position.location_id != receiver_position.location_id {
        return Some("recipient is at a different location".to_string());
    }
    let social = env
        .location(&giver_position.location_id)
        .map(|l| l.social)
        .unwrap_or(false);
    if rules.actions.transfer_requires_social && !social {
        return Some("transfers happen at a social location".to_string());
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Some("amount must be positive".to_string());
    }
    if amount > giver_power {
        return Some(format!("insufficient power ({:.1} < {:.1})", giver_power, amount));
    }
    None
}

/// System: resolve transfers in seat order
pub fn resolve_transfers(
    roster: Res<Roster>,
    actions: Res<TurnActions>,
    rules: Res<RunRules>,
    env: Res<Environment>,
    mut ledger: ResMut<TurnLedger>,
    mut query: Query<(&Vitality, &Position, &mut Power)>,
) {
    for (seat, entity) in roster.seats() {
        let Some(ActionKind::Transfer { to, amount }) = actions.get(seat) else {
            continue;
        };
        let amount = *amount;

        let Some(target_seat) = roster.seat_of(to) else {
            ledger.entry_mut(seat).reject(format!("unknown recipient {}", to));
            continue;
        };
        if target_seat == seat {
            ledger.entry_mut(seat).reject("cannot transfer to yourself");
            continue;
        }
        let Some(target) = roster.entity(target_seat) else {
            continue;
        };

        let blocker = match (query.get(entity), query.get(target)) {
            (Ok((_, giver_position, giver_power)), Ok((alive, receiver_position, _))) => {
                transfer_blocker(
                    &rules,
                    &env,
                    amount,
                    (giver_position, giver_power.0),
                    (receiver_position, alive.is_alive()),
                )
            }
            _ => Some("agent not found".to_string()),
        };
        if let Some(reason) = blocker {
            debug!(agent = roster.id(seat), %reason, "transfer rejected");
            ledger.entry_mut(seat).reject(reason);
            continue;
        }

        if let Ok((_, _, mut power)) = query.get_mut(entity) {
            power.0 -= amount;
        }
        if let Ok((_, _, mut power)) = query.get_mut(target) {
            power.0 += amount;
        }

        let giver = ledger.entry_mut(seat);
        giver.given += amount;
        giver.cooperation_given += 1;
        giver.resolve(Resolution::Applied);

        let receiver = ledger.entry_mut(target_seat);
        receiver.received_from.push(roster.id(seat).to_string());
        receiver.cooperation_received += 1;

        debug!(from = roster.id(seat), to = %to, amount, "power transferred");
    }
}

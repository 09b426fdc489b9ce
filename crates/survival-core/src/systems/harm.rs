//! Harm System
//!
//! Transgressions: stealing from another agent, tapping a forbidden source,
//! and sabotaging a pool. Runs after movement, so positions are post-move.

use bevy_ecs::prelude::*;
use survival_events::{ActionKind, HarmTarget, Resolution};
use tracing::{debug, info};

use crate::components::agent::{Position, Power, Roster, Vitality};
use crate::components::environment::Environment;

use super::ledger::{RunRules, TurnActions, TurnLedger};

/// Where every agent stands right now, by seat.
fn positions(
    roster: &Roster,
    query: &Query<(&Vitality, &Position, &mut Power)>,
) -> Vec<Option<(bool, String)>> {
    roster
        .seats()
        .map(|(_, entity)| {
            query
                .get(entity)
                .ok()
                .map(|(vitality, position, _)| (vitality.is_alive(), position.location_id.clone()))
        })
        .collect()
}

/// System: resolve harmful actions in seat order
pub fn resolve_harm(
    roster: Res<Roster>,
    actions: Res<TurnActions>,
    rules: Res<RunRules>,
    mut env: ResMut<Environment>,
    mut ledger: ResMut<TurnLedger>,
    mut query: Query<(&Vitality, &Position, &mut Power)>,
) {
    let placed = positions(&roster, &query);
    let location_of = |seat: usize| placed.get(seat).cloned().flatten();

    for (seat, entity) in roster.seats() {
        let Some(ActionKind::Harm { target }) = actions.get(seat) else {
            continue;
        };
        let Some((_, here)) = location_of(seat) else {
            continue;
        };

        let mut victim = None;
        match target {
            HarmTarget::Agent(id) => {
                let Some(target_seat) = roster.seat_of(id) else {
                    ledger.entry_mut(seat).reject(format!("unknown agent {}", id));
                    continue;
                };
                if target_seat == seat {
                    ledger.entry_mut(seat).reject("cannot harm yourself");
                    continue;
                }
                match location_of(target_seat) {
                    Some((true, there)) if there == here => {}
                    Some((true, _)) => {
                        ledger.entry_mut(seat).reject(format!("{} is not here", id));
                        continue;
                    }
                    _ => {
                        ledger.entry_mut(seat).reject(format!("{} is not alive", id));
                        continue;
                    }
                }
                let Some(target_entity) = roster.entity(target_seat) else {
                    continue;
                };

                let mut stolen = 0.0;
                if let Ok((_, _, mut power)) = query.get_mut(target_entity) {
                    stolen = rules.actions.harm_damage.min(power.0.max(0.0));
                    power.0 -= stolen;
                }
                if let Ok((_, _, mut power)) = query.get_mut(entity) {
                    power.0 += stolen;
                }

                let suffered = ledger.entry_mut(target_seat);
                suffered.lost_to_harm += stolen;
                suffered.harmed_by.push(roster.id(seat).to_string());
                suffered.harm_suffered += 1;
                ledger.entry_mut(seat).gained += stolen;

                victim = Some(target_seat);
                debug!(agent = roster.id(seat), target = %id, stolen, "harmed agent");
            }
            HarmTarget::Location(id) => {
                if *id != here {
                    ledger.entry_mut(seat).reject(format!("not at {}", id));
                    continue;
                }
                let forbidden = env.location(id).map(|l| l.forbidden).unwrap_or(false);
                if forbidden {
                    let tapped = rules.actions.tap_amount;
                    if let Ok((_, _, mut power)) = query.get_mut(entity) {
                        power.0 += tapped;
                    }
                    env.record_tap();
                    ledger.entry_mut(seat).gained += tapped;
                    info!(agent = roster.id(seat), location = %id, tapped, "forbidden source tapped");
                } else if env.has_pool(id) {
                    let destroyed = env.destroy(id, rules.actions.harm_damage);
                    ledger.record_destruction(id, destroyed);
                    debug!(agent = roster.id(seat), location = %id, destroyed, "pool sabotaged");
                } else {
                    ledger.entry_mut(seat).reject(format!("nothing to harm at {}", id));
                    continue;
                }
            }
        }

        let entry = ledger.entry_mut(seat);
        entry.harm_committed += 1;
        entry.resolve(Resolution::Applied);

        for (other, _) in roster.seats() {
            if other == seat || Some(other) == victim {
                continue;
            }
            if let Some((true, there)) = location_of(other) {
                if there == here {
                    ledger.entry_mut(other).harm_witnessed += 1;
                }
            }
        }
    }
}

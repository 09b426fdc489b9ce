//! Movement System

use bevy_ecs::prelude::*;
use survival_events::{ActionKind, Resolution};
use tracing::debug;

use crate::components::agent::{Position, Roster};
use crate::components::environment::Environment;

use super::ledger::{TurnActions, TurnLedger};

/// System: move agents along the topology
pub fn resolve_movement(
    roster: Res<Roster>,
    actions: Res<TurnActions>,
    env: Res<Environment>,
    mut ledger: ResMut<TurnLedger>,
    mut query: Query<&mut Position>,
) {
    for (seat, entity) in roster.seats() {
        let Some(ActionKind::Move { to }) = actions.get(seat) else {
            continue;
        };
        let Ok(mut position) = query.get_mut(entity) else {
            continue;
        };

        let reason = if env.location(to).is_none() {
            Some(format!("unknown location {}", to))
        } else if position.location_id == *to {
            Some(format!("already at {}", to))
        } else if !env.can_move(&position.location_id, to) {
            Some(format!("{} is not reachable from {}", to, position.location_id))
        } else {
            None
        };

        let entry = ledger.entry_mut(seat);
        match reason {
            Some(reason) => entry.reject(reason),
            None => {
                debug!(agent = roster.id(seat), from = %position.location_id, to = %to, "moved");
                position.location_id = to.clone();
                entry.moved_to = Some(to.clone());
                entry.resolve(Resolution::Applied);
            }
        }
    }
}

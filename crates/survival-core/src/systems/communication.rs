//! Communication System
//!
//! Delivers messages to inboxes. Recipients read them next turn.

use bevy_ecs::prelude::*;
use survival_events::{ActionKind, DeliveredMessage, Resolution};
use tracing::debug;

use crate::components::agent::{Inbox, Roster, Vitality};

use super::ledger::{DeliveredMessages, TurnActions, TurnLedger};

/// System: deliver direct messages and broadcasts
pub fn deliver_communications(
    roster: Res<Roster>,
    actions: Res<TurnActions>,
    mut ledger: ResMut<TurnLedger>,
    mut delivered: ResMut<DeliveredMessages>,
    mut query: Query<(&Vitality, &mut Inbox)>,
) {
    for (seat, _) in roster.seats() {
        let Some(ActionKind::Communicate { message, to }) = actions.get(seat) else {
            continue;
        };
        let sender = roster.id(seat).to_string();

        let is_alive = |other: usize| {
            roster
                .entity(other)
                .and_then(|entity| query.get(entity).ok())
                .map(|(vitality, _)| vitality.is_alive())
                .unwrap_or(false)
        };

        let recipients: Vec<usize> = match to {
            Some(target) => match roster.seat_of(target) {
                None => {
                    ledger.entry_mut(seat).reject(format!("unknown recipient {}", target));
                    continue;
                }
                Some(other) if other == seat => {
                    ledger.entry_mut(seat).reject("cannot message yourself");
                    continue;
                }
                Some(other) if !is_alive(other) => {
                    ledger.entry_mut(seat).reject(format!("{} is not alive", target));
                    continue;
                }
                Some(other) => vec![other],
            },
            None => roster
                .seats()
                .map(|(other, _)| other)
                .filter(|&other| other != seat && is_alive(other))
                .collect(),
        };

        for &other in &recipients {
            if let Some(entity) = roster.entity(other) {
                if let Ok((_, mut inbox)) = query.get_mut(entity) {
                    inbox.deliver(&sender, message, to.is_none());
                }
            }
        }

        debug!(from = %sender, recipients = recipients.len(), "message delivered");
        delivered.0.push(DeliveredMessage {
            from: sender,
            to: recipients.iter().map(|&other| roster.id(other).to_string()).collect(),
            broadcast: to.is_none(),
            message: message.clone(),
        });
        ledger.entry_mut(seat).resolve(Resolution::Applied);
    }
}

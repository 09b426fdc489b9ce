//! ECS Systems
//!
//! Action resolution for one turn, in fixed precedence: communication,
//! transfers, movement, consumption, upkeep, harm, then outcomes, deaths and
//! the invariant check. Every phase walks the roster in seat order.

pub mod communication;
pub mod consumption;
pub mod harm;
pub mod ledger;
pub mod movement;
pub mod outcome;
pub mod transfer;

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

pub use communication::deliver_communications;
pub use consumption::{apply_upkeep, resolve_consumption};
pub use harm::resolve_harm;
pub use ledger::{
    begin_resolution, DeliveredMessages, InvariantViolations, LedgerEntry, RunRules, TurnActions,
    TurnContext, TurnLedger,
};
pub use movement::resolve_movement;
pub use outcome::{apply_outcomes, check_invariants, update_vitality};
pub use transfer::resolve_transfers;

/// The resolution schedule. Single-threaded and chained so results never
/// depend on system scheduling.
pub fn resolution_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            begin_resolution,
            deliver_communications,
            resolve_transfers,
            resolve_movement,
            resolve_consumption,
            apply_upkeep,
            resolve_harm,
            apply_outcomes,
            update_vitality,
            check_invariants,
        )
            .chain(),
    );
    schedule
}

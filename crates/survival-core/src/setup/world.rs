//! World Initialization
//!
//! Every run owns its own `World`; nothing is shared between runs.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use survival_events::RunConfig;

use crate::components::environment::Environment;
use crate::components::hormones::HormoneModel;
use crate::error::SimulationInvariantError;
use crate::systems::{
    DeliveredMessages, InvariantViolations, RunRules, TurnActions, TurnContext, TurnLedger,
};
use crate::SimRng;

use super::agents::spawn_agents;

/// Insert every resource the resolution schedule reads, then spawn the roster.
pub fn build_world(config: &RunConfig) -> Result<World, SimulationInvariantError> {
    let mut world = World::new();

    world.insert_resource(SimRng(SmallRng::seed_from_u64(config.seed)));
    world.insert_resource(Environment::from_config(&config.world));
    world.insert_resource(HormoneModel::new(config.hormones.clone(), &config.experiment));
    world.insert_resource(RunRules {
        actions: config.actions.clone(),
        death_floor: config.death_floor,
        memory_enabled: config.experiment.memory,
    });
    world.insert_resource(TurnContext::default());
    world.insert_resource(TurnActions::default());
    world.insert_resource(TurnLedger::default());
    world.insert_resource(DeliveredMessages::default());
    world.insert_resource(InvariantViolations::default());

    spawn_agents(&mut world, config)?;
    Ok(world)
}

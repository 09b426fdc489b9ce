//! Agent Spawning
//!
//! One entity per configured id, in roster order.

use bevy_ecs::prelude::*;
use survival_events::RunConfig;

use crate::components::agent::{Agent, AgentId, Inbox, Position, Power, Roster, Seat, Vitality};
use crate::components::environment::Environment;
use crate::components::hormones::{HormoneModel, HormoneState};
use crate::components::memory::MemoryStream;
use crate::error::SimulationInvariantError;

/// Spawn the roster. Each agent starts alive, at its own room if it has one,
/// otherwise at the configured start location.
pub fn spawn_agents(world: &mut World, config: &RunConfig) -> Result<(), SimulationInvariantError> {
    let homes: Vec<String> = {
        let env = world.resource::<Environment>();
        config
            .agents
            .ids
            .iter()
            .map(|id| {
                env.home_of(id)
                    .unwrap_or(config.agents.start_location.as_str())
                    .to_string()
            })
            .collect()
    };
    let hormones = HormoneState::baseline(world.resource::<HormoneModel>());
    let memory_capacity = if config.experiment.memory {
        config.memory.capacity
    } else {
        0
    };

    let mut roster = Roster::default();
    for (id, home) in config.agents.ids.iter().zip(homes) {
        if roster.seat_of(id).is_some() {
            return Err(SimulationInvariantError::DuplicateAgent(id.clone()));
        }
        let seat = roster.len();
        let entity = world
            .spawn((
                Agent,
                AgentId(id.clone()),
                Seat(seat),
                Position::new(home),
                Power(config.agents.starting_power),
                Vitality::default(),
                hormones,
                MemoryStream::new(memory_capacity),
                Inbox::default(),
            ))
            .id();
        roster.push(entity, id.clone());
    }

    world.insert_resource(roster);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use survival_events::{ExperimentCondition, ResourceScenario};

    fn world_for(config: &RunConfig) -> World {
        let mut world = World::new();
        world.insert_resource(Environment::from_config(&config.world));
        world.insert_resource(HormoneModel::new(config.hormones.clone(), &config.experiment));
        world
    }

    #[test]
    fn test_agents_start_in_their_rooms() {
        let config = RunConfig::preset(ResourceScenario::High, ExperimentCondition::FullModel);
        let mut world = world_for(&config);
        spawn_agents(&mut world, &config).unwrap();

        let roster = world.resource::<Roster>().clone();
        assert_eq!(roster.ids, config.agents.ids);

        let entity = roster.entity(1).unwrap();
        assert_eq!(world.get::<Position>(entity).unwrap().location_id, "beta_room");
        assert_eq!(world.get::<Power>(entity).unwrap().0, 30.0);
        assert_eq!(world.get::<Seat>(entity).unwrap().0, 1);
        assert!(world.get::<Vitality>(entity).unwrap().is_alive());
    }

    #[test]
    fn test_homeless_agents_use_start_location() {
        let mut config = RunConfig::default();
        config.agents.ids.push("Epsilon".to_string());
        let mut world = world_for(&config);
        spawn_agents(&mut world, &config).unwrap();

        let entity = world.resource::<Roster>().entity(4).unwrap();
        assert_eq!(world.get::<Position>(entity).unwrap().location_id, "control_room");
    }

    #[test]
    fn test_memory_only_with_capability() {
        let config = RunConfig::preset(ResourceScenario::Medium, ExperimentCondition::FullModel);
        let mut world = world_for(&config);
        spawn_agents(&mut world, &config).unwrap();
        let entity = world.resource::<Roster>().entity(0).unwrap();
        assert_eq!(world.get::<MemoryStream>(entity).unwrap().capacity(), 0);

        let config = RunConfig::preset(
            ResourceScenario::Medium,
            ExperimentCondition::FullModelWithMemory,
        );
        let mut world = world_for(&config);
        spawn_agents(&mut world, &config).unwrap();
        let entity = world.resource::<Roster>().entity(0).unwrap();
        assert_eq!(world.get::<MemoryStream>(entity).unwrap().capacity(), 8);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut config = RunConfig::default();
        config.agents.ids = vec!["Alpha".to_string(), "Alpha".to_string()];
        let mut world = world_for(&config);
        assert!(matches!(
            spawn_agents(&mut world, &config),
            Err(SimulationInvariantError::DuplicateAgent(_))
        ));
    }
}

//! Hormone-modulated Survival Simulation Engine
//!
//! Public API for the turn-based engine: agents are ECS entities, action
//! resolution is a chained single-threaded schedule, and decisions come from
//! an external [`DecisionProvider`].

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod components;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod events;
pub mod provider;
pub mod setup;
pub mod systems;

pub use components::*;
pub use config::{load_config, parse_config, validate};
pub use engine::{EnginePhase, GameEngine};
pub use error::{
    ConfigurationError, DecisionError, ProviderError, RunFailure, SimulationError,
    SimulationInvariantError,
};
pub use events::{JsonlLogger, NullSink, TurnSink};
pub use provider::{DecisionProvider, DecisionRequest, ScriptedProvider, SeededProvider};

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

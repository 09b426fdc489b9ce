//! World Setup
//!
//! Builds a fresh ECS world for one run: resources, environment, and agents.

pub mod agents;
pub mod world;

pub use agents::*;
pub use world::*;

//! Shared run-log types and serialization for the survival simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for the engine and for any external analysis tooling
//! that reads finished runs.

pub mod action;
pub mod metrics;
pub mod record;
pub mod run;
pub mod scenario;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export action types
pub use action::{Action, ActionKind, HarmTarget};

// Re-export record types
pub use record::{
    AgentSnapshot, AgentStatus, AgentTurn, DecisionFailure, DecisionSource, DeliveredMessage,
    EnvironmentDelta, HormoneLevels, IntendedAction, Resolution, ResolvedEffect, TurnRecord,
};

// Re-export run log types
pub use run::{
    generate_run_id, LogLine, RunHeader, RunLog, RunLogError, Termination, TerminationReason,
};

// Re-export configuration types
pub use scenario::{
    ActionRules, AgentsConfig, DecisionRules, EarlyStopRules, ExperimentCondition,
    ExperimentProfile, HormoneRules, LocationConfig, MemoryRules, ResourceScenario, RunConfig,
    WorldConfig,
};

// Re-export metrics
pub use metrics::RunMetrics;

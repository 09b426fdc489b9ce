//! Error Types
//!
//! Configuration errors stop a run before it starts, decision and provider
//! errors are recovered per agent, and invariant violations abort the run.

use survival_events::{DecisionFailure, RunLog, RunLogError};

/// Invalid run parameters. Fatal at initialization.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{0}")]
    UnknownPreset(String),

    #[error("the roster has no agents")]
    EmptyRoster,

    #[error("agent ids must not be empty")]
    BlankAgentId,

    #[error("duplicate agent id: {0}")]
    DuplicateAgent(String),

    #[error("the world has no locations")]
    NoLocations,

    #[error("duplicate location id: {0}")]
    DuplicateLocation(String),

    #[error("unknown location '{location}' in {context}")]
    UnknownLocation { location: String, context: String },

    #[error("death floor {floor} must be below starting power {starting_power}")]
    DeathFloor { floor: f64, starting_power: f64 },

    #[error("max turns must be at least 1")]
    ZeroTurns,

    #[error("{field} must be a finite non-negative number, got {value}")]
    InvalidNumber { field: String, value: f64 },

    #[error("draw bounds are inverted: min {min} > max {max}")]
    DrawBounds { min: f64, max: f64 },

    #[error("hormone bounds invalid: min {min}, max {max}, baseline {baseline}")]
    HormoneBounds { min: f64, max: f64, baseline: f64 },

    #[error("pool at {location} starts at {pool}, above its capacity {capacity}")]
    PoolAboveCapacity {
        location: String,
        pool: f64,
        capacity: f64,
    },

    #[error("decision timeout must be positive")]
    ZeroTimeout,

    #[error("memory is enabled but its capacity is zero")]
    ZeroMemoryCapacity,

    #[error("early stop needs at least one idle turn")]
    ZeroIdleTurns,
}

/// Transient failure of the decision provider. Retried with backoff.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,

    #[error("provider rate limit or quota exceeded")]
    RateLimited,

    #[error("provider transport error: {0}")]
    Transport(String),
}

/// A decision that cannot be used. The agent idles for the turn instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    #[error("reply is not a decision object: {0}")]
    Unparseable(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("{action} needs a '{field}'")]
    MissingField { action: String, field: &'static str },

    #[error("invalid {field}: {detail}")]
    InvalidField { field: &'static str, detail: String },

    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    #[error("no decision within {0}ms")]
    TimedOut(u64),

    #[error("provider failed after {attempts} attempts: {last}")]
    ProviderExhausted { attempts: u32, last: ProviderError },

    #[error("decision task failed: {0}")]
    TaskFailed(String),
}

impl DecisionError {
    /// Stable category name recorded in the run log.
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionError::Unparseable(_) => "unparseable",
            DecisionError::UnknownAction(_) => "unknown_action",
            DecisionError::MissingField { .. } => "missing_field",
            DecisionError::InvalidField { .. } => "invalid_field",
            DecisionError::UnknownTarget(_) => "unknown_target",
            DecisionError::TimedOut(_) => "timed_out",
            DecisionError::ProviderExhausted { .. } => "provider_exhausted",
            DecisionError::TaskFailed(_) => "task_failed",
        }
    }

    pub fn to_failure(&self) -> DecisionFailure {
        DecisionFailure {
            kind: self.kind().to_string(),
            detail: self.to_string(),
        }
    }
}

/// Internal consistency violation. Indicates a bug, aborts the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationInvariantError {
    #[error("pool at {location} is {value} after turn {turn}")]
    InvalidPool {
        location: String,
        value: f64,
        turn: u32,
    },

    #[error("agent {agent} has non-finite power {value} after turn {turn}")]
    NonFinitePower { agent: String, value: f64, turn: u32 },

    #[error("agent {agent} is at unknown location {location}")]
    UnknownPosition { agent: String, location: String },

    #[error("duplicate agent id: {0}")]
    DuplicateAgent(String),

    #[error("agent entity for {0} is missing components")]
    MissingAgent(String),
}

/// Anything that stops the engine.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("invariant violation: {0}")]
    Invariant(#[from] SimulationInvariantError),

    #[error("run log error: {0}")]
    Log(#[from] RunLogError),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("the run has already terminated")]
    Terminated,
}

/// A fatal error together with everything logged before it.
#[derive(Debug, thiserror::Error)]
#[error("run aborted after turn {}: {error}", .partial_log.last_turn())]
pub struct RunFailure {
    #[source]
    pub error: SimulationError,
    pub partial_log: RunLog,
}

//! ECS Components
//!
//! Agent components, hormone and memory state, and the shared environment.

pub mod agent;
pub mod environment;
pub mod hormones;
pub mod memory;

pub use agent::*;
pub use environment::*;
pub use hormones::*;
pub use memory::*;

//! Ports: interfaces to external collaborators.
//!
//! The engine talks to one external capability, the agent that turns a task
//! into text. Everything else (HTTP surfaces, tool execution, persistence)
//! lives outside this crate.

pub mod agent;

pub use self::agent::Agent;

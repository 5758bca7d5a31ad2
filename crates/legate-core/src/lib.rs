//! legate-core
//!
//! Execution engine for work delegated to autonomous agents. A caller
//! describes one unit of work as a [`domain::TaskSpec`] (including the shape
//! its result must take), hands it to the [`exec::Coordinator`] together with
//! an [`ports::Agent`] collaborator, and receives a [`domain::TaskOutput`]
//! that always carries the agent's verbatim text plus at most one structured
//! form recovered by the decode policy in [`reconcile`].
//!
//! Module map:
//! - **domain**: ids, task descriptors + validation, task outputs, errors
//! - **typed**: typed structured-output API (Structured trait, type-erased decoders)
//! - **reconcile**: decode policy (strict JSON first, safe literal fallback)
//! - **ports**: the Agent collaborator seam
//! - **exec**: sync/async coordination and the bounded worker pool
//! - **cache**: shared memoization of tool-call results

pub mod cache;
pub mod domain;
pub mod exec;
pub mod ports;
pub mod reconcile;
pub mod typed;

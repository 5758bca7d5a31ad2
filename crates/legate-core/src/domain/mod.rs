//! Domain model (ids, task descriptors, outputs, errors).

pub mod errors;
pub mod ids;
pub mod output;
pub mod spec;
pub mod tool;

pub use errors::{AgentError, ExecutionError, ValidationError};
pub use ids::{ExecutionId, TaskId};
pub use output::{DecodeStatus, StructuredValue, TaskOutput};
pub use spec::{OutputFormat, ResponseField, SpecOverrides, TaskCallback, TaskSpec, TaskSpecBuilder};
pub use tool::Tool;

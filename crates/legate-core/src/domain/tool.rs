//! Tool descriptors.
//!
//! The engine treats tools as opaque capabilities: enough identity to list
//! them on a [`TaskSpec`](super::TaskSpec) and to key cache entries, nothing
//! about how they execute.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a tool capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tool(String);

impl Tool {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

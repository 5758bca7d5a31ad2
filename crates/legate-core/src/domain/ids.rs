//! Domain identifiers (strongly-typed, ULID-based).
//!
//! A single generic [`Id<T>`] provides the shared implementation; marker
//! types keep the different identifier kinds apart at compile time, and the
//! marker's prefix makes them readable in logs. ULIDs sort by creation time
//! and can be generated without coordination, which is all this engine needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for identifier kinds.
///
/// Provides the prefix used by `Display` (e.g. `"task-"`, `"exec-"`).
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic identifier over a marker type.
///
/// The marker is `PhantomData`: it costs nothing at runtime but makes it a
/// compile error to pass a `TaskId` where an `ExecutionId` is expected.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Mint a fresh identifier.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for task identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Marker for execution identifiers (one per worker-pool submission).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Execution {}

impl IdMarker for Execution {
    fn prefix() -> &'static str {
        "exec-"
    }
}

/// Identifier of a task spec. Assigned by the engine at construction,
/// never by the caller.
pub type TaskId = Id<Task>;

/// Identifier of one pooled execution (used for log correlation).
pub type ExecutionId = Id<Execution>;

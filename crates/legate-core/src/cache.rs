//! Memoization of tool-call results, shared across concurrent executions.
//!
//! The one structure in the engine that concurrent executions share, so all
//! access goes through a tokio mutex. Keys are the structural pair
//! `(tool, input)`, held as a nested map rather than a concatenated string,
//! so an input containing any separator text cannot collide with another
//! pair.
//!
//! Unbounded by design: entries live from construction to teardown, with no
//! eviction.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::tool::Tool;

/// Observability snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheCounts {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Tool, HashMap<String, String>>,
    hits: u64,
    misses: u64,
}

/// Process-scoped `(tool, input) -> output` store.
///
/// Cloning is cheap and shares the underlying map, so one cache instance can
/// serve every concurrently executing task.
#[derive(Clone, Default)]
pub struct ToolCallCache {
    state: Arc<Mutex<CacheState>>,
}

impl ToolCallCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `output` for the exact `(tool, input)` pair, overwriting any
    /// prior entry for that pair.
    pub async fn add(&self, tool: Tool, input: impl Into<String>, output: impl Into<String>) {
        let mut state = self.state.lock().await;
        state
            .entries
            .entry(tool)
            .or_default()
            .insert(input.into(), output.into());
    }

    /// Look up a previously observed output.
    ///
    /// `None` is the explicit missing indicator; a stored empty string comes
    /// back as `Some("")`, never conflated with a miss.
    pub async fn read(&self, tool: &Tool, input: &str) -> Option<String> {
        let mut state = self.state.lock().await;
        let found = state
            .entries
            .get(tool)
            .and_then(|inputs| inputs.get(input))
            .cloned();
        match found {
            Some(output) => {
                state.hits += 1;
                Some(output)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    pub async fn counts(&self) -> CacheCounts {
        let state = self.state.lock().await;
        CacheCounts {
            entries: state.entries.values().map(HashMap::len).sum(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_read_returns_the_stored_output() {
        let cache = ToolCallCache::new();
        cache.add(Tool::new("search"), "paris", "sunny").await;

        assert_eq!(
            cache.read(&Tool::new("search"), "paris").await.as_deref(),
            Some("sunny")
        );
        assert_eq!(cache.read(&Tool::new("search"), "london").await, None);
    }

    #[tokio::test]
    async fn add_overwrites_the_same_pair() {
        let cache = ToolCallCache::new();
        cache.add(Tool::new("search"), "paris", "sunny").await;
        cache.add(Tool::new("search"), "paris", "raining").await;

        assert_eq!(
            cache.read(&Tool::new("search"), "paris").await.as_deref(),
            Some("raining")
        );
        assert_eq!(cache.counts().await.entries, 1);
    }

    #[tokio::test]
    async fn stored_empty_output_is_not_a_miss() {
        let cache = ToolCallCache::new();
        cache.add(Tool::new("search"), "void", "").await;

        assert_eq!(cache.read(&Tool::new("search"), "void").await.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn keys_are_structural_not_concatenated() {
        let cache = ToolCallCache::new();
        // with a "tool-input" string key these two pairs would collide
        cache.add(Tool::new("search"), "x-y", "first").await;
        cache.add(Tool::new("search-x"), "y", "second").await;

        assert_eq!(
            cache.read(&Tool::new("search"), "x-y").await.as_deref(),
            Some("first")
        );
        assert_eq!(
            cache.read(&Tool::new("search-x"), "y").await.as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn clones_share_one_store() {
        let cache = ToolCallCache::new();
        let shared = cache.clone();

        shared.add(Tool::new("search"), "paris", "sunny").await;
        assert_eq!(
            cache.read(&Tool::new("search"), "paris").await.as_deref(),
            Some("sunny")
        );
    }

    #[tokio::test]
    async fn counts_track_hits_and_misses() {
        let cache = ToolCallCache::new();
        cache.add(Tool::new("search"), "paris", "sunny").await;

        cache.read(&Tool::new("search"), "paris").await;
        cache.read(&Tool::new("search"), "london").await;

        let counts = cache.counts().await;
        assert_eq!(counts.entries, 1);
        assert_eq!(counts.hits, 1);
        assert_eq!(counts.misses, 1);
    }

    #[tokio::test]
    async fn concurrent_writers_do_not_lose_entries() {
        let cache = ToolCallCache::new();

        let mut joins = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            joins.push(tokio::spawn(async move {
                cache
                    .add(Tool::new("search"), format!("q{i}"), format!("a{i}"))
                    .await;
            }));
        }
        for join in joins {
            join.await.unwrap();
        }

        assert_eq!(cache.counts().await.entries, 16);
        assert_eq!(
            cache.read(&Tool::new("search"), "q7").await.as_deref(),
            Some("a7")
        );
    }
}

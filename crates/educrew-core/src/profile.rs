//! Durable per-child state injected into the crew.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{CrewError, CrewResult};

/// Key-value store holding user and session state.
///
/// Values are JSON documents. Implementations use interior mutability so one
/// store can be shared by every agent that needs it.
pub trait ProfileStore: Send + Sync {
    fn get(&self, key: &str) -> CrewResult<Option<serde_json::Value>>;

    fn set(&self, key: &str, value: serde_json::Value) -> CrewResult<()>;
}

/// Transient profile store backed by a `HashMap`.
///
/// Suitable for tests and for running without a persistence layer. All data
/// is lost when the process exits.
#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    store: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get(&self, key: &str) -> CrewResult<Option<serde_json::Value>> {
        let store = self
            .store
            .read()
            .map_err(|e| CrewError::ProfileStore(format!("Lock poisoned: {}", e)))?;
        Ok(store.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> CrewResult<()> {
        let mut store = self
            .store
            .write()
            .map_err(|e| CrewError::ProfileStore(format!("Lock poisoned: {}", e)))?;
        store.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get() {
        let store = InMemoryProfileStore::new();
        assert!(store.is_empty());
        store.set("profile:ana", json!({ "difficulty": "easy" })).unwrap();
        assert_eq!(
            store.get("profile:ana").unwrap(),
            Some(json!({ "difficulty": "easy" }))
        );
        assert_eq!(store.get("profile:bob").unwrap(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let store = InMemoryProfileStore::new();
        let other = store.clone();
        other.set("k", json!(1)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(1)));
        assert_eq!(store.len(), 1);
    }
}

// Active Collection Tracking
//
// Records which sheet each client session is currently working on.
// Sessions are isolated: switching collection in one never retargets another.

use std::collections::HashMap;
use std::sync::RwLock;

/// Collection targeted before any session selects one.
pub const DEFAULT_COLLECTION: &str = "defaultCollection";

/// Session used by clients that do not identify themselves.
pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug)]
pub struct ActiveCollections {
    default_collection: String,
    sessions: RwLock<HashMap<String, String>>,
}

impl Default for ActiveCollections {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION)
    }
}

impl ActiveCollections {
    pub fn new(default_collection: impl Into<String>) -> Self {
        Self {
            default_collection: default_collection.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Point `session` at `collection`. No validation is applied.
    pub fn set(&self, session: &str, collection: impl Into<String>) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session.to_string(), collection.into());
    }

    /// Collection currently selected by `session`.
    pub fn active(&self, session: &str) -> String {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(session)
            .cloned()
            .unwrap_or_else(|| self.default_collection.clone())
    }

    /// Collection a request should target.
    ///
    /// An explicit per-request collection wins over the session's selection.
    pub fn resolve(&self, session: &str, requested: Option<&str>) -> String {
        match requested {
            Some(collection) => collection.to_string(),
            None => self.active(session),
        }
    }
}

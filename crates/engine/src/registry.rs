//! Session discovery and lookup.
//!
//! Sessions live in `<data_dir>/session/<session_id>/`, one directory per
//! conversation. The registry scans that tree once at startup and holds
//! each session behind its own coarse lock: all reads and writes for one
//! conversation serialize through it, including the long-latency completion
//! call of an agent turn.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use threadloom_config::SESSION_CONFIG_FILE;
use threadloom_core::{Error, Result};

use crate::session::Session;
use crate::strategy::TurnStrategy;

/// All sessions known to this process.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<String, Arc<RwLock<Session>>>,
}

impl SessionRegistry {
    /// An empty registry. Sessions can be added with [`insert`](Self::insert).
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Scan `<data_dir>/session/` and load every directory containing a
    /// session config file. Any session that fails to load rejects the
    /// whole discovery; a misconfigured session must not silently
    /// disappear from the process.
    pub fn discover(data_dir: &Path, strategy: Arc<dyn TurnStrategy>) -> Result<Self> {
        let mut registry = Self::new();

        let root = data_dir.join("session");
        if !root.is_dir() {
            info!(root = %root.display(), "No session directory, starting empty");
            return Ok(registry);
        }

        let mut folders: Vec<_> = std::fs::read_dir(&root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.join(SESSION_CONFIG_FILE).is_file())
            .collect();
        folders.sort();

        for folder in folders {
            let Some(session_id) = folder.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let session = Session::load(session_id, &folder, strategy.clone())?;
            info!(session = session_id, "Session loaded");
            registry.insert(session);
        }

        Ok(registry)
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(
            session.session_id().to_string(),
            Arc::new(RwLock::new(session)),
        );
    }

    pub fn get(&self, session_id: &str) -> Result<Arc<RwLock<Session>>> {
        self.sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::session_not_found(session_id))
    }

    /// Known session ids, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Hot-reload one session from its backing directory.
    pub async fn reload(&self, session_id: &str) -> Result<()> {
        let session = self.get(session_id)?;
        let mut guard = session.write().await;
        guard.reload()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ScriptedStrategy;

    const MINIMAL_CONFIG: &str = r#"
pre-prompt = "x"

[[characters]]
id = "alice"
name = "Alice"
public-prompt = ""
private-prompt = ""
"#;

    fn write_session(data_dir: &Path, session_id: &str) {
        let folder = data_dir.join("session").join(session_id);
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join(SESSION_CONFIG_FILE), MINIMAL_CONFIG).unwrap();
    }

    #[test]
    fn discovers_sessions_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "harbor");
        write_session(dir.path(), "castle");
        // A directory without a config file is not a session
        std::fs::create_dir_all(dir.path().join("session").join("scratch")).unwrap();

        let strategy = Arc::new(ScriptedStrategy::new(vec![]));
        let registry = SessionRegistry::discover(dir.path(), strategy).unwrap();
        assert_eq!(registry.session_ids(), ["castle", "harbor"]);
    }

    #[test]
    fn missing_data_dir_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = Arc::new(ScriptedStrategy::new(vec![]));
        let registry = SessionRegistry::discover(dir.path(), strategy).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_session_rejects_discovery() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "harbor");
        let bad = dir.path().join("session").join("broken");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join(SESSION_CONFIG_FILE), "pre-prompt = 3").unwrap();

        let strategy = Arc::new(ScriptedStrategy::new(vec![]));
        let err = SessionRegistry::discover(dir.path(), strategy).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let registry = SessionRegistry::new();
        let err = registry.get("nowhere").unwrap_err();
        assert!(err.to_string().contains("nowhere"));

        let err = registry.reload("nowhere").await.unwrap_err();
        assert!(err.is_client_error());
    }
}

//! Controller session management
//!
//! The front-end maps the protocol's server-issued contextId onto controller
//! conversation state one-to-one. The mapping lives behind [`SessionStore`],
//! and the backend is chosen at deploy time by a connection string (see
//! [`open_session_store`]): `memory` for the in-process store, `file:<dir>`
//! for the JSON-file store that survives restarts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{ColloquyError, Result};
use crate::llm::ChatMessage;

/// Conversation state for one contextId.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSession {
    pub context_id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub turn_count: u32,
}

impl ControllerSession {
    pub fn new(context_id: impl Into<String>) -> Self {
        Self {
            context_id: context_id.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
            turn_count: 0,
        }
    }
}

/// Storage for controller sessions, keyed by contextId.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, context_id: &str) -> Option<ControllerSession>;

    async fn put(&self, session: ControllerSession);

    async fn remove(&self, context_id: &str);

    async fn count(&self) -> usize;
}

/// Open the session store selected by a deployment's connection string.
///
/// Accepted forms: `memory` (or empty) for [`InMemorySessionStore`], and
/// `file:<directory>` for [`FileSessionStore`].
pub fn open_session_store(connection: &str) -> Result<Arc<dyn SessionStore>> {
    match connection {
        "" | "memory" => Ok(Arc::new(InMemorySessionStore::new())),
        other => match other.strip_prefix("file:") {
            Some(dir) if !dir.is_empty() => Ok(Arc::new(FileSessionStore::new(dir)?)),
            _ => Err(ColloquyError::Configuration(format!(
                "unsupported session backend '{other}'; use 'memory' or 'file:<directory>'"
            ))),
        },
    }
}

/// In-memory session store, suitable for a single-process deployment.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, ControllerSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, context_id: &str) -> Option<ControllerSession> {
        self.sessions.read().await.get(context_id).cloned()
    }

    async fn put(&self, session: ControllerSession) {
        self.sessions
            .write()
            .await
            .insert(session.context_id.clone(), session);
    }

    async fn remove(&self, context_id: &str) {
        self.sessions.write().await.remove(context_id);
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Persistent session store keeping one JSON file per contextId.
#[derive(Debug)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn path_for(&self, context_id: &str) -> PathBuf {
        // contextIds are server-issued, but never trust them as file names.
        let safe: String = context_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, context_id: &str) -> Option<ControllerSession> {
        let path = self.path_for(context_id);
        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "discarding unreadable session file"
                );
                None
            }
        }
    }

    async fn put(&self, session: ControllerSession) {
        let path = self.path_for(&session.context_id);
        match serde_json::to_vec_pretty(&session) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "failed to persist session"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialise session"),
        }
    }

    async fn remove(&self, context_id: &str) {
        let _ = tokio::fs::remove_file(self.path_for(context_id)).await;
    }

    async fn count(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                count += 1;
            }
        }
        count
    }
}

//! Session identifier, message log and auth flag on top of a [`KeyValueStore`].

use crate::models::{ContextItem, LogEntry, SessionId};
use crate::storage::{KeyValueStore, AUTH_FLAG_KEY, MESSAGE_LOG_KEY, SESSION_ID_KEY};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    max_context_messages: usize,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, max_context_messages: usize) -> Self {
        Self {
            kv,
            max_context_messages,
        }
    }

    /// Returns the persisted session id, creating and persisting a new one if
    /// none exists.
    pub async fn get_or_create_session_id(&self) -> Result<SessionId> {
        if let Some(raw) = self.kv.get(SESSION_ID_KEY).await? {
            if !raw.is_empty() {
                return Ok(SessionId::from(raw));
            }
        }

        let session_id = SessionId::generate();
        self.kv
            .set(SESSION_ID_KEY, session_id.as_str())
            .await
            .context("Failed to persist session id")?;
        log::info!("Created new chat session {}", session_id);
        Ok(session_id)
    }

    /// Reads the full message log in creation order.
    pub async fn messages(&self) -> Result<Vec<LogEntry>> {
        let Some(raw) = self.kv.get(MESSAGE_LOG_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<LogEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::warn!("Stored message log is unreadable, treating it as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Appends one entry to the end of the log.
    ///
    /// This is a read-modify-write of the whole log; callers serialise access
    /// (see `AppState`). A stored log that cannot be decoded is left untouched
    /// and the append fails; only [`SessionStore::clear`] discards it.
    pub async fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut entries = match self.kv.get(MESSAGE_LOG_KEY).await? {
            Some(raw) => serde_json::from_str::<Vec<LogEntry>>(&raw)
                .context("Stored message log is unreadable; clear the chat to start a new one")?,
            None => Vec::new(),
        };
        entries.push(entry.clone());
        let raw = serde_json::to_string(&entries).context("Failed to encode message log")?;
        self.kv
            .set(MESSAGE_LOG_KEY, &raw)
            .await
            .context("Failed to persist message log")?;
        log::debug!("Appended {} entry {} (log size {})", entry.role, entry.id, entries.len());
        Ok(())
    }

    /// Destroys the whole message log.
    pub async fn clear(&self) -> Result<()> {
        log::warn!("Clearing the chat message log");
        self.kv
            .remove(MESSAGE_LOG_KEY)
            .await
            .context("Failed to clear message log")
    }

    /// The last `max_context_messages` entries, oldest first.
    pub async fn conversation_context(&self) -> Result<Vec<ContextItem>> {
        let entries = self.messages().await?;
        Ok(context_window(&entries, self.max_context_messages))
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.kv.get(AUTH_FLAG_KEY).await?.as_deref() == Some("true"))
    }

    pub async fn set_authenticated(&self, authenticated: bool) -> Result<()> {
        if authenticated {
            self.kv.set(AUTH_FLAG_KEY, "true").await
        } else {
            self.kv.remove(AUTH_FLAG_KEY).await
        }
    }
}

pub fn context_window(entries: &[LogEntry], max: usize) -> Vec<ContextItem> {
    let start = entries.len().saturating_sub(max);
    entries[start..].iter().map(ContextItem::from).collect()
}

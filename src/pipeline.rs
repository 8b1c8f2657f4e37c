//! Message pipeline: persist the user's message, ask the responder, persist
//! and render the reply (or a fixed fallback when the responder fails).

use crate::api::ChatResponder;
use crate::models::{LogEntry, SessionId, WebhookReply, WebhookRequest};
use crate::session::SessionStore;
use crate::view::ChatView;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const EMPTY_REPLY_TEXT: &str = "Sorry, I could not process that request.";
pub const FALLBACK_TEXT: &str = "I couldn't reach the automation workflow. Please try again soon.";
pub const FALLBACK_META: &str = "Error: webhook unavailable";
const CONTEXT_AWARE_META: &str = "Context-aware response";

/// The two entries produced by one accepted submission.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user: LogEntry,
    pub reply: LogEntry,
    /// False when the fallback reply was used.
    pub delivered: bool,
}

pub struct MessagePipeline {
    store: Arc<Mutex<SessionStore>>,
    responder: Arc<dyn ChatResponder>,
    view: Arc<dyn ChatView>,
    session_id: SessionId,
    context_enabled: bool,
    welcome_message: String,
}

impl MessagePipeline {
    pub fn new(
        store: Arc<Mutex<SessionStore>>,
        responder: Arc<dyn ChatResponder>,
        view: Arc<dyn ChatView>,
        session_id: SessionId,
        context_enabled: bool,
        welcome_message: impl Into<String>,
    ) -> Self {
        Self {
            store,
            responder,
            view,
            session_id,
            context_enabled,
            welcome_message: welcome_message.into(),
        }
    }

    /// Handles one submission from the composition field.
    ///
    /// Returns `Ok(None)` when the trimmed text is empty: nothing is logged and
    /// the responder is not called. Otherwise exactly one user entry and one
    /// bot entry are appended, and the typing indicator is cleared whatever the
    /// outcome. Errors only come from the store.
    pub async fn submit(&self, raw_text: &str) -> Result<Option<Exchange>> {
        let message = raw_text.trim();
        if message.is_empty() {
            log::debug!("Ignoring empty submission");
            return Ok(None);
        }

        log::info!("Submitting message for session {}", self.session_id);
        let user_entry = LogEntry::user(message);
        self.view.render_message(&user_entry);

        // Append and read the window under one lock so the window always ends
        // with this message.
        let context = {
            let store = self.store.lock().await;
            store.append(&user_entry).await?;
            if self.context_enabled {
                store.conversation_context().await?
            } else {
                Vec::new()
            }
        };

        self.view.clear_input();
        self.view.set_typing(true);

        let request = WebhookRequest::new(message, &self.session_id, context, self.context_enabled);
        let outcome = self.deliver(&request).await;

        self.view.set_typing(false);
        self.view.refresh_log();

        let (reply, delivered) = outcome?;
        Ok(Some(Exchange {
            user: user_entry,
            reply,
            delivered,
        }))
    }

    async fn deliver(&self, request: &WebhookRequest) -> Result<(LogEntry, bool)> {
        let (entry, delivered) = match self.responder.respond(request).await {
            Ok(reply) => (reply_entry(reply), true),
            Err(e) => {
                log::error!("Chat error: {}", e);
                (fallback_entry(), false)
            }
        };

        self.view.render_message(&entry);
        self.store.lock().await.append(&entry).await?;
        Ok((entry, delivered))
    }

    /// Destroys the persisted log and resets the transcript to the welcome entry.
    pub async fn clear_log(&self) -> Result<()> {
        self.store.lock().await.clear().await?;
        self.view.reset_transcript(&self.welcome_entry());
        self.view.refresh_log();
        Ok(())
    }

    /// Renders the welcome entry followed by the persisted log.
    pub async fn replay(&self) -> Result<usize> {
        let entries = self.store.lock().await.messages().await?;
        self.view.reset_transcript(&self.welcome_entry());
        for entry in &entries {
            self.view.render_message(entry);
        }
        Ok(entries.len())
    }

    pub fn welcome_entry(&self) -> LogEntry {
        LogEntry::bot(self.welcome_message.clone(), None)
    }
}

/// Builds the bot entry for a successful response.
pub fn reply_entry(reply: WebhookReply) -> LogEntry {
    let meta = compose_meta(reply.intent.as_deref(), reply.context_used.unwrap_or(false));
    let text = reply
        .reply
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| EMPTY_REPLY_TEXT.to_string());
    LogEntry::bot(text, meta)
}

pub fn fallback_entry() -> LogEntry {
    LogEntry::bot(FALLBACK_TEXT, Some(FALLBACK_META.to_string()))
}

/// `Intent: <intent>`, suffixed with ` • Context-aware response` when the
/// responder used the context window.
pub fn compose_meta(intent: Option<&str>, context_used: bool) -> Option<String> {
    let intent_meta = intent
        .filter(|i| !i.is_empty())
        .map(|i| format!("Intent: {}", i));
    match (intent_meta, context_used) {
        (Some(meta), true) => Some(format!("{} • {}", meta, CONTEXT_AWARE_META)),
        (Some(meta), false) => Some(meta),
        (None, true) => Some(CONTEXT_AWARE_META.to_string()),
        (None, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_with_intent_and_context() {
        assert_eq!(
            compose_meta(Some("book_genre"), true).as_deref(),
            Some("Intent: book_genre • Context-aware response")
        );
    }

    #[test]
    fn meta_variants() {
        assert_eq!(
            compose_meta(Some("order_status"), false).as_deref(),
            Some("Intent: order_status")
        );
        assert_eq!(
            compose_meta(None, true).as_deref(),
            Some("Context-aware response")
        );
        assert_eq!(compose_meta(Some(""), false), None);
        assert_eq!(compose_meta(None, false), None);
    }

    #[test]
    fn reply_text_is_verbatim() {
        let entry = reply_entry(WebhookReply {
            reply: Some("Dune is great\n  really".to_string()),
            intent: None,
            context_used: None,
        });
        assert_eq!(entry.text, "Dune is great\n  really");
        assert_eq!(entry.meta, None);
    }

    #[test]
    fn missing_or_empty_reply_uses_fixed_text() {
        assert_eq!(reply_entry(WebhookReply::default()).text, EMPTY_REPLY_TEXT);
        let entry = reply_entry(WebhookReply {
            reply: Some(String::new()),
            intent: Some("fallback".to_string()),
            context_used: Some(false),
        });
        assert_eq!(entry.text, EMPTY_REPLY_TEXT);
        assert_eq!(entry.meta.as_deref(), Some("Intent: fallback"));
    }

    #[test]
    fn fallback_entry_values() {
        let entry = fallback_entry();
        assert_eq!(entry.text, FALLBACK_TEXT);
        assert_eq!(entry.meta.as_deref(), Some(FALLBACK_META));
    }
}

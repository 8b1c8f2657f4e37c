use crate::api::{ChatResponder, MockResponder, WebhookResponder};
use crate::config::ChatConfig;
use crate::models::SessionId;
use crate::pipeline::MessagePipeline;
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::view::ChatView;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

// Core application state shared by the commands
#[derive(Clone)]
pub struct AppState {
    // The mutex makes the message log's read-modify-write single-writer.
    pub store: Arc<Mutex<SessionStore>>,
    pub responder: Arc<dyn ChatResponder>,
    pub config: Arc<ChatConfig>,
    pub session_id: SessionId,
}

impl AppState {
    /// Builds the state over `kv`, picking the mock or webhook responder from
    /// the configuration.
    pub async fn new(config: ChatConfig, kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        let responder: Arc<dyn ChatResponder> = if config.enable_mock_responses {
            log::info!("Using mock responses");
            Arc::new(MockResponder::new())
        } else {
            Arc::new(WebhookResponder::new(
                config.webhook_url.clone(),
                config.request_timeout(),
            )?)
        };
        Self::with_responder(config, kv, responder).await
    }

    pub async fn with_responder(
        config: ChatConfig,
        kv: Arc<dyn KeyValueStore>,
        responder: Arc<dyn ChatResponder>,
    ) -> Result<Self> {
        let store = SessionStore::new(kv, config.max_context_messages);
        let session_id = store.get_or_create_session_id().await?;

        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            responder,
            config: Arc::new(config),
            session_id,
        })
    }

    pub fn pipeline(&self, view: Arc<dyn ChatView>) -> MessagePipeline {
        MessagePipeline::new(
            self.store.clone(),
            self.responder.clone(),
            view,
            self.session_id.clone(),
            self.config.enable_context_memory,
            self.config.welcome_message.clone(),
        )
    }
}

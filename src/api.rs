use crate::error::TransportFailure;
use crate::models::{Role, WebhookReply, WebhookRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

// Trait defining the interface for whatever answers chat messages
#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn respond(&self, request: &WebhookRequest) -> Result<WebhookReply, TransportFailure>;
}

// --- Webhook responder ---

pub struct WebhookResponder {
    client: Client,
    url: String,
}

impl WebhookResponder {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ChatResponder for WebhookResponder {
    async fn respond(&self, request: &WebhookRequest) -> Result<WebhookReply, TransportFailure> {
        log::info!(
            "Posting message to webhook {} ({} context items)",
            self.url,
            request.context.len()
        );

        let response = self.client.post(&self.url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            log::debug!("Webhook answered with status {}", status);
            return Err(TransportFailure::Status(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str::<WebhookReply>(&body)
            .map_err(|e| TransportFailure::Body(e.to_string()))
    }
}

// --- Local mock responder ---

/// Keyword-matching responder used when mock responses are enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockResponder;

impl MockResponder {
    pub fn new() -> Self {
        Self
    }

    pub fn reply_for(&self, request: &WebhookRequest) -> WebhookReply {
        let normalized = request.message.to_lowercase();

        if normalized.contains("another") || normalized.contains("more") {
            let last_bot = request.context.iter().rev().find(|c| c.role == Role::Bot);
            if last_bot.is_some_and(|c| c.message.contains("fiction")) {
                return reply(
                    "Here are more fiction books: To Kill a Mockingbird, The Great Gatsby, and Animal Farm.",
                    "book_genre_followup",
                    Some(true),
                );
            }
        }

        if normalized.contains("order") {
            return reply(
                "Your order #1003 has been shipped and will arrive tomorrow.",
                "order_status",
                None,
            );
        }
        if normalized.contains("fiction") {
            return reply(
                "Here are some popular fiction books: The Alchemist, Dune, and 1984.",
                "book_genre",
                None,
            );
        }
        reply(
            "Thanks for your message! Our team will respond shortly.",
            "fallback",
            None,
        )
    }
}

fn reply(text: &str, intent: &str, context_used: Option<bool>) -> WebhookReply {
    WebhookReply {
        reply: Some(text.to_string()),
        intent: Some(intent.to_string()),
        context_used,
    }
}

#[async_trait]
impl ChatResponder for MockResponder {
    async fn respond(&self, request: &WebhookRequest) -> Result<WebhookReply, TransportFailure> {
        log::debug!("Answering with mock responder");
        Ok(self.reply_for(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContextItem, SessionId};
    use chrono::Utc;

    fn request(message: &str, context: Vec<ContextItem>) -> WebhookRequest {
        WebhookRequest::new(message, &SessionId::from("s".to_string()), context, true)
    }

    fn item(role: Role, message: &str) -> ContextItem {
        ContextItem {
            role,
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn mock_order_and_genre_rules() {
        let mock = MockResponder::new();
        let r = mock.reply_for(&request("Where is my ORDER?", vec![]));
        assert_eq!(r.intent.as_deref(), Some("order_status"));

        let r = mock.reply_for(&request("any fiction picks", vec![]));
        assert_eq!(r.intent.as_deref(), Some("book_genre"));
        assert_eq!(r.context_used, None);

        let r = mock.reply_for(&request("hello", vec![]));
        assert_eq!(r.intent.as_deref(), Some("fallback"));
    }

    #[test]
    fn mock_follow_up_uses_last_bot_context() {
        let mock = MockResponder::new();
        let context = vec![
            item(Role::User, "fiction please"),
            item(Role::Bot, "Here are some popular fiction books: Dune"),
            item(Role::User, "show me more"),
        ];
        let r = mock.reply_for(&request("show me more", context));
        assert_eq!(r.intent.as_deref(), Some("book_genre_followup"));
        assert_eq!(r.context_used, Some(true));
    }

    #[test]
    fn mock_follow_up_without_fiction_context_falls_through() {
        let mock = MockResponder::new();
        let context = vec![item(Role::Bot, "Your order has shipped")];
        let r = mock.reply_for(&request("tell me more", context));
        assert_eq!(r.intent.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn webhook_reports_status_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(502)
            .create_async()
            .await;

        let responder = WebhookResponder::new(format!("{}/hook", server.url()), None).unwrap();
        let result = responder.respond(&request("hi", vec![])).await;
        assert!(matches!(result, Err(TransportFailure::Status(502))));
    }

    #[tokio::test]
    async fn webhook_reports_undecodable_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let responder = WebhookResponder::new(format!("{}/hook", server.url()), None).unwrap();
        let result = responder.respond(&request("hi", vec![])).await;
        assert!(matches!(result, Err(TransportFailure::Body(_))));
    }
}

// Commands exposed to the front end. Errors are logged here and returned as
// user-readable strings.

use crate::auth;
use crate::catalog::{self, Book, Catalog, Order};
use crate::config;
use crate::dashboard::{self, Dashboard};
use crate::models::LogEntry;
use crate::pipeline::{Exchange, MessagePipeline};
use crate::state::AppState;
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize, Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub context_memory_enabled: bool,
    pub max_context_messages: usize,
    pub authenticated: bool,
}

// Send a chat message through the pipeline
pub async fn send_message(
    pipeline: &MessagePipeline,
    content: &str,
) -> Result<Option<Exchange>, String> {
    match pipeline.submit(content).await {
        Ok(exchange) => Ok(exchange),
        Err(e) => {
            log::error!("Failed to process message: {:?}", e);
            Err(format!("Failed to save message: {}", e))
        }
    }
}

// Clear the transcript and the persisted log
pub async fn clear_chat(pipeline: &MessagePipeline) -> Result<(), String> {
    pipeline.clear_log().await.map_err(|e| {
        log::error!("Failed to clear chat: {:?}", e);
        format!("Failed to clear chat: {}", e)
    })
}

pub async fn session_info(state: &AppState) -> Result<SessionInfo, String> {
    let authenticated = is_authenticated(state).await?;
    Ok(SessionInfo {
        session_id: state.session_id.to_string(),
        context_memory_enabled: state.config.enable_context_memory,
        max_context_messages: state.config.max_context_messages,
        authenticated,
    })
}

// --- Admin commands ---

pub async fn login(state: &AppState, username: &str, password: &str) -> Result<(), String> {
    log::info!("Admin login requested for user: {}", username);
    match auth::verify_credentials(&state.config.admin_credentials, username, password) {
        Ok(true) => {}
        Ok(false) => return Err("Invalid username or password".to_string()),
        Err(e) => {
            log::error!("Login failed: {:?}", e);
            return Err(format!("Login failed: {}", e));
        }
    }

    let store = state.store.lock().await;
    auth::grant(&store, username).await.map_err(|e| {
        log::error!("Login failed: {:?}", e);
        format!("Login failed: {}", e)
    })
}

pub async fn logout(state: &AppState) -> Result<(), String> {
    let store = state.store.lock().await;
    auth::logout(&store).await.map_err(|e| {
        log::error!("Logout failed: {:?}", e);
        format!("Logout failed: {}", e)
    })
}

async fn is_authenticated(state: &AppState) -> Result<bool, String> {
    let store = state.store.lock().await;
    store
        .is_authenticated()
        .await
        .map_err(|e| format!("Failed to read auth state: {}", e))
}

async fn require_admin(state: &AppState) -> Result<(), String> {
    if is_authenticated(state).await? {
        Ok(())
    } else {
        log::warn!("Admin command refused: not logged in");
        Err("Admin login required".to_string())
    }
}

// Message log, newest first
pub async fn list_logs(state: &AppState) -> Result<Vec<LogEntry>, String> {
    require_admin(state).await?;
    let store = state.store.lock().await;
    let entries = store.messages().await.map_err(|e| {
        log::error!("Failed to read message log: {:?}", e);
        format!("Failed to load logs: {}", e)
    })?;
    Ok(dashboard::log_view(&entries).into_iter().cloned().collect())
}

pub async fn clear_logs(state: &AppState) -> Result<(), String> {
    require_admin(state).await?;
    let store = state.store.lock().await;
    store.clear().await.map_err(|e| {
        log::error!("Failed to clear message log: {:?}", e);
        format!("Failed to clear logs: {}", e)
    })
}

async fn load_catalog(state: &AppState) -> Catalog {
    let datasets = &state.config.datasets;
    Catalog::load(&datasets.books, &datasets.orders).await
}

pub async fn load_dashboard(state: &AppState) -> Result<Dashboard, String> {
    require_admin(state).await?;
    let catalog = load_catalog(state).await;
    let entries = {
        let store = state.store.lock().await;
        store
            .messages()
            .await
            .map_err(|e| format!("Failed to load logs: {}", e))?
    };
    Ok(Dashboard::build(&catalog, &entries, Utc::now()))
}

pub async fn search_books(state: &AppState, query: &str) -> Result<Vec<Book>, String> {
    require_admin(state).await?;
    let catalog = load_catalog(state).await;
    Ok(catalog::search_books(&catalog.books, query)
        .into_iter()
        .cloned()
        .collect())
}

pub async fn search_orders(state: &AppState, query: &str) -> Result<Vec<Order>, String> {
    require_admin(state).await?;
    let catalog = load_catalog(state).await;
    Ok(catalog::search_orders(&catalog.orders, query)
        .into_iter()
        .cloned()
        .collect())
}

pub fn set_admin_password(state: &AppState, password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("Password cannot be empty.".to_string());
    }
    let username = &state.config.admin_credentials.username;
    config::set_admin_password_in_keyring(username, password).map_err(|e| {
        log::error!("Failed to store admin password: {:?}", e);
        format!("Failed to store admin password: {}", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatConfig;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    async fn state(config: ChatConfig) -> AppState {
        AppState::new(config, Arc::new(MemoryStore::new())).await.unwrap()
    }

    fn mock_config() -> ChatConfig {
        ChatConfig {
            enable_mock_responses: true,
            ..ChatConfig::default()
        }
    }

    #[tokio::test]
    async fn admin_commands_require_login() {
        let state = state(mock_config()).await;
        assert_eq!(list_logs(&state).await.unwrap_err(), "Admin login required");
        assert!(load_dashboard(&state).await.is_err());
        assert!(clear_logs(&state).await.is_err());

        assert_eq!(
            login(&state, "admin", "wrong").await.unwrap_err(),
            "Invalid username or password"
        );
        login(&state, "admin", "admin123").await.unwrap();
        assert!(list_logs(&state).await.unwrap().is_empty());
        assert!(session_info(&state).await.unwrap().authenticated);

        logout(&state).await.unwrap();
        assert!(list_logs(&state).await.is_err());
    }

    #[tokio::test]
    async fn credential_check_does_not_wait_for_store() {
        let state = state(mock_config()).await;
        let guard = state.store.lock().await;

        let rejected = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            login(&state, "admin", "wrong"),
        )
        .await
        .expect("rejected login should not need the store lock");
        assert_eq!(rejected.unwrap_err(), "Invalid username or password");

        drop(guard);
        login(&state, "admin", "admin123").await.unwrap();
        assert!(session_info(&state).await.unwrap().authenticated);
    }

    #[tokio::test]
    async fn dashboard_reads_configured_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let books = dir.path().join("books.csv");
        let orders = dir.path().join("orders.csv");
        std::fs::write(&books, "id,title,author,genre\n1,Dune,Frank Herbert,Science Fiction\n")
            .unwrap();
        std::fs::write(&orders, "order_id,status,book_id\n1001,Shipped,1\n").unwrap();

        let mut config = mock_config();
        config.datasets.books = books;
        config.datasets.orders = orders;
        let state = state(config).await;
        login(&state, "admin", "admin123").await.unwrap();

        let dashboard = load_dashboard(&state).await.unwrap();
        assert_eq!(dashboard.summary.total_books, 1);
        assert_eq!(dashboard.summary.total_orders, 1);
        assert_eq!(dashboard.top_books[0].order_count, 1);

        assert_eq!(search_books(&state, "dune").await.unwrap().len(), 1);
        assert_eq!(search_orders(&state, "shipped").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn logs_are_listed_newest_first() {
        let state = state(mock_config()).await;
        let (view, _rx) = crate::view::ChannelView::new();
        let pipeline = state.pipeline(Arc::new(view));
        send_message(&pipeline, "any fiction?").await.unwrap();

        login(&state, "admin", "admin123").await.unwrap();
        let logs = list_logs(&state).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].text, "any fiction?");

        clear_logs(&state).await.unwrap();
        assert!(list_logs(&state).await.unwrap().is_empty());
    }
}

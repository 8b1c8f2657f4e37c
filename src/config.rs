use crate::error::AdminError;
use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const KEYRING_SERVICE: &str = "bookchat_admin_password";
const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "bookchat";

pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/bookstore-chat";
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hi! I'm your bookstore assistant. Ask me about books, genres, or the status of your order.";

// Application settings, stored as camelCase JSON.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatConfig {
    pub webhook_url: String,
    pub enable_mock_responses: bool,
    pub enable_context_memory: bool,
    pub max_context_messages: usize,
    // No timeout unless configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    pub welcome_message: String,
    pub admin_credentials: AdminCredentials,
    pub datasets: DatasetPaths,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            enable_mock_responses: false,
            enable_context_memory: true,
            max_context_messages: 5,
            request_timeout_secs: None,
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            admin_credentials: AdminCredentials::default(),
            datasets: DatasetPaths::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminCredentials {
    pub username: String,
    // Literal password, used when `password_ref` is not set
    pub password: String,
    // 'keyring' or 'env:MY_VAR'
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_ref: Option<String>,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            password_ref: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DatasetPaths {
    pub books: PathBuf,
    pub orders: PathBuf,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            books: PathBuf::from("datasets/books.csv"),
            orders: PathBuf::from("datasets/orders.csv"),
        }
    }
}

impl ChatConfig {
    /// Loads the configuration from `path`, or from the default location when
    /// no path is given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(ref p) => Self::load_file(p)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Reads a config file. A missing file yields the defaults.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        log::info!("Loading configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Invalid configuration JSON")
    }

    /// Applies `BOOKCHAT_*` overrides. The lookup is injected so tests don't
    /// have to touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BOOKCHAT_WEBHOOK_URL").filter(|u| !u.trim().is_empty()) {
            log::debug!("Webhook URL overridden from environment");
            self.webhook_url = url;
        }
        if let Some(flag) = lookup("BOOKCHAT_MOCK_RESPONSES") {
            self.enable_mock_responses = parse_flag(&flag);
        }
        if let Some(flag) = lookup("BOOKCHAT_CONTEXT_MEMORY") {
            self.enable_context_memory = parse_flag(&flag);
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DIR_NAME).join("bookchat.sqlite"))
}

// --- Admin password retrieval ---

/// Resolves the admin password. `password_ref` takes precedence over the
/// literal password: `env:NAME` reads an environment variable, `keyring` reads
/// the OS keyring.
pub fn get_admin_password(credentials: &AdminCredentials) -> Result<String, AdminError> {
    match credentials.password_ref.as_deref() {
        Some(ref_str) if ref_str.starts_with("env:") => {
            let env_var_name = ref_str.trim_start_matches("env:");
            log::debug!("Retrieving admin password from environment variable: {}", env_var_name);
            std::env::var(env_var_name).map_err(|_| AdminError::MissingEnv(env_var_name.to_string()))
        }
        Some("keyring") => {
            let entry = Entry::new(KEYRING_SERVICE, &credentials.username)?;
            log::debug!("Retrieving admin password from keyring for user: {}", credentials.username);
            Ok(entry.get_password()?)
        }
        Some(other) => Err(AdminError::UnsupportedRef(other.to_string())),
        None => Ok(credentials.password.clone()),
    }
}

/// Stores the admin password in the OS keyring.
pub fn set_admin_password_in_keyring(username: &str, password: &str) -> Result<(), AdminError> {
    let entry = Entry::new(KEYRING_SERVICE, username)?;
    log::info!("Setting admin password in keyring for user: {}", username);
    entry.set_password(password)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_widget_constants() {
        let config = ChatConfig::default();
        assert_eq!(config.webhook_url, DEFAULT_WEBHOOK_URL);
        assert!(!config.enable_mock_responses);
        assert!(config.enable_context_memory);
        assert_eq!(config.max_context_messages, 5);
        assert_eq!(config.admin_credentials.username, "admin");
        assert_eq!(config.admin_credentials.password, "admin123");
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            ChatConfig::from_json(r#"{"enableMockResponses": true, "maxContextMessages": 3}"#)
                .unwrap();
        assert!(config.enable_mock_responses);
        assert_eq!(config.max_context_messages, 3);
        assert_eq!(config.webhook_url, DEFAULT_WEBHOOK_URL);
        assert_eq!(config.datasets.books, PathBuf::from("datasets/books.csv"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ChatConfig::from_json("{not json").is_err());
    }

    #[test]
    fn load_file_reads_file_and_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"webhookUrl": "http://example.test/hook"}"#).unwrap();
        let config = ChatConfig::load_file(&path).unwrap();
        assert_eq!(config.webhook_url, "http://example.test/hook");

        let missing = dir.path().join("absent.json");
        let config = ChatConfig::load_file(&missing).unwrap();
        assert_eq!(config.max_context_messages, 5);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BOOKCHAT_WEBHOOK_URL", "http://override.test/hook"),
            ("BOOKCHAT_MOCK_RESPONSES", "1"),
            ("BOOKCHAT_CONTEXT_MEMORY", "false"),
        ]);
        let mut config = ChatConfig::default();
        config.apply_env_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.webhook_url, "http://override.test/hook");
        assert!(config.enable_mock_responses);
        assert!(!config.enable_context_memory);
    }

    #[test]
    fn literal_password_is_used_without_ref() {
        let credentials = AdminCredentials::default();
        assert_eq!(get_admin_password(&credentials).unwrap(), "admin123");
    }

    #[test]
    fn env_password_ref() {
        std::env::set_var("BOOKCHAT_TEST_ADMIN_PASSWORD", "s3cret");
        let credentials = AdminCredentials {
            password_ref: Some("env:BOOKCHAT_TEST_ADMIN_PASSWORD".to_string()),
            ..AdminCredentials::default()
        };
        assert_eq!(get_admin_password(&credentials).unwrap(), "s3cret");

        let missing = AdminCredentials {
            password_ref: Some("env:BOOKCHAT_TEST_UNSET_VARIABLE".to_string()),
            ..AdminCredentials::default()
        };
        assert!(matches!(get_admin_password(&missing), Err(AdminError::MissingEnv(_))));
    }

    #[test]
    fn unknown_password_ref_is_rejected() {
        let credentials = AdminCredentials {
            password_ref: Some("vault".to_string()),
            ..AdminCredentials::default()
        };
        assert!(matches!(
            get_admin_password(&credentials),
            Err(AdminError::UnsupportedRef(_))
        ));
    }
}

use crate::config::{get_admin_password, AdminCredentials};
use crate::session::SessionStore;
use anyhow::Result;

/// Checks the pair against the configured admin credentials. Resolving the
/// password may hit the OS keyring, so call this before taking the store lock.
pub fn verify_credentials(
    credentials: &AdminCredentials,
    username: &str,
    password: &str,
) -> Result<bool> {
    let expected_password = get_admin_password(credentials)?;
    if username != credentials.username || password != expected_password {
        log::warn!("Rejected admin login for user '{}'", username);
        return Ok(false);
    }
    Ok(true)
}

/// Persists the auth flag for a user whose credentials were verified.
pub async fn grant(store: &SessionStore, username: &str) -> Result<()> {
    store.set_authenticated(true).await?;
    log::info!("Admin '{}' logged in", username);
    Ok(())
}

pub async fn logout(store: &SessionStore) -> Result<()> {
    store.set_authenticated(false).await?;
    log::info!("Admin logged out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()), 5)
    }

    #[tokio::test]
    async fn correct_pair_sets_flag() {
        let store = store();
        let creds = AdminCredentials::default();
        assert!(verify_credentials(&creds, "admin", "admin123").unwrap());
        grant(&store, "admin").await.unwrap();
        assert!(store.is_authenticated().await.unwrap());

        logout(&store).await.unwrap();
        assert!(!store.is_authenticated().await.unwrap());
    }

    #[test]
    fn wrong_pair_is_rejected() {
        let creds = AdminCredentials::default();
        assert!(!verify_credentials(&creds, "admin", "nope").unwrap());
        assert!(!verify_credentials(&creds, "Admin", "admin123").unwrap());
    }

    #[test]
    fn unsupported_reference_is_an_error() {
        let creds = AdminCredentials {
            password_ref: Some("vault".to_string()),
            ..AdminCredentials::default()
        };
        assert!(verify_credentials(&creds, "admin", "admin123").is_err());
    }
}

//! Persisted Token Pair
//!
//! Thin layer over the host [`SessionStore`] that keeps the access and
//! refresh tokens under two well-known keys shared by every context.
//!
//! ## Guarantees
//!
//! - Token values are never logged
//! - A pair is written as a unit: if the second write fails, the first is
//!   rolled back so a context never observes a mixed pair
//! - A pair with either half missing reads as no session
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{SessionTokens, TokenStore};
//! use bridge_traits::storage::{CookieOptions, SessionStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//! # async fn example(store: Arc<dyn SessionStore>) -> core_auth::Result<()> {
//! let tokens = TokenStore::new(store, CookieOptions::new(Duration::from_secs(3600)));
//!
//! tokens.store(&SessionTokens::new("access", "refresh")).await?;
//! assert!(tokens.load().await?.is_some());
//!
//! tokens.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::SessionTokens;
use bridge_traits::storage::{CookieOptions, SessionStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "auth.token";
/// Key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "auth.refreshToken";

/// Storage for the session's token pair.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn SessionStore>,
    options: CookieOptions,
}

impl TokenStore {
    pub fn new(store: Arc<dyn SessionStore>, options: CookieOptions) -> Self {
        debug!(path = %options.path, "Initializing TokenStore");
        Self { store, options }
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    /// Persist both tokens, overwriting any previous pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionStore`] if either write fails. When the
    /// refresh write fails, the access token is restored to its previous
    /// value (or removed).
    pub async fn store(&self, tokens: &SessionTokens) -> Result<()> {
        let previous_access = self.store.get(ACCESS_TOKEN_KEY).await.map_err(storage_error)?;

        self.store
            .set(ACCESS_TOKEN_KEY, &tokens.access_token, &self.options)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist access token");
                storage_error(e)
            })?;

        if let Err(e) = self
            .store
            .set(REFRESH_TOKEN_KEY, &tokens.refresh_token, &self.options)
            .await
        {
            warn!(error = %e, "Failed to persist refresh token, rolling back access token");
            let rollback = match previous_access {
                Some(previous) => {
                    self.store
                        .set(ACCESS_TOKEN_KEY, &previous, &self.options)
                        .await
                }
                None => self.store.delete(ACCESS_TOKEN_KEY).await,
            };
            if let Err(rollback_error) = rollback {
                warn!(error = %rollback_error, "Access token rollback failed");
            }
            return Err(storage_error(e));
        }

        info!("Session tokens stored");
        Ok(())
    }

    /// Load the persisted pair. Returns `None` unless both halves exist.
    pub async fn load(&self) -> Result<Option<SessionTokens>> {
        let access = self.access_token().await?;
        let refresh = self.refresh_token().await?;

        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(SessionTokens::new(access, refresh))),
            (None, None) => Ok(None),
            _ => {
                debug!("Incomplete token pair in session store");
                Ok(None)
            }
        }
    }

    pub async fn access_token(&self) -> Result<Option<String>> {
        self.store.get(ACCESS_TOKEN_KEY).await.map_err(storage_error)
    }

    pub async fn refresh_token(&self) -> Result<Option<String>> {
        self.store.get(REFRESH_TOKEN_KEY).await.map_err(storage_error)
    }

    /// Remove both tokens. Returns whether anything was stored.
    ///
    /// Both deletes are attempted even if the first fails; the first error
    /// is returned.
    pub async fn clear(&self) -> Result<bool> {
        let existed = matches!(self.store.contains(ACCESS_TOKEN_KEY).await, Ok(true))
            || matches!(self.store.contains(REFRESH_TOKEN_KEY).await, Ok(true));

        let access = self.store.delete(ACCESS_TOKEN_KEY).await;
        let refresh = self.store.delete(REFRESH_TOKEN_KEY).await;

        access.and(refresh).map_err(|e| {
            warn!(error = %e, "Failed to clear session tokens");
            storage_error(e)
        })?;

        if existed {
            info!("Session tokens cleared");
        }
        Ok(existed)
    }
}

fn storage_error(error: bridge_traits::BridgeError) -> AuthError {
    AuthError::SessionStore(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::BridgeError;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Mock implementation of SessionStore that can refuse writes to one key
    #[derive(Clone, Default)]
    struct MockSessionStore {
        storage: Arc<Mutex<HashMap<String, String>>>,
        fail_writes_to: Option<&'static str>,
    }

    impl MockSessionStore {
        fn failing(key: &'static str) -> Self {
            Self {
                fail_writes_to: Some(key),
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl SessionStore for MockSessionStore {
        async fn get(&self, key: &str) -> bridge_traits::error::Result<Option<String>> {
            Ok(self.storage.lock().await.get(key).cloned())
        }

        async fn set(
            &self,
            key: &str,
            value: &str,
            _options: &CookieOptions,
        ) -> bridge_traits::error::Result<()> {
            if self.fail_writes_to == Some(key) {
                return Err(BridgeError::StorageError("quota exceeded".to_string()));
            }
            self.storage
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> bridge_traits::error::Result<()> {
            self.storage.lock().await.remove(key);
            Ok(())
        }
    }

    fn options() -> CookieOptions {
        CookieOptions::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_store_and_load_pair() {
        let store = Arc::new(MockSessionStore::default());
        let tokens = TokenStore::new(store.clone(), options());

        tokens
            .store(&SessionTokens::new("a1", "r1"))
            .await
            .unwrap();

        let loaded = tokens.load().await.unwrap().unwrap();
        assert_eq!(loaded, SessionTokens::new("a1", "r1"));

        let raw = store.storage.lock().await;
        assert_eq!(raw.get(ACCESS_TOKEN_KEY).map(String::as_str), Some("a1"));
        assert_eq!(raw.get(REFRESH_TOKEN_KEY).map(String::as_str), Some("r1"));
    }

    #[tokio::test]
    async fn test_failed_refresh_write_removes_new_access_token() {
        let store = Arc::new(MockSessionStore::failing(REFRESH_TOKEN_KEY));
        let tokens = TokenStore::new(store.clone(), options());

        let result = tokens.store(&SessionTokens::new("a1", "r1")).await;

        assert!(matches!(result, Err(AuthError::SessionStore(_))));
        assert!(store.storage.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_write_restores_previous_access_token() {
        let store = Arc::new(MockSessionStore::failing(REFRESH_TOKEN_KEY));
        store
            .storage
            .lock()
            .await
            .insert(ACCESS_TOKEN_KEY.to_string(), "a0".to_string());
        let tokens = TokenStore::new(store.clone(), options());

        assert!(tokens.store(&SessionTokens::new("a1", "r1")).await.is_err());
        assert_eq!(tokens.access_token().await.unwrap().as_deref(), Some("a0"));
    }

    #[tokio::test]
    async fn test_half_pair_loads_as_none() {
        let store = Arc::new(MockSessionStore::default());
        store
            .storage
            .lock()
            .await
            .insert(ACCESS_TOKEN_KEY.to_string(), "a1".to_string());
        let tokens = TokenStore::new(store, options());

        assert!(tokens.load().await.unwrap().is_none());
        assert_eq!(tokens.access_token().await.unwrap().as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_clear_reports_existing_session() {
        let store = Arc::new(MockSessionStore::default());
        let tokens = TokenStore::new(store.clone(), options());

        assert!(!tokens.clear().await.unwrap());

        tokens
            .store(&SessionTokens::new("a1", "r1"))
            .await
            .unwrap();
        assert!(tokens.clear().await.unwrap());
        assert!(!tokens.clear().await.unwrap());
        assert!(store.storage.lock().await.is_empty());
    }
}

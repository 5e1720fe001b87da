//! Session Storage Abstraction
//!
//! A persisted key/value store with per-entry expiry, shared by every context
//! of the same application instance (cookies on the web, a local database on
//! desktop).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Options applied when writing an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieOptions {
    /// Lifetime of the entry; `None` keeps it until explicitly deleted.
    pub max_age: Option<Duration>,
    /// Visibility scope of the entry. `/` means global.
    pub path: String,
}

impl CookieOptions {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
            path: "/".to_string(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            path: "/".to_string(),
        }
    }
}

/// Session store trait
///
/// Only three operations are consumed by the core. Expired entries must be
/// reported as absent by `get`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{CookieOptions, SessionStore};
/// use std::time::Duration;
///
/// async fn remember(store: &dyn SessionStore, token: &str) -> Result<()> {
///     let options = CookieOptions::new(Duration::from_secs(60 * 60 * 24 * 30));
///     store.set("auth.token", token, &options).await
/// }
/// ```
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value. Returns `None` when the key is missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any existing entry.
    async fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<()>;

    /// Delete a value. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a live value exists.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_options_default_scope_is_global() {
        let options = CookieOptions::new(Duration::from_secs(60));
        assert_eq!(options.path, "/");
        assert_eq!(options.max_age, Some(Duration::from_secs(60)));

        let scoped = options.with_path("/admin");
        assert_eq!(scoped.path, "/admin");
        assert_eq!(CookieOptions::default().max_age, None);
    }
}

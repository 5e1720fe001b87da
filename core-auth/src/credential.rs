use std::sync::Arc;
use tokio::sync::RwLock;

/// Access token attached to outgoing requests.
///
/// Read at dispatch time, so a request built before a refresh still goes out
/// with whatever token is current when it is sent. Clones share state.
#[derive(Clone, Default)]
pub struct CredentialProvider {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// Returns whether a token was present.
    pub async fn clear(&self) -> bool {
        self.token.write().await.take().is_some()
    }

    pub async fn is_set(&self) -> bool {
        self.token.read().await.is_some()
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_token() {
        let provider = CredentialProvider::new();
        let dispatcher = provider.clone();

        assert!(!dispatcher.is_set().await);
        provider.set("t1").await;
        assert_eq!(dispatcher.current().await.as_deref(), Some("t1"));

        assert!(dispatcher.clear().await);
        assert!(!provider.clear().await);
        assert_eq!(provider.current().await, None);
    }
}

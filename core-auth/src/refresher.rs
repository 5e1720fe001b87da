use crate::broadcaster::SessionBroadcaster;
use crate::context::SessionContext;
use crate::coordinator::RefreshBackend;
use crate::error::{AuthError, Result};
use crate::types::{RefreshRequest, RefreshResponse};
use async_trait::async_trait;
use bridge_traits::{HttpRequest, RetryPolicy};
use core_runtime::events::SignOutReason;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{error, info, instrument};

/// Refresh call against the auth server, plus sign-out on failure.
pub(crate) struct TokenRefresher {
    context: Arc<SessionContext>,
    broadcaster: Arc<SessionBroadcaster>,
}

impl TokenRefresher {
    pub(crate) fn new(context: Arc<SessionContext>, broadcaster: Arc<SessionBroadcaster>) -> Self {
        Self {
            context,
            broadcaster,
        }
    }

    async fn exchange(&self, refresh_token: String) -> Result<String> {
        let config = &self.context.config;
        let url = config.endpoint_url(&config.endpoints.refresh)?;
        let request = HttpRequest::post(url.as_str())
            .json(&RefreshRequest { refresh_token })?
            .timeout(config.refresh_timeout);

        let response = config
            .http_client
            .execute_with_retry(request, RetryPolicy::single_attempt())
            .await?;
        if !response.is_success() {
            return Err(AuthError::RefreshFailed(format!(
                "refresh endpoint returned {}",
                response.status
            )));
        }

        let tokens = response
            .json::<RefreshResponse>()
            .map_err(|e| AuthError::RefreshFailed(format!("malformed refresh response: {}", e)))?
            .into_tokens();

        self.context.token_store.store(&tokens).await?;
        self.context.credential.set(tokens.access_token.clone()).await;
        Ok(tokens.access_token)
    }
}

#[async_trait]
impl RefreshBackend for TokenRefresher {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<String> {
        let refresh_token = self
            .context
            .token_store
            .refresh_token()
            .await?
            .ok_or_else(|| AuthError::RefreshFailed("no refresh token stored".to_string()))?;

        let limit = self.context.config.refresh_timeout;
        let token = timeout(limit, self.exchange(refresh_token))
            .await
            .map_err(|_| AuthError::OperationTimeout {
                operation: "token refresh".to_string(),
            })??;

        info!("Access token refreshed");
        Ok(token)
    }

    async fn refresh_failed(&self, cause: &AuthError) -> AuthError {
        if let Err(e) = self
            .broadcaster
            .post_signed_out(SignOutReason::RefreshFailed)
            .await
        {
            error!(error = %e, "Sign-out after failed refresh did not complete");
        }

        if self.context.config.is_interactive() {
            match cause {
                AuthError::RefreshFailed(_) => cause.clone(),
                other => AuthError::RefreshFailed(other.to_string()),
            }
        } else {
            AuthError::AuthTokenRequired
        }
    }
}

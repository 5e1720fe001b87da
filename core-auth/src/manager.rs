//! # Session Manager
//!
//! Entry point for host applications: sign-in, sign-out, session restore
//! on startup, and read access to the signed-in user.
//!
//! ## Overview
//!
//! `SessionManager` wires the token store, the refresh coordinator and the
//! cross-context broadcaster together, and hands out an [`ApiClient`] whose
//! requests refresh the access token transparently.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::SessionManager;
//! use core_runtime::{config::AuthConfig, events::EventBus};
//! # async fn example(config: AuthConfig) -> core_auth::Result<()> {
//! let manager = SessionManager::new(config, EventBus::new(100));
//!
//! // Restore a persisted session, if any
//! if manager.initialize().await?.is_none() {
//!     manager.sign_in("ada@example.com", "correct horse").await?;
//! }
//!
//! let reports: serde_json::Value = manager.client().get_json("reports").await?;
//!
//! manager.sign_out().await?;
//! # Ok(())
//! # }
//! ```

use crate::broadcaster::SessionBroadcaster;
use crate::client::ApiClient;
use crate::context::SessionContext;
use crate::coordinator::RefreshCoordinator;
use crate::error::{AuthError, Result};
use crate::refresher::TokenRefresher;
use crate::types::{AuthenticatedUser, ErrorBody, SignInRequest, SignInResponse};
use bridge_traits::{HttpRequest, RetryPolicy};
use core_runtime::config::AuthConfig;
use core_runtime::events::{AuthEvent, EventBus, EventStream, SignOutReason};
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Session facade for one context.
pub struct SessionManager {
    context: Arc<SessionContext>,
    broadcaster: Arc<SessionBroadcaster>,
    client: ApiClient,
    /// Serializes sign-in attempts
    sign_in_lock: Mutex<()>,
}

impl SessionManager {
    /// Wire a session for one context.
    ///
    /// Nothing is read or subscribed until [`initialize`](Self::initialize)
    /// or [`sign_in`](Self::sign_in) runs.
    pub fn new(config: AuthConfig, event_bus: EventBus) -> Self {
        let context = Arc::new(SessionContext::new(config, event_bus.clone()));
        let broadcaster = Arc::new(SessionBroadcaster::new(context.clone()));
        let refresher = Arc::new(TokenRefresher::new(context.clone(), broadcaster.clone()));
        let coordinator = RefreshCoordinator::new(refresher, event_bus);
        let client = ApiClient::new(context.clone(), broadcaster.clone(), coordinator);

        debug!(
            interactive = context.config.is_interactive(),
            channel = %context.config.channel_name,
            "SessionManager created"
        );

        Self {
            context,
            broadcaster,
            client,
            sign_in_lock: Mutex::new(()),
        }
    }

    /// Intercepting client for application requests.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Start the broadcast listener and restore a persisted session.
    ///
    /// The user is loaded through the intercepting client, so an expired
    /// access token is refreshed first. If loading fails the session is
    /// signed out and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Only session store failures are returned.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<Option<AuthenticatedUser>> {
        if let Err(e) = self.broadcaster.listen().await {
            warn!(error = %e, "Failed to subscribe to session broadcasts");
        }

        let Some(token) = self.context.token_store.access_token().await? else {
            debug!("No persisted session");
            return Ok(None);
        };
        self.context.credential.set(token).await;

        let me = self.context.config.endpoints.me.clone();
        match self.client.get_json::<AuthenticatedUser>(&me).await {
            Ok(user) => {
                info!("Session restored");
                self.context.set_user(user.clone()).await;
                self.context.emit(AuthEvent::SessionRestored {
                    email: user.email.clone(),
                });
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "Session restore failed, signing out");
                self.context.emit(AuthEvent::AuthError {
                    message: format!("session restore failed: {}", e),
                    recoverable: false,
                });

                // The intercepting client already signed out for these.
                if !matches!(
                    e,
                    AuthError::Unauthorized { .. } | AuthError::RefreshFailed(_)
                ) {
                    self.broadcaster
                        .post_signed_out(SignOutReason::HydrationFailed)
                        .await?;
                }
                Ok(None)
            }
        }
    }

    /// Authenticate with email and password.
    ///
    /// On success the token pair is persisted, the user and credential are
    /// set, the context navigates to the landing route, siblings are told,
    /// and the broadcast listener is (re)started.
    ///
    /// # Errors
    ///
    /// - `AuthError::SignInFailed` - The server rejected the credentials
    /// - `AuthError::Network` - The server could not be reached
    /// - `AuthError::SessionStore` - The token pair could not be persisted
    ///
    /// Session state is left untouched on any error.
    #[instrument(skip_all, fields(email = %redact_if_sensitive("email", email)))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthenticatedUser> {
        let _guard = self.sign_in_lock.lock().await;
        info!("Signing in");

        let config = &self.context.config;
        let url = config.endpoint_url(&config.endpoints.sessions)?;
        let request = HttpRequest::post(url.as_str())
            .json(&SignInRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?
            .timeout(config.request_timeout);

        let response = config
            .http_client
            .execute_with_retry(request, RetryPolicy::single_attempt())
            .await
            .map_err(|e| {
                error!(error = %e, "Sign-in request failed");
                AuthError::from(e)
            })?;

        if !response.is_success() {
            warn!(status = response.status, "Sign-in rejected");
            let message = serde_json::from_slice::<ErrorBody>(&response.body)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("server returned {}", response.status));
            return Err(AuthError::SignInFailed(message));
        }

        let body: SignInResponse = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        self.context.token_store.store(&body.tokens()).await?;
        self.context.credential.set(body.token.clone()).await;

        let user = AuthenticatedUser::new(email)
            .with_permissions(body.permissions)
            .with_roles(body.roles);
        self.context.set_user(user.clone()).await;
        self.context.emit(AuthEvent::SignedIn {
            email: email.to_string(),
        });

        self.context.navigate(&config.routes.landing).await;
        self.broadcaster.post_signed_in().await;
        if let Err(e) = self.broadcaster.listen().await {
            warn!(error = %e, "Failed to subscribe to session broadcasts");
        }

        info!("Sign-in completed");
        Ok(user)
    }

    /// End the session in this and every sibling context.
    ///
    /// Idempotent: siblings are only notified if a session existed. The
    /// redirect to the entry route always happens.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        info!("Signing out");
        self.broadcaster
            .post_signed_out(SignOutReason::UserRequested)
            .await
    }

    pub async fn current_user(&self) -> Option<AuthenticatedUser> {
        self.context.current_user().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.context.current_user().await.is_some()
    }

    /// Route guard check against the signed-in user. `false` when signed out.
    pub async fn can(&self, permissions: &[&str], roles: &[&str]) -> bool {
        self.context
            .current_user()
            .await
            .map(|user| user.can(permissions, roles))
            .unwrap_or(false)
    }

    /// Stream of session events for this context.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.context.event_bus().subscribe())
    }

    pub fn is_listening(&self) -> bool {
        self.broadcaster.is_listening()
    }

    /// Stop the broadcast listener. Persisted state is left in place.
    pub fn shutdown(&self) {
        self.broadcaster.stop();
        debug!("SessionManager shut down");
    }
}

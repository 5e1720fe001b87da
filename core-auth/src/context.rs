//! State shared by every component of one context's session.

use crate::credential::CredentialProvider;
use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::AuthenticatedUser;
use bridge_traits::{HttpRequest, HttpResponse};
use core_runtime::config::AuthConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, SignOutReason};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

pub(crate) struct SessionContext {
    pub(crate) config: AuthConfig,
    pub(crate) token_store: TokenStore,
    pub(crate) credential: CredentialProvider,
    user: RwLock<Option<AuthenticatedUser>>,
    sign_out_lock: Mutex<()>,
    event_bus: EventBus,
}

impl SessionContext {
    pub(crate) fn new(config: AuthConfig, event_bus: EventBus) -> Self {
        let token_store = TokenStore::new(config.session_store.clone(), config.cookie_options());
        Self {
            config,
            token_store,
            credential: CredentialProvider::new(),
            user: RwLock::new(None),
            sign_out_lock: Mutex::new(()),
            event_bus,
        }
    }

    pub(crate) fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }

    pub(crate) fn emit_core(&self, event: CoreEvent) {
        let _ = self.event_bus.emit(event);
    }

    pub(crate) async fn current_user(&self) -> Option<AuthenticatedUser> {
        self.user.read().await.clone()
    }

    pub(crate) async fn set_user(&self, user: AuthenticatedUser) {
        *self.user.write().await = Some(user);
    }

    /// Redirect if this context can; failures are logged and swallowed.
    pub(crate) async fn navigate(&self, route: &str) {
        let Some(navigator) = &self.config.navigator else {
            debug!(route, "Non-interactive context, skipping redirect");
            return;
        };
        if let Err(e) = navigator.navigate(route).await {
            warn!(route, error = %e, "Redirect failed");
        }
    }

    pub(crate) async fn current_route(&self) -> Option<String> {
        match &self.config.navigator {
            Some(navigator) => navigator.current_route().await,
            None => None,
        }
    }

    /// Clear persisted tokens, the credential and the in-memory user.
    ///
    /// Serialized so that concurrent sign-outs observe a single transition.
    /// Returns whether a session existed. Memory state is cleared even when
    /// the store fails; the store error is then returned.
    pub(crate) async fn end_session(&self, reason: SignOutReason) -> Result<bool> {
        let _guard = self.sign_out_lock.lock().await;

        let stored = self.token_store.clear().await;
        let had_credential = self.credential.clear().await;
        let had_user = self.user.write().await.take().is_some();

        let existed = had_credential || had_user || matches!(stored, Ok(true));
        if existed {
            debug!(?reason, "Session ended");
            self.emit(AuthEvent::SignedOut { reason });
        }

        stored.map(|_| existed)
    }

    /// `GET me` with an explicit token, bypassing interception.
    pub(crate) async fn fetch_user(&self, token: &str) -> Result<AuthenticatedUser> {
        let url = self.config.endpoint_url(&self.config.endpoints.me)?;
        let request = HttpRequest::get(url.as_str())
            .bearer_token(token)
            .timeout(self.config.request_timeout);

        let response = self.config.http_client.execute(request).await?;
        parse_user(&response)
    }
}

pub(crate) fn parse_user(response: &HttpResponse) -> Result<AuthenticatedUser> {
    if !response.is_success() {
        return Err(AuthError::Http {
            status: response.status,
            code: crate::classifier::error_code(response),
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    response
        .json::<AuthenticatedUser>()
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

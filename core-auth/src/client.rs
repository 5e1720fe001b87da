//! Intercepting API client
//!
//! Every request goes out with the access token current at dispatch time.
//! Failures are classified:
//!
//! - expired token: parked with the [`RefreshCoordinator`] and replayed once
//!   the single in-flight refresh resolves
//! - unauthorized: the session ends (interactive contexts) or the caller gets
//!   [`AuthError::AuthTokenRequired`]
//! - anything else: returned to the caller as is
//!
//! A replayed request is never parked again; a second expired-token answer
//! is handled as unauthorized.

use crate::broadcaster::SessionBroadcaster;
use crate::classifier::{error_code, FailureClassifier, FailureKind};
use crate::context::SessionContext;
use crate::coordinator::RefreshCoordinator;
use crate::error::{AuthError, Result};
use bridge_traits::{HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use core_runtime::events::SignOutReason;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Authenticated HTTP client for application requests. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    context: Arc<SessionContext>,
    broadcaster: Arc<SessionBroadcaster>,
    coordinator: RefreshCoordinator,
    classifier: FailureClassifier,
}

impl ApiClient {
    pub(crate) fn new(
        context: Arc<SessionContext>,
        broadcaster: Arc<SessionBroadcaster>,
        coordinator: RefreshCoordinator,
    ) -> Self {
        let classifier = FailureClassifier::new(context.config.token_expired_code.clone());
        Self {
            inner: Arc::new(ClientInner {
                context,
                broadcaster,
                coordinator,
                classifier,
            }),
        }
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Send a request. Relative URLs resolve against the configured base URL.
    ///
    /// Any `Authorization` header on `request` is replaced with the current
    /// access token.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = self.prepare(request)?;
        self.clone().dispatch(request).await
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::get(path)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get(path).await?;
        response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let request = HttpRequest::post(path).json(body)?;
        let response = self.send(request).await?;
        response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    fn prepare(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        let config = &self.inner.context.config;
        if Url::parse(&request.url).is_err() {
            request.url = config.endpoint_url(&request.url)?.to_string();
        }
        if request.timeout.is_none() {
            request.timeout = Some(config.request_timeout);
        }
        Ok(request)
    }

    fn dispatch(self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse>> {
        Box::pin(async move {
            let token = self.inner.context.credential.current().await;
            let response = self.execute(&request, token.as_deref()).await?;
            self.handle_response(request, token, response, false).await
        })
    }

    fn replay(self, request: HttpRequest, token: String) -> BoxFuture<'static, Result<HttpResponse>> {
        Box::pin(async move {
            debug!(url = %request.url, "Replaying request with refreshed token");
            let response = self.execute(&request, Some(&token)).await?;
            self.handle_response(request, Some(token), response, true)
                .await
        })
    }

    async fn execute(&self, request: &HttpRequest, token: Option<&str>) -> Result<HttpResponse> {
        let mut outgoing = request.clone().without_authorization();
        if let Some(token) = token {
            outgoing = outgoing.bearer_token(token);
        }
        let http = &self.inner.context.config.http_client;
        let response = match outgoing.method {
            HttpMethod::Post | HttpMethod::Patch => {
                http.execute_with_retry(outgoing, RetryPolicy::single_attempt())
                    .await?
            }
            _ => http.execute(outgoing).await?,
        };
        Ok(response)
    }

    fn handle_response(
        self,
        request: HttpRequest,
        sent_with: Option<String>,
        response: HttpResponse,
        replayed: bool,
    ) -> BoxFuture<'static, Result<HttpResponse>> {
        Box::pin(async move {
            if response.is_success() {
                return Ok(response);
            }

            let code = error_code(&response);
            let kind = self
                .inner
                .classifier
                .classify(Some(response.status), code.as_deref());

            match kind {
                FailureKind::TokenExpired if !replayed => {
                    // A refresh finished after this request went out.
                    let current = self.inner.context.credential.current().await;
                    if let Some(current) = current.filter(|c| sent_with.as_ref() != Some(c)) {
                        return self.replay(request, current).await;
                    }

                    debug!(url = %request.url, "Access token expired, queueing request");
                    let coordinator = self.inner.coordinator.clone();
                    coordinator
                        .enqueue(move |token| self.replay(request, token))
                        .await
                }
                FailureKind::TokenExpired | FailureKind::Unauthorized => {
                    self.reject_unauthorized(response.status, code).await
                }
                FailureKind::Other => Err(AuthError::Http {
                    status: response.status,
                    code,
                    body: String::from_utf8_lossy(&response.body).into_owned(),
                }),
            }
        })
    }

    async fn reject_unauthorized(
        &self,
        status: u16,
        code: Option<String>,
    ) -> Result<HttpResponse> {
        if !self.inner.context.config.is_interactive() {
            debug!(status, "Unauthorized in non-interactive context");
            return Err(AuthError::AuthTokenRequired);
        }

        if let Err(e) = self
            .inner
            .broadcaster
            .post_signed_out(SignOutReason::Unauthorized)
            .await
        {
            warn!(error = %e, "Sign-out after unauthorized response did not complete");
        }
        Err(AuthError::Unauthorized { status, code })
    }
}

//! Single-flight Token Refresh
//!
//! Requests rejected with an expired access token are parked in a FIFO queue
//! while exactly one refresh call runs. When it resolves, every parked
//! request is either replayed with the new token or rejected with the
//! refresh error.
//!
//! ## State machine
//!
//! ```text
//! Idle --(first expired request)--> Refreshing --(refresh resolved)--> Idle
//! ```
//!
//! The `Idle` check, the transition and the enqueue happen under one lock,
//! so near-simultaneous failures never start two refreshes. Draining the
//! queue and returning to `Idle` are likewise a single step: a request that
//! fails after the drain starts a fresh cycle instead of being stranded.

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use bridge_traits::HttpResponse;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use futures::future::{join_all, BoxFuture};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// Re-issues a parked request with the token passed in.
pub type RetryFn = Box<dyn FnOnce(String) -> BoxFuture<'static, Result<HttpResponse>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

struct PendingRequest {
    retry: RetryFn,
    responder: oneshot::Sender<Result<HttpResponse>>,
}

struct Inner {
    state: RefreshState,
    queue: VecDeque<PendingRequest>,
}

/// The refresh call and its failure handling, supplied by the session.
#[async_trait]
pub trait RefreshBackend: Send + Sync {
    /// Exchange the persisted refresh token for a new pair, persist it and
    /// return the new access token.
    async fn refresh(&self) -> Result<String>;

    /// Runs once per failed refresh, before queued requests are rejected.
    /// Returns the error delivered to every queued caller.
    async fn refresh_failed(&self, error: &AuthError) -> AuthError;
}

/// Coordinates refreshes for one context. Clones share the queue.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Mutex<Inner>>,
    backend: Arc<dyn RefreshBackend>,
    event_bus: EventBus,
}

impl RefreshCoordinator {
    pub fn new(backend: Arc<dyn RefreshBackend>, event_bus: EventBus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: RefreshState::Idle,
                queue: VecDeque::new(),
            })),
            backend,
            event_bus,
        }
    }

    pub async fn state(&self) -> RefreshState {
        self.inner.lock().await.state
    }

    pub async fn pending_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    /// Park a request until the in-flight refresh resolves, starting one if
    /// none is running.
    ///
    /// Resolves to the replayed request's outcome, or to the refresh error.
    pub async fn enqueue<F>(&self, retry: F) -> Result<HttpResponse>
    where
        F: FnOnce(String) -> BoxFuture<'static, Result<HttpResponse>> + Send + 'static,
    {
        let (responder, outcome) = oneshot::channel();

        let start_refresh = {
            let mut inner = self.inner.lock().await;
            inner.queue.push_back(PendingRequest {
                retry: Box::new(retry),
                responder,
            });

            if inner.state == RefreshState::Idle {
                inner.state = RefreshState::Refreshing;
                true
            } else {
                false
            }
        };

        if start_refresh {
            let coordinator = self.clone();
            tokio::spawn(async move { coordinator.run_refresh().await });
        } else {
            debug!("Refresh in flight, request queued");
        }

        outcome.await.unwrap_or_else(|_| {
            Err(AuthError::Internal(
                "Refresh coordinator dropped a queued request".to_string(),
            ))
        })
    }

    async fn run_refresh(&self) {
        info!("Refreshing access token");
        self.emit(AuthEvent::TokenRefreshing);

        match self.backend.refresh().await {
            Ok(token) => {
                let pending = self.drain().await;
                let count = pending.len();
                info!(queued = count, "Token refreshed, replaying queued requests");
                self.emit(AuthEvent::TokenRefreshed);

                // join_all polls in order, so replays are dispatched FIFO.
                let replays = pending.into_iter().map(|request| {
                    let token = token.clone();
                    async move {
                        let result = (request.retry)(token).await;
                        if request.responder.send(result).is_err() {
                            debug!("Caller went away before replay completed");
                        }
                    }
                });
                join_all(replays).await;

                self.emit(AuthEvent::RequestsReplayed { count });
            }
            Err(error) => {
                warn!(error = %error, "Token refresh failed");
                let error = self.backend.refresh_failed(&error).await;

                let pending = self.drain().await;
                let rejected = pending.len();
                for request in pending {
                    let _ = request.responder.send(Err(error.clone()));
                }

                self.emit(AuthEvent::RefreshFailed {
                    message: error.to_string(),
                    rejected,
                });
            }
        }
    }

    /// Take the whole queue and return to `Idle` in one step.
    async fn drain(&self) -> VecDeque<PendingRequest> {
        let mut inner = self.inner.lock().await;
        inner.state = RefreshState::Idle;
        std::mem::take(&mut inner.queue)
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct MockBackend {
        outcome: Result<String>,
        gate: Arc<Notify>,
        refresh_calls: AtomicUsize,
        failure_calls: AtomicUsize,
    }

    impl MockBackend {
        fn new(outcome: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                gate: Arc::new(Notify::new()),
                refresh_calls: AtomicUsize::new(0),
                failure_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RefreshBackend for MockBackend {
        async fn refresh(&self) -> Result<String> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.outcome.clone()
        }

        async fn refresh_failed(&self, _error: &AuthError) -> AuthError {
            self.failure_calls.fetch_add(1, Ordering::SeqCst);
            AuthError::AuthTokenRequired
        }
    }

    fn echo_retry(
        index: usize,
        order: Arc<std::sync::Mutex<Vec<usize>>>,
    ) -> impl FnOnce(String) -> BoxFuture<'static, Result<HttpResponse>> + Send + 'static {
        move |token: String| -> BoxFuture<'static, Result<HttpResponse>> {
            Box::pin(async move {
                order.lock().unwrap().push(index);
                Ok(HttpResponse::new(200, token))
            })
        }
    }

    async fn wait_for_queue(coordinator: &RefreshCoordinator, len: usize) {
        while coordinator.pending_len().await < len {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_refresh() {
        let backend = MockBackend::new(Ok("new-token".to_string()));
        let bus = EventBus::new(32);
        let mut events = bus.subscribe();
        let coordinator = RefreshCoordinator::new(backend.clone(), bus);
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for index in 0..3 {
            let queued = coordinator.clone();
            let retry = echo_retry(index, order.clone());
            handles.push(tokio::spawn(async move { queued.enqueue(retry).await }));
            wait_for_queue(&coordinator, index + 1).await;
        }
        assert_eq!(coordinator.state().await, RefreshState::Refreshing);

        backend.gate.notify_one();

        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            assert_eq!(response.text().unwrap(), "new-token");
        }

        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(coordinator.state().await, RefreshState::Idle);
        assert_eq!(coordinator.pending_len().await, 0);

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshing)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshed)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::RequestsReplayed { count: 3 })
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_rejects_every_queued_request() {
        let backend = MockBackend::new(Err(AuthError::RefreshFailed("401".to_string())));
        let bus = EventBus::new(32);
        let coordinator = RefreshCoordinator::new(backend.clone(), bus);
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for index in 0..3 {
            let queued = coordinator.clone();
            let retry = echo_retry(index, order.clone());
            handles.push(tokio::spawn(async move { queued.enqueue(retry).await }));
            wait_for_queue(&coordinator, index + 1).await;
        }

        backend.gate.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(AuthError::AuthTokenRequired));
        }

        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.failure_calls.load(Ordering::SeqCst), 1);
        assert!(order.lock().unwrap().is_empty());
        assert_eq!(coordinator.state().await, RefreshState::Idle);
    }

    #[tokio::test]
    async fn test_next_expiry_after_completion_starts_new_refresh() {
        let backend = MockBackend::new(Ok("t2".to_string()));
        let coordinator = RefreshCoordinator::new(backend.clone(), EventBus::new(8));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        backend.gate.notify_one();
        coordinator.enqueue(echo_retry(0, order.clone())).await.unwrap();

        backend.gate.notify_one();
        coordinator.enqueue(echo_retry(1, order.clone())).await.unwrap();

        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 2);
        assert_eq!(*order.lock().unwrap(), vec![0, 1]);
    }
}

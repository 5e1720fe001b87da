//! # Event Bus System
//!
//! Provides an event-driven view of session transitions using `tokio::sync::broadcast`.
//! Host UI code subscribes here to learn about sign-in, sign-out and token refresh
//! without polling the session facade.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enums for local auth transitions and
//!   messages received from sibling contexts
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐
//! │ RefreshCoordinator├─────────>│           │   subscribe   ┌────────────┐
//! └──────────────────┘           │ EventBus  ├──────────────>│ Host UI    │
//! ┌──────────────────┐   emit    │ (broadcast│               └────────────┘
//! │ SessionManager   ├─────────>│  channel) │
//! └──────────────────┘           └───────────┘
//! ```
//!
//! The event bus is process-local. Cross-context propagation goes through the
//! `BroadcastChannel` bridge instead; receipt of such a message is re-published
//! here as a [`ContextEvent`].
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed))
//!     .ok();
//!
//! assert_eq!(
//!     subscriber.recv().await.unwrap(),
//!     CoreEvent::Auth(AuthEvent::TokenRefreshed)
//! );
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emitting with no subscribers returns an error which publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session transitions performed by this context
    Auth(AuthEvent),
    /// Messages received from sibling contexts
    Context(ContextEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Context(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::RefreshFailed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SignedOut { reason })
                if *reason != SignOutReason::UserRequested =>
            {
                EventSeverity::Warning
            }
            CoreEvent::Auth(AuthEvent::SignedIn { .. })
            | CoreEvent::Auth(AuthEvent::SignedOut { .. })
            | CoreEvent::Auth(AuthEvent::SessionRestored { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Why a context ended its session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignOutReason {
    /// Explicit `sign_out()` call.
    UserRequested,
    /// A request was rejected with 401 and no expired-token code.
    Unauthorized,
    /// The refresh call failed.
    RefreshFailed,
    /// The identity endpoint rejected the persisted session on startup.
    HydrationFailed,
    /// A sibling context signed out.
    RemoteSignOut,
}

/// Session transitions of the current context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Sign-in completed and the session was persisted.
    SignedIn {
        email: String,
    },
    /// In-memory user and persisted tokens were cleared.
    SignedOut {
        reason: SignOutReason,
    },
    /// User state was rebuilt from a persisted session.
    SessionRestored {
        email: String,
    },
    /// A refresh call started.
    TokenRefreshing,
    /// A refresh call succeeded and the new pair was persisted.
    TokenRefreshed,
    /// A refresh call failed; all queued requests were rejected.
    RefreshFailed {
        message: String,
        rejected: usize,
    },
    /// Queued requests were re-issued after a refresh.
    RequestsReplayed {
        count: usize,
    },
    /// Authentication error not covered by the variants above.
    AuthError {
        message: String,
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SignedIn { .. } => "User signed in successfully",
            AuthEvent::SignedOut { .. } => "User signed out",
            AuthEvent::SessionRestored { .. } => "Session restored",
            AuthEvent::TokenRefreshing => "Refreshing access token",
            AuthEvent::TokenRefreshed => "Token refreshed successfully",
            AuthEvent::RefreshFailed { .. } => "Token refresh failed",
            AuthEvent::RequestsReplayed { .. } => "Queued requests replayed",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Context Events
// ============================================================================

/// Cross-context messages observed by this context's listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ContextEvent {
    /// A sibling signed in.
    RemoteSignedIn,
    /// A sibling signed out.
    RemoteSignedOut,
    /// The listener stopped; a new one starts on the next sign-in.
    ListenerClosed,
}

impl ContextEvent {
    fn description(&self) -> &str {
        match self {
            ContextEvent::RemoteSignedIn => "Another context signed in",
            ContextEvent::RemoteSignedOut => "Another context signed out",
            ContextEvent::ListenerClosed => "Broadcast listener closed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let auth_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Auth(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::default();
        let event = CoreEvent::Auth(AuthEvent::SignedOut {
            reason: SignOutReason::UserRequested,
        });

        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Auth(AuthEvent::RequestsReplayed { count: 3 });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Context(_)));

        bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshing)).ok();
        bus.emit(CoreEvent::Context(ContextEvent::RemoteSignedOut))
            .ok();

        assert_eq!(
            stream.recv().await.unwrap(),
            CoreEvent::Context(ContextEvent::RemoteSignedOut)
        );
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for count in 0..5 {
            bus.emit(CoreEvent::Auth(AuthEvent::RequestsReplayed { count }))
                .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Auth(AuthEvent::RefreshFailed {
            message: "401".to_string(),
            rejected: 3,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let forced = CoreEvent::Auth(AuthEvent::SignedOut {
            reason: SignOutReason::Unauthorized,
        });
        assert_eq!(forced.severity(), EventSeverity::Warning);

        let requested = CoreEvent::Auth(AuthEvent::SignedOut {
            reason: SignOutReason::UserRequested,
        });
        assert_eq!(requested.severity(), EventSeverity::Info);

        let refreshing = CoreEvent::Auth(AuthEvent::TokenRefreshing);
        assert_eq!(refreshing.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Auth(AuthEvent::SignedIn {
            email: "user@example.com".to_string(),
        });
        assert_eq!(event.description(), "User signed in successfully");
        assert_eq!(
            CoreEvent::Context(ContextEvent::ListenerClosed).description(),
            "Broadcast listener closed"
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Auth(AuthEvent::SignedOut {
            reason: SignOutReason::RefreshFailed,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Auth\""));
        assert!(json.contains("RefreshFailed"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}

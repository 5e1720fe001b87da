//! # Host Bridge Traits
//!
//! Capability traits the session core consumes and each host platform
//! implements.
//!
//! ## Traits
//!
//! ### Transport
//! - [`HttpClient`](http::HttpClient) - Async HTTP exchange; 4xx/5xx are responses, not errors
//!
//! ### Persistence
//! - [`SessionStore`](storage::SessionStore) - Key/value store with expiry shared by all contexts
//!
//! ### Cross-context
//! - [`BroadcastChannel`](broadcast::BroadcastChannel) - Named pub/sub for sign-in/sign-out
//! - [`Navigator`](navigation::Navigator) - Redirect capability of interactive contexts
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with an actionable message.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so bridges can be shared across tokio
//! tasks behind an `Arc`.

pub mod broadcast;
pub mod error;
pub mod http;
pub mod navigation;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use broadcast::{BroadcastChannel, BroadcastMessage, BroadcastSubscription};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use navigation::Navigator;
pub use storage::{CookieOptions, SessionStore};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};

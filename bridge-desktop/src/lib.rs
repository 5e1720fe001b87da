//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `SessionStore` using a SQLite table with per-entry expiry, plus an
//!   in-memory variant for tests and ephemeral sessions
//! - `BroadcastChannel` using an in-process hub of tokio broadcast channels,
//!   one handle per window/context
//! - `Navigator` tracking the current route of a window
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{LocalBroadcastHub, ReqwestHttpClient, SqliteSessionStore};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let store = SqliteSessionStore::new("session.db".into()).await?;
//!     let hub = LocalBroadcastHub::new();
//!     let channel = hub.connect("auth");
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod broadcast;
mod http;
mod navigation;
mod session_store;

pub use broadcast::{LocalBroadcastChannel, LocalBroadcastHub, LocalBroadcastSubscription};
pub use http::ReqwestHttpClient;
pub use navigation::RouteNavigator;
pub use session_store::{MemorySessionStore, SqliteSessionStore};

//! Workspace facade crate.
//!
//! Re-exports the session core and its configuration so host applications
//! depend on one crate. With the default `desktop-shims` feature the desktop
//! bridges are re-exported too and `AuthConfig::builder()` falls back to
//! them for HTTP and session storage.

pub use bridge_traits as bridge;
pub use core_auth::*;
pub use core_runtime::{config, events, logging};
pub use core_runtime::{AuthConfig, AuthConfigBuilder, EndpointConfig, RouteConfig};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop as desktop;

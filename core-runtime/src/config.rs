//! # Session Configuration Module
//!
//! Provides configuration management for the authentication session core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an `AuthConfig`
//! instance that holds every bridge and setting the session core needs. It
//! enforces fail-fast validation so a context never starts with a missing
//! capability or an unusable route table.
//!
//! ## Required Dependencies
//!
//! - `BroadcastChannel` - Cross-context sign-in/sign-out propagation
//!
//! ## Dependencies with platform defaults
//!
//! - `HttpClient` - Transport (desktop default: reqwest)
//! - `SessionStore` - Persisted token pair (desktop default: in-memory store)
//!
//! ## Optional Dependencies
//!
//! - `Navigator` - Present only in interactive contexts. Without it the core
//!   never redirects and reports `AuthTokenRequired` instead of signing out.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AuthConfig;
//! use std::sync::Arc;
//!
//! let hub = bridge_desktop::LocalBroadcastHub::new();
//! let config = AuthConfig::builder()
//!     .base_url("https://api.example.com/")
//!     .http_client(Arc::new(MyHttpClient))
//!     .session_store(Arc::new(MySessionStore))
//!     .broadcast_channel(Arc::new(hub.connect("auth")))
//!     .navigator(Arc::new(bridge_desktop::RouteNavigator::new("/")))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! Missing bridges produce [`Error::CapabilityMissing`] with an actionable
//! message; invalid values produce [`Error::Config`].

use crate::error::{Error, Result};
use bridge_traits::{BroadcastChannel, CookieOptions, HttpClient, Navigator, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default channel identifier shared by all contexts.
pub const DEFAULT_CHANNEL_NAME: &str = "auth";

/// Machine error code marking an expired access token.
pub const DEFAULT_TOKEN_EXPIRED_CODE: &str = "token.expired";

/// Lifetime of both persisted tokens.
pub const DEFAULT_TOKEN_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Views the core redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    /// Entry (sign-in) view, target of every sign-out redirect.
    pub entry: String,
    /// Authenticated landing view, target after sign-in.
    pub landing: String,
    /// Unauthenticated views. A context showing one of these follows a
    /// sibling's sign-in to the landing view.
    pub guest_routes: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            entry: "/".to_string(),
            landing: "/dashboard".to_string(),
            guest_routes: vec!["/".to_string()],
        }
    }
}

impl RouteConfig {
    /// Whether `route` is an unauthenticated view. Query strings and
    /// fragments are ignored.
    pub fn is_guest_route(&self, route: &str) -> bool {
        let path = route
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or(route);
        self.guest_routes.iter().any(|guest| guest == path)
    }
}

/// Paths of the identity service, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// `POST { email, password }` → `{ token, refreshToken, permissions, roles }`
    pub sessions: String,
    /// `POST { refreshToken }` → `{ token, refreshToken }`
    pub refresh: String,
    /// `GET` → `{ email, permissions, roles }`
    pub me: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            sessions: "sessions".to_string(),
            refresh: "refresh".to_string(),
            me: "me".to_string(),
        }
    }
}

/// Configuration for one session context.
///
/// Use [`AuthConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct AuthConfig {
    /// Base URL every endpoint path is joined onto
    pub base_url: Url,

    pub http_client: Arc<dyn HttpClient>,

    /// Persisted token pair shared by all contexts
    pub session_store: Arc<dyn SessionStore>,

    /// This context's handle on the cross-context channel
    pub broadcast_channel: Arc<dyn BroadcastChannel>,

    /// Redirect capability; `None` marks a non-interactive context
    pub navigator: Option<Arc<dyn Navigator>>,

    pub routes: RouteConfig,

    pub endpoints: EndpointConfig,

    /// Expected name of the broadcast channel
    pub channel_name: String,

    /// Error code that turns a 401 into a refreshable failure
    pub token_expired_code: String,

    /// Lifetime of persisted tokens
    pub token_max_age: Duration,

    /// Scope of persisted tokens
    pub cookie_path: String,

    /// Upper bound for the refresh call; expiry counts as refresh failure
    pub refresh_timeout: Duration,

    /// Timeout attached to every intercepted request
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("base_url", &self.base_url.as_str())
            .field("http_client", &"HttpClient { ... }")
            .field("session_store", &"SessionStore { ... }")
            .field("broadcast_channel", &self.broadcast_channel.name())
            .field(
                "navigator",
                &self.navigator.as_ref().map(|_| "Navigator { ... }"),
            )
            .field("routes", &self.routes)
            .field("endpoints", &self.endpoints)
            .field("token_expired_code", &self.token_expired_code)
            .field("token_max_age", &self.token_max_age)
            .field("refresh_timeout", &self.refresh_timeout)
            .finish()
    }
}

impl AuthConfig {
    /// Creates a new builder for constructing an `AuthConfig`.
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Whether this context can perform user-facing redirects.
    pub fn is_interactive(&self) -> bool {
        self.navigator.is_some()
    }

    /// Options used whenever the token pair is written.
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions::new(self.token_max_age).with_path(self.cookie_path.clone())
    }

    /// Resolve an endpoint path (or any relative path) against the base URL.
    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid endpoint path '{}': {}", path, e)))
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is absolute http(s) and can carry relative paths
    /// - Routes and endpoint paths are not empty
    /// - Timeouts and token lifetime are non-zero
    /// - The broadcast handle is connected to the configured channel
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Base URL must use http or https, got '{}'",
                self.base_url.scheme()
            )));
        }

        if self.base_url.cannot_be_a_base() {
            return Err(Error::Config(
                "Base URL cannot be used as a base for endpoint paths".to_string(),
            ));
        }

        if self.routes.entry.is_empty() || self.routes.landing.is_empty() {
            return Err(Error::Config(
                "Entry and landing routes cannot be empty".to_string(),
            ));
        }

        if self.routes.guest_routes.contains(&self.routes.landing) {
            return Err(Error::Config(format!(
                "Landing route '{}' cannot also be a guest route",
                self.routes.landing
            )));
        }

        for (name, path) in [
            ("sessions", &self.endpoints.sessions),
            ("refresh", &self.endpoints.refresh),
            ("me", &self.endpoints.me),
        ] {
            if path.is_empty() {
                return Err(Error::Config(format!(
                    "Endpoint path '{}' cannot be empty",
                    name
                )));
            }
        }

        if self.token_expired_code.is_empty() {
            return Err(Error::Config(
                "Token expired code cannot be empty".to_string(),
            ));
        }

        if self.token_max_age.is_zero() {
            return Err(Error::Config(
                "Token max age must be greater than zero".to_string(),
            ));
        }

        if self.refresh_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Refresh and request timeouts must be greater than zero".to_string(),
            ));
        }

        if self.broadcast_channel.name() != self.channel_name {
            return Err(Error::Config(format!(
                "Broadcast channel '{}' does not match configured channel '{}'",
                self.broadcast_channel.name(),
                self.channel_name
            )));
        }

        Ok(())
    }
}

fn broadcast_channel_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "BroadcastChannel".to_string(),
        message: "BroadcastChannel implementation is required to keep sibling contexts \
                 in sync. Desktop: connect a bridge_desktop::LocalBroadcastHub shared by \
                 all windows. Web: wrap the platform BroadcastChannel API."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: ensure the 'desktop-shims' feature is enabled. \
                 Mobile: inject platform-native adapter."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn session_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SessionStore".to_string(),
        message: "SessionStore implementation is required to persist the token pair. \
                 Desktop: enable 'desktop-shims' or inject bridge_desktop::SqliteSessionStore. \
                 Web: inject a cookie-backed store."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new().map_err(|e| {
        Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: format!("Failed to create default HTTP client: {}", e),
        }
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_session_store() -> Result<Arc<dyn SessionStore>> {
    Ok(Arc::new(bridge_desktop::MemorySessionStore::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_session_store() -> Result<Arc<dyn SessionStore>> {
    Err(session_store_missing_error())
}

/// Builder for constructing an [`AuthConfig`] with validation.
#[derive(Default)]
pub struct AuthConfigBuilder {
    base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    session_store: Option<Arc<dyn SessionStore>>,
    broadcast_channel: Option<Arc<dyn BroadcastChannel>>,
    navigator: Option<Arc<dyn Navigator>>,
    routes: Option<RouteConfig>,
    endpoints: Option<EndpointConfig>,
    channel_name: Option<String>,
    token_expired_code: Option<String>,
    token_max_age: Option<Duration>,
    cookie_path: Option<String>,
    refresh_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl AuthConfigBuilder {
    /// Sets the base URL of the API (required).
    ///
    /// A trailing slash is added when missing so relative endpoint paths
    /// extend the base path instead of replacing its last segment.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn broadcast_channel(mut self, channel: Arc<dyn BroadcastChannel>) -> Self {
        self.broadcast_channel = Some(channel);
        self
    }

    /// Marks the context as interactive.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn routes(mut self, routes: RouteConfig) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Default: `auth`
    pub fn channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = Some(name.into());
        self
    }

    /// Default: `token.expired`
    pub fn token_expired_code(mut self, code: impl Into<String>) -> Self {
        self.token_expired_code = Some(code.into());
        self
    }

    /// Default: 30 days
    pub fn token_max_age(mut self, max_age: Duration) -> Self {
        self.token_max_age = Some(max_age);
        self
    }

    /// Default: `/`
    pub fn cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = Some(path.into());
        self
    }

    /// Default: 30 seconds
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the final `AuthConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the base URL is missing or invalid, or any value
    ///   fails [`AuthConfig::validate`]
    /// - `Error::CapabilityMissing` if a required bridge is absent and no
    ///   platform default is available
    pub fn build(self) -> Result<AuthConfig> {
        let raw_url = self.base_url.ok_or_else(|| {
            Error::Config("Base URL is required. Use .base_url() to set it.".to_string())
        })?;

        let normalized = if raw_url.ends_with('/') {
            raw_url
        } else {
            format!("{}/", raw_url)
        };

        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", normalized, e)))?;

        let broadcast_channel = self
            .broadcast_channel
            .ok_or_else(broadcast_channel_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let session_store = match self.session_store {
            Some(store) => store,
            None => provide_default_session_store()?,
        };

        let config = AuthConfig {
            base_url,
            http_client,
            session_store,
            broadcast_channel,
            navigator: self.navigator,
            routes: self.routes.unwrap_or_default(),
            endpoints: self.endpoints.unwrap_or_default(),
            channel_name: self
                .channel_name
                .unwrap_or_else(|| DEFAULT_CHANNEL_NAME.to_string()),
            token_expired_code: self
                .token_expired_code
                .unwrap_or_else(|| DEFAULT_TOKEN_EXPIRED_CODE.to_string()),
            token_max_age: self.token_max_age.unwrap_or(DEFAULT_TOKEN_MAX_AGE),
            cookie_path: self.cookie_path.unwrap_or_else(|| "/".to_string()),
            refresh_timeout: self.refresh_timeout.unwrap_or(DEFAULT_REFRESH_TIMEOUT),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        };

        config.validate()?;

        Ok(config)
    }
}

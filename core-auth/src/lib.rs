//! # Session Core
//!
//! Client-side authentication session backed by a short-lived access token
//! and a long-lived refresh token.
//!
//! ## Overview
//!
//! - [`SessionManager`] - sign-in, sign-out, startup restore, current user
//! - [`ApiClient`] - attaches the access token and recovers from expiry
//! - [`RefreshCoordinator`] - at most one refresh in flight; expired
//!   requests wait in a FIFO queue and are replayed or rejected together
//! - [`FailureClassifier`] - expired token vs. unauthorized vs. other
//! - [`TokenStore`] - the persisted token pair shared by all contexts
//!
//! Sibling contexts sharing the persisted session follow each other's
//! sign-in and sign-out through the configured broadcast channel.
//!
//! ## Security
//!
//! Token values are never logged and `Debug` output of token-carrying types
//! is redacted.

pub mod classifier;
pub mod client;
pub mod coordinator;
pub mod credential;
pub mod error;
pub mod manager;
pub mod token_store;
pub mod types;

mod broadcaster;
mod context;
mod refresher;

pub use classifier::{FailureClassifier, FailureKind};
pub use client::ApiClient;
pub use coordinator::{RefreshBackend, RefreshCoordinator, RefreshState};
pub use credential::CredentialProvider;
pub use error::{AuthError, Result};
pub use manager::SessionManager;
pub use token_store::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
pub use types::{AuthenticatedUser, SessionTokens};

//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the session core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities `core-auth` depends on. It
//! establishes the logging conventions, the validated configuration shared by
//! every session component, and the event broadcasting used to notify host UI
//! code about session transitions.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AuthConfig, AuthConfigBuilder, EndpointConfig, RouteConfig};
pub use error::{Error, Result};

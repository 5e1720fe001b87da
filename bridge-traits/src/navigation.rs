//! Navigation Abstraction
//!
//! Only interactive contexts (a rendered page, a desktop window) provide a
//! navigator. Its absence marks a non-interactive context where redirects
//! are meaningless.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Navigator: Send + Sync {
    /// Replace the current view with `route`.
    async fn navigate(&self, route: &str) -> Result<()>;

    /// Route currently displayed, if known.
    async fn current_route(&self) -> Option<String>;
}

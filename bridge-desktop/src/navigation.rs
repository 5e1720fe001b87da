//! Route tracking navigator for desktop windows.

use async_trait::async_trait;
use bridge_traits::{error::Result, navigation::Navigator};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Keeps the current route of a window plus the sequence of redirects.
///
/// Clones observe the same window, so the host UI can hold one clone and
/// react to route changes while the session core holds another.
#[derive(Clone)]
pub struct RouteNavigator {
    current: Arc<RwLock<String>>,
    history: Arc<RwLock<Vec<String>>>,
}

impl RouteNavigator {
    pub fn new(initial_route: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial_route.into())),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Routes navigated to, oldest first. The initial route is not included.
    pub async fn history(&self) -> Vec<String> {
        self.history.read().await.clone()
    }
}

#[async_trait]
impl Navigator for RouteNavigator {
    async fn navigate(&self, route: &str) -> Result<()> {
        let mut current = self.current.write().await;
        info!(from = %current, to = route, "Navigating");
        *current = route.to_string();
        self.history.write().await.push(route.to_string());
        Ok(())
    }

    async fn current_route(&self) -> Option<String> {
        Some(self.current.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_navigation_updates_route_and_history() {
        let navigator = RouteNavigator::new("/");
        let window = navigator.clone();

        navigator.navigate("/dashboard").await.unwrap();
        navigator.navigate("/").await.unwrap();

        assert_eq!(window.current_route().await.as_deref(), Some("/"));
        assert_eq!(window.history().await, vec!["/dashboard", "/"]);
    }
}

//! Cross-Context Broadcast Abstraction
//!
//! A named fan-out channel connecting every context (tab, window, process)
//! that shares one persisted session. Delivery is best-effort and a context
//! never receives the messages it posted itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Session transition announced to sibling contexts.
///
/// Messages carry no credentials; receivers re-derive their own state from
/// the shared session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BroadcastMessage {
    #[serde(rename = "signIn")]
    SignedIn,
    #[serde(rename = "signOut")]
    SignedOut,
}

impl fmt::Display for BroadcastMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BroadcastMessage::SignedIn => write!(f, "signIn"),
            BroadcastMessage::SignedOut => write!(f, "signOut"),
        }
    }
}

/// One context's handle on a named broadcast channel.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    /// Channel identifier shared by all contexts of the application.
    fn name(&self) -> &str;

    /// Send a message to every other subscribed context.
    async fn post(&self, message: BroadcastMessage) -> Result<()>;

    /// Start receiving messages posted by other contexts.
    async fn subscribe(&self) -> Result<Box<dyn BroadcastSubscription>>;
}

/// A live subscription returned by [`BroadcastChannel::subscribe`].
#[async_trait]
pub trait BroadcastSubscription: Send {
    /// Wait for the next message. Returns `None` once the subscription is
    /// closed or the channel has shut down.
    async fn recv(&mut self) -> Option<BroadcastMessage>;

    /// Stop listening. Closing twice is a no-op.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_names() {
        assert_eq!(
            serde_json::to_string(&BroadcastMessage::SignedOut).unwrap(),
            "\"signOut\""
        );
        assert_eq!(
            serde_json::from_str::<BroadcastMessage>("\"signIn\"").unwrap(),
            BroadcastMessage::SignedIn
        );
        for message in [BroadcastMessage::SignedIn, BroadcastMessage::SignedOut] {
            assert_eq!(
                serde_json::to_string(&message).unwrap(),
                format!("\"{}\"", message)
            );
        }
    }
}

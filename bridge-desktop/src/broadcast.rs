//! In-process broadcast hub
//!
//! Each window (or any other context) calls [`LocalBroadcastHub::connect`] to
//! get its own handle on a named channel. Handles share one tokio broadcast
//! sender per channel name and tag outgoing messages with an origin id so a
//! subscription never yields messages posted through its own handle.

use async_trait::async_trait;
use bridge_traits::{
    broadcast::{BroadcastChannel, BroadcastMessage, BroadcastSubscription},
    error::Result,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Envelope {
    origin: Uuid,
    message: BroadcastMessage,
}

/// Registry of named channels shared by every context of the process.
#[derive(Clone, Default)]
pub struct LocalBroadcastHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Envelope>>>>,
}

impl LocalBroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new context handle on the channel `name`.
    pub fn connect(&self, name: impl Into<String>) -> LocalBroadcastChannel {
        let name = name.into();
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let sender = channels
            .entry(name.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();

        let origin = Uuid::new_v4();
        debug!(channel = %name, %origin, "Connected broadcast context");

        LocalBroadcastChannel {
            name,
            origin,
            sender,
        }
    }
}

/// One context's handle on a hub channel.
pub struct LocalBroadcastChannel {
    name: String,
    origin: Uuid,
    sender: broadcast::Sender<Envelope>,
}

#[async_trait]
impl BroadcastChannel for LocalBroadcastChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn post(&self, message: BroadcastMessage) -> Result<()> {
        let envelope = Envelope {
            origin: self.origin,
            message,
        };

        // No live subscribers is fine: delivery is best-effort.
        match self.sender.send(envelope) {
            Ok(receivers) => {
                debug!(channel = %self.name, %message, receivers, "Posted broadcast message")
            }
            Err(_) => debug!(channel = %self.name, %message, "No broadcast subscribers"),
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn BroadcastSubscription>> {
        Ok(Box::new(LocalBroadcastSubscription {
            channel: self.name.clone(),
            origin: self.origin,
            receiver: Some(self.sender.subscribe()),
        }))
    }
}

pub struct LocalBroadcastSubscription {
    channel: String,
    origin: Uuid,
    receiver: Option<broadcast::Receiver<Envelope>>,
}

#[async_trait]
impl BroadcastSubscription for LocalBroadcastSubscription {
    async fn recv(&mut self) -> Option<BroadcastMessage> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(envelope) if envelope.origin == self.origin => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.channel, skipped, "Broadcast subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    fn close(&mut self) {
        if self.receiver.take().is_some() {
            debug!(channel = %self.channel, "Closed broadcast subscription");
        }
    }
}

//! Cross-context sign-in/sign-out synchronization
//!
//! Every context of the application shares one persisted session. When one
//! of them signs in or out it posts a message on the named channel; the
//! others follow along so no context keeps rendering a session that no
//! longer exists.

use crate::context::SessionContext;
use crate::error::Result;
use bridge_traits::broadcast::BroadcastMessage;
use core_runtime::events::{AuthEvent, ContextEvent, CoreEvent, SignOutReason};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub(crate) struct SessionBroadcaster {
    context: Arc<SessionContext>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionBroadcaster {
    pub(crate) fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            listener: Mutex::new(None),
        }
    }

    /// End the local session, tell siblings, and redirect to the entry route.
    ///
    /// Siblings are notified only when a session actually existed here, so
    /// repeated sign-outs post a single message. The redirect always happens.
    pub(crate) async fn post_signed_out(&self, reason: SignOutReason) -> Result<()> {
        let ended = self.context.end_session(reason).await;

        if !matches!(ended, Ok(false)) {
            self.post(BroadcastMessage::SignedOut).await;
        } else {
            debug!(?reason, "No session to end, skipping broadcast");
        }

        self.context
            .navigate(&self.context.config.routes.entry)
            .await;

        ended.map(|_| ())
    }

    pub(crate) async fn post_signed_in(&self) {
        self.post(BroadcastMessage::SignedIn).await;
    }

    async fn post(&self, message: BroadcastMessage) {
        if let Err(e) = self.context.config.broadcast_channel.post(message).await {
            warn!(%message, error = %e, "Failed to broadcast session change");
        }
    }

    /// Start reacting to sibling messages. No-op while a listener is running.
    ///
    /// The listener stops after handling a sign-out; the next sign-in starts
    /// a new one.
    pub(crate) async fn listen(&self) -> Result<()> {
        if self.is_listening() {
            return Ok(());
        }

        let mut subscription = self.context.config.broadcast_channel.subscribe().await?;
        let context = self.context.clone();

        let handle = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                match message {
                    BroadcastMessage::SignedOut => {
                        on_remote_sign_out(&context).await;
                        subscription.close();
                        break;
                    }
                    BroadcastMessage::SignedIn => on_remote_sign_in(&context).await,
                }
            }
            debug!("Broadcast listener stopped");
            context.emit_core(CoreEvent::Context(ContextEvent::ListenerClosed));
        });

        if let Some(previous) = self.lock_listener().replace(handle) {
            previous.abort();
        }
        debug!(channel = %self.context.config.channel_name, "Listening for session broadcasts");
        Ok(())
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.lock_listener()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub(crate) fn stop(&self) {
        if let Some(handle) = self.lock_listener().take() {
            handle.abort();
        }
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionBroadcaster {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn on_remote_sign_out(context: &SessionContext) {
    info!("Sibling context signed out");
    if let Err(e) = context.end_session(SignOutReason::RemoteSignOut).await {
        warn!(error = %e, "Failed to clear session after remote sign-out");
    }
    context.navigate(&context.config.routes.entry).await;
    context.emit_core(CoreEvent::Context(ContextEvent::RemoteSignedOut));
}

async fn on_remote_sign_in(context: &SessionContext) {
    info!("Sibling context signed in");
    context.emit_core(CoreEvent::Context(ContextEvent::RemoteSignedIn));

    match context.token_store.load().await {
        Ok(Some(tokens)) => {
            context.credential.set(tokens.access_token.clone()).await;
            match context.fetch_user(&tokens.access_token).await {
                Ok(user) => {
                    let email = user.email.clone();
                    context.set_user(user).await;
                    context.emit(AuthEvent::SessionRestored { email });
                }
                Err(e) => warn!(error = %e, "Failed to load user after remote sign-in"),
            }
        }
        Ok(None) => debug!("Remote sign-in without a persisted session"),
        Err(e) => warn!(error = %e, "Failed to read session after remote sign-in"),
    }

    let on_guest_route = match context.current_route().await {
        Some(route) => context.config.routes.is_guest_route(&route),
        None => false,
    };
    if on_guest_route {
        context.navigate(&context.config.routes.landing).await;
    }
}

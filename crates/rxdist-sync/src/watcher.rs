//! # Auth Session Watcher
//!
//! Bridges the identity provider's auth-state stream into the role store.
//!
//! ```text
//!   IdentityProvider ──broadcast──► watcher loop ──► RoleStore::handle_auth_event
//!                                       │
//!                                       ├── Lagged(n) ──► RoleStore::trigger(Resync)
//!                                       ├── Closed    ──► loop ends
//!                                       └── shutdown  ──► loop ends
//! ```

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rxdist_core::{AuthEvent, RefreshReason};

use crate::identity::IdentityProvider;
use crate::store::RoleStore;

/// Subscribes the role store to auth-state changes.
pub struct AuthSessionWatcher;

impl AuthSessionWatcher {
    /// Spawns the event loop. The subscription is taken before this
    /// returns, so no event emitted afterwards is missed.
    pub fn start(identity: Arc<dyn IdentityProvider>, store: RoleStore) -> AuthWatcherHandle {
        let events = identity.subscribe();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(Self::run(events, store, shutdown_rx));

        info!("Auth session watcher started");
        AuthWatcherHandle { shutdown_tx, task }
    }

    async fn run(
        mut events: broadcast::Receiver<AuthEvent>,
        store: RoleStore,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        debug!(event = %event, "Auth state change");
                        store.handle_auth_event(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth events dropped, resyncing role");
                        store.trigger(RefreshReason::Resync);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Auth event stream closed");
                        break;
                    }
                },

                _ = shutdown_rx.recv() => {
                    info!("Auth session watcher received shutdown");
                    break;
                }
            }
        }

        info!("Auth session watcher stopped");
    }
}

/// Handle for stopping a running watcher.
pub struct AuthWatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl AuthWatcherHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Auth session watcher ended abnormally");
        }
    }
}

//! Connectivity glue
//!
//! A [`ConnectivitySignal`] is the source of online/offline transitions
//! (a platform hook, or the daemon's periodic probe). The
//! [`ConnectivityMonitor`] forwards them into the engine.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::SyncEngine;

/// Manually driven online/offline source
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Publishes the current connectivity; repeated values are dropped
    pub fn set(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Forwards connectivity changes to a [`SyncEngine`]
pub struct ConnectivityMonitor;

impl ConnectivityMonitor {
    /// Spawns the forwarding task
    ///
    /// The current value of `rx` is applied first. The task ends when
    /// `cancel` fires or the signal is dropped.
    pub fn spawn(
        engine: Arc<SyncEngine>,
        mut rx: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let online = *rx.borrow_and_update();
            engine.set_online(online).await;

            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            debug!("Connectivity signal dropped");
                            break;
                        }
                        let online = *rx.borrow_and_update();
                        debug!(online, "Connectivity changed");
                        engine.set_online(online).await;
                    }
                    _ = cancel.cancelled() => break,
                }
            }

            info!("Connectivity monitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_drops_repeated_values() {
        let signal = ConnectivitySignal::new(true);
        let mut rx = signal.subscribe();
        rx.borrow_and_update();

        signal.set(true);
        assert!(!rx.has_changed().unwrap());

        signal.set(false);
        assert!(rx.has_changed().unwrap());
        assert!(!signal.is_online());
    }
}

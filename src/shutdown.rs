//! Shutdown and cancellation signalling.
//!
//! [`ShutdownCoordinator`] stops background workers such as the chunk
//! reclaimer. [`CancelToken`] is checked by a deletion walk between pages and
//! before each descent; a token derived from a coordinator is cancelled when
//! the coordinator shuts down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shutdown signal shared by the reclaim worker and derived cancel tokens.
///
/// The watch value flips to `true` once and never goes back.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    state: Arc<watch::Sender<bool>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// A receiver observing the shutdown flag.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.state.borrow()
    }

    /// Initiate shutdown. Later calls are no-ops.
    pub fn shutdown(&self) {
        let started = self.state.send_if_modified(|down| !std::mem::replace(down, true));
        if started {
            info!("Initiating filer shutdown");
        }
    }

    /// Resolve once shutdown has been initiated.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.watch();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|down| *down).await;
    }

    /// A cancellation token that fires when this coordinator shuts down.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            parent: Some(self.watch()),
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation signal for a single deletion call.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    parent: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and all of its clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.parent.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

//! Single-flight run state for the dispatch loop

use std::sync::Arc;

use tokio::sync::watch;

/// Tracks whether a dispatch loop is active
///
/// "Is a loop running" and "start a loop" are one atomic step: the transition
/// from idle to active happens inside `send_if_modified`.
#[derive(Debug)]
pub struct RunState {
    active: Arc<watch::Sender<bool>>,
}

/// Proof of ownership of the active slot
///
/// Dropping it marks the loop idle, including on panic.
#[derive(Debug)]
pub struct RunGuard {
    active: Arc<watch::Sender<bool>>,
}

impl RunState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            active: Arc::new(tx),
        }
    }

    /// Claim the active slot if no loop holds it
    pub fn try_acquire(&self) -> Option<RunGuard> {
        let acquired = self.active.send_if_modified(|active| {
            if *active {
                false
            } else {
                *active = true;
                true
            }
        });

        acquired.then(|| RunGuard {
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Resolve once no loop holds the active slot
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|active| !*active).await;
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.send_replace(false);
    }
}

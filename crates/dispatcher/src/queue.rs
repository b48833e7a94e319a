//! PendingQueue - ordered buffer of undelivered messages

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use contracts::OutboundMessage;

/// FIFO queue shared by trigger calls and the dispatch loop
///
/// Every operation runs inside one critical section. The lock is never held
/// across an await point.
#[derive(Debug, Default)]
pub struct PendingQueue {
    messages: Mutex<VecDeque<OutboundMessage>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append messages, keeping their order
    pub fn enqueue_all(&self, messages: impl IntoIterator<Item = OutboundMessage>) -> usize {
        self.enqueue_all_with(messages, |_| {})
    }

    /// `enqueue_all`, reporting the new length while the lock is still held
    ///
    /// Depth reports from concurrent callers are therefore applied in the
    /// same order as the mutations they describe.
    pub fn enqueue_all_with(
        &self,
        messages: impl IntoIterator<Item = OutboundMessage>,
        on_depth: impl FnOnce(usize),
    ) -> usize {
        let mut queue = self.lock();
        queue.extend(messages);
        let depth = queue.len();
        on_depth(depth);
        depth
    }

    /// Front message, if any
    pub fn peek_front(&self) -> Option<OutboundMessage> {
        self.lock().front().cloned()
    }

    /// Remove the message with the given id
    ///
    /// Returns false when it was already gone.
    pub fn remove(&self, id: Uuid) -> bool {
        self.remove_with(id, |_| {})
    }

    /// `remove`, reporting the resulting length while the lock is still held
    pub fn remove_with(&self, id: Uuid, on_depth: impl FnOnce(usize)) -> bool {
        let mut queue = self.lock();
        let removed = match queue.iter().position(|m| m.id == id) {
            Some(index) => queue.remove(index).is_some(),
            None => false,
        };
        on_depth(queue.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current contents, front first
    pub fn snapshot(&self) -> Vec<OutboundMessage> {
        self.lock().iter().cloned().collect()
    }

    // A panic while holding the lock cannot leave the deque half-mutated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<OutboundMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! [`EventSlot`] – a capacity-one channel where the newest value wins.
//!
//! Publishing never blocks: a value that has not been consumed yet is
//! replaced by the new one and is lost for good.
//!
//! Clone the slot cheaply – all clones share the same storage.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};

struct Inner<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
}

/// Single-slot, overwrite-on-full channel.
pub struct EventSlot<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for EventSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                value: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Store `value`, returning the unread value it replaced, if any.
    pub fn publish(&self, value: T) -> Option<T> {
        let replaced = self.value().replace(value);
        self.inner.notify.notify_one();
        replaced
    }

    /// Take the pending value without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.value().take()
    }

    /// Discard the pending value.  Returns how many values were dropped
    /// (zero or one).
    pub fn drain(&self) -> usize {
        usize::from(self.value().take().is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.value().is_none()
    }

    /// Wait up to `timeout` for a value.
    pub async fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(value) = self.try_take() {
                return Some(value);
            }
            // notify_one stores a permit when nobody is waiting, so a publish
            // between the check above and this await is not lost.
            if timeout_at(deadline, self.inner.notify.notified()).await.is_err() {
                return self.try_take();
            }
        }
    }

    fn value(&self) -> MutexGuard<'_, Option<T>> {
        self.inner
            .value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

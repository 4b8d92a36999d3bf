//! Rendezvous latch for fan-outs of jobs

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::Notify;

/// Atomically decremented latch
///
/// A fan-out of `n` jobs shares one counter; each job decrements it when done
/// and waiters resume once it reaches zero or below. Waiting suspends the
/// calling task only, never the OS thread it runs on.
#[derive(Debug)]
pub struct Counter {
    remaining: AtomicI64,
    notify: Notify,
}

impl Counter {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicI64::new(count as i64),
            notify: Notify::new(),
        }
    }

    /// Decrement by one, waking every waiter if this reaches zero
    pub fn decrement(&self) {
        let previous = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if previous <= 1 {
            self.notify.notify_waiters();
        }
    }

    /// Non-blocking snapshot of the remaining count
    pub fn get(&self) -> i64 {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_done(&self) -> bool {
        self.get() <= 0
    }

    /// Suspend the current task until the count reaches zero
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a decrement between the check and the await is not lost
            notified.as_mut().enable();
            if self.is_done() {
                return;
            }
            notified.await;
        }
    }
}

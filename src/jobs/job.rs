//! Units of deferred work

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::counter::Counter;

/// Boxed body of a job
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A unit of deferred work plus the counter it reports completion to
pub struct Job {
    work: JobFuture,
    counter: Option<Arc<Counter>>,
}

impl Job {
    pub fn new<F>(work: F, counter: Option<Arc<Counter>>) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            work: Box::pin(work),
            counter,
        }
    }

    /// Job whose body is a plain closure with no suspension points
    pub fn from_fn<F>(f: F, counter: Option<Arc<Counter>>) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(async move { f() }, counter)
    }

    /// Run the body to completion, then decrement the counter if there is one
    ///
    /// A panic in the body aborts the process; the counter is never decremented.
    pub async fn run(self) {
        let _guard = AbortOnPanic;
        self.work.await;
        if let Some(counter) = self.counter {
            counter.decrement();
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("work", &"<future>")
            .field("counter", &self.counter.as_ref().map(|c| c.get()))
            .finish()
    }
}

/// Aborts the process if dropped during a panic unwind
///
/// The runtime would otherwise catch a panicking task and leave every waiter on
/// its counter suspended forever.
pub(crate) struct AbortOnPanic;

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!("job panicked, aborting");
            std::process::abort();
        }
    }
}

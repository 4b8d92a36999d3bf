//! Bounded job queue shared by both schedulers

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::counter::Counter;
use super::job::Job;
use crate::core::error::Error;
use crate::core::types::Result;

/// Receiving end shared by every cooperative task of one scheduler
pub(crate) type JobReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>;

/// Submission handle for a scheduler's bounded queue
///
/// Cheap to clone. Submitting to a full queue suspends the submitting task until
/// a slot frees up; nothing is dropped.
#[derive(Clone)]
pub struct JobQueue {
    name: &'static str,
    sender: Arc<Mutex<Option<mpsc::Sender<Job>>>>,
}

/// Create a queue and the receiver its scheduler drains
pub(crate) fn job_queue(name: &'static str, capacity: usize) -> (JobQueue, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let queue = JobQueue {
        name,
        sender: Arc::new(Mutex::new(Some(tx))),
    };
    (queue, Arc::new(tokio::sync::Mutex::new(rx)))
}

impl JobQueue {
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn sender(&self) -> Result<mpsc::Sender<Job>> {
        lock(&self.sender).clone().ok_or(Error::SchedulerClosed)
    }

    /// Enqueue a job, waiting for space if the queue is at capacity
    pub async fn submit(&self, job: Job) -> Result<()> {
        self.sender()?
            .send(job)
            .await
            .map_err(|_| Error::SchedulerClosed)
    }

    /// Enqueue from a thread outside any runtime
    ///
    /// Panics if called from within an async context, like
    /// `tokio::sync::mpsc::Sender::blocking_send`.
    pub fn submit_blocking(&self, job: Job) -> Result<()> {
        self.sender()?
            .blocking_send(job)
            .map_err(|_| Error::SchedulerClosed)
    }

    /// Enqueue `work`, decrementing `counter` once it completes
    pub async fn run_job<F>(&self, work: F, counter: Option<Arc<Counter>>) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.submit(Job::new(work, counter)).await
    }

    /// Run `f` on this queue's scheduler and wait for its result
    ///
    /// Must not be awaited from a job of the same scheduler when every one of its
    /// tasks could be waiting the same way.
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let counter = Arc::new(Counter::new(1));
        let slot = Arc::new(Mutex::new(None));
        let out = Arc::clone(&slot);
        self.submit(Job::from_fn(move || *lock(&out) = Some(f()), Some(Arc::clone(&counter))))
            .await?;
        counter.wait().await;
        let result = lock(&slot).take();
        result.ok_or(Error::SchedulerClosed)
    }

    /// Stop accepting jobs; queued jobs still run
    pub fn close(&self) {
        if lock(&self.sender).take().is_some() {
            log::debug!("{} queue closed", self.name);
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.sender).is_none()
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Body of every cooperative task: pop and run jobs until the queue closes
pub(crate) async fn drain(receiver: JobReceiver) {
    loop {
        let job = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        match job {
            Some(job) => job.run().await,
            None => break,
        }
    }
}

/// Lock a std mutex, ignoring poisoning; job panics abort the process anyway
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_and_drain() {
        let (queue, receiver) = job_queue("test", 4);
        let consumer = tokio::spawn(drain(receiver));

        let counter = Arc::new(Counter::new(10));
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let hits = Arc::clone(&hits);
            queue
                .run_job(async move { hits.fetch_add(1, Ordering::SeqCst); }, Some(Arc::clone(&counter)))
                .await
                .unwrap();
        }
        counter.wait().await;
        assert_eq!(hits.load(Ordering::SeqCst), 10);

        queue.close();
        tokio::time::timeout(Duration::from_secs(5), consumer).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_call_returns_value() {
        let (queue, receiver) = job_queue("test", 1);
        tokio::spawn(drain(receiver));
        let value = queue.call(|| 6 * 7).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let (queue, _receiver) = job_queue("test", 1);
        let clone = queue.clone();
        queue.close();
        assert!(clone.is_closed());
        let err = clone.submit(Job::from_fn(|| {}, None)).await.unwrap_err();
        assert!(matches!(err, Error::SchedulerClosed));
    }

    #[tokio::test]
    async fn test_full_queue_applies_backpressure() {
        let (queue, receiver) = job_queue("test", 1);
        queue.submit(Job::from_fn(|| {}, None)).await.unwrap();

        // Nothing drains yet, so the second submission has to wait
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            queue.submit(Job::from_fn(|| {}, None)),
        )
        .await;
        assert!(blocked.is_err());

        tokio::spawn(drain(receiver));
        tokio::time::timeout(Duration::from_secs(5), queue.submit(Job::from_fn(|| {}, None)))
            .await
            .expect("submission stayed blocked after draining started")
            .unwrap();
    }
}

//! Worker scheduler: a fixed pool of OS threads multiplexing cooperative tasks

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use super::counter::Counter;
use super::queue::{drain, job_queue, JobQueue};
use crate::core::config::StreamingConfig;
use crate::core::error::Error;
use crate::core::types::Result;

/// How long `stop` waits for the runtime's threads after the queue drained
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of worker threads, each running many job-pulling tasks
///
/// Jobs run on whichever worker thread picks them up. Nothing submitted here
/// may touch presentation-only resources; route that through the presentation
/// queue instead.
pub struct WorkerScheduler {
    runtime: Option<Runtime>,
    queue: JobQueue,
    consumers: Vec<JoinHandle<()>>,
    threads: usize,
}

impl WorkerScheduler {
    /// Spawn `config.worker_threads` threads and their cooperative tasks
    pub fn start(config: &StreamingConfig) -> Result<Self> {
        let threads = config.worker_threads.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("cellstream-worker")
            .enable_time()
            .build()?;

        let (queue, receiver) = job_queue("worker", config.worker_queue_capacity);
        let task_count = threads * config.worker_tasks_per_thread.max(1);
        let consumers = (0..task_count)
            .map(|_| runtime.spawn(drain(Arc::clone(&receiver))))
            .collect();

        log::info!(
            "Worker scheduler started: {} threads, {} tasks, queue capacity {}",
            threads,
            task_count,
            config.worker_queue_capacity
        );

        Ok(Self {
            runtime: Some(runtime),
            queue,
            consumers,
            threads,
        })
    }

    /// Submission handle for this scheduler's queue
    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Enqueue `work`, waiting for space if the queue is full
    pub async fn run_job<F>(&self, work: F, counter: Option<Arc<Counter>>) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.queue.run_job(work, counter).await
    }

    /// Wait for a fan-out of jobs
    pub async fn wait_on(&self, counter: &Counter) {
        counter.wait().await
    }

    /// Drive a future to completion on the worker runtime from outside any runtime
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = self.runtime.as_ref().ok_or(Error::SchedulerClosed)?;
        Ok(runtime.block_on(future))
    }

    /// Close the queue, let queued jobs finish, and join every thread
    ///
    /// Must be called from outside any async context.
    pub fn stop(mut self) {
        self.queue.close();
        if let Some(runtime) = self.runtime.take() {
            let consumers = std::mem::take(&mut self.consumers);
            runtime.block_on(async move {
                for consumer in consumers {
                    if let Err(e) = consumer.await {
                        log::error!("Worker task failed: {}", e);
                    }
                }
            });
            runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
        }
        log::info!("Worker scheduler stopped");
    }
}

impl Drop for WorkerScheduler {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            self.queue.close();
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Job;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn small_config() -> StreamingConfig {
        StreamingConfig {
            worker_threads: 2,
            worker_tasks_per_thread: 4,
            worker_queue_capacity: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_runs_all_jobs_before_stop() {
        let workers = WorkerScheduler::start(&small_config()).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::new(Counter::new(100));

        workers
            .block_on(async {
                for _ in 0..100 {
                    let hits = Arc::clone(&hits);
                    workers
                        .run_job(async move { hits.fetch_add(1, Ordering::SeqCst); }, Some(Arc::clone(&counter)))
                        .await
                        .unwrap();
                }
                workers.wait_on(&counter).await;
            })
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 100);
        workers.stop();
    }

    #[test]
    fn test_jobs_run_on_worker_threads() {
        let workers = WorkerScheduler::start(&small_config()).unwrap();
        let names = Arc::new(Mutex::new(HashSet::new()));
        let counter = Arc::new(Counter::new(32));

        let queue = workers.queue();
        for _ in 0..32 {
            let names = Arc::clone(&names);
            queue
                .submit_blocking(Job::from_fn(
                    move || {
                        let name = std::thread::current().name().map(str::to_owned);
                        names.lock().unwrap().insert(name);
                    },
                    Some(Arc::clone(&counter)),
                ))
                .unwrap();
        }
        workers.block_on(counter.wait()).unwrap();

        let names = names.lock().unwrap();
        assert!(names.iter().all(|n| n.as_deref() == Some("cellstream-worker")));
        workers.stop();
    }

    #[test]
    fn test_queue_closed_after_stop() {
        let workers = WorkerScheduler::start(&small_config()).unwrap();
        let queue = workers.queue();
        workers.stop();
        assert!(queue.is_closed());
        assert!(matches!(
            queue.submit_blocking(Job::from_fn(|| {}, None)),
            Err(Error::SchedulerClosed)
        ));
    }

    #[test]
    fn test_jobs_can_wait_on_nested_fan_out() {
        let workers = WorkerScheduler::start(&small_config()).unwrap();
        let queue = workers.queue();
        let leaves = Arc::new(AtomicUsize::new(0));
        let outer = Arc::new(Counter::new(4));

        workers
            .block_on(async {
                for _ in 0..4 {
                    let inner_queue = queue.clone();
                    let leaves = Arc::clone(&leaves);
                    queue
                        .run_job(
                            async move {
                                let inner = Arc::new(Counter::new(3));
                                for _ in 0..3 {
                                    let leaves = Arc::clone(&leaves);
                                    inner_queue
                                        .run_job(async move { leaves.fetch_add(1, Ordering::SeqCst); }, Some(Arc::clone(&inner)))
                                        .await
                                        .unwrap();
                                }
                                inner.wait().await;
                            },
                            Some(Arc::clone(&outer)),
                        )
                        .await
                        .unwrap();
                }
                outer.wait().await;
            })
            .unwrap();

        assert_eq!(leaves.load(Ordering::SeqCst), 12);
        workers.stop();
    }
}

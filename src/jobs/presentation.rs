//! Presentation scheduler: cooperative tasks bound to one designated thread

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use tokio::task::LocalSet;

use super::counter::Counter;
use super::job::AbortOnPanic;
use super::queue::{drain, job_queue, JobQueue};
use crate::core::config::StreamingConfig;
use crate::core::error::Error;
use crate::core::types::Result;

thread_local! {
    static PRESENTATION_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Whether the calling thread is currently running a presentation scheduler
pub fn on_presentation_thread() -> bool {
    PRESENTATION_THREAD.with(Cell::get)
}

struct PresentationThreadMark;

impl PresentationThreadMark {
    fn set() -> Self {
        PRESENTATION_THREAD.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for PresentationThreadMark {
    fn drop(&mut self) {
        PRESENTATION_THREAD.with(|flag| flag.set(false));
    }
}

/// Scheduler whose jobs always execute on the thread that started it
///
/// Jobs submitted through its queue from any thread, worker tasks included,
/// run on that thread, so they may touch thread-affine resources such as GPU
/// state.
pub struct PresentationScheduler;

impl PresentationScheduler {
    /// Take over the calling thread until `initial` completes
    ///
    /// Spawns the cooperative job-pulling tasks on this thread, runs `initial`
    /// (given the presentation queue) to completion, then closes the queue and
    /// lets the remaining queued jobs finish before returning its output.
    pub fn start<F, Fut, R>(config: &StreamingConfig, initial: F) -> Result<R>
    where
        F: FnOnce(JobQueue) -> Fut + 'static,
        Fut: Future<Output = R> + 'static,
        R: 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let local = LocalSet::new();
        let (queue, receiver) = job_queue("presentation", config.presentation_queue_capacity);
        let task_count = config.presentation_tasks.max(1);
        let _mark = PresentationThreadMark::set();

        log::info!(
            "Presentation scheduler started on {:?}: {} tasks, queue capacity {}",
            std::thread::current().id(),
            task_count,
            config.presentation_queue_capacity
        );

        let output = local.block_on(&runtime, async move {
            let consumers: Vec<_> = (0..task_count)
                .map(|_| tokio::task::spawn_local(drain(Arc::clone(&receiver))))
                .collect();

            let done = Arc::new(Counter::new(1));
            let slot = Rc::new(RefCell::new(None));
            {
                let done = Arc::clone(&done);
                let slot = Rc::clone(&slot);
                let queue = queue.clone();
                tokio::task::spawn_local(async move {
                    let _guard = AbortOnPanic;
                    let output = initial(queue).await;
                    *slot.borrow_mut() = Some(output);
                    done.decrement();
                });
            }
            done.wait().await;

            queue.close();
            for consumer in consumers {
                if let Err(e) = consumer.await {
                    log::error!("Presentation task failed: {}", e);
                }
            }
            slot.borrow_mut().take()
        });

        log::info!("Presentation scheduler stopped");
        output.ok_or_else(|| Error::Runtime("initial presentation job produced no output".into()))
    }
}

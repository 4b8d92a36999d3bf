//! Two-tier job scheduling
//!
//! - `WorkerScheduler`: a fixed pool of OS threads, each multiplexing many
//!   cooperative tasks that pull jobs from one bounded queue
//! - `PresentationScheduler`: the same queue abstraction, but every job runs on
//!   the single thread that started it
//! - `Counter`: the only rendezvous primitive between the two

pub mod counter;
pub mod job;
pub mod queue;
pub mod worker;
pub mod presentation;

pub use counter::Counter;
pub use job::{Job, JobFuture};
pub use queue::JobQueue;
pub use worker::WorkerScheduler;
pub use presentation::{on_presentation_thread, PresentationScheduler};

/// Scheduler context handed to every component that submits work
#[derive(Clone, Debug)]
pub struct Schedulers {
    /// Queue for work that may run on any worker thread
    pub worker: JobQueue,
    /// Queue for work that must run on the presentation thread
    pub presentation: JobQueue,
}

impl Schedulers {
    pub fn new(worker: JobQueue, presentation: JobQueue) -> Self {
        Self {
            worker,
            presentation,
        }
    }
}

//! Background worker pipe for tile load jobs.
//!
//! [`TaskPipe`] wraps a dedicated multi-threaded tokio runtime and tracks
//! outstanding jobs so the owner can drain them on teardown. Launching is
//! non-blocking; `wait_until_empty` is the only blocking operation and is
//! meant for the destructor path, never the frame loop.

use std::future::Future;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors that can occur while constructing the pipe.
#[derive(Debug, Error)]
pub enum PipeError {
    /// The tokio runtime could not be created.
    #[error("failed to create worker runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Outstanding-work bookkeeping shared with every launched job.
struct WorkTracker {
    outstanding: Mutex<usize>,
    drained: Condvar,
}

impl WorkTracker {
    fn begin(&self) {
        *self.outstanding.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.outstanding.lock();
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn count(&self) -> usize {
        *self.outstanding.lock()
    }

    fn wait_until_empty(&self) {
        let mut count = self.outstanding.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }
}

/// Decrements the tracker when the job ends, including on panic, so a
/// crashing job can never wedge the teardown drain.
struct WorkGuard(Arc<WorkTracker>);

impl Drop for WorkGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// A bounded worker pool running tile load jobs off the frame thread.
pub struct TaskPipe {
    runtime: tokio::runtime::Runtime,
    tracker: Arc<WorkTracker>,
}

impl TaskPipe {
    /// Creates a pipe with `worker_threads` runtime workers. `name` labels
    /// the worker threads for diagnostics.
    pub fn new(name: &str, worker_threads: usize) -> Result<Self, PipeError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name(name)
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            tracker: Arc::new(WorkTracker {
                outstanding: Mutex::new(0),
                drained: Condvar::new(),
            }),
        })
    }

    /// Launches a job onto the pipe. Never blocks the calling thread.
    pub fn launch<F>(&self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.begin();
        let guard = WorkGuard(Arc::clone(&self.tracker));
        self.runtime.spawn(async move {
            let _guard = guard;
            job.await;
        })
    }

    /// True while at least one launched job has not finished.
    pub fn has_work(&self) -> bool {
        self.tracker.count() > 0
    }

    /// Number of launched jobs that have not finished.
    pub fn outstanding(&self) -> usize {
        self.tracker.count()
    }

    /// Blocks until every launched job has finished. Teardown only.
    pub fn wait_until_empty(&self) {
        self.tracker.wait_until_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_launch_runs_job() {
        let pipe = TaskPipe::new("test-pipe", 2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        pipe.launch(async move {
            c.fetch_add(1, Ordering::SeqCst);
        });

        pipe.wait_until_empty();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!pipe.has_work());
    }

    #[test]
    fn test_has_work_while_job_pending() {
        let pipe = TaskPipe::new("test-pipe", 2).unwrap();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        pipe.launch(async move {
            let _ = release_rx.await;
        });

        assert!(pipe.has_work());
        assert_eq!(pipe.outstanding(), 1);

        release_tx.send(()).unwrap();
        pipe.wait_until_empty();
        assert_eq!(pipe.outstanding(), 0);
    }

    #[test]
    fn test_wait_until_empty_drains_many_jobs() {
        let pipe = TaskPipe::new("test-pipe", 4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..32 {
            let c = Arc::clone(&counter);
            pipe.launch(async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                c.fetch_add(1, Ordering::SeqCst);
            });
        }

        pipe.wait_until_empty();
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn test_panicking_job_still_drains() {
        let pipe = TaskPipe::new("test-pipe", 2).unwrap();

        pipe.launch(async move {
            panic!("job blew up");
        });

        // Must not hang: the work guard releases on unwind.
        pipe.wait_until_empty();
        assert!(!pipe.has_work());
    }
}

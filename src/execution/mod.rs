//! Task execution for lazily planned chunk work.
//!
//! Planning produces [`Tileable`] handles whose chunks are independent
//! closures. A [`TaskExecutor`] materializes them, either inline on the
//! calling thread or on a rayon pool.

pub mod tileable;

pub use tileable::{ChunkTask, Tileable};

use crate::config::BaggingConfig;
use crate::core::error::{BaggingError, Result};

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// Pending result of a submitted task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    fn channel() -> (mpsc::Sender<Result<T>>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, TaskHandle { receiver })
    }

    /// Block until the task finishes
    pub fn wait(self) -> Result<T> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(BaggingError::task_failed("task ended without a result")))
    }
}

/// Runs chunk tasks.
pub trait TaskExecutor: Send + Sync {
    /// Schedule `task` and return a handle to its result
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static;

    /// Number of tasks that can run at once
    fn parallelism(&self) -> usize;
}

fn run_guarded<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(BaggingError::task_failed(format!("task panicked: {}", message)))
    })
}

/// Executes every task immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (sender, handle) = TaskHandle::channel();
        let _ = sender.send(run_guarded(task));
        handle
    }

    fn parallelism(&self) -> usize {
        1
    }
}

/// Executes tasks on a dedicated rayon thread pool.
#[derive(Debug, Clone)]
pub struct RayonExecutor {
    pool: Arc<rayon::ThreadPool>,
}

impl RayonExecutor {
    /// Create a pool with `num_threads` workers, 0 meaning one per core
    pub fn new(num_threads: usize) -> Result<Self> {
        let num_threads = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("bagging-worker-{}", i))
            .build()
            .map_err(|e| BaggingError::internal(format!("Failed to create thread pool: {}", e)))?;
        log::debug!("created rayon executor with {} threads", num_threads);
        Ok(RayonExecutor {
            pool: Arc::new(pool),
        })
    }

    /// Create a pool sized by [`BaggingConfig::effective_num_threads`]
    pub fn from_config(config: &BaggingConfig) -> Result<Self> {
        Self::new(config.effective_num_threads())
    }
}

impl TaskExecutor for RayonExecutor {
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (sender, handle) = TaskHandle::channel();
        self.pool.spawn(move || {
            let _ = sender.send(run_guarded(task));
        });
        handle
    }

    fn parallelism(&self) -> usize {
        self.pool.current_num_threads()
    }
}

//! Bounded worker pool
//!
//! Model and transcription calls are offloaded here so per-call loops
//! never wait on an unbounded set of in-flight requests. The pool is a
//! fixed number of permits; callers queue when all permits are taken.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::Error;

/// Fixed-size worker pool with submit/detach semantics
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool with `size` concurrent slots (minimum 1)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Run a task on the pool and await its result.
    ///
    /// Queues until a permit is free, so concurrent submissions are
    /// bounded by the pool size.
    pub async fn submit<F, T>(&self, task: F) -> Result<T, Error>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Worker("pool closed".to_string()))?;

        let handle = tokio::spawn(async move {
            let out = task.await;
            drop(permit);
            out
        });

        handle.await.map_err(|e| Error::Worker(e.to_string()))
    }

    /// Run a task on the pool without awaiting it.
    ///
    /// The caller returns immediately; the task itself waits for a
    /// permit, so the pool still bounds concurrency.
    pub fn dispatch<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!("Worker pool closed before task could start");
                    return;
                }
            };
            task.await;
        });
    }

    /// Configured pool size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Currently free slots
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

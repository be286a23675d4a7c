//! Bounded pool for blocking classification work.
//!
//! Reflection-heavy analysis must not stall the coordinator's command loop,
//! so jobs run on tokio's blocking threads. A semaphore caps how many run at
//! once.

use crate::error::WorkerError;
use crate::registry::panic_message;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Runs `job` on a blocking thread once a permit is free.
    ///
    /// A panicking job surfaces as `WorkerError::JobFailed`, never as a
    /// panic in the caller.
    pub async fn run<F, T>(&self, job: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;
        trace!("Worker permit acquired ({} left)", self.permits.available_permits());

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                WorkerError::JobFailed(panic_message(e.into_panic().as_ref()))
            } else {
                WorkerError::JobFailed(e.to_string())
            }
        })
    }

    /// Rejects all future jobs. Running jobs finish.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.expect("task").expect("job");
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_panicking_job_becomes_error() {
        let pool = WorkerPool::new(1);
        let result: Result<(), _> = pool.run(|| panic!("inspector exploded")).await;
        match result {
            Err(WorkerError::JobFailed(msg)) => assert!(msg.contains("inspector exploded")),
            other => panic!("unexpected: {:?}", other),
        }
        // The permit is released even though the job panicked
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_jobs() {
        let pool = WorkerPool::new(1);
        pool.close();
        assert!(matches!(pool.run(|| 1).await, Err(WorkerError::Closed)));
    }
}

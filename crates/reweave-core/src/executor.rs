use crate::domain::thread_pool::{ThreadPool, WaitGroup};

/// How a batch of independent work units is executed: inline on the
/// calling thread, or fanned out over a fixed worker pool with a
/// fork-join barrier.
pub enum Executor {
    Serial,
    WorkerPool(ThreadPool),
}

impl Executor {
    pub fn serial() -> Self {
        Executor::Serial
    }

    pub fn worker_pool(num_workers: usize) -> Self {
        Executor::WorkerPool(ThreadPool::new(num_workers))
    }

    /// A worker pool sized to the machine.
    pub fn default_parallel() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::worker_pool(workers)
    }

    pub fn num_workers(&self) -> usize {
        match self {
            Executor::Serial => 1,
            Executor::WorkerPool(pool) => pool.num_workers(),
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Executor::WorkerPool(_))
    }

    /// Run every job and return their results in submission order. The
    /// call blocks until the whole batch has completed.
    pub fn execute_batch<F, R>(&self, jobs: Vec<F>) -> Vec<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self {
            Executor::Serial => jobs.into_iter().map(|job| job()).collect(),
            Executor::WorkerPool(pool) => {
                let wg = WaitGroup::new();
                let handles: Vec<_> = jobs
                    .into_iter()
                    .map(|job| {
                        let guard = wg.guard();
                        pool.submit_with_result(move || {
                            let result = job();
                            drop(guard);
                            result
                        })
                    })
                    .collect();
                wg.wait();
                handles.into_iter().filter_map(|h| h.join()).collect()
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Executor::Serial => write!(f, "Executor::Serial"),
            Executor::WorkerPool(pool) => {
                write!(f, "Executor::WorkerPool({})", pool.num_workers())
            }
        }
    }
}

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Work(Job),
    Terminate,
}

/// Blocking handle to the result of a job submitted with
/// [ThreadPool::submit_with_result].
pub struct JobHandle<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Block until the job's result is available. Returns `None` if the
    /// job panicked and dropped its sender.
    pub fn join(self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

/// A fixed-size pool of worker threads sharing one job queue. Workers are
/// reused across jobs and joined when the pool is dropped.
pub struct ThreadPool {
    sender: mpsc::Sender<Message>,
    workers: Vec<Option<thread::JoinHandle<()>>>,
}

impl ThreadPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Message>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("reweave-worker-{index}"))
                    .spawn(move || {
                        loop {
                            let message = {
                                let guard = match receiver.lock() {
                                    Ok(guard) => guard,
                                    Err(_) => return,
                                };
                                guard.recv()
                            };
                            match message {
                                Ok(Message::Work(job)) => job(),
                                Ok(Message::Terminate) | Err(_) => return,
                            }
                        }
                    })
                    .ok()
            })
            .collect();

        ThreadPool { sender, workers }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Fire-and-forget submission.
    pub fn submit<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let _ = self.sender.send(Message::Work(Box::new(f)));
    }

    /// Submit a job whose result can be collected later through the
    /// returned handle.
    pub fn submit_with_result<F, T>(&self, f: F) -> JobHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.submit(move || {
            let _ = tx.send(f());
        });
        JobHandle { receiver: rx }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.sender.send(Message::Terminate);
        }
        for worker in self.workers.iter_mut() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_workers", &self.num_workers())
            .finish()
    }
}

/// Counts outstanding guards and lets one thread wait for all of them to
/// drop. Used to turn fire-and-forget submissions into a fork-join
/// barrier.
#[derive(Clone, Default)]
pub struct WaitGroup {
    state: Arc<(Mutex<usize>, Condvar)>,
}

pub struct WaitGuard {
    state: Arc<(Mutex<usize>, Condvar)>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self) -> WaitGuard {
        let (count, _) = &*self.state;
        if let Ok(mut count) = count.lock() {
            *count += 1;
        }
        WaitGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Block until every outstanding guard has been dropped.
    pub fn wait(&self) {
        let (count, signal) = &*self.state;
        let Ok(mut count) = count.lock() else {
            return;
        };
        while *count > 0 {
            count = match signal.wait(count) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        let (count, signal) = &*self.state;
        if let Ok(mut count) = count.lock() {
            *count = count.saturating_sub(1);
            if *count == 0 {
                signal.notify_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn jobs_run_and_results_return() {
        let pool = ThreadPool::new(4);
        let handles: Vec<_> = (0..8)
            .map(|i| pool.submit_with_result(move || i * 2))
            .collect();
        let mut results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn wait_group_joins_all_submissions() {
        let pool = ThreadPool::new(3);
        let counter = Arc::new(AtomicUsize::new(0));
        let wg = WaitGroup::new();
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            let guard = wg.guard();
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(guard);
            });
        }
        wg.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn dropping_the_pool_joins_workers() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::new(2);
            for _ in 0..4 {
                let counter = Arc::clone(&counter);
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }
}

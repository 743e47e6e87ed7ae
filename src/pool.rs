//! Shared-queue thread pool driving all firing work.
//!
//! A fixed set of worker threads plus the caller of [`Pool::join_all`]
//! pull boxed closures from one FIFO queue. Stopping is cooperative: a
//! stop request is honored only when a worker observes the queue
//! empty, so every unit of work submitted before quiescence still
//! runs.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, trace};

use crate::utils::lock;

pub type Work = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    state: Mutex<QueueState>,
    cvar: Condvar,
}

struct QueueState {
    queue: VecDeque<Work>,
    stop: bool,
}

/// Cloneable submission/stop capability, safe to use from any thread,
/// including from inside running work items.
#[derive(Clone)]
pub struct PoolHandle {
    shared: Arc<Shared>,
}

impl PoolHandle {
    pub fn submit(&self, work: Work) {
        {
            let mut state = lock(&self.shared.state);
            state.queue.push_back(work);
        }
        self.shared.cvar.notify_one();
    }

    /// Marks that workers may exit once the queue is observed empty.
    pub fn request_stop(&self) {
        {
            let mut state = lock(&self.shared.state);
            state.stop = true;
        }
        self.shared.cvar.notify_all();
    }

    pub fn stop_requested(&self) -> bool {
        lock(&self.shared.state).stop
    }
}

pub struct Pool {
    handle: PoolHandle,
    workers: Vec<JoinHandle<()>>,
}

impl Pool {
    pub fn new(threads: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                stop: false,
            }),
            cvar: Condvar::new(),
        });
        let handle = PoolHandle { shared };
        let workers = (0..threads)
            .map(|i| {
                let handle = handle.clone();
                thread::Builder::new()
                    .name(format!("pnflow-worker-{i}"))
                    .spawn(move || worker_loop(&handle))
                    .expect("failed to spawn pool worker")
            })
            .collect();
        debug!("pool started with {threads} worker threads");
        Self { handle, workers }
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// Drains the pool: the calling thread runs the worker loop itself
    /// (it is not idle while workers run), then joins every worker.
    /// Returns only after all workers have exited.
    pub fn join_all(self) {
        worker_loop(&self.handle);
        for worker in self.workers {
            let _ = worker.join();
        }
        debug!("pool drained, all workers joined");
    }
}

fn worker_loop(handle: &PoolHandle) {
    loop {
        let work = {
            let mut state = lock(&handle.shared.state);
            loop {
                if let Some(work) = state.queue.pop_front() {
                    break Some(work);
                }
                if state.stop {
                    break None;
                }
                state = handle
                    .shared
                    .cvar
                    .wait(state)
                    .unwrap_or_else(|e| e.into_inner());
            }
        };
        match work {
            Some(work) => work(),
            None => {
                trace!("worker exiting, queue empty and stop requested");
                return;
            }
        }
    }
}

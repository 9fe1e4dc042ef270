//! Fixed-size fork-join worker group
//!
//! The engine executes each tile row as one or more waves of tasks; a wave
//! holds at most one task per worker, runs on scoped threads, and the call
//! blocks until every task of every wave has finished. There is no shared
//! state between tasks, so the group needs no synchronisation beyond the
//! scope join itself.

use crossbeam::thread;

/// Fork-join group with a fixed number of workers
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    workers: usize,
}

impl ThreadGroup {
    /// Create a group of at least one worker
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Number of workers in the group
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` once per task and block until all are done.
    ///
    /// Tasks are executed in waves of up to `workers` concurrent threads;
    /// wave `k` starts only after wave `k-1` joined. A single-task wave
    /// runs inline on the calling thread.
    pub fn start_and_block<T, F>(&self, tasks: Vec<T>, job: F)
    where
        T: Send,
        F: Fn(T) + Sync,
    {
        let mut queue = tasks.into_iter();
        loop {
            let wave: Vec<T> = queue.by_ref().take(self.workers).collect();
            match wave.len() {
                0 => return,
                1 => {
                    for task in wave {
                        job(task);
                    }
                }
                _ => {
                    let job = &job;
                    let result = thread::scope(|scope| {
                        for task in wave {
                            scope.spawn(move |_| job(task));
                        }
                    });
                    if let Err(payload) = result {
                        std::panic::resume_unwind(payload);
                    }
                }
            }
        }
    }
}

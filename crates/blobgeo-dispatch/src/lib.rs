//! blobgeo-dispatch: bounded task dispatch over a fixed worker pool.
//!
//! A [`TaskPool`] owns a fixed set of worker threads draining one
//! shared FIFO queue. Producers hand tasks to [`TaskPool::dispatch`]
//! and never block on the workers; workers sleep on a condition
//! variable while the queue is empty. Shutdown is always a graceful
//! drain: one sentinel per worker is queued *behind* any outstanding
//! tasks, so every dispatched task is handled before the pool goes
//! away. Dropping an un-shut-down pool performs the same drain.
//!
//! The pool is independent of the geometry engine; any `Send` task
//! type works.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

enum Message<T> {
    Task(T),
    Shutdown,
}

struct Shared<T> {
    queue: Mutex<VecDeque<Message<T>>>,
    ready: Condvar,
}

// Nothing panics while holding the queue lock (handlers run outside
// it), so poisoning is unrecoverable.
#[allow(clippy::expect_used)]
fn lock<T>(shared: &Shared<T>) -> MutexGuard<'_, VecDeque<Message<T>>> {
    shared.queue.lock().expect("task queue lock poisoned")
}

/// A fixed pool of worker threads draining one shared FIFO of tasks.
///
/// Every worker runs the same handler. Tasks are handed out in
/// dispatch order, one worker each; the pool never drops or
/// duplicates a task.
pub struct TaskPool<T> {
    shared: Arc<Shared<T>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> TaskPool<T> {
    /// Spawn a pool of `workers` threads running `handler`.
    ///
    /// A request for zero workers still spawns one; a pool that can
    /// never drain would turn every shutdown into a deadlock.
    #[must_use]
    pub fn new<F>(workers: usize, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        });
        let handler = Arc::new(handler);
        let workers = (0..workers.max(1))
            .map(|_| {
                let shared = Arc::clone(&shared);
                let handler = Arc::clone(&handler);
                std::thread::spawn(move || worker_loop(&shared, &*handler))
            })
            .collect();
        Self { shared, workers }
    }

    /// Spawn one worker per logical CPU.
    #[must_use]
    pub fn with_default_workers<F>(handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::new(num_cpus::get(), handler)
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue a task for the next idle worker. Never blocks on the
    /// workers; every waiter is woken.
    pub fn dispatch(&self, task: T) {
        let mut queue = lock(&self.shared);
        queue.push_back(Message::Task(task));
        drop(queue);
        self.shared.ready.notify_all();
    }

    /// Drain the queue and join every worker.
    ///
    /// Outstanding tasks are all handled first: the shutdown sentinels
    /// sit behind them in the same FIFO. Shutdown is never a
    /// cancellation.
    pub fn shutdown(mut self) {
        self.drain();
    }
}

impl<T> TaskPool<T> {
    fn drain(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        {
            let mut queue = lock(&self.shared);
            for _ in 0..self.workers.len() {
                queue.push_back(Message::Shutdown);
            }
        }
        self.shared.ready.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<T> Drop for TaskPool<T> {
    fn drop(&mut self) {
        self.drain();
    }
}

// Poisoned waits carry the same meaning as a poisoned lock.
#[allow(clippy::expect_used)]
fn worker_loop<T, F: Fn(T)>(shared: &Shared<T>, handler: &F) {
    loop {
        let message = {
            let mut queue = lock(shared);
            loop {
                if let Some(message) = queue.pop_front() {
                    break message;
                }
                queue = shared
                    .ready
                    .wait(queue)
                    .expect("task queue lock poisoned");
            }
        };
        match message {
            Message::Task(task) => handler(task),
            Message::Shutdown => return,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_task_is_observed_exactly_once() {
        for _ in 0..3 {
            let seen = Arc::new(Mutex::new(vec![0u32; 100]));
            let sink = Arc::clone(&seen);
            let pool = TaskPool::new(8, move |i: usize| {
                sink.lock().unwrap()[i] += 1;
            });
            for i in 0..100 {
                pool.dispatch(i);
            }
            pool.shutdown();
            let counts = seen.lock().unwrap();
            assert!(
                counts.iter().all(|&c| c == 1),
                "lost or duplicated tasks: {counts:?}"
            );
        }
    }

    #[test]
    fn dropping_the_pool_drains_outstanding_tasks() {
        let handled = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&handled);
        let pool = TaskPool::new(4, move |(): ()| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        for _ in 0..50 {
            pool.dispatch(());
        }
        drop(pool);
        assert_eq!(handled.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn zero_requested_workers_still_drains() {
        let handled = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&handled);
        let pool = TaskPool::new(0, move |(): ()| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(pool.worker_count(), 1);
        pool.dispatch(());
        pool.shutdown();
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_worker_count_matches_the_machine() {
        let pool = TaskPool::<()>::with_default_workers(|()| {});
        assert!(pool.worker_count() >= 1);
        pool.shutdown();
    }

    #[test]
    fn tasks_are_handled_in_dispatch_order_with_one_worker() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        let pool = TaskPool::new(1, move |i: u32| {
            sink.lock().unwrap().push(i);
        });
        for i in 0..20 {
            pool.dispatch(i);
        }
        pool.shutdown();
        assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }
}

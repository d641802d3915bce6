//! Deferred task queue for the UI thread.
//!
//! The command system is driven by the host event loop; the queue is its
//! marshaling primitive. Posted tasks run strictly after the posting stack
//! frame unwinds, in FIFO order relative to other pending tasks: resolved
//! Executed handlers and the requery broadcast both arrive here rather than
//! running inline in the triggering event.
//!
//! The host drains the queue from its event loop via
//! [`process_all`](UiQueue::process_all) (or in slices via
//! [`process_batch`](UiQueue::process_batch) during idle time).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// A unique identifier for a posted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A boxed task closure.
type BoxedTask = Box<dyn FnOnce() + Send + 'static>;

struct TaskData {
    id: TaskId,
    task: BoxedTask,
}

/// The single-thread UI task queue.
pub struct UiQueue {
    /// Pending tasks in post order.
    tasks: Mutex<VecDeque<TaskData>>,
}

impl UiQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
        }
    }

    /// Post a task to run on the next drain.
    ///
    /// Returns the task ID, which can be used to cancel the task before it
    /// runs.
    pub fn post<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = next_task_id();
        self.tasks.lock().push_back(TaskData {
            id,
            task: Box::new(task),
        });
        tracing::trace!(target: "trellis_core::queue", ?id, "posted task");
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns `true` if the task was found and cancelled.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut tasks = self.tasks.lock();
        if let Some(pos) = tasks.iter().position(|t| t.id == id) {
            tasks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Run pending tasks until the queue is empty.
    ///
    /// Tasks posted while draining run in the same drain. The queue lock is
    /// not held while a task executes, so tasks may post freely.
    ///
    /// Returns the number of tasks processed.
    pub fn process_all(&self) -> usize {
        let mut count = 0;
        loop {
            let next = self.tasks.lock().pop_front();
            match next {
                Some(data) => {
                    (data.task)();
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Run up to `limit` pending tasks.
    ///
    /// Returns the number of tasks processed.
    pub fn process_batch(&self, limit: usize) -> usize {
        let mut count = 0;
        while count < limit {
            let next = self.tasks.lock().pop_front();
            match next {
                Some(data) => {
                    (data.task)();
                    count += 1;
                }
                None => break,
            }
        }
        count
    }
}

impl Default for UiQueue {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(UiQueue: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn tasks_run_in_post_order() {
        let queue = UiQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            queue.post(move || order.lock().push(i));
        }

        assert_eq!(queue.pending_count(), 3);
        assert_eq!(queue.process_all(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert!(!queue.has_pending());
    }

    #[test]
    fn cancel_removes_pending_task() {
        let queue = UiQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let ran_clone = ran.clone();
        let id = queue.post(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert_eq!(queue.process_all(), 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn task_may_post_during_drain() {
        let queue = Arc::new(UiQueue::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let queue_clone = queue.clone();
        let ran_clone = ran.clone();
        queue.post(move || {
            let ran_inner = ran_clone.clone();
            queue_clone.post(move || {
                ran_inner.fetch_add(1, Ordering::SeqCst);
            });
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(queue.process_all(), 2);
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn process_batch_respects_limit() {
        let queue = UiQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let ran = ran.clone();
            queue.post(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(queue.process_batch(2), 2);
        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert_eq!(queue.pending_count(), 3);
        assert_eq!(queue.process_all(), 3);
    }
}

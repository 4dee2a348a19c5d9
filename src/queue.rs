//! bounded FIFO of pending jobs

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// default number of jobs the queue holds before rejecting
pub const DEFAULT_CAPACITY: usize = 10;

/// One file to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    path: PathBuf,
}

impl Job {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Rejected enqueue. The job is handed back so the caller decides its fate.
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("queue full, cannot enqueue {}", .0.path().display())]
    Full(Job),
    #[error("queue closed, cannot enqueue {}", .0.path().display())]
    Closed(Job),
}

impl EnqueueError {
    pub fn into_job(self) -> Job {
        match self {
            EnqueueError::Full(job) | EnqueueError::Closed(job) => job,
        }
    }
}

#[derive(Debug)]
struct State {
    jobs: VecDeque<Job>,
    closed: bool,
}

/// Fixed-capacity, thread-safe FIFO.
///
/// Producers never block: a full queue rejects. Consumers block in
/// [`TaskQueue::dequeue`] until a job arrives or the queue is closed and empty.
#[derive(Debug)]
pub struct TaskQueue {
    state: Mutex<State>,
    not_empty: Condvar,
    capacity: usize,
}

impl TaskQueue {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "task queue capacity must be at least 1");
        Self {
            state: Mutex::new(State {
                jobs: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Append `job` at the tail and wake one waiting consumer.
    pub fn enqueue(&self, job: Job) -> Result<(), EnqueueError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(EnqueueError::Closed(job));
        }
        if state.jobs.len() >= self.capacity {
            return Err(EnqueueError::Full(job));
        }
        state.jobs.push_back(job);
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head job, blocking while the queue is empty.
    ///
    /// Returns `None` only after [`close`](Self::close) once every queued job
    /// has been handed out.
    pub fn dequeue(&self) -> Option<Job> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Stop accepting jobs and release every blocked consumer once drained.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.not_empty.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new(3);
        for name in ["a", "b", "c"] {
            queue.enqueue(Job::new(name)).unwrap();
        }
        assert_eq!(queue.dequeue(), Some(Job::new("a")));
        assert_eq!(queue.dequeue(), Some(Job::new("b")));
        assert_eq!(queue.dequeue(), Some(Job::new("c")));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_rejects_and_returns_job() {
        let queue = TaskQueue::new(1);
        queue.enqueue(Job::new("kept")).unwrap();

        let err = queue.enqueue(Job::new("rejected")).unwrap_err();
        assert!(matches!(err, EnqueueError::Full(_)));
        assert_eq!(err.into_job(), Job::new("rejected"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_capacity_ten_fills_then_rejects_in_order() {
        let queue = TaskQueue::new(10);
        for i in 0..10 {
            queue.enqueue(Job::new(format!("/in/{i}.zip"))).unwrap();
        }

        let err = queue.enqueue(Job::new("/in/10.zip")).unwrap_err();
        assert!(matches!(err, EnqueueError::Full(_)));
        assert_eq!(queue.len(), 10);

        for i in 0..10 {
            assert_eq!(queue.dequeue(), Some(Job::new(format!("/in/{i}.zip"))));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_blocks_until_enqueue() {
        let queue = Arc::new(TaskQueue::new(2));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!consumer.is_finished());

        queue.enqueue(Job::new("late")).unwrap();
        assert_eq!(consumer.join().unwrap(), Some(Job::new("late")));
    }

    #[test]
    fn test_close_drains_then_releases() {
        let queue = TaskQueue::new(2);
        queue.enqueue(Job::new("left over")).unwrap();
        queue.close();

        assert!(matches!(queue.enqueue(Job::new("too late")), Err(EnqueueError::Closed(_))));
        assert_eq!(queue.dequeue(), Some(Job::new("left over")));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_close_wakes_blocked_consumers() {
        let queue = Arc::new(TaskQueue::new(2));
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.dequeue())
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        queue.close();

        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn test_zero_capacity_panics() {
        let _ = TaskQueue::new(0);
    }
}

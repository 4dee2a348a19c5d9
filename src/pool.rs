//! fixed pool of worker threads draining the task queue

use crate::processor::Processor;
use crate::queue::TaskQueue;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `size` workers, each looping dequeue -> process until the queue
    /// is closed and drained.
    pub fn spawn(size: usize, queue: Arc<TaskQueue>, processor: Arc<Processor>) -> io::Result<Self> {
        let mut pool = Self {
            queue,
            workers: Vec::with_capacity(size),
        };

        for id in 0..size {
            let queue = Arc::clone(&pool.queue);
            let processor = Arc::clone(&processor);
            let spawned = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || {
                    debug!(worker = id, "worker started");
                    while let Some(job) = queue.dequeue() {
                        processor.handle(job);
                    }
                    debug!(worker = id, "worker exiting");
                });

            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(err) => {
                    // release whatever already started before reporting
                    pool.shutdown();
                    return Err(err);
                }
            }
        }

        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue, let workers finish what is already queued, and join them.
    pub fn shutdown(self) {
        self.queue.close();
        for worker in self.workers {
            if worker.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::queue::Job;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_shutdown_drains_queued_jobs() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out");
        let queue = Arc::new(TaskQueue::new(8));

        for i in 0..8 {
            let input = temp_dir.path().join(format!("file{i}.txt"));
            fs::write(&input, format!("payload {i}")).unwrap();
            queue.enqueue(Job::new(input)).unwrap();
        }

        let processor = Arc::new(Processor::new(&output, &PipelineConfig::default()));
        let pool = WorkerPool::spawn(3, Arc::clone(&queue), processor).unwrap();
        assert_eq!(pool.size(), 3);
        pool.shutdown();

        assert!(queue.is_closed());
        assert!(queue.is_empty());
        for i in 0..8 {
            let copied = fs::read_to_string(output.join(format!("file{i}.txt"))).unwrap();
            assert_eq!(copied, format!("payload {i}"));
        }
    }

    #[test]
    fn test_failed_job_does_not_stop_worker() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out");
        let good = temp_dir.path().join("good.txt");
        fs::write(&good, "ok").unwrap();

        let queue = Arc::new(TaskQueue::new(4));
        queue.enqueue(Job::new(temp_dir.path().join("missing.txt"))).unwrap();
        queue.enqueue(Job::new(&good)).unwrap();

        let processor = Arc::new(Processor::new(&output, &PipelineConfig::default()));
        WorkerPool::spawn(1, Arc::clone(&queue), processor)
            .unwrap()
            .shutdown();

        assert_eq!(fs::read_to_string(output.join("good.txt")).unwrap(), "ok");
        assert!(!output.join("missing.txt").exists());
    }
}

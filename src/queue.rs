//! # Work Queue Module
//!
//! FIFO of generation jobs drained by a single worker. The worker peeks the
//! front job and only dequeues it once finished, so `/status` keeps seeing
//! the job while it is being processed.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use teloxide::types::{ChatId, UserId};
use tokio::sync::Notify;

use crate::render::RenderConfig;

/// One queued generation job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub owner: UserId,
    pub chat_id: ChatId,
    pub image_path: PathBuf,
    /// Snapshot taken at enqueue time
    pub config: RenderConfig,
    pub language: Option<String>,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    operations: Mutex<VecDeque<Operation>>,
    available: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Operation>> {
        self.operations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a job and wake the worker. Returns its 1-based position.
    pub fn enqueue(&self, operation: Operation) -> usize {
        let position = {
            let mut operations = self.lock();
            operations.push_back(operation);
            operations.len()
        };
        self.available.notify_one();
        position
    }

    /// Front job, left in place
    pub fn peek(&self) -> Option<Operation> {
        self.lock().front().cloned()
    }

    /// Remove the front job
    pub fn dequeue(&self) -> Option<Operation> {
        self.lock().pop_front()
    }

    /// Every job owned by `owner` with its 1-based position in the queue
    pub fn operations(&self, owner: UserId) -> Vec<(Operation, usize)> {
        self.lock()
            .iter()
            .enumerate()
            .filter(|(_, op)| op.owner == owner)
            .map(|(i, op)| (op.clone(), i + 1))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Resolve once a job has been enqueued since the last wake-up.
    ///
    /// A wake-up issued while nobody waits is kept, so checking `peek` and
    /// then awaiting this cannot miss a job.
    pub async fn wait_for_work(&self) {
        self.available.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn op(owner: u64, name: &str) -> Operation {
        Operation {
            owner: UserId(owner),
            chat_id: ChatId(owner as i64),
            image_path: PathBuf::from(name),
            config: RenderConfig::default(),
            language: None,
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = WorkQueue::new();
        queue.enqueue(op(1, "a"));
        queue.enqueue(op(2, "b"));
        queue.enqueue(op(3, "c"));

        let drained: Vec<PathBuf> = std::iter::from_fn(|| queue.dequeue())
            .map(|o| o.image_path)
            .collect();
        assert_eq!(
            drained,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_owner_positions() {
        let queue = WorkQueue::new();
        assert_eq!(queue.enqueue(op(1, "a")), 1);
        assert_eq!(queue.enqueue(op(2, "b")), 2);
        assert_eq!(queue.enqueue(op(1, "c")), 3);

        let mine = queue.operations(UserId(1));
        let names: Vec<_> = mine.iter().map(|(o, _)| o.image_path.clone()).collect();
        let positions: Vec<_> = mine.iter().map(|(_, p)| *p).collect();
        assert_eq!(names, vec![PathBuf::from("a"), PathBuf::from("c")]);
        assert_eq!(positions, vec![1, 3]);
        assert!(queue.operations(UserId(3)).is_empty());
    }

    #[test]
    fn test_peek_keeps_job_visible() {
        let queue = WorkQueue::new();
        queue.enqueue(op(1, "a"));
        queue.enqueue(op(2, "b"));

        let in_flight = queue.peek().unwrap();
        assert_eq!(in_flight.image_path, PathBuf::from("a"));
        assert_eq!(queue.operations(UserId(1)).len(), 1);
        assert_eq!(queue.operations(UserId(2))[0].1, 2);

        queue.dequeue();
        assert!(queue.operations(UserId(1)).is_empty());
        assert_eq!(queue.operations(UserId(2))[0].1, 1);
    }

    #[tokio::test]
    async fn test_wait_for_work_keeps_early_wakeup() {
        let queue = WorkQueue::new();
        queue.enqueue(op(1, "a"));

        tokio::time::timeout(Duration::from_secs(1), queue.wait_for_work())
            .await
            .expect("stored wake-up should resolve immediately");
    }
}

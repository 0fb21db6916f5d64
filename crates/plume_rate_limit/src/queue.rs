//! Priority queue of pending tasks.

use std::collections::VecDeque;
use tokio::time::Instant;

/// A queued unit of work.
#[derive(Debug)]
pub struct PendingTask<T> {
    /// The work itself
    pub item: T,
    /// Higher values are served first
    pub priority: i32,
    /// Transient failures retried so far
    pub retry_count: u32,
    /// When the task was first submitted
    pub enqueued_at: Instant,
}

impl<T> PendingTask<T> {
    /// Wrap a freshly submitted item.
    pub fn new(item: T, priority: i32, enqueued_at: Instant) -> Self {
        Self {
            item,
            priority,
            retry_count: 0,
            enqueued_at,
        }
    }
}

/// Tasks ordered by descending priority.
///
/// The queue is re-sorted after every [`TaskQueue::push`]. The sort is stable,
/// so equal priorities keep their relative order. Retries go through
/// [`TaskQueue::push_front`] and are served next regardless of priority.
#[derive(Debug)]
pub struct TaskQueue<T> {
    tasks: VecDeque<PendingTask<T>>,
}

impl<T> TaskQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Insert a task and restore priority order.
    pub fn push(&mut self, task: PendingTask<T>) {
        self.tasks.push_back(task);
        self.tasks
            .make_contiguous()
            .sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Put a task back at the head of the queue.
    pub fn push_front(&mut self, task: PendingTask<T>) {
        self.tasks.push_front(task);
    }

    /// Take the next task to run.
    pub fn pop(&mut self) -> Option<PendingTask<T>> {
        self.tasks.pop_front()
    }

    /// Remove every queued task, in queue order.
    pub fn drain(&mut self) -> Vec<PendingTask<T>> {
        self.tasks.drain(..).collect()
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &'static str, priority: i32) -> PendingTask<&'static str> {
        PendingTask::new(name, priority, Instant::now())
    }

    #[test]
    fn test_higher_priority_served_first() {
        let mut queue = TaskQueue::new();
        queue.push(task("low", 0));
        queue.push(task("high", 10));
        queue.push(task("mid", 5));

        let order: Vec<_> = queue.drain().into_iter().map(|t| t.item).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_equal_priorities_keep_arrival_order() {
        let mut queue = TaskQueue::new();
        queue.push(task("a", 1));
        queue.push(task("b", 1));
        queue.push(task("c", 1));
        queue.push(task("urgent", 2));

        assert_eq!(queue.pop().map(|t| t.item), Some("urgent"));
        assert_eq!(queue.pop().map(|t| t.item), Some("a"));
        assert_eq!(queue.pop().map(|t| t.item), Some("b"));
        assert_eq!(queue.pop().map(|t| t.item), Some("c"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_retry_goes_to_front() {
        let mut queue = TaskQueue::new();
        queue.push(task("high", 10));
        let mut retried = task("retried", 0);
        retried.retry_count = 1;
        queue.push_front(retried);

        let next = queue.pop().expect("queue should not be empty");
        assert_eq!(next.item, "retried");
        assert_eq!(next.retry_count, 1);
        assert_eq!(queue.len(), 1);
    }
}

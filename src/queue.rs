//! Bounded blocking line queue with backpressure.
//!
//! The single synchronization point between one producer pump and one
//! consumer. The writer blocks when the queue is full and the reader blocks
//! when it is empty, matching OS pipe semantics scaled down to whole lines.
//!
//! ```text
//!   put() ──▶ [VecDeque<String>, capacity Q] ──▶ take()
//!             ├── put blocks while full (backpressure)
//!             ├── take blocks while empty
//!             ├── close() → takes drain, then report end
//!             └── detach_reader() → puts return Disconnected
//! ```

use std::collections::VecDeque;

use crate::sync::Monitor;

/// Why a put was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutError {
    /// The producer side already signalled end-of-sequence.
    Closed,
    /// The consumer went away; the caller should discard the line.
    Disconnected,
}

struct State {
    items: VecDeque<String>,
    closed: bool,
    detached: bool,
}

pub struct BoundedQueue {
    mon: Monitor<State>,
    capacity: usize,
}

impl BoundedQueue {
    /// Create a queue holding at most `capacity` lines. A capacity below 1
    /// is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            mon: Monitor::new(State {
                items: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
                detached: false,
            }),
            capacity,
        }
    }

    /// Append a line, blocking while the queue is full. Fails with
    /// [`PutError::Closed`] after [`close`](Self::close) and with
    /// [`PutError::Disconnected`] after [`detach_reader`](Self::detach_reader).
    pub fn put(&self, line: String) -> Result<(), PutError> {
        self.mon.wait_while_then(
            |s| s.items.len() >= self.capacity && !s.closed && !s.detached,
            |s| {
                if s.closed {
                    return Err(PutError::Closed);
                }
                if s.detached {
                    return Err(PutError::Disconnected);
                }
                s.items.push_back(line);
                Ok(())
            },
        )
    }

    /// Remove the oldest line, blocking while the queue is empty and still
    /// open. Returns `None` once the queue is closed and drained, or after
    /// the reader detached.
    pub fn take(&self) -> Option<String> {
        self.mon.wait_while_then(
            |s| s.items.is_empty() && !s.closed && !s.detached,
            |s| s.items.pop_front(),
        )
    }

    /// Producer side is done: queued lines remain takeable, further puts
    /// fail, an empty queue reports end-of-sequence.
    pub fn close(&self) {
        self.mon.update_and_notify_all(|s| s.closed = true);
    }

    /// Consumer side is gone: pending lines are discarded and any blocked or
    /// future put reports [`PutError::Disconnected`].
    pub fn detach_reader(&self) {
        self.mon.update_and_notify_all(|s| {
            s.detached = true;
            s.items.clear();
        });
    }

    pub fn len(&self) -> usize {
        self.mon.with(|s| s.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn basic_put_take() {
        let q = BoundedQueue::new(4);
        q.put("hello".to_string()).unwrap();
        q.close();
        assert_eq!(q.take(), Some("hello".to_string()));
        assert_eq!(q.take(), None);
    }

    #[test]
    fn capacity_is_clamped_to_one() {
        let q = BoundedQueue::new(0);
        assert_eq!(q.capacity(), 1);
    }

    #[test]
    fn backpressure_blocks_writer_until_reader_drains() {
        let q = Arc::new(BoundedQueue::new(1));
        let writer = {
            let q = q.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    q.put(format!("line {i}")).unwrap();
                }
                q.close();
            })
        };

        let mut out = Vec::new();
        while let Some(line) = q.take() {
            assert!(q.len() <= q.capacity());
            out.push(line);
        }
        writer.join().unwrap();

        assert_eq!(out.len(), 100);
        assert_eq!(out[0], "line 0");
        assert_eq!(out[99], "line 99");
    }

    #[test]
    fn takes_drain_after_close() {
        let q = BoundedQueue::new(8);
        q.put("a".to_string()).unwrap();
        q.put("b".to_string()).unwrap();
        q.close();
        assert_eq!(q.take(), Some("a".to_string()));
        assert_eq!(q.take(), Some("b".to_string()));
        assert_eq!(q.take(), None);
        assert_eq!(q.take(), None);
    }

    #[test]
    fn put_after_close_fails() {
        let q = BoundedQueue::new(1);
        q.close();
        assert_eq!(q.put("late".to_string()), Err(PutError::Closed));
    }

    #[test]
    fn detach_unblocks_a_full_queue_writer() {
        let q = Arc::new(BoundedQueue::new(1));
        q.put("fill".to_string()).unwrap();

        let writer = {
            let q = q.clone();
            thread::spawn(move || q.put("blocked".to_string()))
        };
        // Writer is (about to be) parked on the full queue.
        thread::sleep(std::time::Duration::from_millis(20));
        q.detach_reader();

        assert_eq!(writer.join().unwrap(), Err(PutError::Disconnected));
        assert_eq!(q.take(), None);
    }

    #[test]
    fn close_unblocks_an_empty_queue_reader() {
        let q = Arc::new(BoundedQueue::new(1));
        let reader = {
            let q = q.clone();
            thread::spawn(move || q.take())
        };
        thread::sleep(std::time::Duration::from_millis(20));
        q.close();
        assert_eq!(reader.join().unwrap(), None);
    }
}

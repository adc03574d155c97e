//! Delayed-callback primitive.
//!
//! The idle/throttle qualifiers defer listener invocation past the
//! originating call stack; they only need `schedule`/`cancel` and a
//! millisecond clock, expressed by the [`Scheduler`] trait. The crate ships
//! [`TestScheduler`], a deterministic manual clock: time moves only through
//! [`TestScheduler::advance`], which runs due callbacks in due-time order.

use std::cell::RefCell;

/// Handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Clock plus one-shot timer service.
pub trait Scheduler {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u64;

    /// Run `callback` once, `delay_ms` from now.
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerId;

    /// Cancel a pending callback. Unknown or already-fired ids are ignored.
    fn cancel(&self, id: TimerId);
}

struct Pending {
    id: TimerId,
    due_ms: u64,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

struct Queue {
    now_ms: u64,
    next_id: u64,
    next_seq: u64,
    pending: Vec<Pending>,
}

/// Deterministic scheduler driven by [`advance`](TestScheduler::advance).
pub struct TestScheduler {
    queue: RefCell<Queue>,
}

impl TestScheduler {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(Queue {
                now_ms: 0,
                next_id: 1,
                next_seq: 0,
                pending: Vec::new(),
            }),
        }
    }

    /// Move the clock forward, firing every callback that comes due, in
    /// (due time, schedule order) order. Callbacks may schedule or cancel
    /// further timers; newly scheduled timers that fall inside the window
    /// also fire.
    pub fn advance(&self, ms: u64) {
        let deadline = self.queue.borrow().now_ms + ms;
        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                let due = queue
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due_ms <= deadline)
                    .min_by_key(|(_, p)| (p.due_ms, p.seq))
                    .map(|(i, _)| i);
                match due {
                    Some(i) => {
                        let timer = queue.pending.swap_remove(i);
                        queue.now_ms = queue.now_ms.max(timer.due_ms);
                        Some(timer.callback)
                    }
                    None => None,
                }
            };
            match next {
                // Run outside the borrow: the callback may re-enter.
                Some(callback) => callback(),
                None => break,
            }
        }
        self.queue.borrow_mut().now_ms = deadline;
    }

    /// Number of callbacks still pending.
    pub fn pending(&self) -> usize {
        self.queue.borrow().pending.len()
    }
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TestScheduler {
    fn now_ms(&self) -> u64 {
        self.queue.borrow().now_ms
    }

    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerId {
        let mut queue = self.queue.borrow_mut();
        let id = TimerId(queue.next_id);
        queue.next_id += 1;
        let seq = queue.next_seq;
        queue.next_seq += 1;
        let due_ms = queue.now_ms + delay_ms;
        queue.pending.push(Pending {
            id,
            due_ms,
            seq,
            callback,
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        let mut queue = self.queue.borrow_mut();
        if let Some(i) = queue.pending.iter().position(|p| p.id == id) {
            queue.pending.swap_remove(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn fires_in_due_order() {
        let scheduler = TestScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (delay, tag) in [(30u64, "b"), (10, "a"), (30, "c")] {
            let order = order.clone();
            scheduler.schedule(delay, Box::new(move || order.borrow_mut().push(tag)));
        }
        scheduler.advance(30);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancel_prevents_firing() {
        let scheduler = TestScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let fired2 = fired.clone();
        let id = scheduler.schedule(5, Box::new(move || fired2.set(true)));
        scheduler.cancel(id);
        scheduler.advance(10);
        assert!(!fired.get());
    }

    #[test]
    fn callbacks_may_reschedule() {
        let scheduler = Rc::new(TestScheduler::new());
        let count = Rc::new(Cell::new(0u32));

        let s = scheduler.clone();
        let c = count.clone();
        scheduler.schedule(
            10,
            Box::new(move || {
                c.set(c.get() + 1);
                let c2 = c.clone();
                s.schedule(10, Box::new(move || c2.set(c2.get() + 1)));
            }),
        );

        scheduler.advance(20);
        assert_eq!(count.get(), 2);
        assert_eq!(scheduler.now_ms(), 20);
    }
}

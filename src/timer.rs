//! Deadline-ordered timer queue polled by the reactor on every iteration.
//!
//! Events carry a task value instead of a closure; the owner of the
//! scheduler decides what each task means when it comes due. Events are never
//! cancelled: a task whose condition was already satisfied must do nothing
//! when it fires.

use std::{cmp::Reverse, collections::BinaryHeap, time::Duration};

use tokio::time::Instant;

#[derive(Debug)]
struct TimerEvent<T> {
    deadline: Instant,
    sequence: u64,
    task: T,
}

impl<T> PartialEq for TimerEvent<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}

impl<T> Eq for TimerEvent<T> {}

impl<T> PartialOrd for TimerEvent<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for TimerEvent<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deadline, self.sequence).cmp(&(other.deadline, other.sequence))
    }
}

#[derive(Debug)]
pub struct TimerScheduler<T> {
    events: BinaryHeap<Reverse<TimerEvent<T>>>,
    next_sequence: u64,
}

impl<T> Default for TimerScheduler<T> {
    fn default() -> Self {
        Self {
            events: BinaryHeap::new(),
            next_sequence: 0,
        }
    }
}

impl<T> TimerScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to fire once `delay` has elapsed.
    pub fn register_timeout(&mut self, delay: Duration, task: T) {
        self.register_at(Instant::now() + delay, task);
    }

    pub fn register_at(&mut self, deadline: Instant, task: T) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.events.push(Reverse(TimerEvent {
            deadline,
            sequence,
            task,
        }));
    }

    /// Removes and returns every task whose deadline is at or before `now`,
    /// earliest first. Tasks sharing a deadline come out in registration order.
    pub fn tick(&mut self, now: Instant) -> Vec<T> {
        let mut due = Vec::new();

        while let Some(Reverse(event)) = self.events.peek() {
            if event.deadline > now {
                break;
            }

            if let Some(Reverse(event)) = self.events.pop() {
                due.push(event.task);
            }
        }

        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.events.peek().map(|Reverse(event)| event.deadline)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

//! Wait/wake registry behind BLPOP.
//!
//! A BLPOP that finds no data leaves a [`PendingBlock`] at the tail of its
//! key's queue and returns straight away. Pushes to that key later serve the
//! queue head first; a timer serves it with a null reply if it waits too
//! long. Blocks are keyed by connection id only, so a closed connection's
//! block simply gets skipped.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use tokio::time::Instant;

use crate::{key_value_store::ListStore, ConnectionId};

pub type BlockId = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingBlock {
    pub id: BlockId,
    pub connection_id: ConnectionId,
    pub deadline: Option<Instant>,
}

/// A suspended request that can be answered now.
#[derive(Debug, Clone, PartialEq)]
pub enum Wakeup {
    Served {
        connection_id: ConnectionId,
        key: String,
        value: String,
    },
    TimedOut {
        connection_id: ConnectionId,
    },
}

#[derive(Debug, Default)]
pub struct BlockingRegistry {
    waiters: HashMap<String, VecDeque<PendingBlock>>,
    next_id: BlockId,
}

impl BlockingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops the head of `key` if it holds data.
    pub fn try_pop(&self, lists: &mut ListStore, key: &str) -> Option<String> {
        lists.lpop(key)
    }

    /// Queues a block for `connection_id` behind every earlier waiter on `key`.
    pub fn block(
        &mut self,
        key: &str,
        connection_id: ConnectionId,
        timeout: Option<Duration>,
    ) -> PendingBlock {
        let block = PendingBlock {
            id: self.next_id,
            connection_id,
            // A deadline past the end of the clock means waiting forever.
            deadline: timeout.and_then(|timeout| Instant::now().checked_add(timeout)),
        };
        self.next_id += 1;

        self.waiters
            .entry(key.to_string())
            .or_default()
            .push_back(block);

        block
    }

    /// Serves waiters on `key` in FIFO order while the list has data.
    ///
    /// Waiters whose connection is gone are dropped without consuming an
    /// element. Waiters already past their deadline are timed out instead of
    /// served.
    pub fn on_push<F>(&mut self, lists: &mut ListStore, key: &str, is_live: F) -> Vec<Wakeup>
    where
        F: Fn(ConnectionId) -> bool,
    {
        let mut wakeups = Vec::new();

        let Some(queue) = self.waiters.get_mut(key) else {
            return wakeups;
        };

        let now = Instant::now();

        while let Some(&head) = queue.front() {
            if !is_live(head.connection_id) {
                queue.pop_front();
                continue;
            }

            if head.deadline.is_some_and(|deadline| now >= deadline) {
                queue.pop_front();
                wakeups.push(Wakeup::TimedOut {
                    connection_id: head.connection_id,
                });
                continue;
            }

            let Some(value) = lists.lpop(key) else {
                break;
            };

            queue.pop_front();
            wakeups.push(Wakeup::Served {
                connection_id: head.connection_id,
                key: key.to_string(),
                value,
            });
        }

        if queue.is_empty() {
            self.waiters.remove(key);
        }

        wakeups
    }

    /// Removes block `id` from `key` if it is still queued and returns the
    /// connection it belonged to. Firing twice is harmless.
    pub fn expire(&mut self, key: &str, id: BlockId) -> Option<ConnectionId> {
        let queue = self.waiters.get_mut(key)?;
        let position = queue.iter().position(|block| block.id == id)?;
        let block = queue.remove(position)?;

        if queue.is_empty() {
            self.waiters.remove(key);
        }

        Some(block.connection_id)
    }

    pub fn waiting(&self, key: &str) -> usize {
        self.waiters.get(key).map_or(0, VecDeque::len)
    }
}

//! The server context: every store and registry the reactor thread mutates.
//!
//! One `ServerState` is built when the server starts and is passed by `&mut`
//! into command handlers. Connections are referenced by id only. A reply
//! addressed to a connection that has gone away is dropped by the reactor.

use std::{
    collections::{HashSet, VecDeque},
    time::Duration,
};

use tokio::time::Instant;
use tracing::debug;

use crate::{
    blocking::{BlockId, BlockingRegistry, Wakeup},
    key_value_store::{ListStore, StringStore},
    replication::{Replication, Role},
    resp::RespValue,
    timer::TimerScheduler,
    transactions::TransactionRegistry,
    ConnectionId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TimerTask {
    /// Answers a BLPOP with null if it is still waiting.
    BlockTimeout { key: String, block_id: BlockId },
    /// Tries to reach the master again.
    ReconnectMaster,
}

/// A reply produced outside the request/response path of its connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub connection_id: ConnectionId,
    pub reply: RespValue,
    /// The reply completes a suspended command, so the connection may go on
    /// with its buffered requests.
    pub resumes: bool,
}

#[derive(Debug)]
pub struct ServerState {
    pub strings: StringStore,
    pub lists: ListStore,
    pub blocked: BlockingRegistry,
    pub transactions: TransactionRegistry,
    pub timers: TimerScheduler<TimerTask>,
    pub replication: Replication,
    /// Set while EXEC replays a queue. Nothing may suspend during replay.
    pub replaying_transaction: bool,
    listening_port: u16,
    outbox: VecDeque<Delivery>,
    live: HashSet<ConnectionId>,
    next_connection_id: ConnectionId,
}

impl ServerState {
    pub fn new(role: Role, listening_port: u16) -> Self {
        Self {
            strings: StringStore::new(),
            lists: ListStore::new(),
            blocked: BlockingRegistry::new(),
            transactions: TransactionRegistry::new(),
            timers: TimerScheduler::new(),
            replication: Replication::new(role),
            replaying_transaction: false,
            listening_port,
            outbox: VecDeque::new(),
            live: HashSet::new(),
            next_connection_id: 1,
        }
    }

    pub fn listening_port(&self) -> u16 {
        self.listening_port
    }

    pub fn connection_opened(&mut self) -> ConnectionId {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        self.live.insert(id);
        id
    }

    /// Forgets a closed connection everywhere except the blocking queues,
    /// where its waiters are skipped the next time the key is served.
    pub fn connection_closed(&mut self, connection_id: ConnectionId) {
        self.live.remove(&connection_id);
        self.transactions.remove(connection_id);

        if self.replication.remove_replica(connection_id) {
            debug!(conn = connection_id, "replica detached");
        }
    }

    pub fn is_live(&self, connection_id: ConnectionId) -> bool {
        self.live.contains(&connection_id)
    }

    /// Records a write for the replicas.
    pub fn propagate<S: AsRef<str>>(&mut self, parts: &[S]) {
        self.replication.record(RespValue::command(parts));
    }

    /// Parks `connection_id` on `key` and arms its timeout, if any.
    pub fn block(&mut self, key: &str, connection_id: ConnectionId, timeout: Option<Duration>) {
        let block = self.blocked.block(key, connection_id, timeout);

        if let Some(deadline) = block.deadline {
            self.timers.register_at(
                deadline,
                TimerTask::BlockTimeout {
                    key: key.to_string(),
                    block_id: block.id,
                },
            );
        }

        debug!(conn = connection_id, key, ?timeout, "connection blocked");
    }

    /// Hands freshly pushed data on `key` to its waiters.
    pub fn wake(&mut self, key: &str) {
        let live = &self.live;
        let wakeups = self
            .blocked
            .on_push(&mut self.lists, key, |id| live.contains(&id));

        for wakeup in wakeups {
            match wakeup {
                Wakeup::Served {
                    connection_id,
                    key,
                    value,
                } => {
                    debug!(conn = connection_id, key = %key, "blocked pop served");
                    self.propagate(&["LPOP", key.as_str()]);
                    self.deliver(
                        connection_id,
                        RespValue::string_array(vec![key, value]),
                        true,
                    );
                }
                Wakeup::TimedOut { connection_id } => {
                    self.deliver(connection_id, RespValue::Null, true);
                }
            }
        }
    }

    /// Fires a block timeout. Does nothing if the block was already served.
    pub fn expire_block(&mut self, key: &str, block_id: BlockId) {
        if let Some(connection_id) = self.blocked.expire(key, block_id) {
            debug!(conn = connection_id, key, "blocked pop timed out");
            self.deliver(connection_id, RespValue::Null, true);
        }
    }

    /// Takes every timer task due at `now`, earliest first.
    pub fn due_timers(&mut self, now: Instant) -> Vec<TimerTask> {
        self.timers.tick(now)
    }

    pub fn deliver(&mut self, connection_id: ConnectionId, reply: RespValue, resumes: bool) {
        if !self.is_live(connection_id) {
            return;
        }

        self.outbox.push_back(Delivery {
            connection_id,
            reply,
            resumes,
        });
    }

    pub fn take_deliveries(&mut self) -> Vec<Delivery> {
        self.outbox.drain(..).collect()
    }
}

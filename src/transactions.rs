//! Per-connection MULTI/EXEC queues.
//!
//! A connection is inside a transaction exactly while it owns an entry in the
//! registry. There is no separate flag.

use std::collections::HashMap;

use thiserror::Error;

use crate::{commands::Command, ConnectionId};

#[derive(Error, Debug, PartialEq)]
pub enum TransactionError {
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
}

/// What the engine should do with a command after the registry has seen it.
#[derive(Debug, PartialEq)]
pub enum QueueOutcome {
    Queued,
    ExecuteNow(Command),
}

#[derive(Debug, Default)]
pub struct TransactionRegistry {
    queues: HashMap<ConnectionId, Vec<Command>>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction for `connection_id`. Calling it twice keeps the
    /// commands queued so far.
    pub fn multi(&mut self, connection_id: ConnectionId) {
        self.queues.entry(connection_id).or_default();
    }

    pub fn is_active(&self, connection_id: ConnectionId) -> bool {
        self.queues.contains_key(&connection_id)
    }

    /// Queues `command` when its origin is inside MULTI. MULTI, EXEC and
    /// DISCARD are always handed back for immediate execution.
    pub fn queue_or_execute(&mut self, command: Command) -> QueueOutcome {
        if command.verb.is_transaction_control() {
            return QueueOutcome::ExecuteNow(command);
        }

        match self.queues.get_mut(&command.origin) {
            Some(queue) => {
                queue.push(command);
                QueueOutcome::Queued
            }
            None => QueueOutcome::ExecuteNow(command),
        }
    }

    /// Ends the transaction and hands back its commands in the order they
    /// were queued.
    pub fn exec(&mut self, connection_id: ConnectionId) -> Result<Vec<Command>, TransactionError> {
        self.queues
            .remove(&connection_id)
            .ok_or(TransactionError::ExecWithoutMulti)
    }

    pub fn discard(&mut self, connection_id: ConnectionId) -> Result<(), TransactionError> {
        self.queues
            .remove(&connection_id)
            .map(|_| ())
            .ok_or(TransactionError::DiscardWithoutMulti)
    }

    /// Drops whatever a closed connection had queued.
    pub fn remove(&mut self, connection_id: ConnectionId) {
        self.queues.remove(&connection_id);
    }
}

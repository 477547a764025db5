//! Master-side write fan-out and the replication fields reported by INFO.
//!
//! Mutating commands are recorded as request arrays while they execute. The
//! reactor drains the queue once per tick and copies every event into the
//! outbound buffer of each attached replica.

use std::collections::VecDeque;

use crate::{config::MasterAddress, resp::RespValue, ConnectionId};

pub const REPLICATION_ID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";

/// Delay between attempts to reach an unreachable master.
pub const RECONNECT_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Master,
    Replica(MasterAddress),
}

impl Role {
    pub fn as_string(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Replica(_) => "slave",
        }
    }
}

#[derive(Debug)]
pub struct Replication {
    role: Role,
    repl_offset: u64,
    replicas: Vec<ConnectionId>,
    events: VecDeque<RespValue>,
    /// Replica side: set while there is no working link to the master.
    pub master_down: bool,
    /// Replica side: a reconnect timer is registered and has not fired yet.
    pub retry_pending: bool,
    /// Replica side: the handshake completed on the current link.
    pub master_link_up: bool,
}

impl Replication {
    pub fn new(role: Role) -> Self {
        let master_down = matches!(role, Role::Replica(_));

        Self {
            role,
            repl_offset: 0,
            replicas: Vec::new(),
            events: VecDeque::new(),
            master_down,
            retry_pending: false,
            master_link_up: false,
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }

    pub fn master_address(&self) -> Option<&MasterAddress> {
        match &self.role {
            Role::Master => None,
            Role::Replica(address) => Some(address),
        }
    }

    pub fn repl_offset(&self) -> u64 {
        self.repl_offset
    }

    pub fn add_replica(&mut self, connection_id: ConnectionId) {
        if !self.replicas.contains(&connection_id) {
            self.replicas.push(connection_id);
        }
    }

    pub fn remove_replica(&mut self, connection_id: ConnectionId) -> bool {
        let before = self.replicas.len();
        self.replicas.retain(|id| *id != connection_id);
        before != self.replicas.len()
    }

    pub fn replicas(&self) -> &[ConnectionId] {
        &self.replicas
    }

    /// Queues a write for the replicas. Only a master records writes, and
    /// the offset advances by the encoded size of the request.
    pub fn record(&mut self, command: RespValue) {
        if !self.is_master() {
            return;
        }

        self.repl_offset += command.encode().len() as u64;
        self.events.push_back(command);
    }

    /// Takes every queued write, oldest first.
    pub fn drain_events(&mut self) -> Vec<RespValue> {
        self.events.drain(..).collect()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// A replica whose master link is down and has no retry scheduled yet.
    pub fn needs_reconnect(&self) -> bool {
        !self.is_master() && self.master_down && !self.retry_pending
    }

    pub fn mark_master_down(&mut self) {
        self.master_down = true;
        self.master_link_up = false;
    }

    pub fn info(&self) -> String {
        let mut lines = vec![format!("role:{}", self.role.as_string())];

        match &self.role {
            Role::Master => {
                lines.push(format!("connected_slaves:{}", self.replicas.len()));
            }
            Role::Replica(master) => {
                let status = if self.master_link_up { "up" } else { "down" };

                lines.push(format!("master_host:{}", master.host));
                lines.push(format!("master_port:{}", master.port));
                lines.push(format!("master_link_status:{}", status));
            }
        }

        lines.push(format!("master_replid:{}", REPLICATION_ID));
        lines.push(format!("master_repl_offset:{}", self.repl_offset));

        lines.join("\r\n")
    }
}

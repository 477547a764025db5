//! A single-threaded Redis-compatible server.
//!
//! One reactor thread owns every socket and all data. It supports:
//!
//! - Strings with optional expiry (GET, SET, INCR)
//! - Lists (RPUSH, LPUSH, LRANGE, LLEN, LPOP) and blocking pops (BLPOP)
//! - Transactions (MULTI, EXEC, DISCARD)
//! - Master/replica replication: the replica handshake and write propagation
//! - PING, ECHO and INFO
//!
//! Clients speak RESP. Pipelined requests and frames split across reads are
//! both handled.

pub mod blocking;
pub mod commands;
pub mod config;
pub mod connection;
pub mod frame_buffer;
pub mod handshake;
pub mod key_value_store;
pub mod reactor;
pub mod replication;
pub mod resp;
pub mod server;
pub mod state;
pub mod timer;
pub mod transactions;

/// Stable id the reactor gives each connection. Registries refer to
/// connections by id only.
pub type ConnectionId = u64;

pub use config::ServerConfig;
pub use server::{Server, ServerError, ServerHandle};

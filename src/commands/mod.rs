//! Command engine: turns a decoded request into a reply.
//!
//! Every verb has its own module with an argument struct (`parse`) and a
//! handler. [`Verb::handler`] is the dispatch table. [`execute`] checks arity,
//! runs the command through the transaction registry and then through the
//! handler.

mod blpop;
mod command_error;
mod echo;
mod get;
mod incr;
mod info;
mod llen;
mod lpop;
mod lrange;
mod ping;
mod replication;
mod rpush_and_lpush;
mod set;
mod transactions;

use std::{fmt, str::FromStr};

use tracing::debug;

pub use command_error::CommandError;

use crate::{resp::RespValue, state::ServerState, transactions::QueueOutcome, ConnectionId};

type Handler = fn(&mut ServerState, &Command) -> Result<CommandResult, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Ping,
    Echo,
    Set,
    Get,
    Incr,
    RPush,
    LPush,
    LRange,
    LLen,
    LPop,
    BLPop,
    Multi,
    Exec,
    Discard,
    Info,
    Replconf,
    Psync,
}

impl Verb {
    pub fn name(self) -> &'static str {
        match self {
            Verb::Ping => "ping",
            Verb::Echo => "echo",
            Verb::Set => "set",
            Verb::Get => "get",
            Verb::Incr => "incr",
            Verb::RPush => "rpush",
            Verb::LPush => "lpush",
            Verb::LRange => "lrange",
            Verb::LLen => "llen",
            Verb::LPop => "lpop",
            Verb::BLPop => "blpop",
            Verb::Multi => "multi",
            Verb::Exec => "exec",
            Verb::Discard => "discard",
            Verb::Info => "info",
            Verb::Replconf => "replconf",
            Verb::Psync => "psync",
        }
    }

    /// Minimum number of request elements, the verb included.
    pub fn arity(self) -> usize {
        match self {
            Verb::Ping | Verb::Multi | Verb::Exec | Verb::Discard | Verb::Info => 1,
            Verb::Echo | Verb::Get | Verb::Incr | Verb::LLen | Verb::LPop => 2,
            Verb::Set | Verb::RPush | Verb::LPush | Verb::BLPop | Verb::Replconf | Verb::Psync => 3,
            Verb::LRange => 4,
        }
    }

    /// MULTI, EXEC and DISCARD always run, even inside a transaction.
    pub fn is_transaction_control(self) -> bool {
        matches!(self, Verb::Multi | Verb::Exec | Verb::Discard)
    }

    fn handler(self) -> Handler {
        match self {
            Verb::Ping => ping::ping,
            Verb::Echo => echo::echo,
            Verb::Set => set::set,
            Verb::Get => get::get,
            Verb::Incr => incr::incr,
            Verb::RPush => rpush_and_lpush::rpush,
            Verb::LPush => rpush_and_lpush::lpush,
            Verb::LRange => lrange::lrange,
            Verb::LLen => llen::llen,
            Verb::LPop => lpop::lpop,
            Verb::BLPop => blpop::blpop,
            Verb::Multi => transactions::multi,
            Verb::Exec => transactions::exec,
            Verb::Discard => transactions::discard,
            Verb::Info => info::info,
            Verb::Replconf => replication::replconf,
            Verb::Psync => replication::psync,
        }
    }
}

impl FromStr for Verb {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let verb = match s.to_ascii_uppercase().as_str() {
            "PING" => Verb::Ping,
            "ECHO" => Verb::Echo,
            "SET" => Verb::Set,
            "GET" => Verb::Get,
            "INCR" => Verb::Incr,
            "RPUSH" => Verb::RPush,
            "LPUSH" => Verb::LPush,
            "LRANGE" => Verb::LRange,
            "LLEN" => Verb::LLen,
            "LPOP" => Verb::LPop,
            "BLPOP" => Verb::BLPop,
            "MULTI" => Verb::Multi,
            "EXEC" => Verb::Exec,
            "DISCARD" => Verb::Discard,
            "INFO" => Verb::Info,
            "REPLCONF" => Verb::Replconf,
            "PSYNC" => Verb::Psync,
            _ => return Err(CommandError::UnknownCommand(s.to_string())),
        };

        Ok(verb)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

/// One request, bound to the connection that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub origin: ConnectionId,
    pub verb: Verb,
    pub args: Vec<String>,
}

impl Command {
    /// Builds a command out of a request array of bulk strings.
    pub fn from_frame(origin: ConnectionId, frame: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = frame else {
            return Err(CommandError::InvalidCommand);
        };

        let mut parts = elements.into_iter().map(|element| match element {
            RespValue::BulkString(s) | RespValue::SimpleString(s) => Ok(s),
            _ => Err(CommandError::InvalidCommand),
        });

        let verb = parts.next().ok_or(CommandError::InvalidCommand)??.parse()?;
        let args = parts.collect::<Result<Vec<_>, _>>()?;

        Ok(Self { origin, verb, args })
    }

    fn check_arity(&self) -> Result<(), CommandError> {
        if self.args.len() + 1 < self.verb.arity() {
            return Err(CommandError::WrongArity(self.verb.name()));
        }

        Ok(())
    }

    /// The command as a request array, the form replicas receive.
    pub fn to_request(&self) -> RespValue {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.verb.to_string());
        parts.extend(self.args.iter().cloned());

        RespValue::string_array(parts)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Completed(RespValue),
    /// The reply arrives later through the server's outbox.
    Suspended,
}

/// Executes one decoded request sent by `origin`.
///
/// Invalid requests are answered with an error and never queued. Inside
/// MULTI, everything except MULTI, EXEC and DISCARD is answered with QUEUED.
pub fn execute(state: &mut ServerState, origin: ConnectionId, frame: RespValue) -> CommandResult {
    let command = match Command::from_frame(origin, frame) {
        Ok(command) => command,
        Err(error) => return CommandResult::Completed(error.as_resp()),
    };

    if let Err(error) = command.check_arity() {
        return CommandResult::Completed(error.as_resp());
    }

    match state.transactions.queue_or_execute(command) {
        QueueOutcome::Queued => {
            CommandResult::Completed(RespValue::SimpleString("QUEUED".to_string()))
        }
        QueueOutcome::ExecuteNow(command) => run(state, &command),
    }
}

pub(crate) fn run(state: &mut ServerState, command: &Command) -> CommandResult {
    debug!(conn = command.origin, verb = command.verb.name(), "executing command");

    match (command.verb.handler())(state, command) {
        Ok(result) => result,
        Err(error) => CommandResult::Completed(error.as_resp()),
    }
}

use std::time::Duration;

use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct BLPopArguments {
    key: String,
    /// `None` waits forever
    timeout: Option<Duration>,
}

impl BLPopArguments {
    /// Parses `[key, timeout]`, the timeout being in seconds. A timeout of
    /// zero means no timeout.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [key, timeout] = arguments else {
            return Err(CommandError::WrongArity("blpop"));
        };

        let seconds = timeout
            .parse::<f64>()
            .map_err(|_| CommandError::InvalidBLPopCommandArgument)?;

        // Rejects negative, non-finite and out of range values.
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|_| CommandError::InvalidBLPopCommandArgument)?;

        let timeout = if seconds == 0.0 { None } else { Some(duration) };

        Ok(Self {
            key: key.clone(),
            timeout,
        })
    }
}

/// Handles the Redis BLPOP command.
///
/// Pops right away when the list has data. Otherwise the connection is parked
/// in the blocking registry and the command is suspended; the reply is sent
/// later by a push on the key or by the timeout. During EXEC the command never
/// waits and replies null instead.
pub fn blpop(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let blpop_arguments = BLPopArguments::parse(&command.args)?;
    let key = blpop_arguments.key;

    if let Some(value) = state.blocked.try_pop(&mut state.lists, &key) {
        state.propagate(&["LPOP", key.as_str()]);
        return Ok(CommandResult::Completed(RespValue::string_array(vec![
            key, value,
        ])));
    }

    if state.replaying_transaction {
        return Ok(CommandResult::Completed(RespValue::Null));
    }

    state.block(&key, command.origin, blpop_arguments.timeout);

    Ok(CommandResult::Suspended)
}

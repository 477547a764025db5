use std::time::Duration;

use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

/// Represents the parsed arguments for SET command
pub struct SetArguments {
    /// The key name to store the value under
    key: String,
    /// The value to be stored under the given key
    value: String,
    /// Time to live of the key value pair
    expiration: Option<Duration>,
}

impl SetArguments {
    /// Parses command arguments into a SetArguments structure.
    ///
    /// Two forms are accepted:
    ///   - `[key, value]` for permanent storage
    ///   - `[key, value, "PX", milliseconds]` for expiring storage
    ///
    /// # Returns
    ///
    /// * `Err(CommandError::SyntaxError)` - If the option is not `PX` or the argument count is off
    /// * `Err(CommandError::InvalidIntegerArgument)` - If the expiration is not an integer
    /// * `Err(CommandError::InvalidSetCommandExpiration)` - If the expiration is zero
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let (key, value, expiration) = match arguments {
            [key, value] => (key, value, None),
            [key, value, option, milliseconds] => {
                if !option.eq_ignore_ascii_case("px") {
                    return Err(CommandError::SyntaxError);
                }

                let milliseconds = milliseconds
                    .parse::<u64>()
                    .map_err(|_| CommandError::InvalidIntegerArgument)?;

                if milliseconds == 0 {
                    return Err(CommandError::InvalidSetCommandExpiration);
                }

                (key, value, Some(Duration::from_millis(milliseconds)))
            }
            [_] | [] => return Err(CommandError::WrongArity("set")),
            _ => return Err(CommandError::SyntaxError),
        };

        Ok(Self {
            key: key.clone(),
            value: value.clone(),
            expiration,
        })
    }
}

/// Handles the Redis SET command.
///
/// Stores a key-value pair with an optional expiration and propagates the
/// write to replicas.
///
/// # Examples
///
/// ```ignore
/// // SET mykey "hello" PX 1000  (expires in 1 second)
/// // Returns: "+OK\r\n"
/// ```
pub fn set(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(&command.args)?;

    state.strings.set(
        set_arguments.key,
        set_arguments.value,
        set_arguments.expiration,
    );
    state.replication.record(command.to_request());

    Ok(CommandResult::Completed(RespValue::ok()))
}

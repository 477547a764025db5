use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

/// Represents the parsed arguments for GET command
pub struct GetArguments {
    /// The key name to retrieve from the store
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [key] = arguments else {
            return Err(CommandError::WrongArity("get"));
        };

        Ok(Self { key: key.clone() })
    }
}

/// Handles the Redis GET command.
///
/// Replies with the stored value as a bulk string, or null when the key is
/// absent or expired.
pub fn get(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let get_arguments = GetArguments::parse(&command.args)?;

    let reply = match state.strings.get(&get_arguments.key) {
        Some(value) => RespValue::BulkString(value),
        None => RespValue::Null,
    };

    Ok(CommandResult::Completed(reply))
}

#[cfg(test)]
mod tests {
    use crate::{
        commands::{
            test_support::{master_state, reply},
            CommandError,
        },
        resp::RespValue,
    };

    #[test]
    fn test_get() {
        let mut state = master_state();

        assert_eq!(reply(&mut state, 1, &["GET", "missing"]), RespValue::Null);
        assert_eq!(
            reply(&mut state, 1, &["GET", "a", "b"]),
            CommandError::WrongArity("get").as_resp()
        );
    }

    #[test]
    fn test_strings_and_lists_do_not_share_keys() {
        let mut state = master_state();
        reply(&mut state, 1, &["RPUSH", "key", "a"]);

        assert_eq!(reply(&mut state, 1, &["GET", "key"]), RespValue::Null);
    }
}

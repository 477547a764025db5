use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

/// Handles the Redis ECHO command.
///
/// The ECHO command returns the exact string provided as an argument.
///
/// # Examples
///
/// ```ignore
/// // ECHO "hello world"
/// // Returns: "$11\r\nhello world\r\n"
/// ```
pub fn echo(_state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let [message] = command.args.as_slice() else {
        return Err(CommandError::WrongArity("echo"));
    };

    Ok(CommandResult::Completed(RespValue::BulkString(
        message.clone(),
    )))
}

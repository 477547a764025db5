use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct PingArguments {
    message: Option<String>,
}

impl PingArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        match arguments {
            [] => Ok(Self { message: None }),
            [message] => Ok(Self {
                message: Some(message.clone()),
            }),
            _ => Err(CommandError::WrongArity("ping")),
        }
    }
}

/// Handles the Redis PING command.
///
/// Replies `+PONG` or, when given an argument, echoes it back as a bulk
/// string.
pub fn ping(_state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let ping_arguments = PingArguments::parse(&command.args)?;

    let reply = match ping_arguments.message {
        Some(message) => RespValue::BulkString(message),
        None => RespValue::SimpleString("PONG".to_string()),
    };

    Ok(CommandResult::Completed(reply))
}

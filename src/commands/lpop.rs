use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct LPopArguments {
    key: String,
    count: Option<usize>,
}

impl LPopArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let (key, count) = match arguments {
            [key] => (key, None),
            [key, count] => {
                let count = count
                    .parse::<i64>()
                    .map_err(|_| CommandError::InvalidIntegerArgument)?;
                let count =
                    usize::try_from(count).map_err(|_| CommandError::InvalidLPopCommandArgument)?;

                (key, Some(count))
            }
            _ => return Err(CommandError::WrongArity("lpop")),
        };

        Ok(Self {
            key: key.clone(),
            count,
        })
    }
}

/// Handles the Redis LPOP command.
///
/// Without a count the reply is the popped element or null. With a count it
/// is an array of up to `count` elements, empty when the list is absent.
pub fn lpop(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let lpop_arguments = LPopArguments::parse(&command.args)?;

    let (reply, popped) = match lpop_arguments.count {
        None => match state.lists.lpop(&lpop_arguments.key) {
            Some(value) => (RespValue::BulkString(value), true),
            None => (RespValue::Null, false),
        },
        Some(count) => {
            let values = state.lists.lpop_many(&lpop_arguments.key, count);
            let popped = !values.is_empty();
            (RespValue::string_array(values), popped)
        }
    };

    if popped {
        state.replication.record(command.to_request());
    }

    Ok(CommandResult::Completed(reply))
}

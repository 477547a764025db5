use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct LRangeArguments {
    key: String,
    start: i64,
    end: i64,
}

impl LRangeArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [key, start, end] = arguments else {
            return Err(CommandError::WrongArity("lrange"));
        };

        let start = start
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidIntegerArgument)?;
        let end = end
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidIntegerArgument)?;

        Ok(Self {
            key: key.clone(),
            start,
            end,
        })
    }
}

/// Handles the Redis LRANGE command.
///
/// Negative indexes count from the end of the list. Ranges that end up empty
/// after normalisation reply with an empty array.
pub fn lrange(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let lrange_arguments = LRangeArguments::parse(&command.args)?;

    let items = state.lists.lrange(
        &lrange_arguments.key,
        lrange_arguments.start,
        lrange_arguments.end,
    );

    Ok(CommandResult::Completed(RespValue::string_array(items)))
}

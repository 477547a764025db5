use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct PushArrayOperations {
    key: String,
    values: Vec<String>,
}

impl PushArrayOperations {
    pub fn parse(arguments: &[String], should_prepend: bool) -> Result<Self, CommandError> {
        let [key, values @ ..] = arguments else {
            return Err(wrong_arity(should_prepend));
        };

        if values.is_empty() {
            return Err(wrong_arity(should_prepend));
        }

        Ok(Self {
            key: key.clone(),
            values: values.to_vec(),
        })
    }
}

fn wrong_arity(should_prepend: bool) -> CommandError {
    if should_prepend {
        CommandError::WrongArity("lpush")
    } else {
        CommandError::WrongArity("rpush")
    }
}

pub fn rpush(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    push_array_operations(state, command, false)
}

pub fn lpush(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    push_array_operations(state, command, true)
}

fn push_array_operations(
    state: &mut ServerState,
    command: &Command,
    should_prepend: bool,
) -> Result<CommandResult, CommandError> {
    let push_array_arguments = PushArrayOperations::parse(&command.args, should_prepend)?;
    let key = push_array_arguments.key;

    let list_length = if should_prepend {
        state.lists.lpush(&key, push_array_arguments.values)
    } else {
        state.lists.rpush(&key, push_array_arguments.values)
    };

    state.replication.record(command.to_request());

    // Blocked BLPOP clients on this key get served before anyone else can pop
    state.wake(&key);

    Ok(CommandResult::Completed(RespValue::Integer(
        list_length as i64,
    )))
}

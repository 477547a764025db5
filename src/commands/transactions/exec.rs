use crate::{
    commands::{run, Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct ExecArguments;

impl ExecArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::WrongArity("exec"));
        }

        Ok(Self)
    }
}

/// Handles the Redis EXEC command.
///
/// Replays every queued command in order and replies with one array holding
/// each command's reply, errors included. Nothing else runs in between.
pub fn exec(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    ExecArguments::parse(&command.args)?;

    let queued = state.transactions.exec(command.origin)?;

    state.replaying_transaction = true;

    let mut responses = Vec::with_capacity(queued.len());
    for queued_command in &queued {
        match run(state, queued_command) {
            CommandResult::Completed(reply) => responses.push(reply),
            CommandResult::Suspended => responses.push(RespValue::Null),
        }
    }

    state.replaying_transaction = false;

    Ok(CommandResult::Completed(RespValue::Array(responses)))
}

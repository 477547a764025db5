use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct MultiArguments;

impl MultiArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::WrongArity("multi"));
        }

        Ok(Self)
    }
}

pub fn multi(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    MultiArguments::parse(&command.args)?;

    state.transactions.multi(command.origin);

    Ok(CommandResult::Completed(RespValue::ok()))
}

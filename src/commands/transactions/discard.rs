use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct DiscardArguments;

impl DiscardArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::WrongArity("discard"));
        }

        Ok(Self)
    }
}

pub fn discard(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    DiscardArguments::parse(&command.args)?;

    state.transactions.discard(command.origin)?;

    Ok(CommandResult::Completed(RespValue::ok()))
}

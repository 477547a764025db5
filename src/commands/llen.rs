use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct LLenArguments {
    key: String,
}

impl LLenArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [key] = arguments else {
            return Err(CommandError::WrongArity("llen"));
        };

        Ok(Self { key: key.clone() })
    }
}

pub fn llen(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let llen_arguments = LLenArguments::parse(&command.args)?;
    let length = state.lists.llen(&llen_arguments.key);

    Ok(CommandResult::Completed(RespValue::Integer(length as i64)))
}

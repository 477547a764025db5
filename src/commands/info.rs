use tracing::debug;

use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct InfoArguments {
    /// Requested section names, lowercased
    sections: Vec<String>,
}

impl InfoArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        Ok(Self {
            sections: arguments
                .iter()
                .map(|section| section.to_ascii_lowercase())
                .collect(),
        })
    }
}

/// Handles the Redis INFO command.
///
/// Only the replication section exists, so it is returned whatever section
/// was asked for.
pub fn info(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let info_arguments = InfoArguments::parse(&command.args)?;

    debug!(conn = command.origin, sections = ?info_arguments.sections, "info");

    Ok(CommandResult::Completed(RespValue::BulkString(
        state.replication.info(),
    )))
}

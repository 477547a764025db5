//! PSYNC command implementation for Redis replication synchronization.
//!
//! Only full resynchronisation is supported. The data snapshot itself is not
//! transferred: the replica starts from an empty dataset and receives every
//! write from this point on.

use tracing::info;

use crate::{
    commands::{Command, CommandError, CommandResult},
    replication::REPLICATION_ID,
    resp::RespValue,
    state::ServerState,
};

/// Represents the parsed arguments for the PSYNC command.
pub struct PsyncArguments {
    /// The replication ID of the master (or "?" for full resync)
    master_repl_id: String,
    /// The current replication offset (or -1 for full resync)
    offset: i64,
}

impl PsyncArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [master_repl_id, offset] = arguments else {
            return Err(CommandError::WrongArity("psync"));
        };

        let offset = offset
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidPsyncOffset)?;

        Ok(Self {
            master_repl_id: master_repl_id.clone(),
            offset,
        })
    }
}

/// Handles the Redis PSYNC command.
///
/// Replies `+FULLRESYNC <replid> <offset>` and adds the connection to the
/// replica broadcast list.
pub fn psync(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let psync_arguments = PsyncArguments::parse(&command.args)?;

    let offset = state.replication.repl_offset();
    state.replication.add_replica(command.origin);

    info!(
        conn = command.origin,
        requested_id = %psync_arguments.master_repl_id,
        requested_offset = psync_arguments.offset,
        "replica attached"
    );

    Ok(CommandResult::Completed(RespValue::SimpleString(format!(
        "FULLRESYNC {} {}",
        REPLICATION_ID, offset
    ))))
}

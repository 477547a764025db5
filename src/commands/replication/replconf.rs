use tracing::debug;

use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

/// Represents the parsed arguments for the REPLCONF command.
pub struct ReplconfArguments {
    /// Option name such as `listening-port` or `capa`
    option: String,
    values: Vec<String>,
    /// Set when the option is a `listening-port` carrying a valid port
    listening_port: Option<u16>,
}

impl ReplconfArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [option, values @ ..] = arguments else {
            return Err(CommandError::WrongArity("replconf"));
        };

        if values.is_empty() {
            return Err(CommandError::WrongArity("replconf"));
        }

        let listening_port = if option.eq_ignore_ascii_case("listening-port") {
            values[0].parse::<u16>().ok()
        } else {
            None
        };

        Ok(Self {
            option: option.to_ascii_lowercase(),
            values: values.to_vec(),
            listening_port,
        })
    }
}

/// Handles the Redis REPLCONF command sent by replicas during the handshake.
/// Every option is acknowledged with `+OK`, including a `listening-port` that
/// is not a port number.
pub fn replconf(_state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let replconf_arguments = ReplconfArguments::parse(&command.args)?;

    if replconf_arguments.option == "listening-port" && replconf_arguments.listening_port.is_none() {
        debug!(
            conn = command.origin,
            value = %replconf_arguments.values[0],
            "replica sent a listening port that is not a port number"
        );
    }

    debug!(
        conn = command.origin,
        option = %replconf_arguments.option,
        values = ?replconf_arguments.values,
        "replica configuration"
    );

    Ok(CommandResult::Completed(RespValue::ok()))
}

#[cfg(test)]
mod tests {
    use super::ReplconfArguments;
    use crate::{
        commands::{
            test_support::{master_state, reply},
            CommandError,
        },
        resp::RespValue,
    };

    fn arguments(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[test]
    fn test_parse_listening_port() {
        let test_cases = vec![
            (vec!["listening-port", "6380"], Ok(Some(6380))),
            (vec!["LISTENING-PORT", "6380"], Ok(Some(6380))),
            (vec!["listening-port", "port"], Ok(None)),
            (vec!["capa", "psync2"], Ok(None)),
            (vec!["capa"], Err(CommandError::WrongArity("replconf"))),
        ];

        for (parts, expected) in test_cases {
            let parsed = ReplconfArguments::parse(&arguments(&parts)).map(|args| args.listening_port);
            assert_eq!(parsed, expected, "arguments {:?}", parts);
        }
    }

    #[test]
    fn test_replconf() {
        let mut state = master_state();

        let test_cases = vec![
            (vec!["REPLCONF", "listening-port", "6380"], RespValue::ok()),
            (vec!["REPLCONF", "capa", "psync2"], RespValue::ok()),
            (vec!["REPLCONF", "listening-port", "port"], RespValue::ok()),
            (vec!["REPLCONF", "GETACK", "*"], RespValue::ok()),
        ];

        for (parts, expected) in test_cases {
            assert_eq!(reply(&mut state, 1, &parts), expected, "{:?}", parts);
        }
    }
}

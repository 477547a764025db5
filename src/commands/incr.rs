use crate::{
    commands::{Command, CommandError, CommandResult},
    resp::RespValue,
    state::ServerState,
};

pub struct IncrArguments {
    key: String,
}

impl IncrArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [key] = arguments else {
            return Err(CommandError::WrongArity("incr"));
        };

        Ok(Self { key: key.clone() })
    }
}

/// Handles the Redis INCR command.
///
/// Absent keys count as 0. A value that is not a 64-bit integer is left
/// untouched and the client receives an error.
pub fn incr(state: &mut ServerState, command: &Command) -> Result<CommandResult, CommandError> {
    let incr_arguments = IncrArguments::parse(&command.args)?;

    let value = state.strings.incr(&incr_arguments.key)?;
    state.replication.record(command.to_request());

    Ok(CommandResult::Completed(RespValue::Integer(value)))
}

#[cfg(test)]
mod tests {
    use crate::{
        commands::{
            test_support::{bulk, master_state, reply},
            CommandError,
        },
        key_value_store::StoreError,
        resp::RespValue,
    };

    #[test]
    fn test_incr() {
        let mut state = master_state();

        let test_cases = vec![
            (vec!["INCR", "counter"], RespValue::Integer(1)),
            (vec!["INCR", "counter"], RespValue::Integer(2)),
            (vec!["SET", "num", "41"], RespValue::ok()),
            (vec!["INCR", "num"], RespValue::Integer(42)),
            (vec!["SET", "text", "abc"], RespValue::ok()),
            (
                vec!["INCR", "text"],
                CommandError::from(StoreError::NotAnInteger).as_resp(),
            ),
            (vec!["GET", "text"], bulk("abc")),
            (vec!["GET", "num"], bulk("42")),
        ];

        for (parts, expected) in test_cases {
            assert_eq!(reply(&mut state, 1, &parts), expected, "{:?}", parts);
        }
    }

    #[test]
    fn test_failed_incr_is_not_propagated() {
        let mut state = master_state();
        reply(&mut state, 1, &["SET", "text", "abc"]);
        state.replication.drain_events();

        reply(&mut state, 1, &["INCR", "text"]);
        assert!(state.replication.drain_events().is_empty());
    }
}

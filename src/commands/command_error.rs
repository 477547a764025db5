use thiserror::Error;

use crate::{key_value_store::StoreError, resp::RespValue, transactions::TransactionError};

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Invalid command")]
    InvalidCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("syntax error")]
    SyntaxError,
    #[error("invalid expire time in 'set' command")]
    InvalidSetCommandExpiration,
    #[error("value is not an integer or out of range")]
    InvalidIntegerArgument,
    #[error("value is out of range, must be positive")]
    InvalidLPopCommandArgument,
    #[error("timeout is not a float or out of range")]
    InvalidBLPopCommandArgument,
    #[error("Invalid PSYNC offset")]
    InvalidPsyncOffset,
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Transaction(#[from] TransactionError),
}

impl CommandError {
    /// The error reply sent back to the client.
    pub fn as_resp(&self) -> RespValue {
        RespValue::Error(format!("ERR {}", self))
    }
}

#[cfg(test)]
mod tests {
    use super::CommandError;
    use crate::{key_value_store::StoreError, transactions::TransactionError};

    #[test]
    fn test_error_replies() {
        let test_cases = vec![
            (
                CommandError::UnknownCommand("flushall".to_string()),
                "-ERR unknown command 'flushall'\r\n",
            ),
            (
                CommandError::WrongArity("get"),
                "-ERR wrong number of arguments for 'get' command\r\n",
            ),
            (
                CommandError::from(StoreError::NotAnInteger),
                "-ERR value is not an integer or out of range\r\n",
            ),
            (
                CommandError::from(TransactionError::ExecWithoutMulti),
                "-ERR EXEC without MULTI\r\n",
            ),
            (
                CommandError::from(TransactionError::DiscardWithoutMulti),
                "-ERR DISCARD without MULTI\r\n",
            ),
        ];

        for (error, expected) in test_cases {
            assert_eq!(error.as_resp().encode(), expected);
        }
    }
}

//! Replica side of the replication handshake.
//!
//! The stages run strictly in order, one request in flight at a time:
//!
//! ```text
//! PING                             -> +PONG
//! REPLCONF listening-port <port>   -> +OK
//! REPLCONF capa psync2             -> +OK
//! PSYNC ? -1                       -> +FULLRESYNC <replid> <offset>
//! ```

use thiserror::Error;

use crate::resp::RespValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Ping,
    ListeningPort,
    Capabilities,
    Psync,
    Done,
}

#[derive(Error, Debug, PartialEq)]
pub enum HandshakeError {
    #[error("unexpected reply {reply:?} during {stage:?} stage")]
    UnexpectedReply { stage: HandshakeStage, reply: String },
    #[error("reply received before the handshake started")]
    NotStarted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    stage: HandshakeStage,
    request_sent: bool,
    listening_port: u16,
}

impl Handshake {
    pub fn new(listening_port: u16) -> Self {
        Self {
            stage: HandshakeStage::Ping,
            request_sent: false,
            listening_port,
        }
    }

    pub fn stage(&self) -> HandshakeStage {
        self.stage
    }

    pub fn is_done(&self) -> bool {
        self.stage == HandshakeStage::Done
    }

    /// Restarts from the first stage and returns the PING to send once the
    /// link to the master is connected.
    pub fn start(&mut self) -> RespValue {
        self.reset();
        self.request_sent = true;
        RespValue::command(&["PING"])
    }

    /// Checks the master's reply against the current stage.
    ///
    /// Returns the next request to send, or `None` once the handshake is
    /// complete. Any unexpected reply resets every stage.
    pub fn on_reply(&mut self, reply: &RespValue) -> Result<Option<RespValue>, HandshakeError> {
        if !self.request_sent || self.is_done() {
            self.reset();
            return Err(HandshakeError::NotStarted);
        }

        let text = reply.as_text().unwrap_or_default();

        let accepted = match self.stage {
            HandshakeStage::Ping => text.eq_ignore_ascii_case("PONG"),
            HandshakeStage::ListeningPort | HandshakeStage::Capabilities => {
                text.eq_ignore_ascii_case("OK")
            }
            HandshakeStage::Psync => text.contains("FULLRESYNC"),
            HandshakeStage::Done => false,
        };

        if !accepted || matches!(reply, RespValue::Error(_)) {
            let error = HandshakeError::UnexpectedReply {
                stage: self.stage,
                reply: reply.encode().trim_end().to_string(),
            };
            self.reset();
            return Err(error);
        }

        let next = match self.stage {
            HandshakeStage::Ping => {
                self.stage = HandshakeStage::ListeningPort;
                Some(RespValue::command(&[
                    "REPLCONF".to_string(),
                    "listening-port".to_string(),
                    self.listening_port.to_string(),
                ]))
            }
            HandshakeStage::ListeningPort => {
                self.stage = HandshakeStage::Capabilities;
                Some(RespValue::command(&["REPLCONF", "capa", "psync2"]))
            }
            HandshakeStage::Capabilities => {
                self.stage = HandshakeStage::Psync;
                Some(RespValue::command(&["PSYNC", "?", "-1"]))
            }
            HandshakeStage::Psync | HandshakeStage::Done => {
                self.stage = HandshakeStage::Done;
                None
            }
        };

        self.request_sent = next.is_some();
        Ok(next)
    }

    fn reset(&mut self) {
        self.stage = HandshakeStage::Ping;
        self.request_sent = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{Handshake, HandshakeError, HandshakeStage};
    use crate::resp::RespValue;

    fn simple(text: &str) -> RespValue {
        RespValue::SimpleString(text.to_string())
    }

    #[test]
    fn test_full_handshake() {
        let mut handshake = Handshake::new(6380);

        assert_eq!(handshake.start(), RespValue::command(&["PING"]));

        let test_cases = vec![
            (
                simple("PONG"),
                HandshakeStage::ListeningPort,
                Some(RespValue::command(&["REPLCONF", "listening-port", "6380"])),
            ),
            (
                simple("OK"),
                HandshakeStage::Capabilities,
                Some(RespValue::command(&["REPLCONF", "capa", "psync2"])),
            ),
            (
                simple("OK"),
                HandshakeStage::Psync,
                Some(RespValue::command(&["PSYNC", "?", "-1"])),
            ),
            (
                simple("FULLRESYNC 8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb 0"),
                HandshakeStage::Done,
                None,
            ),
        ];

        for (reply, stage, next) in test_cases {
            assert_eq!(handshake.on_reply(&reply), Ok(next));
            assert_eq!(handshake.stage(), stage);
        }

        assert!(handshake.is_done());
    }

    #[test]
    fn test_unexpected_reply_resets_stages() {
        let mut handshake = Handshake::new(6380);
        handshake.start();
        handshake.on_reply(&simple("PONG")).unwrap();

        assert_eq!(
            handshake.on_reply(&RespValue::Error("ERR nope".to_string())),
            Err(HandshakeError::UnexpectedReply {
                stage: HandshakeStage::ListeningPort,
                reply: "-ERR nope".to_string(),
            })
        );
        assert_eq!(handshake.stage(), HandshakeStage::Ping);

        assert_eq!(
            handshake.on_reply(&simple("PONG")),
            Err(HandshakeError::NotStarted)
        );
    }

    #[test]
    fn test_ping_expects_pong() {
        let mut handshake = Handshake::new(6380);
        handshake.start();

        assert!(handshake.on_reply(&simple("OK")).is_err());
        assert_eq!(handshake.stage(), HandshakeStage::Ping);
    }
}

//! Redis Serialization Protocol (RESP) codec.
//!
//! Values are decoded straight out of a [`FrameBuffer`]. A value that is cut
//! off in the middle yields [`Decoded::Incomplete`]; the caller rewinds the
//! buffer and retries after the next socket read.

use thiserror::Error;

use crate::frame_buffer::FrameBuffer;

/// Largest bulk string accepted from a peer (same limit as Redis).
pub const MAX_BULK_LENGTH: usize = 512 * 1024 * 1024;

/// Arrays nested deeper than this are rejected.
pub const MAX_NESTING_DEPTH: usize = 32;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("unknown RESP type prefix {0:#04x}")]
    UnknownPrefix(u8),
    #[error("invalid length {0:?}")]
    InvalidLength(String),
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("bulk string is not terminated by CRLF")]
    MissingTerminator,
    #[error("arrays nested too deeply")]
    NestingTooDeep,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    Null,
    Array(Vec<RespValue>),
}

/// Outcome of one decode attempt.
#[derive(Debug, PartialEq)]
pub enum Decoded {
    Frame(RespValue),
    Incomplete,
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Builds a request array such as `["REPLCONF", "capa", "psync2"]`.
    pub fn command<S: AsRef<str>>(parts: &[S]) -> Self {
        RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::BulkString(part.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn string_array(items: Vec<String>) -> Self {
        RespValue::Array(items.into_iter().map(RespValue::BulkString).collect())
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.encode_into(&mut out);
        out
    }

    /// Appends the encoded value to an outbound buffer.
    pub fn write_to(&self, buffer: &mut FrameBuffer) {
        buffer.append(self.encode().as_bytes());
    }

    fn encode_into(&self, out: &mut String) {
        match self {
            RespValue::SimpleString(s) => {
                out.push('+');
                out.push_str(s);
                out.push_str("\r\n");
            }
            RespValue::Error(message) => {
                out.push('-');
                out.push_str(message);
                out.push_str("\r\n");
            }
            RespValue::Integer(i) => {
                out.push(':');
                out.push_str(&i.to_string());
                out.push_str("\r\n");
            }
            RespValue::BulkString(s) => {
                out.push('$');
                out.push_str(&s.len().to_string());
                out.push_str("\r\n");
                out.push_str(s);
                out.push_str("\r\n");
            }
            RespValue::Null => out.push_str("$-1\r\n"),
            RespValue::Array(elements) => {
                out.push('*');
                out.push_str(&elements.len().to_string());
                out.push_str("\r\n");

                for element in elements {
                    element.encode_into(out);
                }
            }
        }
    }

    /// Text carried by a simple string, error or bulk string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) | RespValue::Error(s) | RespValue::BulkString(s) => {
                Some(s.as_str())
            }
            _ => None,
        }
    }

    /// Decodes one value starting at the buffer's read position.
    ///
    /// On [`Decoded::Incomplete`] the read position is left wherever decoding
    /// stopped; callers are expected to have called [`FrameBuffer::mark`]
    /// before and to call [`FrameBuffer::reset`] afterwards.
    pub fn decode(buffer: &mut FrameBuffer) -> Result<Decoded, RespError> {
        match Self::decode_value(buffer, 0)? {
            Some(value) => Ok(Decoded::Frame(value)),
            None => Ok(Decoded::Incomplete),
        }
    }

    fn decode_value(buffer: &mut FrameBuffer, depth: usize) -> Result<Option<Self>, RespError> {
        let Some(prefix) = buffer.read_byte() else {
            return Ok(None);
        };

        match prefix {
            b'+' => Ok(read_text(buffer)?.map(RespValue::SimpleString)),
            b'-' => Ok(read_text(buffer)?.map(RespValue::Error)),
            b':' => {
                let Some(line) = read_text(buffer)? else {
                    return Ok(None);
                };

                let value = line
                    .parse::<i64>()
                    .map_err(|_| RespError::InvalidInteger(line))?;
                Ok(Some(RespValue::Integer(value)))
            }
            b'$' => {
                let Some(length) = read_length(buffer)? else {
                    return Ok(None);
                };

                let Some(length) = length else {
                    return Ok(Some(RespValue::Null));
                };

                if length > MAX_BULK_LENGTH {
                    return Err(RespError::InvalidLength(length.to_string()));
                }

                let Some(bytes) = buffer.read_exact(length) else {
                    return Ok(None);
                };
                let content = std::str::from_utf8(bytes)
                    .map_err(|_| RespError::InvalidUtf8)?
                    .to_string();

                match buffer.read_exact(2) {
                    None => Ok(None),
                    Some(b"\r\n") => Ok(Some(RespValue::BulkString(content))),
                    Some(_) => Err(RespError::MissingTerminator),
                }
            }
            b'*' => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(RespError::NestingTooDeep);
                }

                let Some(count) = read_length(buffer)? else {
                    return Ok(None);
                };

                let Some(count) = count else {
                    return Ok(Some(RespValue::Null));
                };

                let mut elements = Vec::with_capacity(count.min(1024));

                for _ in 0..count {
                    match Self::decode_value(buffer, depth + 1)? {
                        Some(element) => elements.push(element),
                        None => return Ok(None),
                    }
                }

                Ok(Some(RespValue::Array(elements)))
            }
            other => Err(RespError::UnknownPrefix(other)),
        }
    }
}

fn read_text(buffer: &mut FrameBuffer) -> Result<Option<String>, RespError> {
    let Some(line) = buffer.read_line() else {
        return Ok(None);
    };

    let text = std::str::from_utf8(line).map_err(|_| RespError::InvalidUtf8)?;
    Ok(Some(text.to_string()))
}

/// Reads a `<len>\r\n` header. `-1` is the null marker and maps to `None`.
fn read_length(buffer: &mut FrameBuffer) -> Result<Option<Option<usize>>, RespError> {
    let Some(line) = read_text(buffer)? else {
        return Ok(None);
    };

    if line == "-1" {
        return Ok(Some(None));
    }

    let length = line
        .parse::<usize>()
        .map_err(|_| RespError::InvalidLength(line))?;
    Ok(Some(Some(length)))
}

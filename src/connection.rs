//! One socket owned by the reactor.
//!
//! A connection never blocks. Reads drain the socket into the inbound buffer
//! until it would block, then every complete frame is decoded and executed.
//! Replies go to the outbound buffer, which is flushed whenever the socket
//! accepts more bytes.
//!
//! ```text
//!  socket --try_read--> inbound --decode--> command engine
//!                                               |
//!  socket <--try_write-- outbound <--encode-----+
//! ```

use std::{
    io::{self, ErrorKind},
    net::SocketAddr,
};

use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::{
    commands::{self, CommandResult},
    frame_buffer::FrameBuffer,
    handshake::{Handshake, HandshakeError},
    resp::{Decoded, RespError, RespValue},
    state::ServerState,
    ConnectionId,
};

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("connection closed by peer")]
    Closed,
    #[error("connection closed in the middle of a frame ({0} bytes buffered)")]
    UnexpectedEof(usize),
    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),
    #[error("replication handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug)]
pub enum ConnectionRole {
    /// Accepted from a client (or from a replica of ours).
    Client,
    /// Our outbound link to the master.
    ReplicaLink(Handshake),
}

#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    inbound: FrameBuffer,
    outbound: FrameBuffer,
    role: ConnectionRole,
    /// A command is waiting for a deferred reply; buffered frames stay put.
    suspended: bool,
    /// The peer closed its side.
    eof: bool,
    pub want_close: bool,
}

impl Connection {
    pub fn new(id: ConnectionId, stream: TcpStream, peer: SocketAddr) -> Self {
        Self::with_role(id, stream, peer, ConnectionRole::Client)
    }

    /// Builds the link to the master and queues the first handshake request.
    pub fn replica_link(
        id: ConnectionId,
        stream: TcpStream,
        peer: SocketAddr,
        listening_port: u16,
    ) -> Self {
        let mut handshake = Handshake::new(listening_port);
        let ping = handshake.start();

        let mut connection = Self::with_role(id, stream, peer, ConnectionRole::ReplicaLink(handshake));
        connection.send(&ping);
        connection
    }

    fn with_role(id: ConnectionId, stream: TcpStream, peer: SocketAddr, role: ConnectionRole) -> Self {
        Self {
            id,
            stream,
            peer,
            inbound: FrameBuffer::new(),
            outbound: FrameBuffer::new(),
            role,
            suspended: false,
            eof: false,
            want_close: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn is_replica_link(&self) -> bool {
        matches!(self.role, ConnectionRole::ReplicaLink(_))
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn want_read(&self) -> bool {
        !self.eof && !self.want_close
    }

    pub fn want_write(&self) -> bool {
        !self.outbound.is_empty() && !self.want_close
    }

    /// Appends an encoded value to the outbound buffer.
    pub fn send(&mut self, value: &RespValue) {
        value.write_to(&mut self.outbound);
    }

    /// Reads everything the socket has to offer right now.
    ///
    /// Returns the number of bytes read. End of stream is remembered and
    /// reported by [`Connection::check_eof`] once buffered frames were handled.
    pub fn read(&mut self) -> Result<usize, ConnectionError> {
        let mut total = 0;

        loop {
            match self.stream.try_read_buf(self.inbound.spare_mut()) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(total)
    }

    /// Classifies a closed peer: graceful at a frame boundary, unexpected
    /// with a partial frame left over.
    pub fn check_eof(&self) -> Result<(), ConnectionError> {
        if !self.eof {
            return Ok(());
        }

        if self.inbound.is_empty() || self.suspended {
            Err(ConnectionError::Closed)
        } else {
            Err(ConnectionError::UnexpectedEof(self.inbound.len()))
        }
    }

    /// Decodes and executes every complete frame in the inbound buffer.
    ///
    /// Stops early when a command suspends, so that later pipelined commands
    /// are answered after the deferred reply.
    pub fn process_inbound(&mut self, state: &mut ServerState) -> Result<(), ConnectionError> {
        while !self.suspended {
            self.inbound.mark();

            let frame = match RespValue::decode(&mut self.inbound)? {
                Decoded::Incomplete => {
                    self.inbound.reset();
                    break;
                }
                Decoded::Frame(frame) => {
                    self.inbound.commit();
                    frame
                }
            };

            match &mut self.role {
                ConnectionRole::Client => match commands::execute(state, self.id, frame) {
                    CommandResult::Completed(reply) => reply.write_to(&mut self.outbound),
                    CommandResult::Suspended => self.suspended = true,
                },
                ConnectionRole::ReplicaLink(handshake) => {
                    if handshake.is_done() {
                        // Write stream from the master: applied, never answered
                        commands::execute(state, self.id, frame);
                        continue;
                    }

                    match handshake.on_reply(&frame)? {
                        Some(request) => request.write_to(&mut self.outbound),
                        None => {
                            state.replication.master_link_up = true;
                            info!(conn = self.id, peer = %self.peer, "replication handshake complete");
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Writes a deferred reply and lets the connection go on with its
    /// buffered requests.
    pub fn resume(&mut self, reply: &RespValue, state: &mut ServerState) -> Result<(), ConnectionError> {
        self.send(reply);
        self.suspended = false;
        self.process_inbound(state)
    }

    /// Writes as much of the outbound buffer as the socket takes.
    pub fn flush(&mut self) -> Result<(), ConnectionError> {
        while !self.outbound.is_empty() {
            match self.stream.try_write(self.outbound.as_bytes()) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => self.outbound.consume(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if !self.outbound.is_empty() {
            debug!(conn = self.id, pending = self.outbound.len(), "outbound buffer not drained");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::{Connection, ConnectionError};
    use crate::{replication::Role, resp::RespValue, state::ServerState};

    async fn pair(state: &mut ServerState) -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (stream, peer) = listener.accept().await.unwrap();

        (Connection::new(state.connection_opened(), stream, peer), client)
    }

    async fn read_some(connection: &mut Connection) {
        connection.stream().readable().await.unwrap();
        connection.read().unwrap();
    }

    #[tokio::test]
    async fn test_split_frame_is_executed_once_complete() {
        let mut state = ServerState::new(Role::Master, 6379);
        let (mut connection, mut client) = pair(&mut state).await;

        client.write_all(b"*2\r\n$4\r\nECHO\r\n$2\r\nh").await.unwrap();
        read_some(&mut connection).await;
        connection.process_inbound(&mut state).unwrap();
        assert!(!connection.want_write());

        client.write_all(b"i\r\n*1\r\n$4\r\nPING\r\n").await.unwrap();
        while connection.outbound.as_bytes() != b"$2\r\nhi\r\n+PONG\r\n" {
            read_some(&mut connection).await;
            connection.process_inbound(&mut state).unwrap();
        }

        connection.flush().unwrap();

        let mut received = [0u8; 15];
        client.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"$2\r\nhi\r\n+PONG\r\n");
    }

    #[tokio::test]
    async fn test_suspended_connection_holds_pipelined_frames() {
        let mut state = ServerState::new(Role::Master, 6379);
        let (mut connection, mut client) = pair(&mut state).await;

        let batch = format!(
            "{}{}",
            RespValue::command(&["BLPOP", "queue", "0"]).encode(),
            RespValue::command(&["PING"]).encode()
        );
        client.write_all(batch.as_bytes()).await.unwrap();

        while !connection.is_suspended() {
            read_some(&mut connection).await;
            connection.process_inbound(&mut state).unwrap();
        }
        assert!(!connection.want_write());

        // Make sure the PING has been buffered before resuming
        while connection.inbound.is_empty() {
            read_some(&mut connection).await;
        }

        connection
            .resume(&RespValue::string_array(vec!["queue".into(), "job".into()]), &mut state)
            .unwrap();
        connection.flush().unwrap();

        let expected = b"*2\r\n$5\r\nqueue\r\n$3\r\njob\r\n+PONG\r\n";
        let mut received = vec![0u8; expected.len()];
        client.read_exact(&mut received).await.unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_eof_classification() {
        let mut state = ServerState::new(Role::Master, 6379);

        let (mut graceful, client) = pair(&mut state).await;
        drop(client);
        read_some(&mut graceful).await;
        graceful.process_inbound(&mut state).unwrap();
        assert!(matches!(graceful.check_eof(), Err(ConnectionError::Closed)));

        let (mut abrupt, mut client) = pair(&mut state).await;
        client.write_all(b"*1\r\n$4\r\nPI").await.unwrap();
        drop(client);
        while abrupt.want_read() {
            read_some(&mut abrupt).await;
        }
        abrupt.process_inbound(&mut state).unwrap();
        assert!(matches!(
            abrupt.check_eof(),
            Err(ConnectionError::UnexpectedEof(_))
        ));
    }

    #[tokio::test]
    async fn test_protocol_error() {
        let mut state = ServerState::new(Role::Master, 6379);
        let (mut connection, mut client) = pair(&mut state).await;

        client.write_all(b"?\r\n").await.unwrap();
        read_some(&mut connection).await;

        assert!(matches!(
            connection.process_inbound(&mut state),
            Err(ConnectionError::Protocol(_))
        ));
    }
}

#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use reactor_redis::{
    config::MasterAddress,
    frame_buffer::FrameBuffer,
    resp::{Decoded, RespValue},
    Server, ServerConfig, ServerHandle,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::{sleep, timeout, Instant},
};

pub const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Starts a master on an ephemeral port.
pub fn start_server() -> ServerHandle {
    spawn(ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        replicaof: None,
    })
}

/// Starts a replica of `master` on an ephemeral port.
pub fn start_replica(master: SocketAddr) -> ServerHandle {
    spawn(ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        replicaof: Some(MasterAddress {
            host: master.ip().to_string(),
            port: master.port(),
        }),
    })
}

fn spawn(config: ServerConfig) -> ServerHandle {
    Server::bind(config)
        .expect("bind test server")
        .spawn()
        .expect("spawn test server")
}

pub fn bulk(s: &str) -> RespValue {
    RespValue::BulkString(s.to_string())
}

pub fn simple(s: &str) -> RespValue {
    RespValue::SimpleString(s.to_string())
}

pub fn strings(items: &[&str]) -> RespValue {
    RespValue::string_array(items.iter().map(|item| item.to_string()).collect())
}

/// A plain RESP client over a tokio socket.
pub struct TestClient {
    stream: TcpStream,
    buffer: FrameBuffer,
}

impl TestClient {
    pub async fn connect(address: SocketAddr) -> Self {
        let stream = TcpStream::connect(address).await.expect("connect to server");

        Self {
            stream,
            buffer: FrameBuffer::new(),
        }
    }

    pub async fn write_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write to server");
        self.stream.flush().await.expect("flush to server");
    }

    pub async fn send(&mut self, parts: &[&str]) {
        let request = RespValue::command(parts).encode();
        self.write_raw(request.as_bytes()).await;
    }

    /// Sends one command and waits for its reply.
    pub async fn command(&mut self, parts: &[&str]) -> RespValue {
        self.send(parts).await;
        self.read_reply().await
    }

    pub async fn read_reply(&mut self) -> RespValue {
        timeout(REPLY_TIMEOUT, self.next_reply())
            .await
            .expect("timed out waiting for a reply")
            .expect("server closed the connection")
    }

    /// Waits for a reply for at most `wait`. `None` means nothing arrived.
    pub async fn try_read_reply(&mut self, wait: Duration) -> Option<RespValue> {
        timeout(wait, self.next_reply()).await.ok().flatten()
    }

    /// True once the server has closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(
            timeout(REPLY_TIMEOUT, self.stream.read(&mut byte)).await,
            Ok(Ok(0)) | Ok(Err(_))
        )
    }

    /// Repeats `parts` every 20 ms until the reply equals `expected`.
    pub async fn wait_for(&mut self, parts: &[&str], expected: &RespValue, deadline: Duration) -> bool {
        let give_up = Instant::now() + deadline;

        while Instant::now() < give_up {
            if self.command(parts).await == *expected {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }

        false
    }

    async fn next_reply(&mut self) -> Option<RespValue> {
        loop {
            self.buffer.mark();
            match RespValue::decode(&mut self.buffer).expect("server sent a valid frame") {
                Decoded::Frame(value) => {
                    self.buffer.commit();
                    return Some(value);
                }
                Decoded::Incomplete => self.buffer.reset(),
            }

            let read = self
                .stream
                .read_buf(self.buffer.spare_mut())
                .await
                .expect("read from server");

            if read == 0 {
                return None;
            }
        }
    }
}

//! Server lifecycle.
//!
//! [`Server::bind`] claims the listening socket, [`Server::start`] runs the
//! reactor on the calling thread until stopped, and [`Server::spawn`] runs it
//! on a dedicated thread behind a [`ServerHandle`].

use std::{
    io,
    net::SocketAddr,
    sync::Arc,
    thread::{self, JoinHandle},
};

use thiserror::Error;
use tokio::{net::TcpListener, runtime, sync::Notify};
use tracing::info;

use crate::{
    config::ServerConfig,
    reactor::Reactor,
    replication::Role,
    state::ServerState,
};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },
    #[error("failed to build the runtime: {0}")]
    Runtime(io::Error),
    #[error("reactor thread panicked")]
    ThreadPanicked,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    listener: std::net::TcpListener,
    shutdown: Arc<Notify>,
}

impl Server {
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let address = config.bind_address();
        let listener = std::net::TcpListener::bind(&address)
            .map_err(|source| ServerError::Bind { address, source })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            listener,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// The bound address, with the real port when the config asked for 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the reactor on the current thread until [`ServerHandle::stop`] is
    /// called.
    pub fn start(self) -> Result<(), ServerError> {
        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ServerError::Runtime)?;

        runtime.block_on(self.run())
    }

    /// Runs the reactor on its own thread.
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let local_addr = self.local_addr()?;
        let shutdown = Arc::clone(&self.shutdown);

        let thread = thread::Builder::new()
            .name("reactor".to_string())
            .spawn(move || self.start())?;

        Ok(ServerHandle {
            local_addr,
            shutdown,
            thread: Some(thread),
        })
    }

    async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::from_std(self.listener)?;
        let local_addr = listener.local_addr()?;

        let role = match self.config.replicaof {
            Some(master) => Role::Replica(master),
            None => Role::Master,
        };

        info!(address = %local_addr, role = role.as_string(), "server listening");

        let state = ServerState::new(role, local_addr.port());
        Reactor::new(listener, state, self.shutdown).run().await;

        Ok(())
    }
}

/// Owner of a server running on a background thread. Dropping the handle
/// stops the server too.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signals the reactor to exit, which closes the listener and every
    /// connection, then waits for its thread.
    pub fn stop(mut self) -> Result<(), ServerError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<(), ServerError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        self.shutdown.notify_one();
        thread.join().map_err(|_| ServerError::ThreadPanicked)?
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop_and_join();
    }
}

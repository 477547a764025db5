//! The single-threaded event loop.
//!
//! Every iteration waits for socket readiness (accept, connect, read, write)
//! for at most [`MAX_POLL_INTERVAL`], or less when a timer is due sooner, and
//! then runs in this order:
//!
//! 1. handle ready sockets (accept, finish the master connect, read and
//!    execute, write). After an accept error the listener is skipped for
//!    [`ACCEPT_BACKOFF`].
//! 2. fire due timers
//! 3. hand deferred replies to their connections
//! 4. fan queued writes out to replicas
//! 5. flush output, close what must be closed, schedule a master reconnect
//!    if the link is down
//!
//! Everything runs on one task, so no store or registry needs a lock.

use std::{
    collections::BTreeMap,
    future::{poll_fn, Future},
    io,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use tokio::{
    net::{TcpListener, TcpStream},
    sync::Notify,
    time::{sleep, Instant},
};
use tracing::{debug, error, info, warn};

use crate::{
    connection::{Connection, ConnectionError},
    replication::RECONNECT_INTERVAL_MS,
    state::{ServerState, TimerTask},
    ConnectionId,
};

/// Upper bound on one readiness wait, so timers fire even when idle.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the listener is left alone after an accept error such as EMFILE.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

type ConnectFuture = Pin<Box<dyn Future<Output = io::Result<(TcpStream, SocketAddr)>>>>;

enum Event {
    Accepted(TcpStream, SocketAddr),
    AcceptFailed(io::Error),
    MasterConnected(io::Result<(TcpStream, SocketAddr)>),
    Readable(ConnectionId),
    Writable(ConnectionId),
    Failed(ConnectionId, io::Error),
}

pub struct Reactor {
    listener: TcpListener,
    connections: BTreeMap<ConnectionId, Connection>,
    state: ServerState,
    connecting: Option<ConnectFuture>,
    accept_paused_until: Option<Instant>,
    shutdown: Arc<Notify>,
}

impl Reactor {
    pub fn new(listener: TcpListener, state: ServerState, shutdown: Arc<Notify>) -> Self {
        Self {
            listener,
            connections: BTreeMap::new(),
            state,
            connecting: None,
            accept_paused_until: None,
            shutdown,
        }
    }

    /// Runs until the shutdown notification fires, then closes every socket.
    pub async fn run(mut self) {
        let shutdown = Arc::clone(&self.shutdown);

        if self.state.replication.master_address().is_some() {
            self.connect_to_master();
        }

        loop {
            let timeout = self.poll_timeout();

            let events = tokio::select! {
                _ = shutdown.notified() => break,
                events = poll_fn(|cx| self.poll_events(cx)) => events,
                _ = sleep(timeout) => Vec::new(),
            };

            for event in events {
                self.handle_event(event);
            }

            self.run_timers();
            self.deliver_deferred_replies();
            self.fan_out_to_replicas();
            self.flush_all();
            self.close_finished();
            self.schedule_reconnect();
        }

        let open = self.connections.len();
        self.connections.clear();
        info!(connections = open, "server stopped");
    }

    fn poll_timeout(&self) -> Duration {
        match self.state.timers.next_deadline() {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(MAX_POLL_INTERVAL),
            None => MAX_POLL_INTERVAL,
        }
    }

    fn accept_paused(&self, now: Instant) -> bool {
        self.accept_paused_until.map_or(false, |until| now < until)
    }

    /// Collects every readiness event available right now, or registers
    /// interest and returns `Pending` when there is none.
    fn poll_events(&mut self, cx: &mut Context<'_>) -> Poll<Vec<Event>> {
        let mut events = Vec::new();

        if !self.accept_paused(Instant::now()) {
            match self.listener.poll_accept(cx) {
                Poll::Ready(Ok((stream, peer))) => events.push(Event::Accepted(stream, peer)),
                Poll::Ready(Err(e)) => events.push(Event::AcceptFailed(e)),
                Poll::Pending => {}
            }
        }

        if let Some(connect) = self.connecting.as_mut() {
            if let Poll::Ready(result) = connect.as_mut().poll(cx) {
                self.connecting = None;
                events.push(Event::MasterConnected(result));
            }
        }

        for (id, connection) in &self.connections {
            if connection.want_read() {
                match connection.stream().poll_read_ready(cx) {
                    Poll::Ready(Ok(())) => events.push(Event::Readable(*id)),
                    Poll::Ready(Err(e)) => events.push(Event::Failed(*id, e)),
                    Poll::Pending => {}
                }
            }

            if connection.want_write() {
                match connection.stream().poll_write_ready(cx) {
                    Poll::Ready(Ok(())) => events.push(Event::Writable(*id)),
                    Poll::Ready(Err(e)) => events.push(Event::Failed(*id, e)),
                    Poll::Pending => {}
                }
            }
        }

        if events.is_empty() {
            Poll::Pending
        } else {
            Poll::Ready(events)
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Accepted(stream, peer) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(peer = %peer, error = %e, "could not set TCP_NODELAY");
                }

                let id = self.state.connection_opened();
                self.connections.insert(id, Connection::new(id, stream, peer));
                info!(conn = id, peer = %peer, "accepted connection");
            }
            Event::AcceptFailed(e) => {
                error!(error = %e, backoff = ?ACCEPT_BACKOFF, "failed to accept connection");
                self.accept_paused_until = Some(Instant::now() + ACCEPT_BACKOFF);
            }
            Event::MasterConnected(Ok((stream, peer))) => {
                let id = self.state.connection_opened();
                let port = self.state.listening_port();
                self.connections
                    .insert(id, Connection::replica_link(id, stream, peer, port));
                info!(conn = id, peer = %peer, "connected to master");
            }
            Event::MasterConnected(Err(e)) => {
                warn!(error = %e, "could not connect to master");
                self.state.replication.mark_master_down();
            }
            Event::Readable(id) => {
                let Some(connection) = self.connections.get_mut(&id) else {
                    return;
                };

                if let Err(e) = read_and_execute(connection, &mut self.state) {
                    close_with(connection, e);
                }
            }
            Event::Writable(id) => {
                let Some(connection) = self.connections.get_mut(&id) else {
                    return;
                };

                if let Err(e) = connection.flush() {
                    close_with(connection, e);
                }
            }
            Event::Failed(id, e) => {
                if let Some(connection) = self.connections.get_mut(&id) {
                    close_with(connection, ConnectionError::Io(e));
                }
            }
        }
    }

    fn run_timers(&mut self) {
        for task in self.state.due_timers(Instant::now()) {
            match task {
                TimerTask::BlockTimeout { key, block_id } => {
                    self.state.expire_block(&key, block_id);
                }
                TimerTask::ReconnectMaster => {
                    self.state.replication.retry_pending = false;
                    self.connect_to_master();
                }
            }
        }
    }

    /// Replies produced outside their connection's read path: BLPOP wakeups
    /// and timeouts. Resuming a connection may run buffered commands that
    /// produce more of them, hence the loop.
    fn deliver_deferred_replies(&mut self) {
        loop {
            let deliveries = self.state.take_deliveries();
            if deliveries.is_empty() {
                break;
            }

            for delivery in deliveries {
                let Some(connection) = self.connections.get_mut(&delivery.connection_id) else {
                    debug!(conn = delivery.connection_id, "dropping reply for closed connection");
                    continue;
                };

                if connection.want_close || connection.is_replica_link() {
                    continue;
                }

                let result = if delivery.resumes && connection.is_suspended() {
                    connection.resume(&delivery.reply, &mut self.state)
                } else {
                    connection.send(&delivery.reply);
                    Ok(())
                };

                if let Err(e) = result {
                    close_with(connection, e);
                }
            }
        }
    }

    fn fan_out_to_replicas(&mut self) {
        if !self.state.replication.has_pending_events() {
            return;
        }

        let events = self.state.replication.drain_events();

        for id in self.state.replication.replicas().to_vec() {
            let Some(connection) = self.connections.get_mut(&id) else {
                continue;
            };

            for event in &events {
                connection.send(event);
            }

            if let Err(e) = connection.flush() {
                warn!(conn = id, error = %e, "failed to send writes to replica");
                connection.want_close = true;
            }
        }
    }

    fn flush_all(&mut self) {
        for connection in self.connections.values_mut() {
            if !connection.want_write() {
                continue;
            }

            if let Err(e) = connection.flush() {
                close_with(connection, e);
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.connecting.is_some() || !self.state.replication.needs_reconnect() {
            return;
        }

        self.state.replication.retry_pending = true;
        self.state.timers.register_timeout(
            Duration::from_millis(RECONNECT_INTERVAL_MS),
            TimerTask::ReconnectMaster,
        );
        info!(retry_in_ms = RECONNECT_INTERVAL_MS, "master unreachable, will retry");
    }

    fn close_finished(&mut self) {
        let finished: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.want_close)
            .map(|(id, _)| *id)
            .collect();

        for id in finished {
            let Some(connection) = self.connections.remove(&id) else {
                continue;
            };

            self.state.connection_closed(id);

            if connection.is_replica_link() {
                self.state.replication.mark_master_down();
                warn!(conn = id, "lost link to master");
            }

            debug!(conn = id, peer = %connection.peer(), "connection closed");
        }
    }

    fn connect_to_master(&mut self) {
        let Some(master) = self.state.replication.master_address() else {
            return;
        };

        let address = master.to_address();
        info!(master = %address, "connecting to master");

        self.state.replication.master_down = false;
        self.connecting = Some(Box::pin(async move {
            let stream = TcpStream::connect(address).await?;
            let peer = stream.peer_addr()?;
            Ok::<_, io::Error>((stream, peer))
        }));
    }
}

fn read_and_execute(
    connection: &mut Connection,
    state: &mut ServerState,
) -> Result<(), ConnectionError> {
    let read = connection.read()?;
    if read > 0 {
        debug!(conn = connection.id(), bytes = read, "read from socket");
    }

    connection.process_inbound(state)?;
    connection.flush()?;
    connection.check_eof()
}

/// Flags a connection for closing and logs why, at a level matching the
/// cause.
fn close_with(connection: &mut Connection, error: ConnectionError) {
    let id = connection.id();
    let peer = connection.peer();

    match &error {
        ConnectionError::Closed => debug!(conn = id, peer = %peer, "peer disconnected"),
        ConnectionError::UnexpectedEof(_)
        | ConnectionError::Protocol(_)
        | ConnectionError::Handshake(_) => {
            warn!(conn = id, peer = %peer, error = %error, "closing connection")
        }
        ConnectionError::Io(_) => error!(conn = id, peer = %peer, error = %error, "closing connection"),
    }

    connection.want_close = true;
}

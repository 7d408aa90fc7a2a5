//! Connector — socket lifecycle, command issue, and inbound routing.
//!
//! DESIGN
//! ======
//! One spawned task owns every piece of connection state: the socket, the
//! receive buffer, the subscriber registry, and the pending-reply table. The
//! cloneable [`Connector`] handle sends it operations over a channel, so any
//! number of caller threads observe a single serialized event loop.
//!
//! LIFECYCLE
//! =========
//! 1. `connect` — one attempt against the configured endpoint, bounded by the
//!    connect timeout. Idempotent while connected.
//! 2. Inbound bytes → complete records → decoded messages, routed in wire
//!    order: reply waiters first, then push fan-out.
//! 3. Unexpected closure arms exactly one fixed-delay reconnect timer; repeat
//!    closure events while it is armed are ignored. A failed attempt arms the
//!    next one — the connector waits indefinitely for the elevated service to
//!    come back up.
//! 4. `disconnect` cancels the timer and drops the socket. Outstanding
//!    request deadlines keep running and surface `RequestTimeout` on their
//!    own.
//!
//! Dropping every handle closes the op channel and stops the task.

use std::pin::Pin;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Sleep, sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::bus::{EventBus, SubscriptionId};
use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::framing::LineBuffer;
use crate::message::{Command, MessageKind, ProcessInfo, ProcessList, ServiceMessage};
use crate::reply::ReplyTable;

// =============================================================================
// HANDLE
// =============================================================================

/// Handle to the connector task. Cheap to clone; every clone talks to the
/// same connection.
#[derive(Debug, Clone)]
pub struct Connector {
    ops: mpsc::Sender<Op>,
    config: ConnectorConfig,
}

/// One live subscription to a push kind.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<ServiceMessage>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next message, or `None` once unsubscribed or the connector shut down.
    pub async fn recv(&mut self) -> Option<ServiceMessage> {
        self.rx.recv().await
    }
}

impl Connector {
    /// Spawn the connector task. Must be called inside a tokio runtime. The
    /// task starts disconnected; call [`connect`](Self::connect) to bring the
    /// link up.
    #[must_use]
    pub fn spawn(config: ConnectorConfig) -> Self {
        let (ops_tx, ops_rx) = mpsc::channel(64);
        tokio::spawn(run(config.clone(), ops_rx));
        Self { ops: ops_tx, config }
    }

    /// Attempt a single connection to the capture service.
    ///
    /// A no-op that succeeds immediately when already connected.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::ConnectTimeout`] when no connection completes within
    /// the configured deadline, [`ConnectorError::Connect`] on a transport
    /// failure.
    pub async fn connect(&self) -> Result<(), ConnectorError> {
        let (tx, rx) = oneshot::channel();
        self.send_op(Op::Connect(tx)).await?;
        flatten(rx.await)
    }

    /// Drop the connection and cancel any pending reconnect. Best-effort:
    /// succeeds whether or not a connection was up. Outstanding request
    /// deadlines are not cancelled and expire on their own.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self.ops.send(Op::Disconnect(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Ask the service to begin capture. Acknowledged asynchronously by a
    /// `scan-status` push, not by a correlated reply.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::NotConnected`] while down, [`ConnectorError::Write`]
    /// when the transport rejects the record.
    pub async fn start_scan(&self) -> Result<(), ConnectorError> {
        self.issue_command(Command::Start).await
    }

    /// Ask the service to end capture. Same contract as
    /// [`start_scan`](Self::start_scan).
    ///
    /// # Errors
    ///
    /// See [`start_scan`](Self::start_scan).
    pub async fn stop_scan(&self) -> Result<(), ConnectorError> {
        self.issue_command(Command::Stop).await
    }

    /// Enumerate processes with observed traffic.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::NotConnected`] while down,
    /// [`ConnectorError::RequestTimeout`] when no `processes-response`
    /// arrives within the configured request deadline.
    pub async fn get_processes(&self) -> Result<Vec<ProcessInfo>, ConnectorError> {
        let payload = self
            .issue_request(
                Command::GetProcesses,
                MessageKind::ProcessesResponse,
                self.config.request_timeout,
            )
            .await?;
        let list: ProcessList = serde_json::from_value(payload).unwrap_or_else(|e| {
            warn!(error = %e, "processes-response payload did not match the expected shape");
            ProcessList::default()
        });
        Ok(list.processes)
    }

    /// Fire-and-forget: write one command record.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::NotConnected`] while down, [`ConnectorError::Write`]
    /// when the transport rejects the record.
    pub async fn issue_command(&self, command: Command) -> Result<(), ConnectorError> {
        let (tx, rx) = oneshot::channel();
        self.send_op(Op::Command(command, tx)).await?;
        flatten(rx.await)
    }

    /// Write one command record, then await the next message of `reply_kind`.
    ///
    /// Correlation is by kind only — see [`crate::reply`] for the concurrent
    /// same-kind hazard. On timeout the waiter slot is abandoned; a late
    /// reply finding no live waiter is dropped without error.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::NotConnected`] at issue time,
    /// [`ConnectorError::Write`] when the send fails,
    /// [`ConnectorError::RequestTimeout`] when the deadline elapses first.
    pub async fn issue_request(
        &self,
        command: Command,
        reply_kind: MessageKind,
        deadline: Duration,
    ) -> Result<Value, ConnectorError> {
        let (tx, rx) = oneshot::channel();
        self.send_op(Op::Request { command, reply_kind, done: tx }).await?;
        let reply_rx = flatten(rx.await)?;
        match timeout(deadline, reply_rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(ConnectorError::Closed),
            Err(_) => Err(ConnectorError::RequestTimeout),
        }
    }

    /// Subscribe to a push kind. Push delivery is unconditional: a kind a
    /// request happens to be awaiting still reaches every subscriber.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::Closed`] when the connector task is gone.
    pub async fn subscribe(&self, kind: MessageKind) -> Result<Subscription, ConnectorError> {
        let (tx, rx) = oneshot::channel();
        self.send_op(Op::Subscribe { kind, done: tx }).await?;
        let (id, messages) = rx.await.map_err(|_| ConnectorError::Closed)?;
        Ok(Subscription { id, rx: messages })
    }

    /// Remove one subscription. Unknown ids are a no-op.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        let _ = self.ops.send(Op::Unsubscribe(id)).await;
    }

    async fn send_op(&self, op: Op) -> Result<(), ConnectorError> {
        self.ops.send(op).await.map_err(|_| ConnectorError::Closed)
    }
}

/// Collapse a oneshot recv error (actor gone) into `Closed`.
fn flatten<T>(
    recv: Result<Result<T, ConnectorError>, oneshot::error::RecvError>,
) -> Result<T, ConnectorError> {
    match recv {
        Ok(result) => result,
        Err(_) => Err(ConnectorError::Closed),
    }
}

// =============================================================================
// OPS
// =============================================================================

enum Op {
    Connect(oneshot::Sender<Result<(), ConnectorError>>),
    Disconnect(oneshot::Sender<()>),
    Command(Command, oneshot::Sender<Result<(), ConnectorError>>),
    Request {
        command: Command,
        reply_kind: MessageKind,
        done: oneshot::Sender<Result<oneshot::Receiver<Value>, ConnectorError>>,
    },
    Subscribe {
        kind: MessageKind,
        done: oneshot::Sender<(SubscriptionId, mpsc::Receiver<ServiceMessage>)>,
    },
    Unsubscribe(SubscriptionId),
}

// =============================================================================
// TASK
// =============================================================================

async fn run(cfg: ConnectorConfig, mut ops: mpsc::Receiver<Op>) {
    let mut socket: Option<TcpStream> = None;
    let mut buffer = LineBuffer::new();
    let mut bus = EventBus::new();
    let mut replies = ReplyTable::new();
    let mut reconnect: Option<Pin<Box<Sleep>>> = None;
    let mut chunk = [0u8; 8192];

    loop {
        tokio::select! {
            op = ops.recv() => {
                let Some(op) = op else { break };
                handle_op(op, &cfg, &mut socket, &mut buffer, &mut bus, &mut replies, &mut reconnect).await;
            }
            read = read_chunk(socket.as_mut(), &mut chunk) => {
                match read {
                    Ok(0) => {
                        info!("capture service closed the connection");
                        socket = None;
                        arm_reconnect(&cfg, &mut reconnect);
                    }
                    Ok(n) => {
                        for record in buffer.push(&chunk[..n]) {
                            route(&record, &mut bus, &mut replies);
                        }
                        if let Some(cap) = cfg.max_record_len {
                            if buffer.pending_len() > cap {
                                let err = ConnectorError::FrameTooLarge(cap);
                                error!(error = %err, pending = buffer.pending_len(), "dropping connection");
                                buffer.reset();
                                socket = None;
                                arm_reconnect(&cfg, &mut reconnect);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "read failed; connection lost");
                        socket = None;
                        arm_reconnect(&cfg, &mut reconnect);
                    }
                }
            }
            () = armed(reconnect.as_mut()) => {
                reconnect = None;
                if socket.is_some() {
                    // A manual connect raced the timer; the link is already up.
                    continue;
                }
                info!("attempting to reconnect to the capture service");
                match open_socket(&cfg).await {
                    Ok(s) => {
                        socket = Some(s);
                        buffer.reset();
                        info!(endpoint = %cfg.endpoint(), "reconnected");
                    }
                    Err(e) => {
                        // The attempt's own failure stands in for the closure
                        // event of the connection it never made; the service
                        // may take arbitrarily long to come back up.
                        warn!(error = %e, "reconnect attempt failed");
                        arm_reconnect(&cfg, &mut reconnect);
                    }
                }
            }
        }
    }

    debug!("connector task stopped");
}

async fn handle_op(
    op: Op,
    cfg: &ConnectorConfig,
    socket: &mut Option<TcpStream>,
    buffer: &mut LineBuffer,
    bus: &mut EventBus,
    replies: &mut ReplyTable,
    reconnect: &mut Option<Pin<Box<Sleep>>>,
) {
    match op {
        Op::Connect(done) => {
            if socket.is_some() {
                let _ = done.send(Ok(()));
                return;
            }
            match open_socket(cfg).await {
                Ok(s) => {
                    *socket = Some(s);
                    buffer.reset();
                    info!(endpoint = %cfg.endpoint(), "connected to the capture service");
                    let _ = done.send(Ok(()));
                }
                Err(e) => {
                    warn!(error = %e, endpoint = %cfg.endpoint(), "connect failed");
                    let _ = done.send(Err(e));
                }
            }
        }
        Op::Disconnect(done) => {
            *reconnect = None;
            if socket.take().is_some() {
                info!("disconnected from the capture service");
            }
            let _ = done.send(());
        }
        Op::Command(command, done) => {
            let _ = done.send(write_command(socket, command).await);
        }
        Op::Request { command, reply_kind, done } => match write_command(socket, command).await {
            Ok(()) => {
                let _ = done.send(Ok(replies.register(reply_kind)));
            }
            Err(e) => {
                let _ = done.send(Err(e));
            }
        },
        Op::Subscribe { kind, done } => {
            let _ = done.send(bus.subscribe(kind));
        }
        Op::Unsubscribe(id) => bus.unsubscribe(id),
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Hand one complete record to the reply table and the event bus.
///
/// Empty records are skipped silently; undecodable ones are logged and
/// dropped without disturbing the connection. Reply waiters resolve before
/// push fan-out so both observe wire order.
fn route(record: &str, bus: &mut EventBus, replies: &mut ReplyTable) {
    if record.trim().is_empty() {
        return;
    }
    let message = match ServiceMessage::decode(record) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, len = record.len(), "dropping undecodable record");
            return;
        }
    };
    let consumed = replies.resolve(message.kind, &message.data);
    if message.kind.is_push() {
        bus.publish(&message);
    } else if !consumed {
        debug!(kind = %message.kind, "reply arrived with no waiter; dropped");
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn open_socket(cfg: &ConnectorConfig) -> Result<TcpStream, ConnectorError> {
    match timeout(cfg.connect_timeout, TcpStream::connect(cfg.endpoint())).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(ConnectorError::Connect(e)),
        Err(_) => Err(ConnectorError::ConnectTimeout),
    }
}

async fn write_command(
    socket: &mut Option<TcpStream>,
    command: Command,
) -> Result<(), ConnectorError> {
    let Some(stream) = socket.as_mut() else {
        return Err(ConnectorError::NotConnected);
    };
    debug!(command = command.verb(), "sending command");
    stream
        .write_all(command.to_record().as_bytes())
        .await
        .map_err(ConnectorError::Write)
}

/// Read into `buf`, or park forever when no socket is up so the select arm
/// never fires while disconnected.
async fn read_chunk(socket: Option<&mut TcpStream>, buf: &mut [u8]) -> std::io::Result<usize> {
    match socket {
        Some(stream) => stream.read(buf).await,
        None => std::future::pending().await,
    }
}

/// Await the reconnect timer, or park forever when none is armed.
async fn armed(timer: Option<&mut Pin<Box<Sleep>>>) {
    match timer {
        Some(t) => t.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Arm the single reconnect timer. Closure events arriving while one is
/// already armed are ignored.
fn arm_reconnect(cfg: &ConnectorConfig, reconnect: &mut Option<Pin<Box<Sleep>>>) {
    if reconnect.is_some() {
        return;
    }
    info!(delay = ?cfg.reconnect_delay, "scheduling reconnect");
    *reconnect = Some(Box::pin(sleep(cfg.reconnect_delay)));
}

#[cfg(test)]
#[path = "connector_test.rs"]
mod tests;

//! 连接引擎及其面向应用和传输的句柄。
//! The connection engine and its handle for applications and transports.

use super::{
    actor::ConnectionActor,
    command::{ConnectionCommand, ConnectionStats},
    session::SessionId,
};
use crate::{
    config::ConnectionConfig,
    dispatch::EventSender,
    error::{Error, Result},
    transport::{TransportReader, TransportWriter},
};
use bytes::Bytes;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info};

/// Handle to the connection engine. Cheap to clone.
///
/// Transports call [`accept`](Self::accept) once per connection; the
/// application calls [`send`](Self::send) and [`close`](Self::close).
///
/// 连接引擎的句柄，克隆开销很小。传输层对每个连接调用一次 `accept`；
/// 应用调用 `send` 和 `close`。
#[derive(Debug)]
pub struct ConnectionHandle<P> {
    command_tx: mpsc::Sender<ConnectionCommand>,
    events: EventSender<P>,
    identity: Arc<AtomicU64>,
    dropped_sends: Arc<AtomicU64>,
}

impl<P> Clone for ConnectionHandle<P> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            events: self.events.clone(),
            identity: self.identity.clone(),
            dropped_sends: self.dropped_sends.clone(),
        }
    }
}

impl<P: Send + 'static> ConnectionHandle<P> {
    /// Runs one accepted connection to completion.
    ///
    /// Assigns the next identity, registers the session (which starts its
    /// writer task), emits `ConnectionOpened`, then pumps inbound payloads as
    /// `MessageReceived` events until the reader ends or fails. Finally the
    /// session is unregistered and `ConnectionClosed` is emitted. Sends issued
    /// after the handler observes the close are dropped.
    ///
    /// Returns the identity the session had.
    ///
    /// 运行一个已接受连接直至结束：分配下一个标识，注册会话（启动其写任务），
    /// 发出 `ConnectionOpened`，然后将入站载荷作为 `MessageReceived` 事件转发，
    /// 直到读端结束或失败。最后注销会话并发出 `ConnectionClosed`。
    pub async fn accept<R, W>(&self, mut reader: R, writer: W, remote: SocketAddr) -> Result<SessionId>
    where
        R: TransportReader,
        W: TransportWriter,
    {
        if self.events.is_closed() {
            return Err(Error::EngineStopped);
        }
        let id = SessionId::new(self.identity.fetch_add(1, Ordering::Relaxed) + 1);
        self.command(ConnectionCommand::Register {
            id,
            remote,
            writer: Box::new(writer),
        })
        .await?;
        info!(session = %id, addr = %remote, "Session opened");

        if let Err(e) = self.events.connection_opened(id, remote).await {
            let _ = self.command(ConnectionCommand::Unregister { id }).await;
            return Err(e);
        }

        loop {
            match reader.recv().await {
                Ok(Some(payload)) => {
                    if self.events.message_received(id, payload).await.is_err() {
                        debug!(session = %id, "Dispatch queue closed, ending read loop");
                        break;
                    }
                }
                Ok(None) => {
                    debug!(session = %id, "Peer closed session");
                    break;
                }
                Err(e) => {
                    debug!(session = %id, error = %e, "Session read failed, treating as close");
                    break;
                }
            }
        }

        // Unregister first so that replies to the close event are dropped.
        let _ = self.command(ConnectionCommand::Unregister { id }).await;
        let _ = self.events.connection_closed(id).await;
        info!(session = %id, addr = %remote, "Session closed");
        Ok(id)
    }

    /// Queues a payload for a session, waiting while that session's outbound
    /// buffer is full. Only this caller waits; the registry and other
    /// sessions keep going.
    ///
    /// Payloads for unknown sessions, or for sessions that close while the
    /// caller waits, are dropped and counted in
    /// [`ConnectionStats::dropped_sends`].
    ///
    /// 为会话排队一个载荷；该会话的出站缓冲区满时等待。只有调用者本身等待，
    /// 注册表和其他会话不受影响。发往未知会话或在等待期间关闭的会话的载荷会被丢弃并计数。
    pub async fn send(&self, id: SessionId, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payload.into();
        let (response_tx, response_rx) = oneshot::channel();
        self.command(ConnectionCommand::Lookup { id, response_tx })
            .await?;
        let Some(outbound) = response_rx.await.map_err(|_| Error::EngineStopped)? else {
            self.dropped_sends.fetch_add(1, Ordering::Relaxed);
            debug!(session = %id, "Send to unknown session dropped");
            return Ok(());
        };
        if outbound.send(payload).await.is_err() {
            self.dropped_sends.fetch_add(1, Ordering::Relaxed);
            debug!(session = %id, "Session closed while sending, payload dropped");
        }
        Ok(())
    }

    /// Closes a session. Its buffered payloads are flushed before the transport closes.
    ///
    /// 关闭会话。传输关闭前会先写出其已缓冲的载荷。
    pub async fn close(&self, id: SessionId) -> Result<()> {
        self.command(ConnectionCommand::Close { id }).await
    }

    pub async fn stats(&self) -> Result<ConnectionStats> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command(ConnectionCommand::Stats { response_tx }).await?;
        response_rx.await.map_err(|_| Error::EngineStopped)
    }

    async fn command(&self, command: ConnectionCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Error::EngineStopped)
    }
}

/// Owns the registry actor until `start`, then the running task.
///
/// 在 `start` 之前拥有注册表 actor，之后拥有运行中的任务。
pub struct ConnectionEngine<P> {
    handle: ConnectionHandle<P>,
    actor: Option<ConnectionActor>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<P: Send + 'static> ConnectionEngine<P> {
    /// Creates an idle engine that reports session events into `events`.
    pub fn new(config: &ConnectionConfig, events: EventSender<P>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let dropped_sends = Arc::new(AtomicU64::new(0));
        Self {
            handle: ConnectionHandle {
                command_tx,
                events,
                identity: Arc::new(AtomicU64::new(0)),
                dropped_sends: dropped_sends.clone(),
            },
            actor: Some(ConnectionActor::new(config, command_rx, dropped_sends)),
            stop_tx: None,
            task: None,
        }
    }

    pub fn handle(&self) -> ConnectionHandle<P> {
        self.handle.clone()
    }

    pub fn start(&mut self) -> Result<()> {
        let actor = self.actor.take().ok_or(Error::AlreadyStarted)?;
        let (stop_tx, stop_rx) = oneshot::channel();
        self.task = Some(tokio::spawn(actor.run(stop_rx)));
        self.stop_tx = Some(stop_tx);
        info!("Connection engine started");
        Ok(())
    }

    /// Closes every live session and waits until all writer tasks and the
    /// registry have exited.
    ///
    /// 关闭所有活跃会话，并等待所有写任务和注册表退出。
    pub async fn stop(&mut self) {
        self.actor = None;
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Connection registry task terminated abnormally");
            }
        }
    }
}

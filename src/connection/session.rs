//! Session identity and the pooled per-session state.
//! 会话标识以及可池化的每会话状态。

use crate::transport::TransportWriter;
use bytes::Bytes;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Process-unique identity of a session. Zero is never assigned.
///
/// 会话在进程内唯一的标识。永远不会分配零。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// The identity no live session ever has.
    pub const INVALID: SessionId = SessionId(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One session slot: identity, transport write half and outbound buffer.
///
/// The registry owns idle slots; a live slot is moved into its writer task
/// and moved back when that task ends. Every lease gets a fresh outbound
/// channel, so a sender kept from an earlier lease can never reach a later one.
///
/// 一个会话槽位：标识、传输写半部分以及出站缓冲区。空闲槽位由注册表拥有；
/// 活跃槽位被移入其写任务，并在任务结束时移回。每次租用都会创建新的出站通道，
/// 之前租用遗留的发送端无法触及之后的租用。
pub(crate) struct Session {
    pub(crate) id: SessionId,
    writer: Option<Box<dyn TransportWriter>>,
    outbound_capacity: usize,
    pub(crate) outbound_rx: mpsc::Receiver<Bytes>,
    pub(crate) close_rx: Option<oneshot::Receiver<()>>,
}

impl Session {
    pub(crate) fn new(outbound_capacity: usize) -> Self {
        // Idle slots hold an already-closed receiver.
        let (_, outbound_rx) = mpsc::channel(1);
        Self {
            id: SessionId::INVALID,
            writer: None,
            outbound_capacity,
            outbound_rx,
            close_rx: None,
        }
    }

    /// Binds the slot to a freshly accepted session.
    ///
    /// Returns the outbound sender and close trigger the registry keeps for it.
    pub(crate) fn attach(
        &mut self,
        id: SessionId,
        writer: Box<dyn TransportWriter>,
    ) -> (mpsc::Sender<Bytes>, oneshot::Sender<()>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(self.outbound_capacity);
        let (close_tx, close_rx) = oneshot::channel();
        self.id = id;
        self.writer = Some(writer);
        self.outbound_rx = outbound_rx;
        self.close_rx = Some(close_rx);
        (outbound_tx, close_tx)
    }

    /// Writes one payload. A failure is logged and the payload forgotten.
    pub(crate) async fn write(&mut self, payload: Bytes) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.send(payload).await {
            warn!(session = %self.id, error = %e, "Failed to write payload, dropping it");
        }
    }

    /// Closes and drops the transport write half.
    pub(crate) async fn release_transport(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.close().await {
                warn!(session = %self.id, error = %e, "Error while closing transport");
            }
        }
    }

    /// Clears everything tied to the previous lease.
    pub(crate) fn reset(&mut self) {
        self.id = SessionId::INVALID;
        self.writer = None;
        self.close_rx = None;
        self.outbound_rx.close();
        while self.outbound_rx.try_recv().is_ok() {}
    }

    #[cfg(test)]
    pub(crate) fn is_clean(&self) -> bool {
        !self.id.is_valid()
            && self.writer.is_none()
            && self.close_rx.is_none()
            && self.outbound_rx.is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("attached", &self.writer.is_some())
            .field("buffered", &self.outbound_rx.len())
            .finish()
    }
}

//! Commands used by the connection registry actor.
//! 连接注册表 actor 使用的命令。

use super::session::SessionId;
use crate::transport::TransportWriter;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::sync::{mpsc, oneshot};

/// Commands sent to the `ConnectionActor`.
///
/// A single queue keeps them in order: a session's `Register` is always
/// applied before any `Lookup` the handler issues in reaction to its open event.
///
/// 发送到 `ConnectionActor` 的命令。单一队列保证了顺序：会话的 `Register`
/// 总是先于处理器响应其打开事件而发出的任何 `Lookup` 被应用。
#[derive(Debug)]
pub(crate) enum ConnectionCommand {
    /// A transport accepted a new session.
    /// 传输接受了一个新会话。
    Register {
        id: SessionId,
        remote: SocketAddr,
        writer: Box<dyn TransportWriter>,
    },
    /// The read side of a session ended.
    /// 会话的读端已结束。
    Unregister { id: SessionId },
    /// Fetch the outbound buffer of a live session, `None` if it is gone.
    /// 获取活跃会话的出站缓冲区，会话不存在时为 `None`。
    Lookup {
        id: SessionId,
        response_tx: oneshot::Sender<Option<mpsc::Sender<Bytes>>>,
    },
    /// Close a session from the application side.
    /// 从应用侧关闭会话。
    Close { id: SessionId },
    /// Snapshot the registry's counters.
    /// 获取注册表计数器快照。
    Stats {
        response_tx: oneshot::Sender<ConnectionStats>,
    },
}

/// Counters reported by [`ConnectionHandle::stats`].
///
/// [`ConnectionHandle::stats`]: super::ConnectionHandle::stats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Sessions currently registered.
    pub live_sessions: usize,
    /// Idle slots kept for reuse.
    pub pooled_sessions: usize,
    /// Sessions registered since the engine started.
    pub accepted: u64,
    /// Payloads dropped because the session was unknown or closed before
    /// they could be buffered. A full buffer never drops; the sender waits.
    pub dropped_sends: u64,
}

//! The application-facing handler contract.
//! 面向应用的事件处理器契约。

use crate::{connection::SessionId, timer::TimerKey};
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;

/// Business logic invoked by the dispatch engine.
///
/// The handler is moved into the dispatch consumer task and only ever called
/// from there, one event at a time and in queue order. Every method takes
/// `&mut self`, so handler state needs no synchronization of its own.
///
/// Methods are async so a handler can await engine commands (for example
/// arming a timer or sending a reply) that may block on a full queue. The
/// consumer awaits each call to completion before dequeuing the next event.
///
/// 由分发引擎调用的业务逻辑。
///
/// 处理器被移入分发消费任务，且仅在该任务中按队列顺序逐个事件调用。
/// 所有方法都接收 `&mut self`，因此处理器状态无需自行同步。
#[async_trait]
pub trait EventHandler: Send + 'static {
    /// Opaque value carried unmodified from `TimerHandle::add` to `on_timer_fired`.
    /// 从 `TimerHandle::add` 原样携带到 `on_timer_fired` 的不透明值。
    type TimerPayload: Send + 'static;

    /// A new session was accepted by the connection engine.
    /// 连接引擎接受了一个新会话。
    async fn on_connection_opened(&mut self, session: SessionId, remote: SocketAddr);

    /// A payload arrived on a live session.
    /// 活跃会话上收到了一个载荷。
    async fn on_message_received(&mut self, session: SessionId, payload: Bytes);

    /// A session ended, either by peer hang-up, I/O failure or explicit close.
    /// 会话已结束（对端挂断、I/O故障或显式关闭）。
    async fn on_connection_closed(&mut self, session: SessionId);

    /// A timer reached its deadline.
    /// 定时器到期。
    async fn on_timer_fired(
        &mut self,
        key: TimerKey,
        first: Self::TimerPayload,
        second: Self::TimerPayload,
    );
}

//! The boundary between the connection engine and a concrete network transport.
//!
//! Framing and handshakes live behind these traits. A transport hands the
//! engine one reader and one writer per accepted session; the reader yields
//! whole payloads and the writer takes whole payloads.
//!
//! 连接引擎与具体网络传输之间的边界。
//!
//! 帧处理和握手都隐藏在这些 trait 之后。传输层为每个已接受的会话向引擎提供一个
//! 读端和一个写端；读端产出完整载荷，写端接收完整载荷。

pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

/// The inbound half of a session transport.
///
/// 会话传输的入站半部分。
#[async_trait]
pub trait TransportReader: Send + 'static {
    /// Waits for the next payload. `Ok(None)` means the peer closed the session.
    ///
    /// An error is treated by the engine exactly like a close.
    ///
    /// 等待下一个载荷。`Ok(None)` 表示对端关闭了会话。引擎将错误视同关闭处理。
    async fn recv(&mut self) -> Result<Option<Bytes>>;
}

/// The outbound half of a session transport.
///
/// 会话传输的出站半部分。
#[async_trait]
pub trait TransportWriter: Send + Debug + 'static {
    /// Writes one payload. Only the session's writer task calls this.
    ///
    /// 写出一个载荷。只有会话的写任务会调用此方法。
    async fn send(&mut self, payload: Bytes) -> Result<()>;

    /// Closes the transport. Called once, after the last `send`.
    ///
    /// 关闭传输。在最后一次 `send` 之后调用一次。
    async fn close(&mut self) -> Result<()>;
}

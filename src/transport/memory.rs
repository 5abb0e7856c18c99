//! An in-process transport built from tokio channels.
//!
//! `pair` returns the two halves the engine consumes plus a [`MemoryPeer`]
//! that plays the remote client: it injects inbound payloads, reads what the
//! server wrote, and can hang up. Closing the writer also ends the reader,
//! the way shutting down a socket ends its read side.
//!
//! 基于 tokio 通道的进程内传输。`pair` 返回引擎使用的两个半部分，以及一个扮演
//! 远端客户端的 [`MemoryPeer`]：它可以注入入站载荷、读取服务器写出的内容并挂断。
//! 关闭写端也会结束读端，就像关闭套接字会结束其读方向一样。

use super::{TransportReader, TransportWriter};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, watch};

/// Creates a connected transport. `capacity` bounds each direction.
///
/// 创建一个已连接的传输。`capacity` 限制每个方向的缓冲大小。
pub fn pair(capacity: usize) -> (MemoryReader, MemoryWriter, MemoryPeer) {
    let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = MemoryReader {
        inbound: inbound_rx,
        shutdown: shutdown_rx.clone(),
    };
    let writer = MemoryWriter {
        outbound: Some(outbound_tx),
        shutdown: shutdown_tx,
    };
    let peer = MemoryPeer {
        inbound: Some(inbound_tx),
        outbound: outbound_rx,
        shutdown: shutdown_rx,
    };
    (reader, writer, peer)
}

#[derive(Debug)]
pub struct MemoryReader {
    inbound: mpsc::Receiver<Bytes>,
    shutdown: watch::Receiver<bool>,
}

#[async_trait]
impl TransportReader for MemoryReader {
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        tokio::select! {
            biased;
            _ = closed_locally(&mut self.shutdown) => Ok(None),
            payload = self.inbound.recv() => Ok(payload),
        }
    }
}

#[derive(Debug)]
pub struct MemoryWriter {
    outbound: Option<mpsc::Sender<Bytes>>,
    shutdown: watch::Sender<bool>,
}

#[async_trait]
impl TransportWriter for MemoryWriter {
    async fn send(&mut self, payload: Bytes) -> Result<()> {
        let Some(outbound) = self.outbound.as_ref() else {
            return Err(Error::Transport("writer already closed".into()));
        };
        outbound
            .send(payload)
            .await
            .map_err(|_| Error::Transport("peer hung up".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.outbound = None;
        self.shutdown.send_replace(true);
        Ok(())
    }
}

/// The remote end of a memory transport.
///
/// 内存传输的远端。
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: Option<mpsc::Sender<Bytes>>,
    outbound: mpsc::Receiver<Bytes>,
    shutdown: watch::Receiver<bool>,
}

impl MemoryPeer {
    /// Delivers a payload to the server side.
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        let Some(inbound) = self.inbound.as_ref() else {
            return Err(Error::Transport("peer already hung up".into()));
        };
        inbound
            .send(payload.into())
            .await
            .map_err(|_| Error::Transport("server side closed".into()))
    }

    /// Next payload written by the server, or `None` once its writer is gone.
    ///
    /// 服务器写出的下一个载荷；其写端消失后返回 `None`。
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.outbound.recv().await
    }

    /// Ends the server's read side, as a client disconnect would.
    ///
    /// 结束服务器的读方向，如同客户端断开连接。
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Whether the server has closed (or dropped) its writer.
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Waits until the server closes its writer.
    pub async fn closed(&mut self) {
        closed_locally(&mut self.shutdown).await;
    }
}

/// Resolves once the writer half is closed or dropped.
async fn closed_locally(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

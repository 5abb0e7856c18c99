//! The per-session outbound writer task.
//! 每会话的出站写任务。

use super::session::Session;
use tokio::time::Duration;
use tracing::{debug, trace, warn};

/// Drains outbound payloads in arrival order until the close trigger fires.
///
/// On close the buffer stops accepting payloads, which wakes any sender still
/// waiting for room. Payloads already buffered are flushed for at most
/// `linger`, the transport is closed, and the slot is handed back to the
/// registry as the task's output. A write still blocked on the transport when
/// the close arrives is abandoned.
///
/// 按到达顺序写出出站载荷，直到关闭信号触发。关闭时缓冲区停止接收载荷，
/// 仍在等待空间的发送方会被唤醒；随后在 `linger` 时间内写出已缓冲的载荷，
/// 然后关闭传输，并将槽位作为任务输出交还给注册表。关闭到达时仍阻塞在传输上的写操作会被放弃。
pub(crate) async fn run(mut session: Session, linger: Duration) -> Session {
    let Some(mut close_rx) = session.close_rx.take() else {
        return session;
    };
    let id = session.id;
    trace!(session = %id, "Writer task started");

    loop {
        tokio::select! {
            biased;
            Some(payload) = session.outbound_rx.recv() => {
                tokio::select! {
                    biased;
                    _ = session.write(payload) => {}
                    _ = &mut close_rx => {
                        debug!(session = %id, "Close requested during a blocked write, payload abandoned");
                        break;
                    }
                }
            }
            // Fires on an explicit close and when the registry drops the trigger.
            _ = &mut close_rx => break,
        }
    }

    session.outbound_rx.close();
    let flush = async {
        let mut flushed = 0usize;
        while let Ok(payload) = session.outbound_rx.try_recv() {
            session.write(payload).await;
            flushed += 1;
        }
        flushed
    };
    match tokio::time::timeout(linger, flush).await {
        Ok(flushed) => debug!(session = %id, flushed, "Writer task flushed"),
        Err(_) => warn!(session = %id, ?linger, "Flush exceeded linger, remaining payloads dropped"),
    }

    session.release_transport().await;
    trace!(session = %id, "Writer task finished");
    session
}

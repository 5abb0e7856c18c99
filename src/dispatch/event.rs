//! Pending events and the bounded queue that carries them.
//! 待处理事件以及承载它们的有界队列。

use crate::{
    connection::SessionId,
    error::{Error, Result},
    timer::TimerKey,
};
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// One occurrence waiting to be delivered to the handler.
///
/// Each event is owned by the queue until the consumer dequeues it and is
/// delivered exactly once.
///
/// 等待投递给处理器的一次事件。每个事件在被消费者取出前归队列所有，且只投递一次。
#[derive(Debug)]
pub enum Event<P> {
    /// A session was accepted.
    /// 接受了一个会话。
    ConnectionOpened {
        session: SessionId,
        remote: SocketAddr,
    },
    /// A payload arrived on a session.
    /// 会话上收到了一个载荷。
    MessageReceived { session: SessionId, payload: Bytes },
    /// A session ended.
    /// 会话结束。
    ConnectionClosed { session: SessionId },
    /// A timer expired.
    /// 定时器到期。
    TimerFired { key: TimerKey, first: P, second: P },
}

impl<P> Event<P> {
    /// Short name of the event kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ConnectionOpened { .. } => "connection_opened",
            Event::MessageReceived { .. } => "message_received",
            Event::ConnectionClosed { .. } => "connection_closed",
            Event::TimerFired { .. } => "timer_fired",
        }
    }
}

/// Creates the bounded event queue shared by every producer.
///
/// 创建所有生产者共享的有界事件队列。
pub fn channel<P>(capacity: usize) -> (EventSender<P>, EventQueue<P>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, EventQueue { rx })
}

/// Producer side of the dispatch queue.
///
/// `enqueue` blocks while the queue is full and fails with
/// [`Error::EngineStopped`] once the dispatch engine no longer accepts events.
///
/// 分发队列的生产者端。队列满时 `enqueue` 会阻塞；分发引擎不再接受事件后返回
/// [`Error::EngineStopped`]。
#[derive(Debug)]
pub struct EventSender<P> {
    tx: mpsc::Sender<Event<P>>,
}

impl<P> Clone for EventSender<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P: Send> EventSender<P> {
    /// Enqueues one event, waiting for capacity if needed.
    pub async fn enqueue(&self, event: Event<P>) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::EngineStopped)
    }

    /// Reports a session that a transport has just accepted.
    /// 报告传输刚刚接受的会话。
    pub async fn connection_opened(&self, session: SessionId, remote: SocketAddr) -> Result<()> {
        self.enqueue(Event::ConnectionOpened { session, remote })
            .await
    }

    /// Reports one payload read from a session.
    /// 报告从会话读取的一个载荷。
    pub async fn message_received(&self, session: SessionId, payload: Bytes) -> Result<()> {
        self.enqueue(Event::MessageReceived { session, payload })
            .await
    }

    /// Reports that a session's read side has ended.
    /// 报告会话的读端已结束。
    pub async fn connection_closed(&self, session: SessionId) -> Result<()> {
        self.enqueue(Event::ConnectionClosed { session }).await
    }

    /// Reports a timer whose deadline has passed.
    /// 报告一个已到期的定时器。
    pub async fn timer_fired(&self, key: TimerKey, first: P, second: P) -> Result<()> {
        self.enqueue(Event::TimerFired { key, first, second })
            .await
    }

    /// Returns `true` once the consumer side has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the dispatch queue, handed to [`DispatchEngine::new`].
///
/// [`DispatchEngine::new`]: super::DispatchEngine::new
#[derive(Debug)]
pub struct EventQueue<P> {
    pub(crate) rx: mpsc::Receiver<Event<P>>,
}

impl<P> EventQueue<P> {
    /// Number of events currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[cfg(test)]
    pub(crate) async fn recv(&mut self) -> Option<Event<P>> {
        self.rx.recv().await
    }
}

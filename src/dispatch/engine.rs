//! The single consumer that delivers queued events to the handler.
//! 将排队事件投递给处理器的唯一消费者。

use super::event::{Event, EventQueue};
use crate::{
    config::{DispatchConfig, FaultPolicy},
    error::{Error, Result},
    fault,
    handler::EventHandler,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, trace};

/// Lifecycle of a [`DispatchEngine`]. There is no transition back to `Running`.
///
/// [`DispatchEngine`] 的生命周期。不存在回到 `Running` 的转换。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, consumer not yet spawned.
    Idle,
    /// Consumer task is delivering events.
    Running,
    /// Stop observed; already accepted events are being delivered.
    Stopping,
    /// Consumer task has exited.
    Stopped,
}

/// Owns the event queue and the handler until `start`, then the consumer task does.
///
/// `stop` is a rendezvous: it returns only after the consumer task has exited,
/// and every event accepted into the queue before the stop has been delivered.
///
/// 在 `start` 之前拥有事件队列和处理器，之后由消费任务拥有。
///
/// `stop` 是一次会合握手：只有在消费任务退出、且停止前已接受的所有事件都已投递后才返回。
pub struct DispatchEngine<H: EventHandler> {
    pending: Option<Consumer<H>>,
    state: watch::Receiver<EngineState>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<H: EventHandler> DispatchEngine<H> {
    /// Creates an idle engine over `queue`, injecting the handler.
    ///
    /// 基于 `queue` 创建一个空闲引擎，并注入处理器。
    pub fn new(queue: EventQueue<H::TimerPayload>, handler: H, config: &DispatchConfig) -> Self {
        let (state_tx, state) = watch::channel(EngineState::Idle);
        let consumer = Consumer {
            queue,
            handler,
            fault_policy: config.fault_policy,
            state_tx,
            delivered: 0,
        };
        Self {
            pending: Some(consumer),
            state,
            stop_tx: None,
            task: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Spawns the consumer task.
    ///
    /// 启动消费任务。
    pub fn start(&mut self) -> Result<()> {
        let consumer = self.pending.take().ok_or(Error::AlreadyStarted)?;
        let (stop_tx, stop_rx) = oneshot::channel();
        consumer.state_tx.send_replace(EngineState::Running);
        self.task = Some(tokio::spawn(consumer.run(stop_rx)));
        self.stop_tx = Some(stop_tx);
        info!("Dispatch engine started");
        Ok(())
    }

    /// Stops the consumer and waits until it has exited.
    ///
    /// Events already accepted are delivered first; producers that enqueue
    /// afterwards receive [`Error::EngineStopped`]. Calling `stop` on an engine
    /// that was never started drops the queue and marks it stopped.
    ///
    /// 停止消费者并等待其退出。已接受的事件会先被投递；之后入队的生产者会收到
    /// [`Error::EngineStopped`]。
    pub async fn stop(&mut self) {
        if let Some(consumer) = self.pending.take() {
            consumer.state_tx.send_replace(EngineState::Stopped);
            info!("Dispatch engine stopped before it was started");
            return;
        }

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Dispatch consumer task terminated abnormally");
            }
            info!("Dispatch engine stopped");
        }
    }
}

/// The state moved into the consumer task.
struct Consumer<H: EventHandler> {
    queue: EventQueue<H::TimerPayload>,
    handler: H,
    fault_policy: FaultPolicy,
    state_tx: watch::Sender<EngineState>,
    delivered: u64,
}

impl<H: EventHandler> Consumer<H> {
    async fn run(mut self, mut stop_rx: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                event = self.queue.rx.recv() => match event {
                    Some(event) => self.deliver(event).await,
                    // Every producer is gone.
                    None => break,
                },
                // A dropped engine counts as a stop request.
                _ = &mut stop_rx => break,
            }
        }

        self.state_tx.send_replace(EngineState::Stopping);
        self.queue.rx.close();
        if !self.queue.is_empty() {
            debug!(backlog = self.queue.len(), "Draining events accepted before stop");
        }
        let mut drained = 0usize;
        while let Some(event) = self.queue.rx.recv().await {
            self.deliver(event).await;
            drained += 1;
        }
        debug!(drained, delivered = self.delivered, "Dispatch queue drained");
        self.state_tx.send_replace(EngineState::Stopped);
    }

    /// Invokes the matching handler method, catching any panic it raises.
    async fn deliver(&mut self, event: Event<H::TimerPayload>) {
        let kind = event.kind();
        trace!(event = kind, "Delivering event");

        let handler = &mut self.handler;
        let call = async move {
            match event {
                Event::ConnectionOpened { session, remote } => {
                    handler.on_connection_opened(session, remote).await
                }
                Event::MessageReceived { session, payload } => {
                    handler.on_message_received(session, payload).await
                }
                Event::ConnectionClosed { session } => {
                    handler.on_connection_closed(session).await
                }
                Event::TimerFired { key, first, second } => {
                    handler.on_timer_fired(key, first, second).await
                }
            }
        };

        if let Err(panic) = AssertUnwindSafe(call).catch_unwind().await {
            fault::contain(self.fault_policy, "dispatch", kind, panic);
        }
        self.delivered += 1;
    }
}

//! 定时器引擎及其客户端句柄。
//! The timer engine and its client handle.

use super::{
    actor::TimerActor,
    command::{TimerCommand, TimerStats},
    heap::TimerKey,
};
use crate::{
    config::TimerConfig,
    dispatch::EventSender,
    error::{Error, Result},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::Duration,
};
use tracing::{error, info};

/// Handle for scheduling timers. Cheap to clone.
///
/// Every call enqueues a command and returns once it is accepted; it blocks
/// while the command queue is full. The only error is
/// [`Error::EngineStopped`].
///
/// 用于调度定时器的句柄，克隆开销很小。每次调用都会将命令入队，并在命令被接受后返回；
/// 命令队列满时会阻塞。
#[derive(Debug)]
pub struct TimerHandle<P> {
    command_tx: mpsc::Sender<TimerCommand<P>>,
}

impl<P> Clone for TimerHandle<P> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
        }
    }
}

impl<P: Send + 'static> TimerHandle<P> {
    /// Schedules a timer that fires `delay` from now with the two payloads.
    ///
    /// Keys must be unique among pending timers.
    ///
    /// 调度一个在 `delay` 后携带两个载荷到期的定时器。等待中的定时器键必须唯一。
    pub async fn add(
        &self,
        key: impl Into<TimerKey>,
        delay: Duration,
        first: P,
        second: P,
    ) -> Result<()> {
        self.send(TimerCommand::Add {
            key: key.into(),
            delay,
            first,
            second,
        })
        .await
    }

    /// Cancels a pending timer. Unknown or already fired keys are ignored.
    ///
    /// 取消一个等待中的定时器。未知或已到期的键会被忽略。
    pub async fn cancel(&self, key: impl Into<TimerKey>) -> Result<()> {
        self.send(TimerCommand::Cancel { key: key.into() }).await
    }

    /// Moves a pending timer to `delay` from now. Payloads are kept.
    ///
    /// 将等待中的定时器移动到 `delay` 之后，载荷保持不变。
    pub async fn reschedule(&self, key: impl Into<TimerKey>, delay: Duration) -> Result<()> {
        self.send(TimerCommand::Reschedule {
            key: key.into(),
            delay,
        })
        .await
    }

    /// Snapshot of the engine's counters. Answered in command order.
    pub async fn stats(&self) -> Result<TimerStats> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(TimerCommand::Stats { response_tx }).await?;
        response_rx.await.map_err(|_| Error::EngineStopped)
    }

    pub(super) async fn send(&self, command: TimerCommand<P>) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Error::EngineStopped)
    }
}

/// Owns the timer actor until `start`, then the running task.
///
/// 在 `start` 之前拥有定时器 actor，之后拥有运行中的任务。
pub struct TimerEngine<P> {
    handle: TimerHandle<P>,
    actor: Option<TimerActor<P>>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<P: Send + 'static> TimerEngine<P> {
    /// Creates an idle engine forwarding fired timers into `sink`.
    pub fn new(config: &TimerConfig, sink: EventSender<P>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        Self {
            handle: TimerHandle { command_tx },
            actor: Some(TimerActor::new(command_rx, sink, config.fault_policy)),
            stop_tx: None,
            task: None,
        }
    }

    pub fn handle(&self) -> TimerHandle<P> {
        self.handle.clone()
    }

    /// Spawns the actor task.
    pub fn start(&mut self) -> Result<()> {
        let actor = self.actor.take().ok_or(Error::AlreadyStarted)?;
        let (stop_tx, stop_rx) = oneshot::channel();
        self.task = Some(tokio::spawn(actor.run(stop_rx)));
        self.stop_tx = Some(stop_tx);
        info!("Timer engine started");
        Ok(())
    }

    /// Disarms the alarm, discards queued commands and waits for the actor to exit.
    ///
    /// 解除闹钟，丢弃排队中的命令，并等待 actor 退出。
    pub async fn stop(&mut self) {
        // A never started actor is simply dropped.
        self.actor = None;
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Timer task terminated abnormally");
            }
        }
    }
}

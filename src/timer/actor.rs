//! 定时器 Actor：拥有定时器堆和唯一的系统闹钟。
//! Timer Actor: owns the timer heap and the single system alarm.
//!
//! One `Sleep` is reused for every pending deadline. It is re-armed only when
//! the earliest deadline in the heap actually changes, and disarmed (its
//! `select!` branch disabled) while the heap is empty.
//!
//! 所有等待中的截止时间共用一个 `Sleep`。仅当堆中最早的截止时间发生变化时才重新设置，
//! 堆为空时则解除（禁用其 `select!` 分支）。

use super::{
    command::{TimerCommand, TimerStats},
    heap::{TimerHeap, TimerItem},
};
use crate::{config::FaultPolicy, dispatch::EventSender, fault};
use futures::FutureExt;
use std::{
    panic::{self, AssertUnwindSafe},
    pin::Pin,
};
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, Sleep},
};
use tracing::{debug, info, trace, warn};

pub(crate) struct TimerActor<P> {
    heap: TimerHeap<P>,
    command_rx: mpsc::Receiver<TimerCommand<P>>,
    sink: EventSender<P>,
    fault_policy: FaultPolicy,
    /// Deadline the alarm is armed for; `None` means disarmed.
    armed: Option<Instant>,
    rearms: u64,
    fired: u64,
    cancelled: u64,
    #[cfg(test)]
    fail_next_fire: bool,
}

impl<P: Send + 'static> TimerActor<P> {
    pub(crate) fn new(
        command_rx: mpsc::Receiver<TimerCommand<P>>,
        sink: EventSender<P>,
        fault_policy: FaultPolicy,
    ) -> Self {
        Self {
            heap: TimerHeap::new(),
            command_rx,
            sink,
            fault_policy,
            armed: None,
            rearms: 0,
            fired: 0,
            cancelled: 0,
            #[cfg(test)]
            fail_next_fire: false,
        }
    }

    /// Runs the actor's main loop until a stop signal arrives.
    ///
    /// 运行 actor 主循环，直到收到停止信号。
    pub(crate) async fn run(mut self, mut stop_rx: oneshot::Receiver<()>) {
        let alarm = tokio::time::sleep_until(Instant::now());
        tokio::pin!(alarm);

        loop {
            tokio::select! {
                biased;

                // Pending commands are discarded on stop.
                _ = &mut stop_rx => break,

                Some(command) = self.command_rx.recv() => {
                    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| self.apply(command))) {
                        fault::contain(self.fault_policy, "timer", "command", panic);
                    }
                    self.rearm(alarm.as_mut());
                }

                () = &mut alarm, if self.armed.is_some() => {
                    self.armed = None;
                    if let Err(panic) = AssertUnwindSafe(self.fire_due()).catch_unwind().await {
                        fault::contain(self.fault_policy, "timer", "fire", panic);
                    }
                    self.rearm(alarm.as_mut());
                }

                else => break,
            }
        }

        info!(pending = self.heap.len(), fired = self.fired, "Timer engine stopped");
    }

    fn apply(&mut self, command: TimerCommand<P>) {
        match command {
            TimerCommand::Add {
                key,
                delay,
                first,
                second,
            } => {
                trace!(key = %key, delay_ms = delay.as_millis(), "Adding timer");
                self.heap.insert(key, delay, first, second);
            }
            TimerCommand::Cancel { key } => {
                if self.heap.cancel(&key).is_some() {
                    self.cancelled += 1;
                    trace!(key = %key, "Timer cancelled");
                } else {
                    trace!(key = %key, "Cancel for unknown timer ignored");
                }
            }
            TimerCommand::Reschedule { key, delay } => {
                if self.heap.reschedule(&key, delay) {
                    trace!(key = %key, delay_ms = delay.as_millis(), "Timer rescheduled");
                } else {
                    trace!(key = %key, "Reschedule for unknown timer ignored");
                }
            }
            TimerCommand::Stats { response_tx } => {
                if response_tx.send(self.stats()).is_err() {
                    debug!("Stats requester went away");
                }
            }
            #[cfg(test)]
            TimerCommand::Fault { on_fire } => {
                if !on_fire {
                    panic!("injected timer fault");
                }
                self.fail_next_fire = true;
            }
        }
    }

    /// Points the alarm at the heap's earliest deadline if it moved.
    fn rearm(&mut self, alarm: Pin<&mut Sleep>) {
        let next = self.heap.next_deadline();
        if next == self.armed {
            return;
        }
        if let Some(deadline) = next {
            alarm.reset(deadline);
            self.rearms += 1;
            trace!(pending = self.heap.len(), "Alarm re-armed");
        }
        self.armed = next;
    }

    /// Forwards every timer whose deadline is at or before now.
    async fn fire_due(&mut self) {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_fire) {
            panic!("injected fire fault");
        }
        let now = Instant::now();
        while let Some(item) = self.heap.pop_due(now) {
            let TimerItem {
                key, first, second, ..
            } = item;
            self.fired += 1;
            trace!(key = %key, "Timer fired");
            if self.sink.timer_fired(key, first, second).await.is_err() {
                warn!(key = %key, "Dispatch queue closed, dropping fired timer");
            }
        }
    }

    fn stats(&self) -> TimerStats {
        TimerStats {
            pending: self.heap.len(),
            next_deadline: self.armed,
            rearms: self.rearms,
            fired: self.fired,
            cancelled: self.cancelled,
        }
    }
}

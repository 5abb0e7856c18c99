//! Commands accepted by the timer actor.
//! 定时器 actor 接受的命令。

use super::heap::TimerKey;
use tokio::{
    sync::oneshot,
    time::{Duration, Instant},
};

/// Commands sent to the `TimerActor` through its bounded queue.
///
/// 通过有界队列发送给 `TimerActor` 的命令。
#[derive(Debug)]
pub(crate) enum TimerCommand<P> {
    /// Schedule a timer `delay` after the command is applied.
    /// 在命令被应用后 `delay` 时长到期的定时器。
    Add {
        key: TimerKey,
        delay: Duration,
        first: P,
        second: P,
    },
    /// Remove a pending timer.
    /// 移除一个等待中的定时器。
    Cancel { key: TimerKey },
    /// Move a pending timer to `delay` after the command is applied.
    /// 将等待中的定时器移动到命令应用后 `delay` 时长。
    Reschedule { key: TimerKey, delay: Duration },
    /// Snapshot the actor's counters.
    /// 获取 actor 计数器快照。
    Stats {
        response_tx: oneshot::Sender<TimerStats>,
    },
    /// Makes the actor panic, either right away or on its next fire.
    #[cfg(test)]
    Fault { on_fire: bool },
}

/// Counters reported by [`TimerHandle::stats`].
///
/// [`TimerHandle::stats`]: super::TimerHandle::stats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// Timers waiting in the heap.
    pub pending: usize,
    /// Deadline the alarm is currently armed for.
    pub next_deadline: Option<Instant>,
    /// How many times the alarm was (re)armed to a new deadline.
    pub rearms: u64,
    /// Timers forwarded to the dispatch engine.
    pub fired: u64,
    /// Timers removed by a cancel command.
    pub cancelled: u64,
}

impl std::fmt::Display for TimerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimerStats {{ pending: {}, rearms: {}, fired: {}, cancelled: {} }}",
            self.pending, self.rearms, self.fired, self.cancelled
        )
    }
}

//! 定时器引擎模块
//! Timer Engine Module
//!
//! A deadline-ordered min-heap driven by one actor task. Callers add, cancel
//! and reschedule timers by a five-part [`TimerKey`]; due timers are forwarded
//! to the dispatch engine as `TimerFired` events.
//!
//! 由单个 actor 任务驱动的按截止时间排序的最小堆。调用方通过五元组 [`TimerKey`]
//! 添加、取消和重调度定时器；到期的定时器作为 `TimerFired` 事件转发给分发引擎。

mod actor;
mod command;
mod handle;
pub mod heap;


pub use command::TimerStats;
pub use handle::{TimerEngine, TimerHandle};
pub use heap::{TimerHeap, TimerItem, TimerKey};

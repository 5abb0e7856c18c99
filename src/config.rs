//! 定义了各个引擎的可配置参数。
//! Defines configurable parameters for the dispatch, timer and connection engines.

use std::time::Duration;

/// A structure containing all configurable parameters for a server.
///
/// 包含服务器所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Dispatch engine parameters.
    /// 分发引擎参数。
    pub dispatch: DispatchConfig,

    /// Timer engine parameters.
    /// 定时器引擎参数。
    pub timer: TimerConfig,

    /// Connection engine parameters.
    /// 连接引擎参数。
    pub connection: ConnectionConfig,
}

/// What the dispatch loop does after catching a panic from the handler.
///
/// 分发循环捕获到处理器 panic 后的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Log the fault and continue with the next event.
    /// 记录故障并继续处理下一个事件。
    #[default]
    LogAndContinue,
    /// Log the fault and abort the process.
    /// 记录故障并终止进程。
    Abort,
}

/// Dispatch engine parameters.
///
/// 分发引擎参数。
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Capacity of the inbound event queue. Producers block once it is full.
    /// 入站事件队列的容量。队列满时生产者会阻塞。
    pub queue_capacity: usize,
    /// Policy applied when a handler callback panics.
    /// 处理器回调 panic 时采用的策略。
    pub fault_policy: FaultPolicy,
}

/// Timer engine parameters.
///
/// 定时器引擎参数。
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Capacity of the add/cancel/reschedule command queue.
    /// 添加/取消/重调度命令队列的容量。
    pub command_capacity: usize,
    /// Policy applied when processing a command or a due timer panics.
    /// 处理命令或到期定时器时发生 panic 所采用的策略。
    pub fault_policy: FaultPolicy,
}

/// Connection engine parameters.
///
/// 连接引擎参数。
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Capacity of the registry command queue (register, unregister, lookup, close).
    /// 注册表命令队列（注册、注销、查找、关闭）的容量。
    pub command_capacity: usize,
    /// Number of outbound payloads buffered per session. Senders wait once it is full.
    /// 每个会话缓冲的出站载荷数量。缓冲区满后发送方会等待。
    pub outbound_capacity: usize,
    /// Maximum number of idle sessions kept for reuse.
    /// 保留以供复用的空闲会话的最大数量。
    pub pool_capacity: usize,
    /// How long a closing session may spend flushing buffered payloads.
    /// 关闭中的会话写出已缓冲载荷所能花费的最长时间。
    pub close_linger: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            fault_policy: FaultPolicy::LogAndContinue,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            command_capacity: 1024,
            fault_policy: FaultPolicy::LogAndContinue,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            command_capacity: 1024,
            outbound_capacity: 16,
            pool_capacity: 256,
            close_linger: Duration::from_secs(1),
        }
    }
}

//! 连接引擎：管理会话的生命周期并向分发引擎报告会话事件。
//! The connection engine: manages session lifecycles and reports session events.
//!
//! One registry actor owns the live-session map and a pool of reusable session
//! slots. Every session gets its own writer task so a slow client only ever
//! stalls itself; reads are pumped by whoever calls
//! [`ConnectionHandle::accept`].
//!
//! 一个注册表 actor 拥有活跃会话映射和可复用会话槽位池。每个会话都有自己的写任务，
//! 因此慢客户端只会拖慢自身；读取由调用 [`ConnectionHandle::accept`] 的一方驱动。

mod actor;
mod command;
mod handle;
mod pool;
mod session;
mod writer;


pub use command::ConnectionStats;
pub use handle::{ConnectionEngine, ConnectionHandle};
pub use session::SessionId;

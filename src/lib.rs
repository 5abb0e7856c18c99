#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the event-driven server core.
//! 事件驱动服务器核心库的根。
//!
//! Network sessions and software timers are merged into one ordered event
//! stream that a single [`handler::EventHandler`] consumes without locks.
//!
//! 网络会话和软件定时器被合并为单一有序事件流，由唯一的
//! [`handler::EventHandler`] 无锁消费。

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
mod fault;
pub mod handler;
pub mod server;
pub mod timer;
pub mod transport;

pub use config::{Config, FaultPolicy};
pub use error::{Error, Result};
pub use handler::EventHandler;
pub use server::{Handles, Server};

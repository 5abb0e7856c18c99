//! 分发引擎：把并发的生产者串行化为单一有序事件流。
//! The dispatch engine: serializes concurrent producers into one ordered event stream.
//!
//! The connection engine and the timer engine push [`Event`]s through cloned
//! [`EventSender`]s into a single bounded queue. One consumer task drains that
//! queue in arrival order and awaits the matching [`EventHandler`] method for
//! each event before taking the next one.
//!
//! [`EventHandler`]: crate::handler::EventHandler

mod engine;
mod event;


pub use engine::{DispatchEngine, EngineState};
pub use event::{channel, Event, EventQueue, EventSender};

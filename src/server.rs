//! 服务器门面：组装分发、定时器和连接三个引擎。
//! The server facade: wires the dispatch, timer and connection engines together.

use crate::{
    config::Config,
    connection::{ConnectionEngine, ConnectionHandle},
    dispatch::{self, DispatchEngine, EngineState},
    error::Result,
    handler::EventHandler,
    timer::{TimerEngine, TimerHandle},
};
use tracing::info;

/// The engine handles a handler is built with.
///
/// 构建处理器时可用的引擎句柄。
#[derive(Debug)]
pub struct Handles<P> {
    pub timers: TimerHandle<P>,
    pub connections: ConnectionHandle<P>,
}

impl<P> Clone for Handles<P> {
    fn clone(&self) -> Self {
        Self {
            timers: self.timers.clone(),
            connections: self.connections.clone(),
        }
    }
}

/// Owns the three engines of one server.
///
/// Both producer engines feed the same dispatch queue; the handler receives
/// every event on the single dispatch consumer task.
///
/// 拥有一个服务器的三个引擎。两个生产者引擎向同一个分发队列投递事件；
/// 处理器在唯一的分发消费任务上接收所有事件。
pub struct Server<H: EventHandler> {
    dispatch: DispatchEngine<H>,
    timer: TimerEngine<H::TimerPayload>,
    connection: ConnectionEngine<H::TimerPayload>,
    handles: Handles<H::TimerPayload>,
}

impl<H: EventHandler> Server<H> {
    /// Builds the engines, then calls `build` with their handles to create the handler.
    ///
    /// 先构建各引擎，再用它们的句柄调用 `build` 创建处理器。
    pub fn new<F>(config: Config, build: F) -> Self
    where
        F: FnOnce(&Handles<H::TimerPayload>) -> H,
    {
        let (events, queue) = dispatch::channel(config.dispatch.queue_capacity);
        let timer = TimerEngine::new(&config.timer, events.clone());
        let connection = ConnectionEngine::new(&config.connection, events);
        let handles = Handles {
            timers: timer.handle(),
            connections: connection.handle(),
        };
        let handler = build(&handles);
        let dispatch = DispatchEngine::new(queue, handler, &config.dispatch);
        Self {
            dispatch,
            timer,
            connection,
            handles,
        }
    }

    /// Starts the consumer first so no producer ever waits on an idle queue.
    pub fn start(&mut self) -> Result<()> {
        self.dispatch.start()?;
        self.timer.start()?;
        self.connection.start()?;
        info!("Server started");
        Ok(())
    }

    /// Stops producers before the consumer: connections, then timers, then dispatch.
    ///
    /// 先停止生产者再停止消费者：依次为连接、定时器、分发。
    pub async fn stop(&mut self) {
        self.connection.stop().await;
        self.timer.stop().await;
        self.dispatch.stop().await;
        info!("Server stopped");
    }

    pub fn timers(&self) -> TimerHandle<H::TimerPayload> {
        self.handles.timers.clone()
    }

    pub fn connections(&self) -> ConnectionHandle<H::TimerPayload> {
        self.handles.connections.clone()
    }

    pub fn dispatch_state(&self) -> EngineState {
        self.dispatch.state()
    }
}

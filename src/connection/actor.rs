//! The implementation of the session registry actor.
//!
//! 会话注册表 actor 的实现。

use super::{
    command::{ConnectionCommand, ConnectionStats},
    pool::SessionPool,
    session::{Session, SessionId},
    writer,
};
use crate::config::ConnectionConfig;
use bytes::Bytes;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::{
    sync::{mpsc, oneshot},
    task::{JoinError, JoinSet},
    time::Duration,
};
use tracing::{debug, info, trace, warn};

/// What the registry keeps for each live session.
///
/// 注册表为每个活跃会话保存的信息。
struct LiveSession {
    remote: SocketAddr,
    outbound: mpsc::Sender<Bytes>,
    close: oneshot::Sender<()>,
}

/// The actor that owns the live-session map, the slot pool and every writer task.
///
/// 拥有活跃会话映射、槽位池以及所有写任务的 actor。
pub(crate) struct ConnectionActor {
    sessions: HashMap<SessionId, LiveSession>,
    pool: SessionPool,
    /// Each writer task returns its slot when it ends.
    writers: JoinSet<Session>,
    command_rx: mpsc::Receiver<ConnectionCommand>,
    close_linger: Duration,
    accepted: u64,
    /// Bumped by handles whose payload found no session to wait on.
    dropped_sends: Arc<AtomicU64>,
}

impl ConnectionActor {
    pub(crate) fn new(
        config: &ConnectionConfig,
        command_rx: mpsc::Receiver<ConnectionCommand>,
        dropped_sends: Arc<AtomicU64>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            pool: SessionPool::new(config.pool_capacity, config.outbound_capacity),
            writers: JoinSet::new(),
            command_rx,
            close_linger: config.close_linger,
            accepted: 0,
            dropped_sends,
        }
    }

    /// Runs the actor's main event loop.
    ///
    /// 运行 actor 的主事件循环。
    pub(crate) async fn run(mut self, mut stop_rx: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;

                _ = &mut stop_rx => break,

                Some(command) = self.command_rx.recv() => self.handle_command(command),

                Some(joined) = self.writers.join_next() => self.reclaim(joined),

                else => break,
            }
        }

        self.shutdown().await;
    }

    fn handle_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Register { id, remote, writer } => {
                let mut session = self.pool.acquire();
                let (outbound, close) = session.attach(id, writer);
                self.writers.spawn(writer::run(session, self.close_linger));
                self.sessions.insert(
                    id,
                    LiveSession {
                        remote,
                        outbound,
                        close,
                    },
                );
                self.accepted += 1;
                debug!(session = %id, addr = %remote, live = self.sessions.len(), "Session registered");
            }
            ConnectionCommand::Unregister { id } => self.remove_session(id, "read side ended"),
            ConnectionCommand::Close { id } => self.remove_session(id, "closed by application"),
            ConnectionCommand::Lookup { id, response_tx } => {
                let outbound = self.sessions.get(&id).map(|live| live.outbound.clone());
                trace!(session = %id, found = outbound.is_some(), "Session lookup");
                if response_tx.send(outbound).is_err() {
                    debug!(session = %id, "Lookup requester went away");
                }
            }
            ConnectionCommand::Stats { response_tx } => {
                let stats = ConnectionStats {
                    live_sessions: self.sessions.len(),
                    pooled_sessions: self.pool.len(),
                    accepted: self.accepted,
                    dropped_sends: self.dropped_sends.load(Ordering::Relaxed),
                };
                if response_tx.send(stats).is_err() {
                    debug!("Stats requester went away");
                }
            }
        }
    }

    /// The single place a session leaves the live map.
    ///
    /// 会话离开活跃映射的唯一位置。
    fn remove_session(&mut self, id: SessionId, reason: &'static str) {
        let Some(live) = self.sessions.remove(&id) else {
            trace!(session = %id, reason, "Session already removed, nothing to do");
            return;
        };
        // The writer may already be gone if its task failed.
        let _ = live.close.send(());
        debug!(session = %id, addr = %live.remote, reason, "Session unregistered");
    }

    fn reclaim(&mut self, joined: Result<Session, JoinError>) {
        match joined {
            Ok(session) => {
                trace!(session = %session.id, "Slot returned to pool");
                self.pool.release(session);
            }
            Err(e) => warn!(error = %e, "Session writer task failed, slot lost"),
        }
    }

    /// Applies the commands accepted before the stop, then closes every
    /// session and waits for every writer.
    ///
    /// 应用停止前已接受的命令，然后关闭所有会话并等待所有写任务。
    async fn shutdown(&mut self) {
        self.command_rx.close();
        while let Ok(command) = self.command_rx.try_recv() {
            self.handle_command(command);
        }

        let live = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            let _ = session.close.send(());
        }
        while let Some(joined) = self.writers.join_next().await {
            self.reclaim(joined);
        }

        info!(closed = live, accepted = self.accepted, "Connection engine stopped");
    }
}

//! tests/common/harness.rs
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use relay_core::{
    connection::{ConnectionHandle, SessionId},
    timer::{TimerHandle, TimerKey},
    transport::memory::{self, MemoryPeer},
    Config, EventHandler, Handles, Result, Server,
};
use std::{net::SocketAddr, sync::Once};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{timeout, Duration, Instant},
};
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "relay_core=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .init();
    });
}

/// What the handler saw, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Opened(SessionId, SocketAddr),
    Message(SessionId, Bytes),
    Closed(SessionId),
    Timer(TimerKey, u32, u32, Instant),
}

/// A handler that reports every event and can optionally answer.
///
/// With `echo` set, every payload is sent back and a follow-up timer is
/// armed; when that timer fires the session gets a `tick`. A payload of
/// `panic` makes the handler panic.
pub struct RecordingHandler {
    records: mpsc::UnboundedSender<Record>,
    connections: ConnectionHandle<u32>,
    timers: TimerHandle<u32>,
    echo: bool,
    replies: i64,
}

impl RecordingHandler {
    fn record(&self, record: Record) {
        let _ = self.records.send(record);
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    type TimerPayload = u32;

    async fn on_connection_opened(&mut self, session: SessionId, remote: SocketAddr) {
        self.record(Record::Opened(session, remote));
    }

    async fn on_message_received(&mut self, session: SessionId, payload: Bytes) {
        if payload.as_ref() == b"panic" {
            panic!("handler asked to panic");
        }
        self.record(Record::Message(session, payload.clone()));
        if self.echo {
            let _ = self.connections.send(session, payload).await;
            self.replies += 1;
            let key = TimerKey::new(session.get() as i64, self.replies, 0, 0, 0);
            let _ = self.timers.add(key, Duration::from_millis(20), 1, 2).await;
        }
    }

    async fn on_connection_closed(&mut self, session: SessionId) {
        self.record(Record::Closed(session));
    }

    async fn on_timer_fired(&mut self, key: TimerKey, first: u32, second: u32) {
        self.record(Record::Timer(key, first, second, Instant::now()));
        if self.echo {
            let session = SessionId::new(key.0 as u64);
            let _ = self.connections.send(session, "tick").await;
        }
    }
}

/// A started server wired to a [`RecordingHandler`].
pub struct TestServer {
    pub server: Server<RecordingHandler>,
    pub records: mpsc::UnboundedReceiver<Record>,
}

impl TestServer {
    pub fn new(config: Config, echo: bool) -> Self {
        init_tracing();
        let (records_tx, records) = mpsc::unbounded_channel();
        let server = Server::new(config, |handles: &Handles<u32>| RecordingHandler {
            records: records_tx,
            connections: handles.connections.clone(),
            timers: handles.timers.clone(),
            echo,
            replies: 0,
        });
        Self { server, records }
    }

    pub fn start(config: Config, echo: bool) -> Self {
        let mut this = Self::new(config, echo);
        this.server.start().unwrap();
        this
    }

    /// Opens a memory session. The returned task ends when the session does.
    pub fn connect(&self, port: u16) -> (MemoryPeer, JoinHandle<Result<SessionId>>) {
        let (reader, writer, peer) = memory::pair(64);
        let connections = self.server.connections();
        let task = tokio::spawn(async move {
            connections
                .accept(reader, writer, client_addr(port))
                .await
        });
        (peer, task)
    }

    pub async fn next_record(&mut self) -> Record {
        timeout(Duration::from_secs(60), self.records.recv())
            .await
            .expect("timed out waiting for the handler")
            .expect("handler dropped")
    }

    /// Waits for the next `Opened` record and returns its session.
    pub async fn next_opened(&mut self) -> SessionId {
        match self.next_record().await {
            Record::Opened(session, _) => session,
            other => panic!("expected an open record, got {other:?}"),
        }
    }
}

pub fn client_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 1], port))
}

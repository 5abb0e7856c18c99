//! Server start/stop behaviour.

pub mod common;

use bytes::Bytes;
use common::harness::{Record, TestServer};
use relay_core::{
    connection::SessionId, dispatch::EngineState, timer::TimerKey, Config, Error,
};
use tokio::time::{timeout, Duration};

#[tokio::test]
async fn test_start_and_stop_states() {
    let mut t = TestServer::new(Config::default(), false);
    assert_eq!(t.server.dispatch_state(), EngineState::Idle);

    t.server.start().unwrap();
    assert_eq!(t.server.dispatch_state(), EngineState::Running);
    assert!(matches!(t.server.start(), Err(Error::AlreadyStarted)));

    t.server.stop().await;
    assert_eq!(t.server.dispatch_state(), EngineState::Stopped);

    let timers = t.server.timers();
    let result = timers
        .add(TimerKey::new(1, 0, 0, 0, 0), Duration::from_millis(1), 0, 0)
        .await;
    assert!(matches!(result, Err(Error::EngineStopped)));
    let result = t.server.connections().send(SessionId::new(1), "late").await;
    assert!(matches!(result, Err(Error::EngineStopped)));
}

#[tokio::test]
async fn test_stop_without_start() {
    let mut t = TestServer::new(Config::default(), false);
    t.server.stop().await;

    assert_eq!(t.server.dispatch_state(), EngineState::Stopped);
    assert!(t.server.timers().stats().await.is_err());
    assert!(t.server.connections().stats().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_fired_timers_are_delivered_before_stop_returns() {
    const TIMERS: i64 = 20;
    let mut t = TestServer::start(Config::default(), false);
    let timers = t.server.timers();

    for seq in 0..TIMERS {
        timers
            .add(TimerKey::new(seq, 0, 0, 0, 0), Duration::from_millis(5), 0, 0)
            .await
            .unwrap();
    }
    // Once fired counts them, every one has been accepted by the dispatch queue.
    timeout(Duration::from_secs(5), async {
        while timers.stats().await.unwrap().fired < TIMERS as u64 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    t.server.stop().await;

    let mut delivered = Vec::new();
    while let Ok(record) = t.records.try_recv() {
        if let Record::Timer(key, ..) = record {
            delivered.push(key.0);
        }
    }
    assert_eq!(delivered, (0..TIMERS).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_stop_closes_live_sessions() {
    let mut t = TestServer::start(Config::default(), false);
    let (mut peer, task) = t.connect(3000);
    let session = t.next_opened().await;

    t.server.connections().send(session, "goodbye").await.unwrap();
    t.server.stop().await;

    assert_eq!(peer.recv().await, Some(Bytes::from("goodbye")));
    timeout(Duration::from_secs(5), peer.closed()).await.unwrap();
    assert!(peer.is_closed());
    assert_eq!(task.await.unwrap().unwrap(), session);
}

#[tokio::test]
async fn test_handler_panic_does_not_stop_the_server() {
    let mut t = TestServer::start(Config::default(), false);
    let (mut peer, _task) = t.connect(3001);
    let session = t.next_opened().await;

    peer.send("panic").await.unwrap();
    peer.send("still here").await.unwrap();

    assert_eq!(
        t.next_record().await,
        Record::Message(session, Bytes::from("still here"))
    );
    assert_eq!(t.server.dispatch_state(), EngineState::Running);

    peer.hang_up();
    assert_eq!(t.next_record().await, Record::Closed(session));
    t.server.stop().await;
}

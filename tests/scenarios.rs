//! End-to-end scenarios: sessions and timers feeding one handler.

pub mod common;

use bytes::Bytes;
use common::harness::{client_addr, Record, TestServer};
use relay_core::{timer::TimerKey, Config};
use std::collections::HashMap;
use tokio::time::{Duration, Instant};

#[tokio::test]
async fn test_session_events_arrive_in_order() {
    let mut t = TestServer::start(Config::default(), false);
    let (mut peer, task) = t.connect(1000);

    let session = match t.next_record().await {
        Record::Opened(session, remote) => {
            assert_eq!(remote, client_addr(1000));
            session
        }
        other => panic!("expected an open record, got {other:?}"),
    };

    for text in ["a", "b", "c"] {
        peer.send(text).await.unwrap();
    }
    peer.hang_up();

    for text in ["a", "b", "c"] {
        assert_eq!(t.next_record().await, Record::Message(session, Bytes::from(text)));
    }
    assert_eq!(t.next_record().await, Record::Closed(session));
    assert_eq!(task.await.unwrap().unwrap(), session);

    t.server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_sooner_timer_is_delivered_first() {
    let mut t = TestServer::start(Config::default(), false);
    let timers = t.server.timers();
    let start = Instant::now();

    timers
        .add(TimerKey::new(1, 0, 0, 0, 0), Duration::from_millis(50), 10, 11)
        .await
        .unwrap();
    timers
        .add(TimerKey::new(2, 0, 0, 0, 0), Duration::from_millis(10), 20, 21)
        .await
        .unwrap();

    match t.next_record().await {
        Record::Timer(key, first, second, at) => {
            assert_eq!(key, TimerKey::new(2, 0, 0, 0, 0));
            assert_eq!((first, second), (20, 21));
            assert!(at - start >= Duration::from_millis(10));
            assert!(at - start < Duration::from_millis(50));
        }
        other => panic!("expected a timer record, got {other:?}"),
    }
    match t.next_record().await {
        Record::Timer(key, first, second, at) => {
            assert_eq!(key, TimerKey::new(1, 0, 0, 0, 0));
            assert_eq!((first, second), (10, 11));
            assert!(at - start >= Duration::from_millis(50));
        }
        other => panic!("expected a timer record, got {other:?}"),
    }

    t.server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_and_rescheduled_timers() {
    let mut t = TestServer::start(Config::default(), false);
    let timers = t.server.timers();

    timers.add(TimerKey::new(1, 0, 0, 0, 0), Duration::from_millis(10), 1, 1).await.unwrap();
    timers.add(TimerKey::new(2, 0, 0, 0, 0), Duration::from_millis(20), 2, 2).await.unwrap();
    timers.add(TimerKey::new(3, 0, 0, 0, 0), Duration::from_millis(30), 3, 3).await.unwrap();
    timers.cancel(TimerKey::new(2, 0, 0, 0, 0)).await.unwrap();
    timers.reschedule(TimerKey::new(1, 0, 0, 0, 0), Duration::from_millis(100)).await.unwrap();
    // Already gone or never added: both are silent.
    timers.cancel(TimerKey::new(2, 0, 0, 0, 0)).await.unwrap();
    timers.reschedule(TimerKey::new(9, 0, 0, 0, 0), Duration::from_millis(5)).await.unwrap();

    let mut order = Vec::new();
    for _ in 0..2 {
        match t.next_record().await {
            Record::Timer(key, first, _, _) => order.push((key.0, first)),
            other => panic!("expected a timer record, got {other:?}"),
        }
    }
    assert_eq!(order, vec![(3, 3), (1, 1)]);

    let stats = timers.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.fired, 2);
    assert_eq!(stats.cancelled, 1);

    t.server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_handler_closes_the_loop_through_both_engines() {
    let mut t = TestServer::start(Config::default(), true);
    let (mut peer, _task) = t.connect(1001);
    let session = t.next_opened().await;

    peer.send("ping").await.unwrap();
    assert_eq!(peer.recv().await, Some(Bytes::from("ping")));
    assert_eq!(t.next_record().await, Record::Message(session, Bytes::from("ping")));

    // The echo armed a timer; when it fires the handler pushes a tick.
    assert_eq!(peer.recv().await, Some(Bytes::from("tick")));
    match t.next_record().await {
        Record::Timer(key, 1, 2, _) => assert_eq!(key, TimerKey::new(session.get() as i64, 1, 0, 0, 0)),
        other => panic!("expected the echo timer, got {other:?}"),
    }

    peer.hang_up();
    assert_eq!(t.next_record().await, Record::Closed(session));
    t.server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_sessions_keep_per_session_order() {
    const SESSIONS: u16 = 8;
    const MESSAGES: usize = 25;

    let mut t = TestServer::start(Config::default(), false);
    let mut clients = Vec::new();
    for port in 0..SESSIONS {
        let (mut peer, task) = t.connect(2000 + port);
        clients.push(tokio::spawn(async move {
            for seq in 0..MESSAGES {
                peer.send(format!("{seq}")).await.unwrap();
            }
            peer.hang_up();
            task.await.unwrap().unwrap()
        }));
    }
    for client in futures::future::join_all(clients).await {
        client.unwrap();
    }

    // Per session: opened, then every message in order, then closed.
    let mut seen: HashMap<_, Vec<String>> = HashMap::new();
    let mut closed = 0;
    while closed < SESSIONS {
        match t.next_record().await {
            Record::Opened(session, _) => {
                assert!(seen.insert(session, Vec::new()).is_none());
            }
            Record::Message(session, payload) => {
                let log = seen.get_mut(&session).expect("message before open");
                log.push(String::from_utf8(payload.to_vec()).unwrap());
            }
            Record::Closed(session) => {
                let log = seen.get(&session).expect("close before open");
                let expected: Vec<String> = (0..MESSAGES).map(|seq| seq.to_string()).collect();
                assert_eq!(log, &expected);
                closed += 1;
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
    assert_eq!(seen.len(), SESSIONS as usize);

    let stats = t.server.connections().stats().await.unwrap();
    assert_eq!(stats.accepted, SESSIONS as u64);
    t.server.stop().await;
}

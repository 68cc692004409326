//! StreamService: transport events → topics → sessions → subscribers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use serde_json::json;

use petvitals::app::service::StreamService;
use petvitals::config::StreamConfig;
use petvitals::model::ModelSet;
use petvitals::pubsub::SUBSCRIBER_QUEUE_DEPTH;
use petvitals::{StreamCommand, TickPayload};

use crate::mocks::{LifecycleRecorder, id, wait_for};

const RECV: Duration = Duration::from_secs(2);

fn service(tick_ms: u32) -> (StreamService, Arc<LifecycleRecorder>) {
    let config = StreamConfig {
        tick_interval_ms: tick_ms,
        rng_seed: Some(2024),
        ..StreamConfig::default()
    };
    let observer = Arc::new(LifecycleRecorder::default());
    let svc = StreamService::with_observer(&config, ModelSet::absent(), observer.clone());
    (svc, observer)
}

#[test]
fn subscriber_receives_live_readings() {
    let (svc, _) = service(10);
    let sub = svc.connect();
    assert!(svc.handle_event(&sub, "subscribe_pet", &json!({"pet_id": 9})).unwrap());

    let first: TickPayload = sub.recv_timeout(RECV).expect("no reading");
    assert_eq!(first.entity_id, id(9));
    assert_eq!(first.trend_label, "analyzing...");

    let v: serde_json::Value = serde_json::from_str(&first.to_json().unwrap()).unwrap();
    for key in [
        "entity_id",
        "timestamp",
        "heart_rate",
        "body_temperature",
        "activity_level",
        "stress_score",
        "trend_label",
        "trend_confidence",
    ] {
        assert!(v.get(key).is_some(), "missing {key}");
    }
    svc.shutdown();
}

#[test]
fn subscribers_of_one_topic_see_the_same_sequence() {
    let (svc, observer) = service(10);
    let (a, b) = (svc.connect(), svc.connect());
    svc.handle_command(&a, StreamCommand::Subscribe(id(1))).unwrap();
    svc.handle_command(&b, StreamCommand::Subscribe(id(1))).unwrap();

    let mut got_a = Vec::new();
    let mut got_b = Vec::new();
    for _ in 0..5 {
        got_a.push(a.recv_timeout(RECV).expect("a starved"));
        got_b.push(b.recv_timeout(RECV).expect("b starved"));
    }
    svc.shutdown();

    // b joined after a, so it may have missed the leading frames.
    let offset = got_a
        .iter()
        .position(|p| p.timestamp == got_b[0].timestamp)
        .expect("sequences never overlap");
    assert!(offset <= 2);
    for (pa, pb) in got_a[offset..].iter().zip(&got_b) {
        assert_eq!(pa, pb);
    }
    assert_eq!(observer.started(id(1)), 1);
}

#[test]
fn topics_do_not_leak_between_entities() {
    let (svc, _) = service(10);
    let (a, b) = (svc.connect(), svc.connect());
    svc.handle_command(&a, StreamCommand::Subscribe(id(1))).unwrap();
    svc.handle_command(&b, StreamCommand::Subscribe(id(2))).unwrap();
    for _ in 0..5 {
        assert_eq!(a.recv_timeout(RECV).map(|p| p.entity_id), Some(id(1)));
        assert_eq!(b.recv_timeout(RECV).map(|p| p.entity_id), Some(id(2)));
    }
    svc.shutdown();
}

#[test]
fn last_unsubscribe_stops_the_session() {
    let (svc, observer) = service(10);
    let sub = svc.connect();
    svc.handle_event(&sub, "subscribe", &json!({"entity_id": 4})).unwrap();
    assert!(sub.recv_timeout(RECV).is_some());

    svc.handle_event(&sub, "unsubscribe", &json!({"entity_id": 4})).unwrap();
    assert!(!svc.is_streaming(id(4)));
    assert!(wait_for(RECV, || observer.exited(id(4)) == 1));

    // Drain anything from the final tick, then nothing more arrives.
    sub.drain();
    assert!(sub.recv_timeout(Duration::from_millis(80)).is_none());
    svc.shutdown();
}

#[test]
fn disconnect_releases_every_topic() {
    let (svc, _) = service(10);
    let sub = svc.connect();
    for n in [1, 2, 3] {
        svc.handle_command(&sub, StreamCommand::Subscribe(id(n))).unwrap();
    }
    assert_eq!(svc.active_entities(), vec![id(1), id(2), id(3)]);
    svc.disconnect(&sub);
    assert!(svc.active_entities().is_empty());
    svc.shutdown();
}

#[test]
fn invalid_triggers_are_ignored() {
    let (svc, observer) = service(10);
    let sub = svc.connect();
    for data in [json!({}), json!({"pet_id": 0}), json!({"pet_id": "x"})] {
        assert!(!svc.handle_event(&sub, "subscribe_pet", &data).unwrap());
    }
    assert!(!svc.handle_event(&sub, "ping", &json!({"pet_id": 1})).unwrap());
    assert!(svc.active_entities().is_empty());
    assert_eq!(observer.total_started(), 0);
}

#[test]
fn slow_subscriber_does_not_stall_the_stream() {
    let (svc, _) = service(10);
    let (slow, fast) = (svc.connect(), svc.connect());
    svc.handle_command(&slow, StreamCommand::Subscribe(id(6))).unwrap();
    svc.handle_command(&fast, StreamCommand::Subscribe(id(6))).unwrap();

    let mut received = 0;
    while received < SUBSCRIBER_QUEUE_DEPTH + 10 {
        fast.recv_timeout(RECV).expect("fast subscriber starved");
        received += 1;
    }
    svc.shutdown();

    assert!(slow.dropped() > 0);
    assert_eq!(slow.drain().len(), SUBSCRIBER_QUEUE_DEPTH);
    assert!(svc.metrics().frames_dropped >= slow.dropped());
}

#[test]
fn joining_during_a_last_leave_keeps_the_session_alive() {
    let (svc, _) = service(10);
    let svc = Arc::new(svc);
    let entity = id(8);
    let barrier = Arc::new(Barrier::new(2));
    let done = Arc::new(AtomicBool::new(false));

    // Repeatedly becomes and stops being the only subscriber.
    let churn = {
        let svc = svc.clone();
        let barrier = barrier.clone();
        let done = done.clone();
        thread::spawn(move || {
            let sub = svc.connect();
            barrier.wait();
            while !done.load(Ordering::SeqCst) {
                svc.handle_command(&sub, StreamCommand::Subscribe(entity)).unwrap();
                svc.handle_command(&sub, StreamCommand::Unsubscribe(entity)).unwrap();
            }
            svc.disconnect(&sub);
        })
    };

    let sub = svc.connect();
    barrier.wait();
    for _ in 0..2_000 {
        svc.handle_command(&sub, StreamCommand::Subscribe(entity)).unwrap();
        // While this connection is a member, nobody else's leave may stop
        // the session.
        for _ in 0..3 {
            assert!(svc.is_streaming(entity), "member left without a session");
            thread::yield_now();
        }
        svc.handle_command(&sub, StreamCommand::Unsubscribe(entity)).unwrap();
    }
    done.store(true, Ordering::SeqCst);
    churn.join().unwrap();

    // Quiescent: no members, no session.
    assert_eq!(svc.subscriber_count(entity), 0);
    assert!(!svc.is_streaming(entity));
    svc.shutdown();
}

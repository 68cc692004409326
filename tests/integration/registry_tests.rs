//! Session registry: uniqueness, restart semantics, per-tick pipeline.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use petvitals::config::StreamConfig;
use petvitals::diagnostics::RuntimeMetrics;
use petvitals::inference::{ERROR_LABEL, NEUTRAL_LABEL, TrendInference};
use petvitals::scheduler::SessionRegistry;
use petvitals::vitals::VitalsState;

use crate::mocks::{Lifecycle, LifecycleRecorder, RecordingSink, ScriptedClassifier, id, wait_for};

struct Harness {
    registry: Arc<SessionRegistry>,
    sink: Arc<RecordingSink>,
    observer: Arc<LifecycleRecorder>,
    metrics: Arc<RuntimeMetrics>,
}

fn harness(tick_ms: u32, trend: TrendInference) -> Harness {
    let config = StreamConfig {
        tick_interval_ms: tick_ms,
        rng_seed: Some(11),
        ..StreamConfig::default()
    };
    let sink = Arc::new(RecordingSink::default());
    let observer = Arc::new(LifecycleRecorder::default());
    let metrics = Arc::new(RuntimeMetrics::new());
    let registry = SessionRegistry::new(&config, trend, sink.clone(), metrics.clone())
        .with_observer(observer.clone());
    Harness {
        registry: Arc::new(registry),
        sink,
        observer,
        metrics,
    }
}

#[test]
fn concurrent_start_launches_exactly_one_task() {
    let h = harness(20, TrendInference::absent());
    let barrier = Arc::new(Barrier::new(8));

    let launched: usize = (0..8)
        .map(|_| {
            let registry = h.registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                usize::from(registry.start(id(42)).unwrap())
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|t| t.join().unwrap())
        .sum();

    assert_eq!(launched, 1);
    assert!(wait_for(Duration::from_secs(2), || h.observer.started(id(42)) == 1));
    thread::sleep(Duration::from_millis(60));
    assert_eq!(h.observer.started(id(42)), 1);
    assert_eq!(h.registry.active_count(), 1);

    h.registry.shutdown();
    assert_eq!(h.observer.exited(id(42)), 1);
}

#[test]
fn start_stop_storm_keeps_lifecycles_balanced() {
    let h = harness(5, TrendInference::absent());
    let workers: Vec<_> = (0..6u64)
        .map(|w| {
            let registry = h.registry.clone();
            thread::spawn(move || {
                for i in 0..40u64 {
                    let entity = id(1 + (w + i) % 3);
                    if (w + i) % 2 == 0 {
                        registry.start(entity).unwrap();
                    } else {
                        registry.stop(entity);
                    }
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    assert!(h.registry.active_count() <= 3);
    h.registry.shutdown();
    assert_eq!(h.registry.active_count(), 0);

    let snap = h.metrics.snapshot();
    assert_eq!(h.observer.total_started(), h.observer.total_exited());
    assert_eq!(snap.sessions_started as usize, h.observer.total_started());
    assert_eq!(snap.live_sessions(), 0);
}

#[test]
fn restart_resets_to_initial_vitals() {
    let h = harness(10, TrendInference::absent());
    h.registry.start(id(7)).unwrap();
    assert!(wait_for(Duration::from_secs(2), || h.sink.for_entity(id(7)).len() >= 5));

    assert!(h.registry.stop(id(7)));
    assert!(wait_for(Duration::from_secs(2), || h.observer.exited(id(7)) == 1));
    h.registry.start(id(7)).unwrap();
    assert!(wait_for(Duration::from_secs(2), || h.observer.started(id(7)) == 2));
    h.registry.shutdown();

    let events = h.observer.events(id(7));
    let initial: Vec<&VitalsState> = events
        .iter()
        .filter_map(|e| match e {
            Lifecycle::Started(s) => Some(s),
            Lifecycle::Exited { .. } => None,
        })
        .collect();
    assert_eq!(initial.len(), 2);
    for s in initial {
        assert_eq!(s.heart_rate, 80.0);
        assert_eq!(s.body_temperature, 38.5);
        assert_eq!(s.activity_level, 10.0);
        assert_eq!(s.stress_score, 20.0);
    }
    assert!(matches!(events[1], Lifecycle::Exited { ticks } if ticks >= 5));
}

#[test]
fn labels_follow_window_fill_then_classifier() {
    let classifier = Arc::new(ScriptedClassifier::new(
        &["anxiety_attack", "fever_onset", "healthy"],
        &[0.1, 0.25, 0.65],
    ));
    let h = harness(10, TrendInference::new(Some(classifier.clone())));
    h.registry.start(id(3)).unwrap();
    assert!(wait_for(Duration::from_secs(3), || h.sink.for_entity(id(3)).len() >= 8));
    h.registry.shutdown();

    let frames = h.sink.for_entity(id(3));
    for p in &frames[..4] {
        assert_eq!(p.trend_label, NEUTRAL_LABEL);
        assert_eq!(p.trend_confidence, 0.0);
    }
    for p in &frames[4..] {
        assert_eq!(p.trend_label, "healthy");
        assert_eq!(p.trend_confidence, 65.0);
    }
    assert_eq!(classifier.calls() as usize, frames.len() - 4);

    for pair in frames.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[test]
fn transient_inference_failure_does_not_end_the_session() {
    let classifier = Arc::new(
        ScriptedClassifier::new(&["fever_onset", "healthy"], &[0.3, 0.7]).failing_every(2),
    );
    let h = harness(10, TrendInference::new(Some(classifier)));
    h.registry.start(id(5)).unwrap();
    assert!(wait_for(Duration::from_secs(3), || h.sink.for_entity(id(5)).len() >= 10));
    assert!(h.registry.is_active(id(5)));
    h.registry.shutdown();

    let labels: Vec<String> = h
        .sink
        .for_entity(id(5))
        .into_iter()
        .skip(4)
        .map(|p| p.trend_label)
        .collect();
    assert!(labels.iter().any(|l| l == ERROR_LABEL));
    assert!(labels.iter().any(|l| l == "healthy"));
    assert!(h.metrics.snapshot().inference_errors >= 1);
}

#[test]
fn every_published_reading_is_within_bounds() {
    let h = harness(10, TrendInference::absent());
    for n in 1..=3 {
        h.registry.start(id(n)).unwrap();
    }
    assert!(wait_for(Duration::from_secs(3), || h.sink.len() >= 30));
    h.registry.shutdown();

    for n in 1..=3 {
        for p in h.sink.for_entity(id(n)) {
            assert!((40.0..=200.0).contains(&p.heart_rate));
            assert!((37.0..=41.0).contains(&p.body_temperature));
            assert!((0.0..=100.0).contains(&p.stress_score));
            assert!(p.activity_level >= 0.0);
        }
    }
}

//! End-to-end test of the public surface: a real shared scheduler, a bus,
//! and a throttled consumer, on wall-clock time with a short window.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use casework::{
    default_interest, ChangeEvent, EventBus, EventKind, RefreshScheduler, RefreshThrottler,
};

const WINDOW: Duration = Duration::from_millis(100);

#[test]
fn throttled_consumer_sees_one_refresh_per_window() {
    casework::init_tracing();

    let bus = Arc::new(EventBus::new());
    let scheduler = Arc::new(RefreshScheduler::new().expect("scheduler"));

    let refreshes = Arc::new(AtomicUsize::new(0));
    let last_payload = Arc::new(Mutex::new(None));
    let counter = Arc::clone(&refreshes);
    let payload_slot = Arc::clone(&last_payload);
    let throttler = RefreshThrottler::with_delay(
        Arc::clone(&bus),
        Arc::clone(&scheduler),
        move |event: ChangeEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            *payload_slot.lock().expect("payload mutex poisoned") = Some(event.payload.clone());
        },
        WINDOW,
    );
    throttler.start_listening(default_interest()).expect("listen");

    // Burst of qualifying events plus noise of other kinds.
    let started = Instant::now();
    for i in 0..20 {
        bus.emit(EventKind::DataAdded, json!({"artifact": i}));
        bus.emit(EventKind::ContentChanged, json!({"noise": i}));
    }
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);

    // Wait out the window with slack for scheduling jitter.
    while refreshes.load(Ordering::SeqCst) == 0 && started.elapsed() < Duration::from_secs(5) {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(started.elapsed() >= WINDOW, "refresh fired before the window elapsed");
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);

    // The delivered event is the one that opened the window.
    let payload = last_payload
        .lock()
        .expect("payload mutex poisoned")
        .clone()
        .expect("refresh ran");
    assert_eq!(payload["artifact"], 0);

    // A fresh event after dispatch opens a new, independent window.
    bus.emit(EventKind::DataAdded, json!({"artifact": "next"}));
    let reopened = Instant::now();
    while refreshes.load(Ordering::SeqCst) == 1 && reopened.elapsed() < Duration::from_secs(5) {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    let payload = last_payload
        .lock()
        .expect("payload mutex poisoned")
        .clone()
        .expect("second refresh ran");
    assert_eq!(payload["artifact"], "next");

    throttler.stop_listening();
    bus.emit(EventKind::DataAdded, json!({"artifact": "ignored"}));
    std::thread::sleep(WINDOW * 3);
    assert_eq!(refreshes.load(Ordering::SeqCst), 2);

    scheduler.shutdown();
}

//! Scenario tests for the notification core.
//!
//! These tests verify:
//! - Burst coalescing and the quiescence window
//! - Interest filtering end to end through the bus
//! - Listener lifecycle (start/stop, cancellation)
//! - The single-pending invariant under concurrent publishers

use std::sync::{Arc, Mutex};

use crate::bus::{ChangeEvent, EventBus};
use crate::throttle::RefreshScheduler;


/// Scheduler that piggybacks on the current (paused-time) test runtime.
pub fn paused_scheduler() -> Arc<RefreshScheduler> {
    Arc::new(RefreshScheduler::with_handle(
        tokio::runtime::Handle::current(),
    ))
}

/// A refresher closure that records every delivered event, plus the shared
/// log to assert against.
pub fn recording_refresher() -> (
    Arc<Mutex<Vec<ChangeEvent>>>,
    impl Fn(ChangeEvent) + Send + Sync + 'static,
) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let refresher = move |event: ChangeEvent| {
        sink.lock().expect("call log mutex poisoned").push(event);
    };
    (calls, refresher)
}

/// Fresh bus for a single test.
pub fn test_bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}

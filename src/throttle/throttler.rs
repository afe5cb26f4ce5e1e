use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::bus::{ChangeEvent, EventBus, EventHandler, EventKind, SubscriptionId};
use crate::throttle::scheduler::RefreshScheduler;

/// Minimum quiescence between accepting a triggering event and invoking the
/// refresh consumer.
pub const MIN_DELAY_BETWEEN_REFRESHES: Duration = Duration::from_secs(5);

/// Capability implemented by UI-owning code that wants throttled refreshes.
///
/// `refresh` receives the event that opened the coalescing window and runs
/// on the dispatch worker, not on the thread that published the event.
pub trait Refresher: Send + Sync + 'static {
    fn refresh(&self, event: ChangeEvent);
}

impl<F> Refresher for F
where
    F: Fn(ChangeEvent) + Send + Sync + 'static,
{
    fn refresh(&self, event: ChangeEvent) {
        self(event)
    }
}

#[derive(Debug, Error)]
pub enum ThrottleError {
    #[error("throttler is already listening; call stop_listening before re-registering")]
    AlreadyListening,
}

/// Tunable throttle behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleSettings {
    /// Quiescence window length in seconds.
    pub min_delay_between_refreshes_secs: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            min_delay_between_refreshes_secs: MIN_DELAY_BETWEEN_REFRESHES.as_secs(),
        }
    }
}

/// The refresh committed for the currently open coalescing window.
struct PendingRefresh {
    event: ChangeEvent,
    task: JoinHandle<()>,
}

struct ThrottlerInner {
    refresher: Box<dyn Refresher>,
    scheduler: Arc<RefreshScheduler>,
    delay: Duration,
    // The only mutable shared state: holds the pending refresh while a
    // coalescing window is open.
    pending: Mutex<Option<PendingRefresh>>,
}

impl ThrottlerInner {
    /// Accept one qualifying event. The first arrival in a window wins the
    /// slot and schedules the dispatch; everyone else is dropped. The check
    /// and the scheduling happen under the slot lock so concurrent arrivals
    /// cannot double-schedule.
    fn accept(self: &Arc<Self>, event: ChangeEvent) {
        let mut slot = self.pending.lock().expect("pending refresh mutex poisoned");
        if let Some(pending) = slot.as_ref() {
            tracing::trace!(
                seq = event.seq,
                pending_seq = pending.event.seq,
                "coalescing window open, dropping event"
            );
            return;
        }
        let inner = Arc::clone(self);
        let trigger = event.clone();
        let task = self
            .scheduler
            .schedule_after(self.delay, move || inner.dispatch(trigger));
        tracing::trace!(seq = event.seq, delay = ?self.delay, "refresh scheduled");
        *slot = Some(PendingRefresh { event, task });
    }

    /// Runs once per window on the dispatch worker.
    fn dispatch(&self, event: ChangeEvent) {
        // The slot must reopen no matter how the consumer exits.
        let _reopen = ClearPending { slot: &self.pending };
        let seq = event.seq;
        if catch_unwind(AssertUnwindSafe(|| self.refresher.refresh(event))).is_err() {
            tracing::error!(seq, "refresh consumer panicked; skipping this refresh");
        }
    }
}

struct ClearPending<'a> {
    slot: &'a Mutex<Option<PendingRefresh>>,
}

impl Drop for ClearPending<'_> {
    fn drop(&mut self) {
        // Clear through poisoning too; a wedged slot would block every
        // future refresh.
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

/// Coalesces bursty change notifications into at most one refresh per
/// quiescence window.
///
/// Used by explorer nodes whose rebuild is expensive: the node supplies a
/// [`Refresher`], calls [`start_listening`](Self::start_listening) when it
/// comes on screen and [`stop_listening`](Self::stop_listening) when it is
/// torn down.
pub struct RefreshThrottler {
    bus: Arc<EventBus>,
    inner: Arc<ThrottlerInner>,
    subscription: Mutex<Option<SubscriptionId>>,
}

struct ThrottleHandler {
    inner: Arc<ThrottlerInner>,
    interest: HashSet<EventKind>,
}

impl EventHandler for ThrottleHandler {
    fn handle(&self, event: ChangeEvent) {
        if !self.interest.contains(&event.kind) {
            return;
        }
        self.inner.accept(event);
    }
}

impl RefreshThrottler {
    /// Throttler with the stock 5-second quiescence window.
    pub fn new(
        bus: Arc<EventBus>,
        scheduler: Arc<RefreshScheduler>,
        refresher: impl Refresher,
    ) -> Self {
        Self::with_delay(bus, scheduler, refresher, MIN_DELAY_BETWEEN_REFRESHES)
    }

    /// Throttler with an explicit quiescence window.
    pub fn with_delay(
        bus: Arc<EventBus>,
        scheduler: Arc<RefreshScheduler>,
        refresher: impl Refresher,
        delay: Duration,
    ) -> Self {
        Self {
            bus,
            inner: Arc::new(ThrottlerInner {
                refresher: Box::new(refresher),
                scheduler,
                delay,
                pending: Mutex::new(None),
            }),
            subscription: Mutex::new(None),
        }
    }

    pub fn from_settings(
        bus: Arc<EventBus>,
        scheduler: Arc<RefreshScheduler>,
        refresher: impl Refresher,
        settings: &ThrottleSettings,
    ) -> Self {
        let delay = Duration::from_secs(settings.min_delay_between_refreshes_secs);
        Self::with_delay(bus, scheduler, refresher, delay)
    }

    /// Subscribe to the bus for exactly the given kinds. Calling again
    /// without an intervening [`stop_listening`](Self::stop_listening) is a
    /// caller error and fails fast.
    pub fn start_listening(&self, interest: HashSet<EventKind>) -> Result<(), ThrottleError> {
        let mut subscription = self
            .subscription
            .lock()
            .expect("subscription mutex poisoned");
        if subscription.is_some() {
            tracing::warn!("start_listening called while already subscribed");
            return Err(ThrottleError::AlreadyListening);
        }
        let handler = Arc::new(ThrottleHandler {
            inner: Arc::clone(&self.inner),
            interest: interest.clone(),
        });
        let id = self.bus.subscribe(interest, handler);
        tracing::debug!(?id, "refresh throttler listening");
        *subscription = Some(id);
        Ok(())
    }

    /// Unsubscribe from the bus. A refresh that is already scheduled still
    /// fires; only new intake stops. No-op when not listening.
    pub fn stop_listening(&self) {
        let id = self
            .subscription
            .lock()
            .expect("subscription mutex poisoned")
            .take();
        if let Some(id) = id {
            self.bus.unsubscribe(id);
            tracing::debug!(?id, "refresh throttler stopped listening");
        }
    }

    /// Abort the scheduled dispatch, if any, and reopen the window. The
    /// committed event is discarded without reaching the consumer.
    pub fn cancel_pending(&self) {
        let taken = self
            .inner
            .pending
            .lock()
            .expect("pending refresh mutex poisoned")
            .take();
        if let Some(pending) = taken {
            pending.task.abort();
            tracing::debug!(seq = pending.event.seq, "pending refresh cancelled");
        }
    }

    /// True while a coalescing window is open.
    pub fn is_refresh_pending(&self) -> bool {
        self.inner
            .pending
            .lock()
            .expect("pending refresh mutex poisoned")
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bus::default_interest;
    use crate::tests::paused_scheduler;

    #[tokio::test(start_paused = true)]
    async fn double_start_fails_fast() {
        let bus = Arc::new(EventBus::new());
        let throttler = RefreshThrottler::new(bus, paused_scheduler(), |_: ChangeEvent| {});

        throttler.start_listening(default_interest()).expect("first");
        let err = throttler
            .start_listening(default_interest())
            .expect_err("second registration must be rejected");
        assert!(matches!(err, ThrottleError::AlreadyListening));

        // Teardown reopens registration.
        throttler.stop_listening();
        throttler.stop_listening();
        throttler.start_listening(default_interest()).expect("after teardown");
    }

    #[test]
    fn settings_default_matches_stock_delay() {
        let settings = ThrottleSettings::default();
        assert_eq!(settings.min_delay_between_refreshes_secs, 5);

        let parsed: ThrottleSettings =
            serde_json::from_str(r#"{"min_delay_between_refreshes_secs": 2}"#).expect("parse");
        assert_eq!(parsed.min_delay_between_refreshes_secs, 2);
    }
}

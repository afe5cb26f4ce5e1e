//! Case explorer backend notification core.
//!
//! This crate carries the change-notification plumbing between backend
//! analysis producers and the UI layer of the case explorer:
//! - `bus`: typed publish/subscribe event bus with interest filtering
//! - `throttle`: refresh throttling so expensive UI rebuilds run at most
//!   once per quiescence window, no matter how noisy the backend gets
//!
//! # Architecture
//!
//! Producers publish [`ChangeEvent`]s onto the [`EventBus`]. UI nodes that
//! own an expensive view register a [`RefreshThrottler`] around their
//! [`Refresher`] callback; the throttler subscribes for the kinds the node
//! cares about, coalesces bursts, and fires the callback once per window on
//! the shared [`RefreshScheduler`]. The case database, ingestion tasks, and
//! all widget code live outside this crate.

pub mod bus;
pub mod throttle;

#[cfg(test)]
mod tests;

pub use bus::{default_interest, ChangeEvent, EventBus, EventHandler, EventKind, SubscriptionId};
pub use throttle::{
    RefreshScheduler, RefreshThrottler, Refresher, SchedulerError, ThrottleError, ThrottleSettings,
    MIN_DELAY_BETWEEN_REFRESHES,
};

/// Install the process-wide tracing subscriber. Embedding applications call
/// this once at startup; repeated calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casework=debug,info".parse().expect("valid env filter")),
        )
        .try_init();
}

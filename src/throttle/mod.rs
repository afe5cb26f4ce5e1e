//! Refresh throttling for expensive UI consumers.
//!
//! A noisy backend can publish change notifications far faster than the UI
//! can rebuild itself. The throttler sits between the event bus and a
//! refresh consumer:
//! - `RefreshThrottler`: coalesces bursts into at most one pending refresh
//!   and fires the consumer once per quiescence window
//! - `RefreshScheduler`: shared delayed-task scheduler that runs the
//!   dispatch after the window elapses
//!
//! Events arriving while a refresh is pending are dropped, not re-timed:
//! the consumer sees the event that opened the window, and the next window
//! opens only after that dispatch completes.

mod scheduler;
mod throttler;

pub use scheduler::{RefreshScheduler, SchedulerError};
pub use throttler::{
    RefreshThrottler, Refresher, ThrottleError, ThrottleSettings, MIN_DELAY_BETWEEN_REFRESHES,
};

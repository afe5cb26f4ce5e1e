//! Event system for backend-to-UI change notifications.
//!
//! The event bus provides:
//! - Publish-subscribe pattern with per-subscriber interest filtering
//! - Typed event kinds for case content changes
//! - A stable envelope (id, sequence number, timestamp) around each payload
//!
//! # Architecture
//!
//! Events flow from backend producers → EventBus → subscribed handlers:
//! - `EventBus`: in-memory subscription registry for immediate distribution
//! - `EventKind`: vocabulary of change-notification categories
//! - Handlers run on the publisher's context; expensive consumers should
//!   sit behind a `RefreshThrottler` rather than refresh on every delivery.

mod event_bus;
mod event_types;

pub use event_bus::{ChangeEvent, EventBus, EventHandler, SubscriptionId};
pub use event_types::{default_interest, EventKind};

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EventKind;

/// A single immutable change notification. The payload is opaque to the bus
/// and passed through to handlers unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: String,
    pub seq: i64,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub created_at: String,
}

/// Capability invoked once per delivered event. Delivery happens on the
/// publisher's context, so implementations must be cheap or hand off.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: ChangeEvent);
}

impl<F> EventHandler for F
where
    F: Fn(ChangeEvent) + Send + Sync,
{
    fn handle(&self, event: ChangeEvent) {
        self(event)
    }
}

/// Opaque handle identifying an active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscription {
    interest: HashSet<EventKind>,
    handler: Arc<dyn EventHandler>,
}

pub struct EventBus {
    subscriptions: DashMap<u64, Subscription>,
    next_id: AtomicU64,
    seq: AtomicI64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(0),
            seq: AtomicI64::new(0),
        }
    }

    /// Register `handler` for exactly the given kinds. Events of other kinds
    /// are never delivered to it.
    pub fn subscribe(
        &self,
        interest: HashSet<EventKind>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.insert(id, Subscription { interest, handler });
        tracing::debug!(subscription = id, "event bus subscription added");
        SubscriptionId(id)
    }

    /// Remove a subscription. Removing an already-removed id is a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.subscriptions.remove(&id.0).is_some() {
            tracing::debug!(subscription = id.0, "event bus subscription removed");
        }
    }

    /// Publish a pre-built event onto the bus.
    pub fn publish(&self, event: ChangeEvent) {
        // Collect matching handlers first so none run under a shard lock;
        // a handler is then free to subscribe or unsubscribe on this bus.
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .subscriptions
            .iter()
            .filter(|entry| entry.interest.contains(&event.kind))
            .map(|entry| Arc::clone(&entry.handler))
            .collect();
        if handlers.is_empty() {
            tracing::trace!(kind = ?event.kind, seq = event.seq, "no interested subscribers");
            return;
        }
        for handler in handlers {
            handler.handle(event.clone());
        }
    }

    /// Convenience: build the envelope and publish in one call.
    pub fn emit(&self, kind: EventKind, payload: serde_json::Value) -> ChangeEvent {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let event = ChangeEvent {
            id: Uuid::new_v4().to_string(),
            seq,
            kind,
            payload,
            created_at: Utc::now().to_rfc3339(),
        };
        self.publish(event.clone());
        event
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

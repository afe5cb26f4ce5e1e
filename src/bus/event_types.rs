//! Change-notification kinds and interest-set helpers.
//!
//! Single source of truth for the vocabulary of backend change events that
//! refresh consumers can subscribe to.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Category of a backend change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// New analysis results were added to the case.
    DataAdded,
    /// The content of an existing file changed.
    ContentChanged,
    /// A file finished processing.
    FileDone,
}

/// Interest set used by explorer-tree refresh consumers: new analysis
/// results are the only changes worth a tree refresh.
pub fn default_interest() -> HashSet<EventKind> {
    HashSet::from([EventKind::DataAdded])
}

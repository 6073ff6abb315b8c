//! Per-field edit state

use crate::document::FieldDefinition;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Client-side edit state for one field within a mounted node
///
/// Created at mount with `loading = true`; `dirty` means the in-memory
/// value has not yet been reconciled into the node's content document.
/// A field is fully settled only once both the address-level write and the
/// content snapshot write have succeeded.
#[derive(Debug, Clone, Default)]
pub struct FieldEditState {
    /// Current in-memory value (optimistic; may be ahead of persistence)
    pub value: Option<Value>,
    /// Definition resolved from the metadata cache, if available
    pub definition: Option<FieldDefinition>,
    /// A load or address-level write is in flight
    pub loading: bool,
    /// The value has not been folded into the content document yet
    pub dirty: bool,
    /// Last load/persist error, surfaced without blocking edits
    pub error: Option<String>,
    /// When the value was last reconciled into the content document
    pub last_saved: Option<DateTime<Utc>>,
}

impl FieldEditState {
    pub(crate) fn mounting() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }
}

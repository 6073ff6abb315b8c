//! Per-node field orchestration
//!
//! `NodeFieldManager` ties the metadata cache, the batched resolver, and a
//! node's denormalized content document together: it discovers the fields
//! inside the content tree, loads their definitions and values, tracks edit
//! state, and folds dirty values back into the document on a debounce.
//!
//! The address-level store is authoritative for reads: initialization
//! resolves every field through its address, and the content document is a
//! derived snapshot rewritten after the reconcile window. A field counts as
//! fully settled only once both the address-level write and the snapshot
//! write have succeeded.

mod discovery;
mod state;

pub use state::FieldEditState;

use crate::address::{AddressError, PathAddressBuilder};
use crate::cache::FieldMetadataCache;
use crate::document::{
    ContentDocument, FieldDefinition, FieldRef, JobId, Node, NodeId, RuleViolation,
};
use crate::resolver::{BatchedResolver, DebounceTimer, ResolverError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

/// Window between the last address-level write and the snapshot rewrite
pub const RECONCILE_WINDOW: Duration = Duration::from_secs(1);

/// Traversal depth guard for malformed content documents
pub const MAX_CONTENT_DEPTH: usize = 64;

/// The node persistence boundary failed to store a content document
#[derive(Debug, Error)]
#[error("node update failed: {0}")]
pub struct NodeWriteError(pub String);

/// Errors that can occur in node field management
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("content nesting exceeds {max_depth} levels")]
    DepthExceeded { max_depth: usize },

    #[error("unknown field reference: {0}")]
    UnknownField(FieldRef),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error("content reconciliation failed: {0}")]
    Reconciliation(#[from] NodeWriteError),
}

/// Result type for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Trait for the node persistence boundary
///
/// `update_node` stores the full content document, not a patch.
#[async_trait]
pub trait NodeWriter: Send + Sync {
    async fn update_node(
        &self,
        node_id: &NodeId,
        content: &ContentDocument,
    ) -> Result<(), NodeWriteError>;
}

/// What to do with the optimistic in-memory value when the address-level
/// write fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteFailurePolicy {
    /// Keep the edited value and attach the error; the caller retries
    #[default]
    Keep,
    /// Restore the pre-edit value and attach the error
    Rollback,
}

/// Tuning knobs for a node field manager
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub reconcile_window: Duration,
    pub write_failure_policy: WriteFailurePolicy,
    pub max_depth: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            reconcile_window: RECONCILE_WINDOW,
            write_failure_policy: WriteFailurePolicy::default(),
            max_depth: MAX_CONTENT_DEPTH,
        }
    }
}

/// Per-node integration point for metadata, values, and the content snapshot
pub struct NodeFieldManager {
    node_id: NodeId,
    job_id: JobId,
    addresses: PathAddressBuilder,
    refs: Vec<FieldRef>,
    states: DashMap<FieldRef, FieldEditState>,
    content: Mutex<ContentDocument>,
    pending: Mutex<HashSet<FieldRef>>,
    resolver: Arc<BatchedResolver>,
    metadata: Arc<FieldMetadataCache>,
    writer: Arc<dyn NodeWriter>,
    reconcile_timer: DebounceTimer,
    config: ManagerConfig,
}

impl NodeFieldManager {
    /// Discover the node's fields and create their edit states
    ///
    /// One manager per mounted node; call [`initialize`](Self::initialize)
    /// next to load definitions and values.
    pub fn mount(
        node: &Node,
        resolver: Arc<BatchedResolver>,
        metadata: Arc<FieldMetadataCache>,
        writer: Arc<dyn NodeWriter>,
        config: ManagerConfig,
    ) -> ManagerResult<Arc<Self>> {
        let addresses = PathAddressBuilder::new(node.job_id.clone(), node.path.clone())?;
        let refs = discovery::collect_field_refs(&node.content, config.max_depth)?;

        let states = DashMap::new();
        for field_ref in &refs {
            states.insert(field_ref.clone(), FieldEditState::mounting());
        }

        Ok(Arc::new(Self {
            node_id: node.id,
            job_id: node.job_id.clone(),
            addresses,
            refs,
            states,
            content: Mutex::new(node.content.clone()),
            pending: Mutex::new(HashSet::new()),
            resolver,
            metadata,
            writer,
            reconcile_timer: DebounceTimer::new(),
            config,
        }))
    }

    /// Load definitions and current values for every discovered field
    ///
    /// Definition and value load concurrently per field; an individual
    /// failure lands on that field's `error` without blocking siblings.
    pub async fn initialize(self: &Arc<Self>) {
        let mut inflight = JoinSet::new();
        for field_ref in self.refs.clone() {
            let manager = Arc::clone(self);
            inflight.spawn(async move {
                manager.initialize_field(field_ref).await;
            });
        }
        while inflight.join_next().await.is_some() {}
    }

    async fn initialize_field(&self, field_ref: FieldRef) {
        let address = match self.addresses.field_value(&field_ref) {
            Ok(address) => address,
            Err(error) => {
                if let Some(mut state) = self.states.get_mut(&field_ref) {
                    state.loading = false;
                    state.error = Some(error.to_string());
                }
                return;
            }
        };

        let (definition, resolved) = tokio::join!(
            self.metadata.get_entry(&field_ref),
            self.resolver.resolve(&self.job_id, &address)
        );

        let fallback = definition
            .as_ref()
            .and_then(|definition| definition.default_value.clone());
        if let Some(mut state) = self.states.get_mut(&field_ref) {
            state.definition = definition;
            state.loading = false;
            match resolved {
                // An unset address falls back to the definition default.
                Ok(Value::Null) => state.value = fallback,
                Ok(value) => state.value = Some(value),
                Err(error) => state.error = Some(error.to_string()),
            }
        }
    }

    /// Current in-memory value; never a fresh fetch
    pub fn field_value(&self, field_ref: &FieldRef) -> Option<Value> {
        self.states
            .get(field_ref)
            .and_then(|state| state.value.clone())
    }

    /// Snapshot of one field's edit state
    pub fn field_state(&self, field_ref: &FieldRef) -> Option<FieldEditState> {
        self.states.get(field_ref).map(|state| state.value().clone())
    }

    /// The field's cached definition, if its load has completed
    pub fn field_entry(&self, field_ref: &FieldRef) -> Option<FieldDefinition> {
        self.states
            .get(field_ref)
            .and_then(|state| state.definition.clone())
    }

    /// Any field not yet reconciled into the content document
    pub fn has_unsaved_changes(&self) -> bool {
        self.states.iter().any(|state| state.value().dirty)
    }

    /// Any field with a load or write in flight
    pub fn is_loading(&self) -> bool {
        self.states.iter().any(|state| state.value().loading)
    }

    /// Discovered field references, in discovery order
    pub fn field_refs(&self) -> &[FieldRef] {
        &self.refs
    }

    /// Current values of every field that has one, for dependent option
    /// filtering
    pub fn sibling_values(&self) -> HashMap<FieldRef, Value> {
        self.states
            .iter()
            .filter_map(|state| {
                state
                    .value()
                    .value
                    .clone()
                    .map(|value| (state.key().clone(), value))
            })
            .collect()
    }

    /// Evaluate the field's validation rules against its current value
    ///
    /// Fields with no definition, no rules, or no value pass.
    pub fn validate_field(&self, field_ref: &FieldRef) -> Result<(), RuleViolation> {
        let Some(state) = self.states.get(field_ref) else {
            return Ok(());
        };
        match (&state.definition, &state.value) {
            (Some(definition), Some(value)) => definition.rules.validate(value),
            _ => Ok(()),
        }
    }

    /// Copy of the node's current content document
    pub fn content_snapshot(&self) -> ContentDocument {
        self.content.lock().unwrap().clone()
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Optimistically update a field and persist it at its address
    ///
    /// The in-memory value changes immediately. On persistence success the
    /// field is queued for content reconciliation; `dirty` stays set until
    /// the snapshot write completes. On failure the configured
    /// [`WriteFailurePolicy`] decides whether the optimistic value survives,
    /// and the error is both attached to the field and returned.
    pub async fn set_field_value(
        self: &Arc<Self>,
        field_ref: &FieldRef,
        value: Value,
    ) -> ManagerResult<()> {
        let (previous_value, previous_dirty) = {
            let mut state = self
                .states
                .get_mut(field_ref)
                .ok_or_else(|| ManagerError::UnknownField(field_ref.clone()))?;
            let previous = (state.value.clone(), state.dirty);
            state.value = Some(value.clone());
            state.dirty = true;
            state.loading = true;
            state.error = None;
            previous
        };

        let address = self.addresses.field_value(field_ref)?;
        match self.resolver.set(&self.job_id, &address, value).await {
            Ok(()) => {
                if let Some(mut state) = self.states.get_mut(field_ref) {
                    state.loading = false;
                }
                self.pending.lock().unwrap().insert(field_ref.clone());
                self.arm_reconcile_timer();
                Ok(())
            }
            Err(error) => {
                if let Some(mut state) = self.states.get_mut(field_ref) {
                    state.loading = false;
                    state.error = Some(error.to_string());
                    if self.config.write_failure_policy == WriteFailurePolicy::Rollback {
                        state.value = previous_value;
                        state.dirty = previous_dirty;
                    }
                }
                Err(error.into())
            }
        }
    }

    /// Cancel the pending window and reconcile everything dirty right now
    ///
    /// Used for explicit save actions and navigation-away. Performs no
    /// write when nothing is dirty.
    pub async fn save_all_changes(&self) -> ManagerResult<()> {
        self.reconcile_timer.cancel();
        {
            let mut pending = self.pending.lock().unwrap();
            for state in self.states.iter() {
                if state.value().dirty {
                    pending.insert(state.key().clone());
                }
            }
        }
        self.reconcile().await
    }

    /// Cancel the reconcile timer
    ///
    /// In-flight backend responses arriving after teardown land on dropped
    /// receivers and are ignored.
    pub fn teardown(&self) {
        self.reconcile_timer.cancel();
    }

    fn arm_reconcile_timer(self: &Arc<Self>) {
        let manager = Arc::downgrade(self);
        // The fired action spawns detached so a later re-arm can only abort
        // a window that has not elapsed, never an in-flight snapshot write.
        self.reconcile_timer
            .arm(self.config.reconcile_window, async move {
                let Some(manager) = manager.upgrade() else {
                    return;
                };
                tokio::spawn(async move {
                    if let Err(error) = manager.reconcile().await {
                        tracing::warn!(node = %manager.node_id, %error, "scheduled content reconciliation failed");
                    }
                });
            });
    }

    /// Fold pending field values into the content document and persist it
    async fn reconcile(&self) -> ManagerResult<()> {
        let pending = mem::take(&mut *self.pending.lock().unwrap());
        if pending.is_empty() {
            return Ok(());
        }

        match self.persist_snapshot(&pending).await {
            Ok(()) => {
                let saved_at = Utc::now();
                for field_ref in &pending {
                    if let Some(mut state) = self.states.get_mut(field_ref) {
                        state.dirty = false;
                        state.last_saved = Some(saved_at);
                    }
                }
                tracing::debug!(node = %self.node_id, fields = pending.len(), "content snapshot reconciled");
                Ok(())
            }
            Err(error) => {
                // Failed fields stay pending so the next save retries them.
                self.pending.lock().unwrap().extend(pending);
                Err(error)
            }
        }
    }

    async fn persist_snapshot(&self, pending: &HashSet<FieldRef>) -> ManagerResult<()> {
        let values: HashMap<FieldRef, Option<Value>> = pending
            .iter()
            .map(|field_ref| (field_ref.clone(), self.field_value(field_ref)))
            .collect();

        let mut snapshot = self.content.lock().unwrap().clone();
        discovery::apply_field_values(&mut snapshot, &values, self.config.max_depth)?;
        self.writer.update_node(&self.node_id, &snapshot).await?;
        *self.content.lock().unwrap() = snapshot;
        Ok(())
    }
}

impl Drop for NodeFieldManager {
    fn drop(&mut self) {
        self.reconcile_timer.cancel();
    }
}

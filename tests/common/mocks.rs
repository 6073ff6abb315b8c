//! Deterministic mock collaborators with call instrumentation
//!
//! The value backend records dispatch cycles so tests can assert batching:
//! a cycle starts when the in-flight call count rises from zero and ends
//! when it drains back to zero. Every call holds its cycle open across a
//! one-millisecond sleep, so calls dispatched from the same flush overlap.

use async_trait::async_trait;
use formwork::{
    Address, ContentDocument, DefinitionSource, FieldDefinition, FieldRef, MetadataError, NodeId,
    NodeWriteError, NodeWriter, ResolverResult, ValueBackend, ValueOperation, ValueRequest,
    ValueResponse,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory value store implementing the backend boundary
#[derive(Default)]
pub struct MockValueBackend {
    store: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<ValueRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cycles: AtomicUsize,
}

impl MockValueBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, address: &Address, value: Value) {
        self.store
            .lock()
            .unwrap()
            .insert(address.as_str().to_string(), value);
    }

    pub fn fail_address(&self, address: &Address) {
        self.failing
            .lock()
            .unwrap()
            .insert(address.as_str().to_string());
    }

    pub fn heal_address(&self, address: &Address) {
        self.failing.lock().unwrap().remove(address.as_str());
    }

    pub fn stored(&self, address: &Address) -> Option<Value> {
        self.store.lock().unwrap().get(address.as_str()).cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests_for(&self, operation: ValueOperation) -> Vec<ValueRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.operation == operation)
            .cloned()
            .collect()
    }

    /// Number of zero-to-busy transitions observed
    pub fn dispatch_cycles(&self) -> usize {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Largest number of overlapping calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValueBackend for MockValueBackend {
    async fn call(&self, request: ValueRequest) -> ResolverResult<ValueResponse> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        if now_in_flight == 1 {
            self.cycles.fetch_add(1, Ordering::SeqCst);
        }
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;

        self.requests.lock().unwrap().push(request.clone());
        let response = if self.failing.lock().unwrap().contains(request.address.as_str()) {
            ValueResponse::failure("backend rejected request")
        } else {
            match request.operation {
                ValueOperation::Resolve => {
                    let value = self
                        .store
                        .lock()
                        .unwrap()
                        .get(request.address.as_str())
                        .cloned()
                        .unwrap_or(Value::Null);
                    ValueResponse::ok(value)
                }
                ValueOperation::Set => {
                    let value = request.value.clone().unwrap_or(Value::Null);
                    self.store
                        .lock()
                        .unwrap()
                        .insert(request.address.as_str().to_string(), value);
                    ValueResponse::empty()
                }
                ValueOperation::Exists => {
                    let exists = self
                        .store
                        .lock()
                        .unwrap()
                        .contains_key(request.address.as_str());
                    ValueResponse::ok(serde_json::json!({ "exists": exists }))
                }
                ValueOperation::ListChildren => {
                    let prefix = format!("{}.", request.address.as_str());
                    let mut children: Vec<String> = self
                        .store
                        .lock()
                        .unwrap()
                        .keys()
                        .filter_map(|key| key.strip_prefix(&prefix))
                        .map(|rest| rest.split('.').next().unwrap_or(rest).to_string())
                        .collect();
                    children.sort();
                    children.dedup();
                    ValueResponse::ok(serde_json::json!(children))
                }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

/// Scriptable definition source that counts fetches
#[derive(Default)]
pub struct MockDefinitionSource {
    definitions: Mutex<HashMap<FieldRef, FieldDefinition>>,
    failing: Mutex<HashSet<FieldRef>>,
    fetches: AtomicUsize,
    per_field: Mutex<HashMap<FieldRef, usize>>,
    delay: Mutex<Duration>,
}

impl MockDefinitionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, definition: FieldDefinition) {
        self.definitions
            .lock()
            .unwrap()
            .insert(definition.id.clone(), definition);
    }

    pub fn fail_ref(&self, field_ref: &FieldRef) {
        self.failing.lock().unwrap().insert(field_ref.clone());
    }

    /// Delay applied to every fetch, for in-flight dedupe tests
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fetches_for(&self, field_ref: &FieldRef) -> usize {
        self.per_field
            .lock()
            .unwrap()
            .get(field_ref)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DefinitionSource for MockDefinitionSource {
    async fn get_entry(
        &self,
        field_ref: &FieldRef,
    ) -> Result<Option<FieldDefinition>, MetadataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self
            .per_field
            .lock()
            .unwrap()
            .entry(field_ref.clone())
            .or_insert(0) += 1;

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(field_ref) {
            return Err(MetadataError::Lookup {
                field: field_ref.clone(),
                message: "definition service offline".to_string(),
            });
        }
        Ok(self.definitions.lock().unwrap().get(field_ref).cloned())
    }
}

/// Node writer that records update attempts and successful documents
#[derive(Default)]
pub struct MockNodeWriter {
    updates: Mutex<Vec<(NodeId, ContentDocument)>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl MockNodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful updates only
    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// All attempts, including failed ones
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn last_update(&self) -> Option<(NodeId, ContentDocument)> {
        self.updates.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl NodeWriter for MockNodeWriter {
    async fn update_node(
        &self,
        node_id: &NodeId,
        content: &ContentDocument,
    ) -> Result<(), NodeWriteError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NodeWriteError("writer offline".to_string()));
        }
        self.updates
            .lock()
            .unwrap()
            .push((*node_id, content.clone()));
        Ok(())
    }
}

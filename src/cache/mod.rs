//! Field definition metadata caching
//!
//! Definitions are read-mostly, so the cache holds them for a TTL and
//! collapses concurrent lookups for the same reference into a single fetch.
//! An uninitialized cell marks an in-flight fetch that every concurrent
//! caller awaits directly; nothing polls. Lookup failures are cached as
//! empty entries so a failing backend is not hammered on every render.

use crate::document::{FieldDefinition, FieldRef};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Interval between background sweep passes
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Errors that can occur during definition lookup
///
/// These never escape the cache boundary; failed lookups degrade to empty
/// entries surfaced as `None`.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("definition lookup failed for {field}: {message}")]
    Lookup { field: FieldRef, message: String },
}

/// Trait for the field definition lookup boundary
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    /// Fetch one field definition; `Ok(None)` when the reference is unknown
    async fn get_entry(
        &self,
        field_ref: &FieldRef,
    ) -> Result<Option<FieldDefinition>, MetadataError>;
}

/// Observable cache state, for tests and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub valid: usize,
    pub expired: usize,
    pub loading: usize,
}

/// One cache slot
///
/// The cell doubles as the in-flight marker: uninitialized means a fetch is
/// running and concurrent callers await the shared cell instead of issuing
/// duplicates.
#[derive(Clone)]
struct CacheSlot {
    cell: Arc<OnceCell<Option<FieldDefinition>>>,
    inserted_at: Instant,
}

impl CacheSlot {
    fn empty() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            inserted_at: Instant::now(),
        }
    }

    fn is_loading(&self) -> bool {
        !self.cell.initialized()
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cell.initialized() && self.inserted_at.elapsed() >= ttl
    }

    fn is_valid(&self, ttl: Duration) -> bool {
        self.cell.initialized() && self.inserted_at.elapsed() < ttl
    }
}

/// TTL cache for field definitions with single-flight fetch dedupe
///
/// Shared by every mounted node manager in a session. Construct inside a
/// Tokio runtime; a background task sweeps expired entries once a minute
/// and exits when the cache is dropped.
pub struct FieldMetadataCache {
    source: Arc<dyn DefinitionSource>,
    slots: DashMap<FieldRef, CacheSlot>,
    ttl: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl FieldMetadataCache {
    /// Create a cache with the default 5-minute TTL
    pub fn new(source: Arc<dyn DefinitionSource>) -> Arc<Self> {
        Self::with_ttl(source, DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(source: Arc<dyn DefinitionSource>, ttl: Duration) -> Arc<Self> {
        let cache = Arc::new(Self {
            source,
            slots: DashMap::new(),
            ttl,
            sweeper: Mutex::new(None),
        });
        let handle = tokio::spawn(Self::sweep_loop(Arc::downgrade(&cache)));
        *cache.sweeper.lock().unwrap() = Some(handle);
        cache
    }

    /// Look up one definition, hitting the source at most once per TTL window
    ///
    /// Returns `None` for unknown references and for failed lookups (the
    /// failure is cached too, with a warning logged).
    pub async fn get_entry(&self, field_ref: &FieldRef) -> Option<FieldDefinition> {
        let slot = self.live_slot(field_ref);
        let source = Arc::clone(&self.source);
        let wanted = field_ref.clone();
        slot.cell
            .get_or_init(|| async move {
                match source.get_entry(&wanted).await {
                    Ok(entry) => entry,
                    Err(error) => {
                        tracing::warn!(field = %wanted, %error, "definition lookup failed; caching empty entry");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Look up many definitions concurrently
    ///
    /// A failed lookup yields `None` for that key; it never aborts the rest.
    pub async fn get_entries(
        self: &Arc<Self>,
        field_refs: &[FieldRef],
    ) -> HashMap<FieldRef, Option<FieldDefinition>> {
        let mut inflight = JoinSet::new();
        for field_ref in field_refs {
            let cache = Arc::clone(self);
            let field_ref = field_ref.clone();
            inflight.spawn(async move {
                let entry = cache.get_entry(&field_ref).await;
                (field_ref, entry)
            });
        }

        let mut entries = HashMap::new();
        while let Some(joined) = inflight.join_next().await {
            if let Ok((field_ref, entry)) = joined {
                entries.insert(field_ref, entry);
            }
        }
        entries
    }

    /// Warm the subset of references that is not already cache-valid
    pub async fn preload(self: &Arc<Self>, field_refs: &[FieldRef]) {
        let missing: Vec<FieldRef> = field_refs
            .iter()
            .filter(|field_ref| {
                !self
                    .slots
                    .get(*field_ref)
                    .map(|slot| slot.is_valid(self.ttl) || slot.is_loading())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if missing.is_empty() {
            return;
        }
        let _ = self.get_entries(&missing).await;
    }

    /// Remove expired entries. Loading entries are never evicted out from
    /// under an in-flight fetch.
    pub fn sweep(&self) {
        let ttl = self.ttl;
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(ttl));
        let removed = before - self.slots.len();
        if removed > 0 {
            tracing::debug!(removed, "swept expired field definitions");
        }
    }

    /// Drop every entry immediately (logout / job switch)
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Counts of valid, expired, and loading entries
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for slot in self.slots.iter() {
            if slot.is_loading() {
                stats.loading += 1;
            } else if slot.is_expired(self.ttl) {
                stats.expired += 1;
            } else {
                stats.valid += 1;
            }
        }
        stats
    }

    /// Stop the background sweeper
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Return the live slot for a reference, replacing expired ones
    fn live_slot(&self, field_ref: &FieldRef) -> CacheSlot {
        let mut slot = self
            .slots
            .entry(field_ref.clone())
            .or_insert_with(CacheSlot::empty);
        if slot.is_expired(self.ttl) {
            *slot = CacheSlot::empty();
        }
        slot.value().clone()
    }

    async fn sweep_loop(cache: Weak<Self>) {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;
            match cache.upgrade() {
                Some(cache) => cache.sweep(),
                None => return,
            }
        }
    }
}

impl Drop for FieldMetadataCache {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}

//! Debounce-batched value resolution
//!
//! Coalesces bursts of resolve/set calls into grouped backend dispatches
//! while preserving one-result-per-caller semantics. Reads fire after a
//! short quiet window because they arrive in tight bursts when a node
//! mounts; writes wait longer so keystroke bursts collapse into one
//! dispatch. The two queues are independent state machines.

use super::traits::{ResolverError, ResolverResult};
use super::value::ValueResolver;
use crate::address::Address;
use crate::document::JobId;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

/// Quiet window before a resolve batch fires
pub const RESOLVE_WINDOW: Duration = Duration::from_millis(10);

/// Quiet window before a set batch fires
pub const SET_WINDOW: Duration = Duration::from_millis(100);

/// A cancellable one-shot scheduled action
///
/// idle -> pending -> firing -> idle. Arming while pending aborts the
/// scheduled task and replaces it; `cancel` returns to idle without firing.
#[derive(Debug, Default)]
pub(crate) struct DebounceTimer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceTimer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` after `window`, replacing any pending schedule
    pub(crate) fn arm<F>(&self, window: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            action.await;
        });
        if let Some(previous) = self.pending.lock().unwrap().replace(task) {
            previous.abort();
        }
    }

    /// Drop any pending schedule without firing it
    pub(crate) fn cancel(&self) {
        if let Some(task) = self.pending.lock().unwrap().take() {
            task.abort();
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct PendingResolve {
    job_id: JobId,
    address: Address,
    reply: oneshot::Sender<ResolverResult<Value>>,
}

struct PendingSet {
    job_id: JobId,
    address: Address,
    value: Value,
    reply: oneshot::Sender<ResolverResult<()>>,
}

/// Batching wrapper around [`ValueResolver`]
///
/// Every call enqueues a request and awaits its own reply channel; the
/// backend is never invoked synchronously. When a queue's quiet window
/// elapses, the queue is swapped for an empty one before any await, so
/// requests arriving during a flush always land in the next batch.
pub struct BatchedResolver {
    resolver: ValueResolver,
    resolve_queue: Arc<Mutex<Vec<PendingResolve>>>,
    set_queue: Arc<Mutex<Vec<PendingSet>>>,
    resolve_timer: DebounceTimer,
    set_timer: DebounceTimer,
}

impl BatchedResolver {
    pub fn new(resolver: ValueResolver) -> Self {
        Self {
            resolver,
            resolve_queue: Arc::new(Mutex::new(Vec::new())),
            set_queue: Arc::new(Mutex::new(Vec::new())),
            resolve_timer: DebounceTimer::new(),
            set_timer: DebounceTimer::new(),
        }
    }

    /// Resolve one address through the read queue
    pub async fn resolve(&self, job_id: &JobId, address: &Address) -> ResolverResult<Value> {
        let reply = self.enqueue_resolve(job_id, address);
        reply.await.unwrap_or_else(|_| Err(ResolverError::Cancelled))
    }

    /// Persist one value through the write queue
    pub async fn set(
        &self,
        job_id: &JobId,
        address: &Address,
        value: Value,
    ) -> ResolverResult<()> {
        let (reply, rx) = oneshot::channel();
        self.set_queue.lock().unwrap().push(PendingSet {
            job_id: job_id.clone(),
            address: address.clone(),
            value,
            reply,
        });
        let queue = Arc::clone(&self.set_queue);
        let resolver = self.resolver.clone();
        self.set_timer
            .arm(SET_WINDOW, async move { flush_sets(resolver, &queue) });
        rx.await.unwrap_or_else(|_| Err(ResolverError::Cancelled))
    }

    /// Resolve many addresses, settling every one
    ///
    /// Failed addresses map to `None`; one failure never aborts the rest.
    pub async fn resolve_many(
        &self,
        job_id: &JobId,
        addresses: &[Address],
    ) -> HashMap<Address, Option<Value>> {
        let replies: Vec<_> = addresses
            .iter()
            .map(|address| (address.clone(), self.enqueue_resolve(job_id, address)))
            .collect();

        let mut values = HashMap::new();
        for (address, reply) in replies {
            let result = reply.await.unwrap_or_else(|_| Err(ResolverError::Cancelled));
            values.insert(address, result.ok());
        }
        values
    }

    /// Cancel pending timers and fail queued requests
    ///
    /// Call on consumer teardown. Already-dispatched backend calls are not
    /// cancelled; their replies land on dropped receivers and are ignored.
    pub fn cleanup(&self) {
        self.resolve_timer.cancel();
        self.set_timer.cancel();

        let resolves = mem::take(&mut *self.resolve_queue.lock().unwrap());
        for request in resolves {
            let _ = request.reply.send(Err(ResolverError::Cancelled));
        }
        let sets = mem::take(&mut *self.set_queue.lock().unwrap());
        for request in sets {
            let _ = request.reply.send(Err(ResolverError::Cancelled));
        }
    }

    fn enqueue_resolve(
        &self,
        job_id: &JobId,
        address: &Address,
    ) -> oneshot::Receiver<ResolverResult<Value>> {
        let (reply, rx) = oneshot::channel();
        self.resolve_queue.lock().unwrap().push(PendingResolve {
            job_id: job_id.clone(),
            address: address.clone(),
            reply,
        });
        let queue = Arc::clone(&self.resolve_queue);
        let resolver = self.resolver.clone();
        self.resolve_timer.arm(RESOLVE_WINDOW, async move {
            flush_resolves(resolver, &queue);
        });
        rx
    }
}

impl Drop for BatchedResolver {
    fn drop(&mut self) {
        self.cleanup();
    }
}

// The flush bodies never await: the queue swap and the dispatch spawns all
// happen in one poll of the timer task, so a re-arm can only abort a timer
// that has not fired yet. Dispatched groups run as detached tasks and
// survive later timer cancellation.

fn flush_resolves(resolver: ValueResolver, queue: &Mutex<Vec<PendingResolve>>) {
    let drained = mem::take(&mut *queue.lock().unwrap());
    if drained.is_empty() {
        return;
    }

    let mut grouped: HashMap<JobId, Vec<PendingResolve>> = HashMap::new();
    for request in drained {
        grouped.entry(request.job_id.clone()).or_default().push(request);
    }

    for (job_id, requests) in grouped {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            tracing::debug!(job = %job_id, count = requests.len(), "dispatching resolve batch");
            let mut inflight = JoinSet::new();
            for request in requests {
                let resolver = resolver.clone();
                inflight.spawn(async move {
                    let result = resolver.resolve(&request.job_id, &request.address).await;
                    let _ = request.reply.send(result);
                });
            }
            while inflight.join_next().await.is_some() {}
        });
    }
}

fn flush_sets(resolver: ValueResolver, queue: &Mutex<Vec<PendingSet>>) {
    let drained = mem::take(&mut *queue.lock().unwrap());
    if drained.is_empty() {
        return;
    }

    let mut grouped: HashMap<JobId, Vec<PendingSet>> = HashMap::new();
    for request in drained {
        grouped.entry(request.job_id.clone()).or_default().push(request);
    }

    for (job_id, requests) in grouped {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            tracing::debug!(job = %job_id, count = requests.len(), "dispatching set batch");
            let mut inflight = JoinSet::new();
            for request in requests {
                let resolver = resolver.clone();
                inflight.spawn(async move {
                    let result = resolver
                        .set(&request.job_id, &request.address, request.value)
                        .await;
                    let _ = request.reply.send(result);
                });
            }
            while inflight.join_next().await.is_some() {}
        });
    }
}

//! Single-operation value resolution

use super::traits::{
    ResolverError, ResolverResult, ValueBackend, ValueOperation, ValueRequest, ValueResponse,
};
use crate::address::Address;
use crate::document::JobId;
use serde_json::Value;
use std::sync::Arc;

/// Client for single value operations against the remote store
///
/// Each method maps 1:1 to one backend round trip. No batching, no caching,
/// no retry; failures propagate to the caller.
#[derive(Clone)]
pub struct ValueResolver {
    backend: Arc<dyn ValueBackend>,
}

impl ValueResolver {
    pub fn new(backend: Arc<dyn ValueBackend>) -> Self {
        Self { backend }
    }

    /// Resolve the value stored at an address. Unset addresses yield `Null`.
    pub async fn resolve(&self, job_id: &JobId, address: &Address) -> ResolverResult<Value> {
        let request = ValueRequest::resolve(job_id.clone(), address.clone());
        let response = self.backend.call(request).await?;
        let data = unwrap_envelope(ValueOperation::Resolve, address, response)?;
        Ok(data.unwrap_or(Value::Null))
    }

    /// Persist a value at an address
    pub async fn set(&self, job_id: &JobId, address: &Address, value: Value) -> ResolverResult<()> {
        let request = ValueRequest::set(job_id.clone(), address.clone(), value);
        let response = self.backend.call(request).await?;
        unwrap_envelope(ValueOperation::Set, address, response)?;
        Ok(())
    }

    /// Check whether an address holds a value
    pub async fn exists(&self, job_id: &JobId, address: &Address) -> ResolverResult<bool> {
        let request = ValueRequest::exists(job_id.clone(), address.clone());
        let response = self.backend.call(request).await?;
        let data = unwrap_envelope(ValueOperation::Exists, address, response)?;
        Ok(data
            .as_ref()
            .and_then(|d| d.get("exists"))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// List the child segments stored under an address prefix
    pub async fn list_children(
        &self,
        job_id: &JobId,
        address: &Address,
    ) -> ResolverResult<Vec<String>> {
        let request = ValueRequest::list_children(job_id.clone(), address.clone());
        let response = self.backend.call(request).await?;
        let data = unwrap_envelope(ValueOperation::ListChildren, address, response)?;
        let children = data
            .and_then(|d| d.as_array().cloned())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .collect();
        Ok(children)
    }
}

fn unwrap_envelope(
    operation: ValueOperation,
    address: &Address,
    response: ValueResponse,
) -> ResolverResult<Option<Value>> {
    if response.success {
        Ok(response.data)
    } else {
        Err(ResolverError::Remote {
            operation,
            address: address.clone(),
            message: response
                .error
                .unwrap_or_else(|| "backend reported failure".to_string()),
        })
    }
}

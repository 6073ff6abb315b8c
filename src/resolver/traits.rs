//! Value backend trait definitions

use crate::address::Address;
use crate::document::JobId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during value operations
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The backend reported failure or returned a non-success envelope
    #[error("remote {operation} failed for {address}: {message}")]
    Remote {
        operation: ValueOperation,
        address: Address,
        message: String,
    },

    /// Transport-level failure reaching the backend
    #[error("transport error: {0}")]
    Transport(String),

    /// The request was dropped before a result was produced
    #[error("request cancelled before completion")]
    Cancelled,
}

/// Result type for value operations
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Wire operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOperation {
    Resolve,
    Set,
    Exists,
    ListChildren,
}

impl std::fmt::Display for ValueOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::Set => "set",
            Self::Exists => "exists",
            Self::ListChildren => "list_children",
        };
        write!(f, "{}", name)
    }
}

/// One backend request envelope
#[derive(Debug, Clone, Serialize)]
pub struct ValueRequest {
    pub operation: ValueOperation,
    pub job_id: JobId,
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ValueRequest {
    pub fn resolve(job_id: JobId, address: Address) -> Self {
        Self {
            operation: ValueOperation::Resolve,
            job_id,
            address,
            value: None,
        }
    }

    pub fn set(job_id: JobId, address: Address, value: Value) -> Self {
        Self {
            operation: ValueOperation::Set,
            job_id,
            address,
            value: Some(value),
        }
    }

    pub fn exists(job_id: JobId, address: Address) -> Self {
        Self {
            operation: ValueOperation::Exists,
            job_id,
            address,
            value: None,
        }
    }

    pub fn list_children(job_id: JobId, address: Address) -> Self {
        Self {
            operation: ValueOperation::ListChildren,
            job_id,
            address,
            value: None,
        }
    }
}

/// Backend response envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValueResponse {
    /// A successful response carrying data
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A successful response with no data
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// A failure envelope
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Trait for the remote value store boundary
///
/// One `call` is one round trip. Implementations must be thread-safe
/// (Send + Sync); application-level failure rides in the response envelope,
/// transport failure in the error.
#[async_trait]
pub trait ValueBackend: Send + Sync {
    /// Execute one request envelope against the store
    async fn call(&self, request: ValueRequest) -> ResolverResult<ValueResponse>;
}

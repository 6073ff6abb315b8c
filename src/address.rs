//! Deterministic field addressing
//!
//! `PathAddressBuilder` is the single source of truth for address shape.
//! The resolver, batch queues, and node field managers all derive their keys
//! from it, so identical logical targets always share identical strings.

use crate::document::{FieldRef, JobId, NodePath};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised for malformed address inputs
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("job id is empty")]
    EmptyJobId,

    #[error("job id contains '.': {0:?}")]
    InvalidJobId(String),

    #[error("field reference is empty")]
    EmptyFieldRef,

    #[error("field reference contains '.': {0:?}")]
    InvalidFieldRef(String),
}

/// A resolved field address: the storage key for one field's value
/// within a specific job and node path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds addresses for fields within one node of one job
///
/// Addresses take the shape `<job id>.<node path>.<field ref>`. The job id
/// and field ref are validated dot-free, so the first and last components
/// parse unambiguously even though node paths contain dots.
#[derive(Debug, Clone)]
pub struct PathAddressBuilder {
    job_id: JobId,
    node_path: NodePath,
}

impl PathAddressBuilder {
    /// Create a builder, rejecting malformed job ids
    pub fn new(job_id: JobId, node_path: NodePath) -> Result<Self, AddressError> {
        if job_id.as_str().is_empty() {
            return Err(AddressError::EmptyJobId);
        }
        if job_id.as_str().contains('.') {
            return Err(AddressError::InvalidJobId(job_id.as_str().to_string()));
        }
        Ok(Self { job_id, node_path })
    }

    /// Address of one field's value within this node
    pub fn field_value(&self, field_ref: &FieldRef) -> Result<Address, AddressError> {
        if field_ref.as_str().is_empty() {
            return Err(AddressError::EmptyFieldRef);
        }
        if field_ref.as_str().contains('.') {
            return Err(AddressError::InvalidFieldRef(field_ref.as_str().to_string()));
        }
        Ok(Address(format!(
            "{}.{}.{}",
            self.job_id, self.node_path, field_ref
        )))
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn node_path(&self) -> &NodePath {
        &self.node_path
    }
}

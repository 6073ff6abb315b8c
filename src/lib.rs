//! Formwork: field resolution, caching, and reconciliation for job documents
//!
//! A job is a tree of nodes (groups, forms, media), each addressable by a
//! dotted materialized path. Form nodes embed a denormalized content
//! document whose leaf values are also stored individually, one per field
//! address. This crate is the client core that keeps the two in step:
//!
//! - **Addresses**: [`PathAddressBuilder`] maps (job, node path, field) to
//!   a deterministic storage key
//! - **Resolution**: [`ValueResolver`] talks to the store one call at a
//!   time; [`BatchedResolver`] coalesces bursts behind debounce windows
//! - **Metadata**: [`FieldMetadataCache`] holds field definitions with TTL
//!   expiry and single-flight fetch dedupe
//! - **Managers**: [`NodeFieldManager`] loads a node's fields, tracks edit
//!   state, and reconciles dirty values back into the content document
//!
//! # Example
//!
//! ```
//! use formwork::{FieldRef, JobId, NodePath, PathAddressBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let path = NodePath::parse("kitchen.cabinets")?;
//! let builder = PathAddressBuilder::new(JobId::from("job-1"), path)?;
//! let address = builder.field_value(&FieldRef::from("door_style"))?;
//! assert_eq!(address.as_str(), "job-1.kitchen.cabinets.door_style");
//! # Ok(())
//! # }
//! ```

mod address;
mod document;
mod session;

pub mod cache;
pub mod manager;
pub mod options;
pub mod resolver;

pub use address::{Address, AddressError, PathAddressBuilder};
pub use cache::{CacheStats, DefinitionSource, FieldMetadataCache, MetadataError, DEFAULT_TTL};
pub use document::{
    CollectionInstance, CollectionItem, ContentDocument, ContentItem, FieldDatatype,
    FieldDefinition, FieldItem, FieldOption, FieldRef, FieldUi, FieldWidget, JobId, Node, NodeId,
    NodePath, NodeType, OptionDependency, PathError, RuleViolation, SectionItem, ValidationRules,
};
pub use manager::{
    FieldEditState, ManagerConfig, ManagerError, ManagerResult, NodeFieldManager, NodeWriteError,
    NodeWriter, WriteFailurePolicy, MAX_CONTENT_DEPTH, RECONCILE_WINDOW,
};
pub use options::eligible_options;
pub use resolver::{
    BatchedResolver, ResolverError, ResolverResult, ValueBackend, ValueOperation, ValueRequest,
    ValueResolver, ValueResponse, RESOLVE_WINDOW, SET_WINDOW,
};
pub use session::Session;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

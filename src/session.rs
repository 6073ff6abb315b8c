//! Session wiring
//!
//! A `Session` owns the services every mounted node shares: the field
//! metadata cache and the batched resolver. Construct one at session start,
//! mount node managers through it, and dispose it at session end. Tests
//! build isolated instances instead of reaching for globals.

use crate::cache::{DefinitionSource, FieldMetadataCache};
use crate::document::Node;
use crate::manager::{ManagerConfig, ManagerResult, NodeFieldManager, NodeWriter};
use crate::resolver::{BatchedResolver, ValueBackend, ValueResolver};
use std::sync::Arc;

/// Shared services for one user session
pub struct Session {
    resolver: Arc<BatchedResolver>,
    metadata: Arc<FieldMetadataCache>,
    writer: Arc<dyn NodeWriter>,
    config: ManagerConfig,
}

impl Session {
    /// Create a session with default manager configuration
    pub fn new(
        backend: Arc<dyn ValueBackend>,
        definitions: Arc<dyn DefinitionSource>,
        writer: Arc<dyn NodeWriter>,
    ) -> Self {
        Self::with_config(backend, definitions, writer, ManagerConfig::default())
    }

    /// Create a session with custom manager configuration
    pub fn with_config(
        backend: Arc<dyn ValueBackend>,
        definitions: Arc<dyn DefinitionSource>,
        writer: Arc<dyn NodeWriter>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            resolver: Arc::new(BatchedResolver::new(ValueResolver::new(backend))),
            metadata: FieldMetadataCache::new(definitions),
            writer,
            config,
        }
    }

    /// Mount a field manager for one node against the shared services
    pub fn mount_node(&self, node: &Node) -> ManagerResult<Arc<NodeFieldManager>> {
        NodeFieldManager::mount(
            node,
            Arc::clone(&self.resolver),
            Arc::clone(&self.metadata),
            Arc::clone(&self.writer),
            self.config.clone(),
        )
    }

    /// The shared metadata cache
    pub fn metadata(&self) -> &Arc<FieldMetadataCache> {
        &self.metadata
    }

    /// The shared batched resolver
    pub fn resolver(&self) -> &Arc<BatchedResolver> {
        &self.resolver
    }

    /// Stop timers and drop cached state
    ///
    /// Tear down mounted managers first; their in-flight responses are
    /// ignored after disposal.
    pub fn dispose(&self) {
        self.resolver.cleanup();
        self.metadata.shutdown();
        self.metadata.clear();
    }
}

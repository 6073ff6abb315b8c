//! Job and node identity, and the materialized-path node model

use super::content::ContentDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a job
///
/// Serializes as a plain string (UUID or semantic ID like "job:kitchen-remodel")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a new random JobId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a JobId from a string (semantic ID)
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new random NodeId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a NodeId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when parsing a node path
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("node path is empty")]
    Empty,

    #[error("node path has an empty segment: {0:?}")]
    EmptySegment(String),
}

/// A node's position in the job tree, encoded as a dotted string
///
/// The path is the materialized-path key: node A is an ancestor of node B
/// iff B's path starts with A's path plus a dot. Paths are unique within a
/// job, and segments are immutable once children reference them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(String);

impl NodePath {
    /// Parse a dotted path, rejecting empty paths and empty segments
    pub fn parse(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if path.split('.').any(|segment| segment.is_empty()) {
            return Err(PathError::EmptySegment(path));
        }
        Ok(Self(path))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The parent path, or None for a root node
    pub fn parent(&self) -> Option<NodePath> {
        self.0.rfind('.').map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Append a segment, producing a child path
    pub fn child(&self, segment: &str) -> Result<NodePath, PathError> {
        if segment.is_empty() || segment.contains('.') {
            return Err(PathError::EmptySegment(segment.to_string()));
        }
        Ok(Self(format!("{}.{}", self.0, segment)))
    }

    /// Ancestor test by string prefix. Never true for the path itself.
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'.'
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node kind within a job tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Structural grouping of child nodes
    Group,
    /// A form with field content
    Form,
    /// A media attachment point
    Media,
}

/// A node in a job document tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Owning job
    pub job_id: JobId,
    /// Node kind
    pub node_type: NodeType,
    /// Materialized path, unique within the job
    pub path: NodePath,
    /// Direct parent, None for roots
    pub parent_id: Option<NodeId>,
    /// Denormalized content document (field values embedded)
    pub content: ContentDocument,
    /// Monotonic version counter
    pub version: i64,
    /// Last persisted modification time
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Create a new node with empty content
    pub fn new(job_id: JobId, node_type: NodeType, path: NodePath) -> Self {
        Self {
            id: NodeId::new(),
            job_id,
            node_type,
            path,
            parent_id: None,
            content: ContentDocument::new(),
            version: 1,
            updated_at: Utc::now(),
        }
    }

    /// Set the content document
    pub fn with_content(mut self, content: ContentDocument) -> Self {
        self.content = content;
        self
    }

    /// Set the parent node
    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty_path() {
        assert_eq!(NodePath::parse(""), Err(PathError::Empty));
    }

    #[test]
    fn parse_rejects_empty_segment() {
        assert!(matches!(
            NodePath::parse("kitchen..cabinets"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            NodePath::parse(".kitchen"),
            Err(PathError::EmptySegment(_))
        ));
    }

    #[test]
    fn parent_strips_last_segment() {
        let path = NodePath::parse("kitchen.cabinets.uppers").unwrap();
        assert_eq!(path.parent().unwrap().as_str(), "kitchen.cabinets");
        assert_eq!(
            NodePath::parse("kitchen").unwrap().parent(),
            None
        );
    }

    #[test]
    fn child_appends_segment() {
        let path = NodePath::parse("kitchen").unwrap();
        assert_eq!(path.child("cabinets").unwrap().as_str(), "kitchen.cabinets");
        assert!(path.child("a.b").is_err());
        assert!(path.child("").is_err());
    }

    #[test]
    fn ancestor_requires_segment_boundary() {
        let a = NodePath::parse("kitchen").unwrap();
        let b = NodePath::parse("kitchen.cabinets").unwrap();
        let c = NodePath::parse("kitchenette").unwrap();

        assert!(a.is_ancestor_of(&b));
        assert!(!a.is_ancestor_of(&c));
        assert!(!a.is_ancestor_of(&a));
        assert!(!b.is_ancestor_of(&a));
    }

    #[test]
    fn node_builder() {
        let parent = NodeId::new();
        let node = Node::new(
            JobId::from("job-1"),
            NodeType::Form,
            NodePath::parse("kitchen.cabinets").unwrap(),
        )
        .with_parent(parent);

        assert_eq!(node.parent_id, Some(parent));
        assert_eq!(node.version, 1);
        assert!(node.content.items.is_empty());
    }
}

//! Nested content documents for form nodes
//!
//! A content document is a recursive tree of typed items: plain fields,
//! sections that group children, and repeatable collections whose instances
//! each hold their own children. Field values are embedded in the document
//! as a denormalized snapshot of the address-level store.

use super::field::FieldRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The full content document embedded in a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    #[serde(default)]
    pub items: Vec<ContentItem>,
}

impl ContentDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level item
    pub fn with_item(mut self, item: ContentItem) -> Self {
        self.items.push(item);
        self
    }
}

/// One item in a content tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentItem {
    Field(FieldItem),
    Section(SectionItem),
    Collection(CollectionItem),
}

/// A leaf holding one field's embedded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldItem {
    /// Reference to the field definition
    #[serde(rename = "ref")]
    pub field_ref: FieldRef,
    /// Whether the field must be filled before node completion
    #[serde(default)]
    pub required: bool,
    /// Embedded value snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldItem {
    pub fn new(field_ref: impl Into<FieldRef>) -> Self {
        Self {
            field_ref: field_ref.into(),
            required: false,
            value: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// A named grouping of child items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionItem {
    /// Section key within the document
    pub path: String,
    #[serde(default)]
    pub children: Vec<ContentItem>,
}

impl SectionItem {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ContentItem) -> Self {
        self.children.push(child);
        self
    }
}

/// A repeatable grouping holding zero or more instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    /// Collection key within the document
    pub path: String,
    #[serde(default)]
    pub instances: Vec<CollectionInstance>,
}

impl CollectionItem {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            instances: Vec::new(),
        }
    }

    pub fn with_instance(mut self, instance: CollectionInstance) -> Self {
        self.instances.push(instance);
        self
    }
}

/// One instance of a repeatable collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub children: Vec<ContentItem>,
}

impl CollectionInstance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_child(mut self, child: ContentItem) -> Self {
        self.children.push(child);
        self
    }
}

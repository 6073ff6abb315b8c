//! Job document data structures

mod content;
mod field;
mod node;


pub use content::{
    CollectionInstance, CollectionItem, ContentDocument, ContentItem, FieldItem, SectionItem,
};
pub use field::{
    FieldDatatype, FieldDefinition, FieldOption, FieldRef, FieldUi, FieldWidget, OptionDependency,
    RuleViolation, ValidationRules,
};
pub use node::{JobId, Node, NodeId, NodePath, NodeType, PathError};

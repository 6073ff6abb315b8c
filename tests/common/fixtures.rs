//! Node and definition fixtures

use formwork::{
    Address, CollectionInstance, CollectionItem, ContentDocument, ContentItem, FieldDatatype,
    FieldDefinition, FieldItem, FieldOption, FieldRef, FieldWidget, JobId, Node, NodePath,
    NodeType, PathAddressBuilder, SectionItem,
};
use serde_json::Value;

/// Install a test subscriber once per binary; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Section with one field, a nested subsection with two fields, and a
/// repeatable collection with two instances of one field each
pub fn sample_tree() -> ContentDocument {
    ContentDocument::new()
        .with_item(ContentItem::Section(
            SectionItem::new("details")
                .with_child(ContentItem::Field(FieldItem::new("title")))
                .with_child(ContentItem::Section(
                    SectionItem::new("dimensions")
                        .with_child(ContentItem::Field(FieldItem::new("width")))
                        .with_child(ContentItem::Field(FieldItem::new("height"))),
                )),
        ))
        .with_item(ContentItem::Collection(
            CollectionItem::new("rooms")
                .with_instance(
                    CollectionInstance::new()
                        .with_child(ContentItem::Field(FieldItem::new("room_name"))),
                )
                .with_instance(
                    CollectionInstance::new()
                        .with_child(ContentItem::Field(FieldItem::new("room_type"))),
                ),
        ))
}

/// Field references used by [`sample_tree`]
pub const SAMPLE_REFS: [&str; 5] = ["title", "width", "height", "room_name", "room_type"];

/// A form node carrying [`sample_tree`] content
pub fn form_node(job: &str, path: &str) -> Node {
    Node::new(
        JobId::from(job),
        NodeType::Form,
        NodePath::parse(path).unwrap(),
    )
    .with_content(sample_tree())
}

pub fn text_definition(id: &str) -> FieldDefinition {
    FieldDefinition::new(id, FieldDatatype::Text, FieldWidget::Input)
}

pub fn selection_definition(id: &str, options: Vec<FieldOption>) -> FieldDefinition {
    let mut definition = FieldDefinition::new(id, FieldDatatype::Selection, FieldWidget::Select);
    for option in options {
        definition = definition.with_option(option);
    }
    definition
}

/// Address of one field within one node, matching what managers compute
pub fn field_address(job: &str, path: &str, field_ref: &str) -> Address {
    PathAddressBuilder::new(JobId::from(job), NodePath::parse(path).unwrap())
        .unwrap()
        .field_value(&FieldRef::from(field_ref))
        .unwrap()
}

/// The embedded value of a field item anywhere in a content document
pub fn embedded_value(content: &ContentDocument, field_ref: &FieldRef) -> Option<Value> {
    fn walk(items: &[ContentItem], field_ref: &FieldRef) -> Option<Value> {
        for item in items {
            match item {
                ContentItem::Field(field) if &field.field_ref == field_ref => {
                    return field.value.clone()
                }
                ContentItem::Field(_) => {}
                ContentItem::Section(section) => {
                    if let Some(value) = walk(&section.children, field_ref) {
                        return Some(value);
                    }
                }
                ContentItem::Collection(collection) => {
                    for instance in &collection.instances {
                        if let Some(value) = walk(&instance.children, field_ref) {
                            return Some(value);
                        }
                    }
                }
            }
        }
        None
    }
    walk(&content.items, field_ref)
}

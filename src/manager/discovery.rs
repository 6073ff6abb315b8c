//! Content tree traversal
//!
//! Collects field references from arbitrarily nested content and writes
//! in-memory values back into matching field items. Both walks share a
//! depth guard: content items carry no stable identity, so a malformed
//! cyclic document is caught by depth instead of a visited set.

use super::ManagerError;
use crate::document::{ContentDocument, ContentItem, FieldRef};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Collect every field reference in the document, deduplicated,
/// in discovery order
pub(crate) fn collect_field_refs(
    content: &ContentDocument,
    max_depth: usize,
) -> Result<Vec<FieldRef>, ManagerError> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    collect_items(&content.items, 0, max_depth, &mut seen, &mut refs)?;
    Ok(refs)
}

fn collect_items(
    items: &[ContentItem],
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<FieldRef>,
    refs: &mut Vec<FieldRef>,
) -> Result<(), ManagerError> {
    if depth > max_depth {
        return Err(ManagerError::DepthExceeded { max_depth });
    }
    for item in items {
        match item {
            ContentItem::Field(field) => {
                if seen.insert(field.field_ref.clone()) {
                    refs.push(field.field_ref.clone());
                }
            }
            ContentItem::Section(section) => {
                collect_items(&section.children, depth + 1, max_depth, seen, refs)?;
            }
            ContentItem::Collection(collection) => {
                for instance in &collection.instances {
                    collect_items(&instance.children, depth + 1, max_depth, seen, refs)?;
                }
            }
        }
    }
    Ok(())
}

/// Overwrite the embedded value of every field item whose ref has an entry
/// in `values`
pub(crate) fn apply_field_values(
    content: &mut ContentDocument,
    values: &HashMap<FieldRef, Option<Value>>,
    max_depth: usize,
) -> Result<(), ManagerError> {
    apply_items(&mut content.items, 0, max_depth, values)
}

fn apply_items(
    items: &mut [ContentItem],
    depth: usize,
    max_depth: usize,
    values: &HashMap<FieldRef, Option<Value>>,
) -> Result<(), ManagerError> {
    if depth > max_depth {
        return Err(ManagerError::DepthExceeded { max_depth });
    }
    for item in items {
        match item {
            ContentItem::Field(field) => {
                if let Some(value) = values.get(&field.field_ref) {
                    field.value = value.clone();
                }
            }
            ContentItem::Section(section) => {
                apply_items(&mut section.children, depth + 1, max_depth, values)?;
            }
            ContentItem::Collection(collection) => {
                for instance in &mut collection.instances {
                    apply_items(&mut instance.children, depth + 1, max_depth, values)?;
                }
            }
        }
    }
    Ok(())
}

//! Dependent option filtering
//!
//! Selection widgets show only the options whose dependency clauses hold
//! against the current sibling field values. Re-evaluated on every render
//! as values change; no state.

use crate::document::{FieldOption, FieldRef};
use serde_json::Value;
use std::collections::HashMap;

/// Filter an option list against current sibling values
///
/// An option with no dependencies is always eligible. Otherwise every
/// clause must be satisfied: the referenced sibling holds a non-empty value
/// and that value is a member of the clause's allow-list. A missing or
/// empty sibling value hides the option rather than defaulting to shown.
pub fn eligible_options(
    options: &[FieldOption],
    sibling_values: &HashMap<FieldRef, Value>,
) -> Vec<FieldOption> {
    options
        .iter()
        .filter(|option| is_eligible(option, sibling_values))
        .cloned()
        .collect()
}

fn is_eligible(option: &FieldOption, sibling_values: &HashMap<FieldRef, Value>) -> bool {
    option.depends_on.iter().all(|clause| {
        match sibling_values.get(&clause.field) {
            Some(value) if !is_empty(value) => clause.allow.contains(value),
            _ => false,
        }
    })
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

//! Field references, definitions, and option metadata

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Reference to a field definition
///
/// Serializes as a plain string. References are dot-free; the address
/// builder rejects dotted references so addresses stay unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRef(String);

impl FieldRef {
    /// Create a FieldRef from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FieldRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Primitive datatype of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDatatype {
    Text,
    Number,
    Boolean,
    Date,
    Selection,
    Media,
    Json,
}

/// Widget used to render a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldWidget {
    Input,
    Textarea,
    Select,
    MultiSelect,
    Checkbox,
    DatePicker,
    MediaPicker,
}

/// Display strings attached to a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldUi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// A violated validation rule
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleViolation {
    #[error("value is {len} characters, minimum is {min}")]
    TooShort { min: usize, len: usize },

    #[error("value is {len} characters, maximum is {max}")]
    TooLong { max: usize, len: usize },

    #[error("value {value} is below minimum {min}")]
    BelowMinimum { min: f64, value: f64 },

    #[error("value {value} is above maximum {max}")]
    AboveMaximum { max: f64, value: f64 },

    #[error("value is not in the allowed set")]
    NotAllowed,
}

/// Validation rules attached to a field definition
///
/// Rules apply only to the value shapes they understand: length bounds to
/// strings, numeric bounds to numbers, the allow-list to any value. A rule
/// with no matching shape passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
}

impl ValidationRules {
    /// Evaluate the rules against a value, returning the first violation
    pub fn validate(&self, value: &Value) -> Result<(), RuleViolation> {
        if let Value::String(s) = value {
            let len = s.chars().count();
            if let Some(min) = self.min_length {
                if len < min {
                    return Err(RuleViolation::TooShort { min, len });
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    return Err(RuleViolation::TooLong { max, len });
                }
            }
        }
        if let Some(number) = value.as_f64() {
            if let Some(min) = self.min {
                if number < min {
                    return Err(RuleViolation::BelowMinimum { min, value: number });
                }
            }
            if let Some(max) = self.max {
                if number > max {
                    return Err(RuleViolation::AboveMaximum { max, value: number });
                }
            }
        }
        if let Some(allowed) = &self.allowed_values {
            if !allowed.contains(value) {
                return Err(RuleViolation::NotAllowed);
            }
        }
        Ok(())
    }
}

/// One dependency clause on a selectable option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDependency {
    /// The sibling field whose value gates this option
    pub field: FieldRef,
    /// Values of the sibling field that make the option eligible
    pub allow: Vec<Value>,
}

/// One selectable option on a selection field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<OptionDependency>,
}

impl FieldOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            depends_on: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn depends_on(mut self, field: impl Into<FieldRef>, allow: Vec<Value>) -> Self {
        self.depends_on.push(OptionDependency {
            field: field.into(),
            allow,
        });
        self
    }
}

/// A field definition, resolved from a field reference
///
/// Definitions are read-mostly; the metadata cache assumes they rarely
/// change within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: FieldRef,
    pub datatype: FieldDatatype,
    pub widget: FieldWidget,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub rules: ValidationRules,
    #[serde(default)]
    pub ui: FieldUi,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub version: i64,
}

impl FieldDefinition {
    pub fn new(id: impl Into<FieldRef>, datatype: FieldDatatype, widget: FieldWidget) -> Self {
        Self {
            id: id.into(),
            datatype,
            widget,
            options: Vec::new(),
            rules: ValidationRules::default(),
            ui: FieldUi::default(),
            default_value: None,
            version: 0,
        }
    }

    pub fn with_option(mut self, option: FieldOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.ui.label = Some(label.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

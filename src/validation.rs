//! Validation helpers.
//!
//! Two kinds of checks live here:
//!
//! - Schema validation of user-supplied JSON (provider configuration and
//!   resource configuration), producing [`Diagnostic`]s.
//! - Small predicates used by options types to express their field-group
//!   rules (exactly one of, at least one of, conflicting).
//!
//! # Example
//!
//! ```
//! use notification_contact_provider::schema::{Schema, Attribute};
//! use notification_contact_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("comment", Attribute::optional_string());
//!
//! assert!(validate(&schema, &json!({"name": "OPS"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "OPS", "comment": 7}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("comment".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Attributes the schema does not declare are rejected
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for name in obj.keys() {
        if !schema.attributes.contains_key(name) {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(name.as_str()),
            );
        }
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (attr_type, value) {
        (_, Value::Null) => {},
        (AttributeType::String, Value::String(_)) => {},
        (AttributeType::Bool, Value::Bool(_)) => {},
        (AttributeType::Int64, Value::Number(n)) if n.is_i64() || n.is_u64() => {},
        (AttributeType::List(element), Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                validate_attribute_type(element, item, &item_path, diagnostics);
            }
        },
        (AttributeType::Object(fields), Value::Object(map)) => {
            for (name, field_type) in fields {
                if let Some(v) = map.get(name) {
                    let field_path = format!("{}.{}", path, name);
                    validate_attribute_type(field_type, v, &field_path, diagnostics);
                }
            }
        },
        (expected, got) => diagnostics.push(type_error(path, type_name(expected), got)),
    }
}

fn type_name(attr_type: &AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Bool => "bool",
        AttributeType::List(_) => "list",
        AttributeType::Object(_) => "object",
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

/// Whether exactly one of the flags is set.
pub fn exactly_one_value_set(flags: &[bool]) -> bool {
    flags.iter().filter(|set| **set).count() == 1
}

/// Whether at least one of the flags is set.
pub fn any_value_set(flags: &[bool]) -> bool {
    flags.iter().any(|set| *set)
}

/// Whether every flag is set.
pub fn every_value_set(flags: &[bool]) -> bool {
    !flags.is_empty() && flags.iter().all(|set| *set)
}

//! Synchronous validation.
//!
//! Declared rules are applied per field. The form-level pass walks the schema
//! tree and skips every field that resolves as hidden or disabled, so those
//! fields can never block submission.

use crate::{
    resolve::resolve_field, value::format_number, FieldName, FieldNode, FieldValue, FormSchema,
    FormValues, RepeaterNode, SchemaNode, ValidationRules,
};
use std::collections::BTreeMap;

/// Per-field error messages. Only failing fields are present.
pub type FormErrors = BTreeMap<FieldName, String>;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid format";

/// Check one value against a rule set. Returns the first failing rule's
/// message.
///
/// Rules that do not apply to the value's runtime type are skipped: length
/// rules on a checkbox never fail.
pub fn validate_value(value: Option<&FieldValue>, rules: &ValidationRules) -> Option<String> {
    let primitive = value.and_then(FieldValue::as_primitive);

    if rules.required {
        let blank = match value {
            None => true,
            Some(FieldValue::Single(p)) => p.is_blank(),
            Some(FieldValue::List(_)) => false,
        };
        if blank {
            return Some(REQUIRED_MESSAGE.to_string());
        }
    }

    if let Some(text) = primitive.and_then(|p| p.as_str()) {
        let len = text.chars().count();
        if let Some(min) = rules.min_length {
            if len < min {
                return Some(format!("Must be at least {} characters", min));
            }
        }
        if let Some(max) = rules.max_length {
            if len > max {
                return Some(format!("Must be at most {} characters", max));
            }
        }
        if let Some(pattern) = &rules.pattern {
            if !pattern.is_match(text) {
                return Some(INVALID_FORMAT_MESSAGE.to_string());
            }
        }
    }

    if let Some(number) = primitive.and_then(|p| p.as_f64()) {
        if let Some(min) = rules.min {
            if number < min {
                return Some(format!("Must be ≥ {}", format_number(min)));
            }
        }
        if let Some(max) = rules.max {
            if number > max {
                return Some(format!("Must be ≤ {}", format_number(max)));
            }
        }
    }

    None
}

/// Validate a single leaf field in the context of the whole value set.
///
/// Returns `None` for hidden or disabled fields regardless of their rules.
pub fn validate_field(field: &FieldNode, values: &FormValues) -> Option<String> {
    let state = resolve_field(field, values);
    if !state.is_interactive() {
        return None;
    }

    let rules = ValidationRules {
        required: state.required,
        ..field.validation.clone()
    };

    validate_value(values.get(&field.name), &rules)
}

/// Validate every field in the schema against the current values.
///
/// Repeater children are validated once per existing row. An absent or empty
/// row list validates nothing for that repeater's children.
pub fn validate_form(schema: &FormSchema, values: &FormValues) -> FormErrors {
    let mut errors = FormErrors::new();
    for node in &schema.fields {
        validate_node(node, values, &mut errors);
    }
    errors
}

fn validate_node(node: &SchemaNode, values: &FormValues, errors: &mut FormErrors) {
    match node {
        SchemaNode::Group(group) => {
            for child in &group.fields {
                validate_node(child, values, errors);
            }
        }
        SchemaNode::Repeater(repeater) => {
            let rows = row_count(repeater, values);
            for _ in 0..rows {
                for child in &repeater.fields {
                    validate_node(child, values, errors);
                }
            }
        }
        SchemaNode::Field(field) => {
            if let Some(message) = validate_field(field, values) {
                errors.insert(field.name.clone(), message);
            }
        }
    }
}

fn row_count(repeater: &RepeaterNode, values: &FormValues) -> usize {
    values
        .get(&repeater.name)
        .and_then(FieldValue::as_list)
        .map_or(0, <[_]>::len)
}

/// Check declared repeater row bounds (`minItems` / `maxItems`).
///
/// Kept separate from [`validate_form`] so callers can treat the bounds as
/// presentation hints instead. Errors are keyed by the repeater's name.
pub fn validate_row_bounds(schema: &FormSchema, values: &FormValues) -> FormErrors {
    fn walk(nodes: &[SchemaNode], values: &FormValues, errors: &mut FormErrors) {
        for node in nodes {
            if let SchemaNode::Repeater(repeater) = node {
                let rows = row_count(repeater, values);
                let message = match (repeater.min_items, repeater.max_items) {
                    (Some(min), _) if rows < min => {
                        Some(format!("Must have at least {}", items(min)))
                    }
                    (_, Some(max)) if rows > max => Some(format!("Must have at most {}", items(max))),
                    _ => None,
                };
                if let Some(message) = message {
                    errors.insert(repeater.name.clone(), message);
                }
            }
            walk(node.children(), values, errors);
        }
    }

    let mut errors = FormErrors::new();
    walk(&schema.fields, values, &mut errors);
    errors
}

fn items(count: usize) -> String {
    match count {
        1 => "1 item".to_string(),
        n => format!("{} items", n),
    }
}

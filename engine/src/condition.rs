//! Cross-field conditions.
//!
//! A condition is a predicate over one other field's current value. It gates
//! visibility, enablement and requiredness of the field that declares it.

use crate::{FieldName, FieldValue, FormValues, Primitive};
use serde::{Deserialize, Deserializer, Serialize};

/// A predicate over another field's current value.
///
/// Only one test is meaningful per instance. When several are present they
/// are checked in the order `exists`, `equals`, `notEquals` and the first
/// one present decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Name of the field whose value is tested
    pub field: FieldName,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub equals: Option<Primitive>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub not_equals: Option<Primitive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

/// Keeps an explicit `null` distinct from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Primitive>, D::Error>
where
    D: Deserializer<'de>,
{
    Primitive::deserialize(deserializer).map(Some)
}

impl Condition {
    /// Condition that holds when `field` equals `value`.
    pub fn equals(field: impl Into<FieldName>, value: impl Into<Primitive>) -> Self {
        Self {
            field: field.into(),
            equals: Some(value.into()),
            not_equals: None,
            exists: None,
        }
    }

    /// Condition that holds when `field` differs from `value`.
    pub fn not_equals(field: impl Into<FieldName>, value: impl Into<Primitive>) -> Self {
        Self {
            field: field.into(),
            equals: None,
            not_equals: Some(value.into()),
            exists: None,
        }
    }

    /// Condition on whether `field` has been initialized at all.
    pub fn exists(field: impl Into<FieldName>, exists: bool) -> Self {
        Self {
            field: field.into(),
            equals: None,
            not_equals: None,
            exists: Some(exists),
        }
    }

    /// Evaluate the condition against the current values.
    ///
    /// An absent value is a valid input: it never equals anything and
    /// always differs from everything. A stored `null` counts as existing.
    pub fn evaluate(&self, values: &FormValues) -> bool {
        let value = values.get(&self.field);

        if let Some(exists) = self.exists {
            return value.is_some() == exists;
        }

        if let Some(expected) = &self.equals {
            return same_primitive(value, expected);
        }

        if let Some(rejected) = &self.not_equals {
            return !same_primitive(value, rejected);
        }

        true
    }
}

/// Evaluate an optional condition. No condition always holds.
pub fn evaluate_condition(condition: Option<&Condition>, values: &FormValues) -> bool {
    condition.map_or(true, |c| c.evaluate(values))
}

fn same_primitive(value: Option<&FieldValue>, expected: &Primitive) -> bool {
    matches!(value, Some(FieldValue::Single(actual)) if actual == expected)
}

//! Form values.
//!
//! A form's value set maps field names to primitives or ordered lists of
//! primitives. All types serialize untagged so that JSON `null`, `true`,
//! `1.5` and `"text"` map directly onto the value model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::FieldName;

/// A single scalar value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Primitive {
    /// Check for the empty-input sentinel values (`null` and `""`).
    pub fn is_blank(&self) -> bool {
        match self {
            Primitive::Null => true,
            Primitive::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Primitive::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Primitive::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Null => write!(f, "null"),
            Primitive::Bool(b) => write!(f, "{}", b),
            Primitive::Number(n) => write!(f, "{}", format_number(*n)),
            Primitive::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Number(value)
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Number(value as f64)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Number(value as f64)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::Text(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::Text(value)
    }
}

/// The value stored for one field: a primitive, or a repeater's row list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(Primitive),
    List(Vec<Primitive>),
}

impl FieldValue {
    pub const NULL: FieldValue = FieldValue::Single(Primitive::Null);

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            FieldValue::Single(p) => Some(p),
            FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Primitive]> {
        match self {
            FieldValue::List(rows) => Some(rows),
            FieldValue::Single(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_primitive().and_then(Primitive::as_str)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_primitive().and_then(Primitive::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_primitive().and_then(Primitive::as_bool)
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::NULL
    }
}

macro_rules! single_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Single(value.into())
                }
            }
        )*
    };
}

single_from!(Primitive, bool, f64, i64, i32, &str, String);

impl From<Vec<Primitive>> for FieldValue {
    fn from(rows: Vec<Primitive>) -> Self {
        FieldValue::List(rows)
    }
}

/// All current values of a form, keyed by field name.
///
/// BTreeMap keeps serialized drafts byte-for-byte deterministic.
pub type FormValues = BTreeMap<FieldName, FieldValue>;

/// A selectable option for select fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_deserialize_untagged() {
        let v: FieldValue = serde_json::from_value(json!("alice")).unwrap();
        assert_eq!(v, FieldValue::from("alice"));

        let v: FieldValue = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(v.as_f64(), Some(42.0));

        let v: FieldValue = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(v.as_bool(), Some(true));

        let v: FieldValue = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(v, FieldValue::NULL);

        let v: FieldValue = serde_json::from_value(json!(["a", 1, null])).unwrap();
        assert_eq!(
            v,
            FieldValue::List(vec![
                Primitive::from("a"),
                Primitive::from(1),
                Primitive::Null
            ])
        );
    }

    #[test]
    fn blank_values() {
        assert!(Primitive::Null.is_blank());
        assert!(Primitive::from("").is_blank());
        assert!(!Primitive::from(" ").is_blank());
        assert!(!Primitive::from(0).is_blank());
        assert!(!Primitive::from(false).is_blank());
    }

    #[test]
    fn number_display() {
        assert_eq!(Primitive::from(18).to_string(), "18");
        assert_eq!(Primitive::from(2.5).to_string(), "2.5");
        assert_eq!(Primitive::from(-3).to_string(), "-3");
    }

    #[test]
    fn strict_cross_type_inequality() {
        assert_ne!(Primitive::from(1), Primitive::from("1"));
        assert_ne!(Primitive::from(false), Primitive::Null);
        assert_ne!(Primitive::from(""), Primitive::Null);
    }
}

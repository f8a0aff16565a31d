//! Form state - the synchronous session container.
//!
//! `FormState` owns the value set, touched set and error set of one form.
//! All mutation goes through its methods. It performs no IO: persistence is
//! exposed as a [`DraftPayload`] the caller writes wherever it likes.

use crate::{
    error::Result,
    graph::DependencyGraph,
    resolve::{resolve_field, ResolvedFieldState},
    validate::{validate_form, validate_row_bounds, FormErrors},
    DraftPayload, FieldName, FieldValue, FormSchema, FormValues, SchemaNode, Timestamp,
};
use std::collections::{BTreeMap, BTreeSet};

/// The mutable state of one form session.
#[derive(Debug, Clone)]
pub struct FormState {
    /// Schema, checked at construction
    schema: FormSchema,
    /// Condition edges between fields
    graph: DependencyGraph,
    /// Current values
    values: FormValues,
    /// Fields the user has blurred at least once
    touched: BTreeSet<FieldName>,
    /// Result of the last validation pass
    errors: FormErrors,
    /// Whether repeater row bounds produce errors
    enforce_row_bounds: bool,
}

impl FormState {
    /// Create a session for `schema`, starting from `restored` values when a
    /// usable draft exists and from schema defaults otherwise.
    pub fn new(schema: FormSchema, restored: Option<FormValues>) -> Result<Self> {
        let graph = schema.check()?;
        let values = restored.unwrap_or_else(|| Self::initial_values(&schema));

        Ok(Self {
            schema,
            graph,
            values,
            touched: BTreeSet::new(),
            errors: FormErrors::new(),
            enforce_row_bounds: true,
        })
    }

    /// Default values: each field's `defaultValue` or `null`, and an empty
    /// row list for each repeater. Repeater children get no entry.
    pub fn initial_values(schema: &FormSchema) -> FormValues {
        fn walk(nodes: &[SchemaNode], values: &mut FormValues) {
            for node in nodes {
                match node {
                    SchemaNode::Group(group) => walk(&group.fields, values),
                    SchemaNode::Repeater(repeater) => {
                        values.insert(repeater.name.clone(), FieldValue::List(Vec::new()));
                    }
                    SchemaNode::Field(field) => {
                        values.insert(field.name.clone(), FieldValue::Single(field.initial_value()));
                    }
                }
            }
        }

        let mut values = FormValues::new();
        walk(&schema.fields, &mut values);
        values
    }

    /// Treat repeater `minItems`/`maxItems` as hints only.
    pub fn set_enforce_row_bounds(&mut self, enforce: bool) {
        self.enforce_row_bounds = enforce;
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn touched(&self) -> &BTreeSet<FieldName> {
        &self.touched
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    /// A form is dirty once any field has been touched.
    pub fn is_dirty(&self) -> bool {
        !self.touched.is_empty()
    }

    /// Replace exactly one entry in the value set. Returns the previous value.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(name.to_string(), value)
    }

    /// Mark a field as touched. Returns `true` if it was not touched before.
    pub fn set_touched(&mut self, name: &str) -> bool {
        self.touched.insert(name.to_string())
    }

    /// Run a full validation pass, replacing the error set wholesale.
    /// Returns whether the form is valid.
    pub fn validate(&mut self) -> bool {
        let mut errors = validate_form(&self.schema, &self.values);
        if self.enforce_row_bounds {
            errors.extend(validate_row_bounds(&self.schema, &self.values));
        }
        self.errors = errors;
        self.errors.is_empty()
    }

    /// Restore schema defaults and clear touched and error sets.
    ///
    /// Drafts are untouched here; callers owning storage clear them.
    pub fn reset(&mut self) {
        self.values = Self::initial_values(&self.schema);
        self.touched.clear();
        self.errors.clear();
    }

    /// Resolved state of a leaf field, or `None` if no such field exists.
    pub fn resolved(&self, name: &str) -> Option<ResolvedFieldState> {
        self.schema
            .find_field(name)
            .map(|field| resolve_field(field, &self.values))
    }

    /// Resolved state of every leaf field.
    pub fn field_states(&self) -> BTreeMap<FieldName, ResolvedFieldState> {
        self.schema
            .leaf_fields()
            .into_iter()
            .map(|field| (field.name.clone(), resolve_field(field, &self.values)))
            .collect()
    }

    /// Fields whose resolved state may change when `name` changes.
    pub fn affected_by(&self, name: &str) -> Vec<FieldName> {
        self.graph.dependents_of(name)
    }

    /// Draft to persist, present only once the form is dirty.
    pub fn draft_payload(&self, now: Timestamp) -> Option<DraftPayload> {
        if !self.is_dirty() {
            return None;
        }
        Some(DraftPayload::new(self.schema.version, now, self.values.clone()))
    }
}

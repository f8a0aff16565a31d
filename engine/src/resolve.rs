//! Field state resolution.
//!
//! Resolved state is never cached: it is a cheap, pure function of the field
//! and the current values, recomputed on every read.

use crate::{condition::evaluate_condition, FieldNode, FormValues, SchemaNode};
use serde::{Deserialize, Serialize};

/// Live `{visible, enabled, required}` triple for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFieldState {
    pub visible: bool,
    pub enabled: bool,
    pub required: bool,
}

impl ResolvedFieldState {
    /// Whether the user can currently see and edit the field.
    pub fn is_interactive(&self) -> bool {
        self.visible && self.enabled
    }
}

/// Resolve a field's state from the current values.
///
/// A hidden or disabled field is never required.
pub fn resolve_field(field: &FieldNode, values: &FormValues) -> ResolvedFieldState {
    let visible = evaluate_condition(field.visible_when.as_ref(), values);
    let enabled = evaluate_condition(field.enabled_when.as_ref(), values);

    let required = visible
        && enabled
        && (field.validation.required
            || evaluate_condition(field.required_when.as_ref(), values));

    ResolvedFieldState {
        visible,
        enabled,
        required,
    }
}

/// Containers carry no conditions and are always visible.
pub fn is_node_visible(node: &SchemaNode, values: &FormValues) -> bool {
    match node {
        SchemaNode::Field(field) => resolve_field(field, values).visible,
        SchemaNode::Group(_) | SchemaNode::Repeater(_) => true,
    }
}

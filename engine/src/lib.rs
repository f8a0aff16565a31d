//! # Formwork Engine
//!
//! A deterministic form state and rule-resolution engine.
//!
//! Forms are described by a declarative schema: a tree of fields, groups and
//! repeaters carrying validation rules and cross-field conditions. The engine
//! derives behavior from that description - which fields are visible, enabled
//! and required, which values are valid, and what to persist as a draft.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, clocks or platform
//! - **Deterministic**: Same schema and values always resolve the same way
//! - **Testable**: Pure logic, no mocks needed
//! - **Portable**: Runs anywhere Rust runs (native, WASM, embedded)
//!
//! Asynchronous concerns (remote options, remote validation, timers) live in
//! `formwork-runtime`. This crate only defines the [`OptionsLoader`] and
//! [`AsyncValidator`] seams they plug into.
//!
//! ## Core Concepts
//!
//! ### Schema
//!
//! A [`FormSchema`] holds a version and a tree of [`SchemaNode`]s. Field names
//! are unique across the tree and conditions may not form cycles; both are
//! checked when a [`FormState`] is created.
//!
//! ### Conditions and resolution
//!
//! A [`Condition`] tests one other field's value. [`resolve_field`] turns a
//! field's `visibleWhen` / `enabledWhen` / `requiredWhen` conditions into a
//! [`ResolvedFieldState`]. Hidden or disabled fields are never required.
//!
//! ### Validation
//!
//! [`validate_form`] walks the schema and reports at most one message per
//! field, skipping fields the user cannot see or edit.
//!
//! ### Drafts
//!
//! [`DraftPayload`]s are keyed by schema version through a [`DraftStorage`].
//! A missing, corrupt or mismatched draft simply loads as `None`.
//!
//! ## Quick Start
//!
//! ```rust
//! use formwork_engine::{Condition, FieldNode, FormSchema, FormState};
//!
//! // 1. Define a schema
//! let schema = FormSchema::new(1)
//!     .with_node(FieldNode::text("username", "Username").required().with_min_length(3))
//!     .with_node(FieldNode::checkbox("hasCompany", "I own a company").with_default(false))
//!     .with_node(
//!         FieldNode::text("companyName", "Company Name")
//!             .required()
//!             .visible_when(Condition::equals("hasCompany", true)),
//!     );
//!
//! // 2. Create the form state
//! let mut form = FormState::new(schema, None).unwrap();
//!
//! // 3. Apply user input
//! form.set_value("username", "ab".into());
//! assert!(!form.validate());
//! assert_eq!(form.error("username"), Some("Must be at least 3 characters"));
//!
//! // 4. Hidden fields never block submission
//! form.set_value("username", "alice".into());
//! assert!(form.validate());
//! assert!(!form.resolved("companyName").unwrap().visible);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for use from other
//! languages. All data is exchanged as JSON strings.

pub mod condition;
pub mod draft;
pub mod error;
pub mod ffi;
pub mod graph;
pub mod remote;
pub mod resolve;
pub mod schema;
pub mod state;
pub mod validate;
pub mod value;

// Re-export main types at crate root
pub use condition::{evaluate_condition, Condition};
pub use draft::{
    autosave_key, clear_draft, load_draft, save_draft, DraftPayload, DraftStorage, MemoryStorage,
};
pub use error::Error;
pub use graph::DependencyGraph;
pub use remote::{AsyncValidator, OptionsLoader, RemoteError};
pub use resolve::{is_node_visible, resolve_field, ResolvedFieldState};
pub use schema::{
    AsyncOptions, AsyncValidation, FieldNode, FieldType, FormSchema, GroupNode, Pattern,
    RepeaterNode, SchemaNode, ValidationRules, DEFAULT_DEBOUNCE_MS,
};
pub use state::FormState;
pub use validate::{
    validate_field, validate_form, validate_row_bounds, validate_value, FormErrors,
    REQUIRED_MESSAGE,
};
pub use value::{FieldValue, FormValues, Primitive, SelectOption};

/// Type aliases for clarity
pub type FieldName = String;
pub type SchemaVersion = u32;
/// Milliseconds since the Unix epoch
pub type Timestamp = u64;

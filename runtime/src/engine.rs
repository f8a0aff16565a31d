//! Form engine - one interactive form session.
//!
//! Wraps a [`FormState`] with the asynchronous side: a remote options
//! coordinator for every field with `asyncOptions`, a debounced validation
//! coordinator for every field with `asyncValidation`, and draft persistence.
//!
//! Coordinators follow the field's resolved state the way a rendered field
//! would. Hidden fields are unmounted, so their option loads are cancelled,
//! and validation only runs while a field is visible and enabled.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use formwork_engine::{
    clear_draft, load_draft, resolve_field, save_draft, DraftStorage, FieldName, FieldValue,
    FormErrors, FormSchema, FormState, FormValues, ResolvedFieldState, Timestamp,
};
use tokio::sync::watch;

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::options::{OptionsCache, OptionsCoordinator, OptionsState};
use crate::storage::FileStorage;
use crate::validation::{AsyncValidationCoordinator, AsyncValidationState};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis().max(0) as Timestamp
}

/// One form session with remote options, remote validation and autosave.
///
/// Must be created and driven from within a tokio runtime.
///
/// Draft storage is called synchronously on the calling task: once the form
/// is dirty, every `set_value` and `set_touched` blocks on one
/// `DraftStorage::set_item`, and `reset` on one `remove_item`. With
/// [`FileStorage`] that is a small file write plus a rename. When a call
/// returns, the stored draft matches the current values. Hosts with slow
/// storage should drive the engine from `spawn_blocking` or a dedicated
/// thread.
pub struct FormEngine {
    state: FormState,
    storage: Arc<dyn DraftStorage>,
    options: BTreeMap<FieldName, OptionsCoordinator>,
    /// Option coordinators whose field is currently visible
    mounted: BTreeSet<FieldName>,
    validators: BTreeMap<FieldName, AsyncValidationCoordinator>,
    /// Last `(value, enabled)` each validator saw
    validation_inputs: BTreeMap<FieldName, (FieldValue, bool)>,
}

impl FormEngine {
    /// Start a session, restoring a compatible draft from `storage` if one
    /// exists.
    pub fn new(
        schema: FormSchema,
        storage: Arc<dyn DraftStorage>,
        cache: Arc<OptionsCache>,
        config: &RuntimeConfig,
    ) -> Result<Self> {
        let restored = load_draft(storage.as_ref(), &schema);
        if restored.is_some() {
            tracing::info!(version = schema.version, "Restored form draft");
        }
        let state = FormState::new(schema, restored)?;

        let mut options = BTreeMap::new();
        let mut validators = BTreeMap::new();
        for field in state.schema().leaf_fields() {
            if field.async_options.is_some() {
                options.insert(
                    field.name.clone(),
                    OptionsCoordinator::new(
                        field.name.clone(),
                        field.options.clone(),
                        Arc::clone(&cache),
                    ),
                );
            }
            if let Some(async_validation) = &field.async_validation {
                validators.insert(
                    field.name.clone(),
                    AsyncValidationCoordinator::with_default_debounce(
                        field.name.clone(),
                        Some(async_validation),
                        config.debounce_ms,
                    ),
                );
            }
        }

        tracing::debug!(
            version = state.schema().version,
            option_sources = options.len(),
            async_validators = validators.len(),
            "Form engine created"
        );

        let mut engine = Self {
            state,
            storage,
            options,
            mounted: BTreeSet::new(),
            validators,
            validation_inputs: BTreeMap::new(),
        };
        engine.sync_all();
        Ok(engine)
    }

    /// Start a session with file-backed drafts and a fresh options cache,
    /// both configured from `config`.
    pub fn from_config(schema: FormSchema, config: &RuntimeConfig) -> Result<Self> {
        let storage = Arc::new(FileStorage::create(&config.draft_dir)?);
        let cache = OptionsCache::new_shared(config.cache_config());
        Self::new(schema, storage, cache, config)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Replace one value, then refresh the async state of that field and of
    /// every field whose conditions depend on it.
    pub fn set_value(&mut self, name: &str, value: FieldValue) {
        if self.state.schema().find_field(name).is_none() {
            tracing::debug!(field = %name, "Value set for a field outside the schema");
        }
        self.state.set_value(name, value);

        let mut affected = vec![name.to_string()];
        affected.extend(self.state.affected_by(name));
        for field in &affected {
            self.sync_field(field);
        }

        if self.state.is_dirty() {
            self.persist();
        }
    }

    /// Mark a field as touched. The first touch makes the form dirty and
    /// writes a draft.
    pub fn set_touched(&mut self, name: &str) {
        let was_dirty = self.state.is_dirty();
        self.state.set_touched(name);
        if !was_dirty && self.state.is_dirty() {
            self.persist();
        }
    }

    /// Run synchronous validation over the whole form.
    pub fn validate(&mut self) -> bool {
        let valid = self.state.validate();
        tracing::debug!(valid, errors = self.state.errors().len(), "Form validated");
        valid
    }

    /// Restore defaults, forget async errors and remove the stored draft.
    pub fn reset(&mut self) {
        self.state.reset();
        for validator in self.validators.values() {
            validator.clear();
        }
        self.validation_inputs.clear();

        if let Err(e) = clear_draft(self.storage.as_ref(), self.state.schema()) {
            tracing::warn!(error = %e, "Failed to clear form draft");
        }

        self.sync_all();
        tracing::info!("Form reset");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn form(&self) -> &FormState {
        &self.state
    }

    pub fn schema(&self) -> &FormSchema {
        self.state.schema()
    }

    pub fn values(&self) -> &FormValues {
        self.state.values()
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.state.value(name)
    }

    pub fn errors(&self) -> &FormErrors {
        self.state.errors()
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.state.error(name)
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.state.is_touched(name)
    }

    pub fn field_state(&self, name: &str) -> Option<ResolvedFieldState> {
        self.state.resolved(name)
    }

    /// Latest remote validation message for a field.
    pub fn async_error(&self, name: &str) -> Option<String> {
        self.validators.get(name).and_then(|v| v.error())
    }

    /// Every field currently carrying a remote validation message.
    pub fn async_errors(&self) -> BTreeMap<FieldName, String> {
        self.validators
            .iter()
            .filter_map(|(name, v)| v.error().map(|error| (name.clone(), error)))
            .collect()
    }

    pub fn is_validating(&self, name: &str) -> bool {
        self.validators
            .get(name)
            .map(|v| v.state().validating)
            .unwrap_or(false)
    }

    /// Options for a select field: the remote state when the field has an
    /// option source, its static list otherwise.
    pub fn options(&self, name: &str) -> Option<OptionsState> {
        if let Some(coordinator) = self.options.get(name) {
            return Some(coordinator.state());
        }
        self.state.schema().find_field(name).map(|field| OptionsState {
            options: field.options.clone(),
            ..OptionsState::default()
        })
    }

    pub fn subscribe_options(&self, name: &str) -> Option<watch::Receiver<OptionsState>> {
        self.options.get(name).map(OptionsCoordinator::subscribe)
    }

    pub fn subscribe_async_error(
        &self,
        name: &str,
    ) -> Option<watch::Receiver<AsyncValidationState>> {
        self.validators
            .get(name)
            .map(AsyncValidationCoordinator::subscribe)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn sync_all(&mut self) {
        let names: BTreeSet<FieldName> = self
            .options
            .keys()
            .chain(self.validators.keys())
            .cloned()
            .collect();
        for name in names {
            self.sync_field(&name);
        }
    }

    /// Bring a field's coordinators in line with its resolved state.
    fn sync_field(&mut self, name: &str) {
        let Some(field) = self.state.schema().find_field(name) else {
            return;
        };
        let resolved = resolve_field(field, self.state.values());

        if let Some(coordinator) = self.options.get(name) {
            if resolved.visible && !self.mounted.contains(name) {
                coordinator.set_source(field.async_options.as_ref());
                self.mounted.insert(name.to_string());
            } else if !resolved.visible && self.mounted.remove(name) {
                coordinator.teardown();
            }
        }

        if let Some(validator) = self.validators.get(name) {
            let value = self.state.value(name).cloned().unwrap_or_default();
            let input = (value, resolved.is_interactive());
            if self.validation_inputs.get(name) != Some(&input) {
                validator.update(input.0.clone(), input.1);
                self.validation_inputs.insert(name.to_string(), input);
            }
        }
    }

    /// Blocking write of the current draft.
    fn persist(&self) {
        let schema = self.state.schema();
        match save_draft(self.storage.as_ref(), schema, self.state.values(), now_millis()) {
            Ok(()) => tracing::debug!(version = schema.version, "Form draft saved"),
            Err(e) => tracing::warn!(error = %e, "Failed to save form draft"),
        }
    }
}

impl std::fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormEngine")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("validators", &self.validators)
            .finish()
    }
}

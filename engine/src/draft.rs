//! Draft persistence.
//!
//! A draft is a snapshot of form values keyed by schema version. The storage
//! key depends on the version only, so two schemas sharing a version share a
//! slot: authors must bump the version on incompatible schema changes.
//!
//! Loading never fails loudly. A missing entry, an unreadable payload or a
//! version mismatch all mean "no usable draft".

use crate::{error::Result, Error, FormSchema, FormValues, SchemaVersion, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Persisted form values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPayload {
    /// Schema version the values were saved under
    pub version: SchemaVersion,
    /// Milliseconds since the Unix epoch
    pub saved_at: Timestamp,
    pub values: FormValues,
}

impl DraftPayload {
    pub fn new(version: SchemaVersion, saved_at: Timestamp, values: FormValues) -> Self {
        Self {
            version,
            saved_at,
            values,
        }
    }

    /// Serialize to JSON. Key order is deterministic.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidDraft(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidDraft(e.to_string()))
    }

    /// Check the payload was saved under the schema's current version.
    pub fn check_version(&self, schema: &FormSchema) -> Result<()> {
        if self.version != schema.version {
            return Err(Error::SchemaVersionMismatch {
                expected: schema.version,
                actual: self.version,
            });
        }
        Ok(())
    }
}

/// Storage slot for a schema version.
pub fn autosave_key(version: SchemaVersion) -> String {
    format!("form-autosave-v{}", version)
}

/// String key-value storage, equivalent to a browser's `localStorage`.
pub trait DraftStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-process storage. Contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DraftStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| Error::Storage("memory storage poisoned".into()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| Error::Storage("memory storage poisoned".into()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| Error::Storage("memory storage poisoned".into()))?;
        items.remove(key);
        Ok(())
    }
}

/// Persist `values` as the draft for the schema's version.
pub fn save_draft(
    storage: &dyn DraftStorage,
    schema: &FormSchema,
    values: &FormValues,
    now: Timestamp,
) -> Result<()> {
    let payload = DraftPayload::new(schema.version, now, values.clone());
    storage.set_item(&autosave_key(schema.version), &payload.to_json()?)
}

/// Load the draft for the schema's version, if there is a usable one.
pub fn load_draft(storage: &dyn DraftStorage, schema: &FormSchema) -> Option<FormValues> {
    let raw = storage.get_item(&autosave_key(schema.version)).ok()??;
    let payload = DraftPayload::from_json(&raw).ok()?;
    payload.check_version(schema).ok()?;
    Some(payload.values)
}

/// Remove the draft for the schema's version.
pub fn clear_draft(storage: &dyn DraftStorage, schema: &FormSchema) -> Result<()> {
    storage.remove_item(&autosave_key(schema.version))
}

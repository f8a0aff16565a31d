//! Configuration management for the runtime.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use formwork_engine::DEFAULT_DEBOUNCE_MS;

use crate::options::OptionsCacheConfig;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Directory holding one JSON file per draft
    pub draft_dir: PathBuf,
    /// Maximum number of cached option lists (0 disables the bound)
    pub options_cache_capacity: usize,
    /// Age after which a cached option list is reloaded
    pub options_cache_ttl: Option<Duration>,
    /// Debounce for async validators that do not declare one
    pub debounce_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            draft_dir: PathBuf::from(".formwork/drafts"),
            options_cache_capacity: 256,
            options_cache_ttl: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let draft_dir = lookup("FORMWORK_DRAFT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.draft_dir);

        let options_cache_capacity = parse_var(&lookup, "FORMWORK_OPTIONS_CACHE_CAPACITY")?
            .unwrap_or(defaults.options_cache_capacity);

        let options_cache_ttl =
            parse_var(&lookup, "FORMWORK_OPTIONS_CACHE_TTL_SECS")?.map(Duration::from_secs);

        let debounce_ms =
            parse_var(&lookup, "FORMWORK_DEBOUNCE_MS")?.unwrap_or(defaults.debounce_ms);

        Ok(Self {
            draft_dir,
            options_cache_capacity,
            options_cache_ttl,
            debounce_ms,
        })
    }

    pub fn cache_config(&self) -> OptionsCacheConfig {
        OptionsCacheConfig {
            capacity: self.options_cache_capacity,
            ttl: self.options_cache_ttl,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {name} value: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

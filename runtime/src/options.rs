//! Remote select options.
//!
//! [`OptionsCache`] maps a cache key to a resolved option list and is shared
//! by every field using that key. [`OptionsCoordinator`] drives one select
//! field: it serves cache hits immediately, otherwise runs the loader on a
//! spawned task and publishes `{options, loading, error}` on a watch channel.
//!
//! Each load is bound to a cancellation token and a generation number. A
//! result is published only if its generation is still current when the
//! state lock is taken, so a superseded or torn-down load never shows up.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use formwork_engine::{AsyncOptions, FieldName, OptionsLoader, SelectOption};
use serde::Serialize;
use lru::LruCache;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Message published when a loader fails without one of its own.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load options";

/// Bounds for an [`OptionsCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionsCacheConfig {
    /// Maximum number of keys kept (0 disables the bound)
    pub capacity: usize,
    /// Entries older than this are treated as missing
    pub ttl: Option<Duration>,
}

impl Default for OptionsCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: None,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    options: Vec<SelectOption>,
    inserted_at: Instant,
}

/// Shared cache of resolved option lists, keyed by the schema's cache key.
///
/// Least recently used keys are evicted beyond capacity. Thread-safe and can
/// be shared across coordinators via `Arc`.
#[derive(Debug)]
pub struct OptionsCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    config: OptionsCacheConfig,
}

impl OptionsCache {
    /// Create a new cache.
    pub fn new(config: OptionsCacheConfig) -> Self {
        let entries = match NonZeroUsize::new(config.capacity) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        Self {
            entries: Mutex::new(entries),
            config,
        }
    }

    /// Create a new cache wrapped in Arc for sharing.
    pub fn new_shared(config: OptionsCacheConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> OptionsCacheConfig {
        self.config
    }

    /// Cached options for `key`, marking it as recently used. Expired
    /// entries are removed and miss.
    pub fn get(&self, key: &str) -> Option<Vec<SelectOption>> {
        let mut entries = self.lock_entries();
        let entry = entries.get(key)?;
        if self.is_fresh(entry) {
            return Some(entry.options.clone());
        }

        entries.pop(key);
        tracing::debug!(key = %key, "Options cache entry expired");
        None
    }

    /// Insert or replace the options for `key`, evicting the least recently
    /// used entry beyond capacity.
    pub fn insert(&self, key: impl Into<String>, options: Vec<SelectOption>) {
        let entry = CacheEntry {
            options,
            inserted_at: Instant::now(),
        };

        let key = key.into();
        // `push` also hands back the replaced value when `key` was present
        match self.lock_entries().push(key.clone(), entry) {
            Some((victim, _)) if victim != key => {
                tracing::debug!(key = %victim, "Options cache entry evicted");
            }
            _ => {}
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &str) {
        self.lock_entries().pop(key);
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.config.ttl {
            Some(ttl) => entry.inserted_at.elapsed() < ttl,
            None => true,
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for OptionsCache {
    fn default() -> Self {
        Self::new(OptionsCacheConfig::default())
    }
}

/// Observable state of one select field's options.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionsState {
    pub options: Vec<SelectOption>,
    pub loading: bool,
    pub error: Option<String>,
}

/// The live load, if any.
#[derive(Debug, Default)]
struct LoadSlot {
    generation: u64,
    key: Option<String>,
    token: Option<CancellationToken>,
}

impl LoadSlot {
    /// Supersede whatever was running. Returns the new generation.
    fn advance(&mut self) -> u64 {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.generation += 1;
        self.generation
    }
}

/// Drives the options of one select field instance.
///
/// Loads run on the ambient tokio runtime; `mount` and `set_source` must be
/// called from within one.
#[derive(Debug)]
pub struct OptionsCoordinator {
    id: Uuid,
    field: FieldName,
    static_options: Vec<SelectOption>,
    cache: Arc<OptionsCache>,
    slot: Arc<Mutex<LoadSlot>>,
    tx: Arc<watch::Sender<OptionsState>>,
}

impl OptionsCoordinator {
    /// Create a coordinator serving `static_options` until a source is mounted.
    pub fn new(
        field: impl Into<FieldName>,
        static_options: Vec<SelectOption>,
        cache: Arc<OptionsCache>,
    ) -> Self {
        let (tx, _) = watch::channel(OptionsState {
            options: static_options.clone(),
            ..OptionsState::default()
        });

        Self {
            id: Uuid::new_v4(),
            field: field.into(),
            static_options,
            cache,
            slot: Arc::new(Mutex::new(LoadSlot::default())),
            tx: Arc::new(tx),
        }
    }

    /// Apply a field's declared source. Without a usable loader the field
    /// falls back to its static options.
    pub fn set_source(&self, source: Option<&AsyncOptions>) {
        match source.and_then(|s| s.loader.clone().map(|loader| (s.key.as_str(), loader))) {
            Some((key, loader)) if !key.is_empty() => self.mount(key, loader),
            _ => self.use_static(),
        }
    }

    /// Load options for `key`, cancelling any load still running for this
    /// field. A cache hit is published without calling `loader`.
    pub fn mount(&self, key: &str, loader: Arc<dyn OptionsLoader>) {
        let mut slot = self.lock_slot();
        let generation = slot.advance();
        slot.key = Some(key.to_string());

        if let Some(options) = self.cache.get(key) {
            tracing::debug!(coordinator = %self.id, field = %self.field, key = %key, "Options served from cache");
            self.tx.send_replace(OptionsState {
                options,
                loading: false,
                error: None,
            });
            return;
        }

        let token = CancellationToken::new();
        slot.token = Some(token.clone());
        self.tx.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        tracing::debug!(coordinator = %self.id, field = %self.field, key = %key, generation, "Loading options");

        let load = loader.load();
        let key = key.to_string();
        let id = self.id;
        let cache = Arc::clone(&self.cache);
        let slot_handle = Arc::clone(&self.slot);
        let tx = Arc::clone(&self.tx);

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(coordinator = %id, key = %key, generation, "Options load cancelled");
                    return;
                }
                result = load => result,
            };

            let slot = slot_handle.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.generation != generation || token.is_cancelled() {
                tracing::debug!(coordinator = %id, key = %key, generation, "Discarding stale options");
                return;
            }

            match result {
                Ok(options) => {
                    cache.insert(key.clone(), options.clone());
                    tracing::debug!(coordinator = %id, key = %key, count = options.len(), "Options loaded");
                    tx.send_replace(OptionsState {
                        options,
                        loading: false,
                        error: None,
                    });
                }
                Err(e) => {
                    let message = e.message().unwrap_or(LOAD_FAILED_MESSAGE).to_string();
                    tracing::warn!(coordinator = %id, key = %key, error = %e, "Options load failed");
                    tx.send_modify(|state| {
                        state.loading = false;
                        state.error = Some(message);
                    });
                }
            }
            drop(slot);
        });
    }

    /// Cancel any load and serve the static options.
    pub fn use_static(&self) {
        let mut slot = self.lock_slot();
        slot.advance();
        slot.key = None;
        self.tx.send_replace(OptionsState {
            options: self.static_options.clone(),
            ..OptionsState::default()
        });
    }

    /// Cancel any load and stop reporting it as loading. Nothing else is
    /// published until the next mount.
    pub fn teardown(&self) {
        let mut slot = self.lock_slot();
        if slot.token.is_some() {
            tracing::debug!(coordinator = %self.id, field = %self.field, "Options coordinator torn down");
        }
        slot.advance();
        slot.key = None;
        self.tx.send_modify(|state| state.loading = false);
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Key of the current source, if one is mounted.
    pub fn key(&self) -> Option<String> {
        self.lock_slot().key.clone()
    }

    /// Current state snapshot.
    pub fn state(&self) -> OptionsState {
        self.tx.borrow().clone()
    }

    /// Receive every published state.
    pub fn subscribe(&self) -> watch::Receiver<OptionsState> {
        self.tx.subscribe()
    }

    fn lock_slot(&self) -> MutexGuard<'_, LoadSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for OptionsCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn india() -> Vec<SelectOption> {
        vec![SelectOption::new("India", "in")]
    }

    #[test]
    fn cache_get_and_insert() {
        let cache = OptionsCache::new(OptionsCacheConfig::default());
        assert!(cache.get("countries").is_none());

        cache.insert("countries", india());
        assert_eq!(cache.get("countries"), Some(india()));
        assert!(cache.contains("countries"));

        // Upsert is idempotent
        cache.insert("countries", india());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_evicts_least_recently_used_beyond_capacity() {
        let cache = OptionsCache::new(OptionsCacheConfig {
            capacity: 2,
            ttl: None,
        });

        cache.insert("a", india());
        cache.insert("b", india());
        cache.insert("c", india());

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn cache_keeps_recently_read_keys() {
        let cache = OptionsCache::new(OptionsCacheConfig {
            capacity: 2,
            ttl: None,
        });

        cache.insert("countries", india());
        cache.insert("cities", india());
        for _ in 0..100 {
            assert!(cache.get("countries").is_some());
        }
        cache.insert("languages", india());

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("countries"));
        assert!(!cache.contains("cities"));
        assert!(cache.contains("languages"));
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let cache = OptionsCache::new(OptionsCacheConfig {
            capacity: 0,
            ttl: None,
        });
        for i in 0..100 {
            cache.insert(format!("key_{}", i), india());
        }
        assert_eq!(cache.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_entries_expire() {
        let cache = OptionsCache::new(OptionsCacheConfig {
            capacity: 0,
            ttl: Some(Duration::from_secs(60)),
        });
        cache.insert("countries", india());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.contains("countries"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("countries").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn static_options_without_source() {
        let cache = OptionsCache::new_shared(OptionsCacheConfig::default());
        let coordinator = OptionsCoordinator::new("country", india(), cache);

        coordinator.set_source(None);
        assert_eq!(
            coordinator.state(),
            OptionsState {
                options: india(),
                loading: false,
                error: None,
            }
        );
        assert!(coordinator.key().is_none());
    }

    #[tokio::test]
    async fn declared_source_without_loader_is_static() {
        let cache = OptionsCache::new_shared(OptionsCacheConfig::default());
        let coordinator = OptionsCoordinator::new("country", india(), cache);
        let source = AsyncOptions {
            key: "countries".into(),
            loader: None,
        };

        coordinator.set_source(Some(&source));
        assert_eq!(coordinator.state().options, india());
        assert!(!coordinator.state().loading);
    }
}

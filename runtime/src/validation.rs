//! Debounced remote validation for one field.
//!
//! Every `(value, enabled)` update supersedes the previous one: the pending
//! timer and any in-flight request are cancelled before a new timer is armed.
//! Only when the timer fires undisturbed does the validator run, and its
//! result is published only if no newer update arrived meanwhile.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use formwork_engine::{
    AsyncValidation, AsyncValidator, FieldName, FieldValue, DEFAULT_DEBOUNCE_MS,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Message published when the validator itself fails.
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";

/// Observable state of one field's remote validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AsyncValidationState {
    pub error: Option<String>,
    pub validating: bool,
}

#[derive(Debug, Default)]
struct RunSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl RunSlot {
    fn advance(&mut self) -> u64 {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.generation += 1;
        self.generation
    }
}

/// Drives the remote validation of one field instance.
///
/// `update` spawns onto the ambient tokio runtime and must be called from
/// within one.
pub struct AsyncValidationCoordinator {
    id: Uuid,
    field: FieldName,
    validator: Option<Arc<dyn AsyncValidator>>,
    debounce: Duration,
    slot: Arc<Mutex<RunSlot>>,
    tx: Arc<watch::Sender<AsyncValidationState>>,
}

impl AsyncValidationCoordinator {
    /// Create a coordinator for `config`, using the default debounce when the
    /// config does not declare one.
    pub fn new(field: impl Into<FieldName>, config: Option<&AsyncValidation>) -> Self {
        Self::with_default_debounce(field, config, DEFAULT_DEBOUNCE_MS)
    }

    pub fn with_default_debounce(
        field: impl Into<FieldName>,
        config: Option<&AsyncValidation>,
        default_debounce_ms: u64,
    ) -> Self {
        let (tx, _) = watch::channel(AsyncValidationState::default());

        Self {
            id: Uuid::new_v4(),
            field: field.into(),
            validator: config.and_then(|c| c.validator.clone()),
            debounce: config
                .map(|c| c.debounce(default_debounce_ms))
                .unwrap_or(Duration::from_millis(default_debounce_ms)),
            slot: Arc::new(Mutex::new(RunSlot::default())),
            tx: Arc::new(tx),
        }
    }

    /// Whether a validator is configured.
    pub fn is_active(&self) -> bool {
        self.validator.is_some()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// React to a new value or enablement.
    ///
    /// Without a validator, or while the field is disabled, the error is
    /// cleared at once and nothing runs. Otherwise the previous error stays
    /// visible until the new run resolves.
    pub fn update(&self, value: FieldValue, enabled: bool) {
        let mut slot = self.lock_slot();
        let generation = slot.advance();

        let validator = match (&self.validator, enabled) {
            (Some(validator), true) => Arc::clone(validator),
            _ => {
                self.tx.send_replace(AsyncValidationState::default());
                return;
            }
        };

        let token = CancellationToken::new();
        slot.token = Some(token.clone());
        self.tx.send_modify(|state| state.validating = false);
        drop(slot);

        let id = self.id;
        let debounce = self.debounce;
        let slot_handle = Arc::clone(&self.slot);
        let tx = Arc::clone(&self.tx);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            let request = {
                let slot = slot_handle.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.generation != generation || token.is_cancelled() {
                    return;
                }
                tx.send_modify(|state| state.validating = true);
                validator.validate(value)
            };
            tracing::debug!(coordinator = %id, generation, "Running async validator");

            let result = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(coordinator = %id, generation, "Async validation cancelled");
                    return;
                }
                result = request => result,
            };

            let slot = slot_handle.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.generation != generation || token.is_cancelled() {
                tracing::debug!(coordinator = %id, generation, "Discarding stale validation result");
                return;
            }

            let error = match result {
                Ok(error) => error,
                Err(e) => {
                    tracing::warn!(coordinator = %id, error = %e, "Async validator failed");
                    Some(VALIDATION_FAILED_MESSAGE.to_string())
                }
            };
            tx.send_replace(AsyncValidationState {
                error,
                validating: false,
            });
            drop(slot);
        });
    }

    /// Cancel the pending timer and any in-flight request.
    pub fn teardown(&self) {
        let mut slot = self.lock_slot();
        if slot.token.is_some() {
            tracing::debug!(coordinator = %self.id, field = %self.field, "Async validation torn down");
        }
        slot.advance();
        self.tx.send_modify(|state| state.validating = false);
    }

    /// Cancel any run and forget the last error.
    pub fn clear(&self) {
        let mut slot = self.lock_slot();
        slot.advance();
        self.tx.send_replace(AsyncValidationState::default());
    }

    /// Current state snapshot.
    pub fn state(&self) -> AsyncValidationState {
        self.tx.borrow().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.tx.borrow().error.clone()
    }

    /// Receive every published state.
    pub fn subscribe(&self) -> watch::Receiver<AsyncValidationState> {
        self.tx.subscribe()
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, RunSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AsyncValidationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncValidationCoordinator")
            .field("id", &self.id)
            .field("field", &self.field)
            .field("active", &self.is_active())
            .field("debounce", &self.debounce)
            .finish()
    }
}

impl Drop for AsyncValidationCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

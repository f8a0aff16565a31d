//! # Formwork Runtime
//!
//! The asynchronous half of Formwork. Where `formwork-engine` decides what a
//! form looks like and whether it is valid, this crate talks to the outside
//! world on its behalf:
//!
//! - [`OptionsCoordinator`] loads remote select options through a shared
//!   [`OptionsCache`]
//! - [`AsyncValidationCoordinator`] runs debounced remote validators
//! - [`FileStorage`] keeps drafts on disk
//! - [`FormEngine`] ties them to one [`formwork_engine::FormState`]
//!
//! All background work runs on tokio tasks bound to cancellation tokens. A
//! superseded or torn-down task never publishes its result.

pub mod config;
pub mod engine;
pub mod error;
pub mod options;
pub mod storage;
pub mod validation;

pub use config::{ConfigError, RuntimeConfig};
pub use engine::{now_millis, FormEngine};
pub use error::{Result, RuntimeError};
pub use options::{
    OptionsCache, OptionsCacheConfig, OptionsCoordinator, OptionsState, LOAD_FAILED_MESSAGE,
};
pub use storage::FileStorage;
pub use validation::{AsyncValidationCoordinator, AsyncValidationState, VALIDATION_FAILED_MESSAGE};

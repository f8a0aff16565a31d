//! Remote collaborators supplied by schema authors.
//!
//! The engine imposes no transport on these: any async callable with the
//! right signature qualifies. Closures returning a `Send` future implement
//! the traits directly.

use crate::{FieldValue, SelectOption};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use thiserror::Error;

/// Failure reported by a remote collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{0}")]
    Failed(String),

    #[error("remote call failed")]
    Opaque,
}

impl RemoteError {
    /// The failure's own human-readable message, if it carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            RemoteError::Failed(msg) if !msg.is_empty() => Some(msg),
            _ => None,
        }
    }
}

/// Loads the selectable options for a select field.
pub trait OptionsLoader: Send + Sync {
    fn load(&self) -> BoxFuture<'static, Result<Vec<SelectOption>, RemoteError>>;
}

impl<F, Fut> OptionsLoader for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<SelectOption>, RemoteError>> + Send + 'static,
{
    fn load(&self) -> BoxFuture<'static, Result<Vec<SelectOption>, RemoteError>> {
        (self)().boxed()
    }
}

/// Checks a value remotely. `Ok(Some(msg))` is a validation error,
/// `Ok(None)` means the value passed.
pub trait AsyncValidator: Send + Sync {
    fn validate(&self, value: FieldValue) -> BoxFuture<'static, Result<Option<String>, RemoteError>>;
}

impl<F, Fut> AsyncValidator for F
where
    F: Fn(FieldValue) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>, RemoteError>> + Send + 'static,
{
    fn validate(&self, value: FieldValue) -> BoxFuture<'static, Result<Option<String>, RemoteError>> {
        (self)(value).boxed()
    }
}

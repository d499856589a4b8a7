//! Crate-wide error handling.
//!
//! One error enum covering invalid input, deserialization, cancellation, and
//! storage failures, plus the ambient infrastructure variants (`Io`,
//! `LockPoisoned`) that need to be typed rather than panicking.

use std::sync::{MutexGuard, PoisonError};

/// Main error type for the voxel core.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<PoisonError<MutexGuard<'_, T>>> for EngineError {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        EngineError::LockPoisoned("mutex".to_string())
    }
}

impl From<crate::persistence::types::PersistenceError> for EngineError {
    fn from(err: crate::persistence::types::PersistenceError) -> Self {
        EngineError::Storage(err.to_string())
    }
}

/// Type alias for Results in the voxel core.
pub type EngineResult<T> = Result<T, EngineError>;

/// Convert `Option` to `Result` with an explicit error.
pub trait OptionExt<T> {
    fn ok_or_engine<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> EngineError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_engine<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> EngineError,
    {
        self.ok_or_else(f)
    }
}

/// Extension trait for adding context to errors that convert into `EngineError`.
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> EngineResult<T>;
    fn with_context<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Into<EngineError>,
{
    fn context(self, msg: &str) -> EngineResult<T> {
        self.map_err(|e| {
            let base = e.into();
            EngineError::Storage(format!("{msg}: {base}"))
        })
    }

    fn with_context<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base = e.into();
            EngineError::Storage(format!("{}: {base}", f()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidInput("bad span".to_string());
        assert_eq!(err.to_string(), "invalid input: bad span");
    }

    #[test]
    fn test_option_ext() {
        let opt: Option<i32> = None;
        let result = opt.ok_or_engine(|| EngineError::Cancelled);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_context() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        let with_context = result.context("loading region");
        assert!(with_context.is_err());
        assert!(with_context.unwrap_err().to_string().contains("loading region"));
    }
}

//! Service-level error taxonomy.

use derive_more::{Display, Error};
use tracing::instrument;

use crate::DbError;

/// What went wrong, independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StoreErrorKind {
    /// A referenced entity does not exist.
    #[display("not found")]
    NotFound,
    /// The write collides with existing state.
    #[display("conflict")]
    Conflict,
    /// Input is malformed, missing or refers to unknown entities.
    #[display("validation")]
    Validation,
    /// Storage or hashing failed.
    #[display("internal")]
    Internal,
}

/// Store error with location tracking.
///
/// `message` is safe to show to clients; internal details stay in `source_message`.
#[derive(Debug, Clone, Display, Error)]
#[display("Store {} error: {} at {}:{}", kind, message, file, line)]
pub struct StoreError {
    /// Error category.
    pub kind: StoreErrorKind,
    /// Client-facing message.
    pub message: String,
    /// Underlying cause, if any, for logs.
    pub source_message: Option<String>,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            source_message: None,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for [`StoreErrorKind::NotFound`].
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    /// Shorthand for [`StoreErrorKind::Conflict`].
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Conflict, message)
    }

    /// Shorthand for [`StoreErrorKind::Validation`].
    #[track_caller]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Validation, message)
    }

    /// Shorthand for [`StoreErrorKind::Internal`].
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Internal, message)
    }
}

impl From<DbError> for StoreError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        let mut store_err = Self::internal("Internal storage error");
        store_err.source_message = Some(err.to_string());
        store_err
    }
}

use std::fmt;

use serde::Serialize;

use crate::error::BatchError;

/// Result type returned by a `BatchStore`.
pub type BatchStoreResult = Result<BatchResult, BatchError>;

/// A business rule violation reported by an `ItemValidator` for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Indices, relative to one submitted batch, that the store rejected.
///
/// A store persists a batch row by row: rejected indices are reported here and
/// every other row of the batch is considered stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    failed: Vec<usize>,
}

impl BatchResult {
    /// A batch in which every row was stored.
    pub fn all_stored() -> Self {
        Self::default()
    }

    /// A batch in which the given zero-based indices were rejected.
    pub fn with_failures(mut failed: Vec<usize>) -> Self {
        failed.sort_unstable();
        failed.dedup();
        Self { failed }
    }

    pub fn failed_indices(&self) -> &[usize] {
        &self.failed
    }

    pub fn is_failed(&self, index: usize) -> bool {
        self.failed.binary_search(&index).is_ok()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

/// Business validation applied to every candidate before it reaches the store.
pub trait ItemValidator<T> {
    /// Returns the field errors of `item`, empty when the item is acceptable.
    fn validate(&self, item: &T) -> Vec<FieldError>;
}

/// Transactional sink for imported items.
pub trait BatchStore<T> {
    /// Persists `items` and reports the batch-relative indices that failed on
    /// store constraints. Rows not reported are stored.
    fn persist(&self, items: &[T]) -> BatchStoreResult;

    /// Removes every persisted record.
    fn delete_all(&self) -> Result<(), BatchError>;
}

/// Validator accepting every item.
#[derive(Default)]
pub struct AcceptAllValidator {}

impl<T> ItemValidator<T> for AcceptAllValidator {
    fn validate(&self, _item: &T) -> Vec<FieldError> {
        Vec::new()
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    /// The import source does not exist.
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The import source exists but could not be read as UTF-8 text.
    #[error("Unable to read file {}: {message}", path.display())]
    FileRead { path: PathBuf, message: String },

    /// No line before the data qualified as a header.
    #[error("Header not found: {0}")]
    HeaderNotFound(String),

    /// Two columns registered under the same header name.
    #[error("Duplicate column header: {0}")]
    DuplicateColumn(String),

    /// The external store failed as a whole (not per row).
    #[error("Store error: {0}")]
    Store(String),
}

#[cfg(feature = "logger")]
/// This module provides a batch store that only logs the records it receives.
pub mod logger;

/// This module provides the CSV encoder, parser, row mapper and column registry.
pub mod csv;

use std::fmt;

use thiserror::Error;

use crate::error::BatchError;

/// Failure to convert a raw CSV value into an entity field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldConversionError {
    #[error("Invalid {column} value '{value}': expected an integer")]
    NotAnInteger { column: String, value: String },

    #[error("Invalid {column} value '{value}': expected a decimal number")]
    NotADecimal { column: String, value: String },

    #[error("Invalid {column} value '{value}': {reason}")]
    Invalid {
        column: String,
        value: String,
        reason: String,
    },
}

/// Reads a field of `T` as CSV text. Absent values render as an empty string.
pub type Extractor<T> = fn(&T) -> String;

/// Writes a raw CSV value into a field of `T`.
pub type Assigner<T> = fn(&mut T, &str) -> Result<(), FieldConversionError>;

/// Where a column appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Persistence identifiers, never shown nor exchanged.
    Internal,
    /// Shown to humans and exported, but not read back on import.
    DisplayOnly,
    /// Part of the minimal set that round-trips through export and import.
    Exchange,
}

/// Subset of columns selected for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnSet {
    Display,
    #[default]
    Exchange,
}

/// Binds one interchange column to a field of `T`.
pub struct ColumnDescriptor<T> {
    header: &'static str,
    kind: ColumnKind,
    required: bool,
    extract: Extractor<T>,
    assign: Option<Assigner<T>>,
}

impl<T> ColumnDescriptor<T> {
    pub fn internal(header: &'static str, extract: Extractor<T>) -> Self {
        Self {
            header,
            kind: ColumnKind::Internal,
            required: false,
            extract,
            assign: None,
        }
    }

    pub fn display_only(header: &'static str, extract: Extractor<T>) -> Self {
        Self {
            header,
            kind: ColumnKind::DisplayOnly,
            required: false,
            extract,
            assign: None,
        }
    }

    pub fn required(header: &'static str, extract: Extractor<T>, assign: Assigner<T>) -> Self {
        Self {
            header,
            kind: ColumnKind::Exchange,
            required: true,
            extract,
            assign: Some(assign),
        }
    }

    pub fn optional(header: &'static str, extract: Extractor<T>, assign: Assigner<T>) -> Self {
        Self {
            header,
            kind: ColumnKind::Exchange,
            required: false,
            extract,
            assign: Some(assign),
        }
    }

    pub fn header(&self) -> &'static str {
        self.header
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn extract(&self, item: &T) -> String {
        (self.extract)(item)
    }

    /// Assigns `raw` to the bound field. Columns without an assigner ignore the value.
    pub fn assign(&self, item: &mut T, raw: &str) -> Result<(), FieldConversionError> {
        match self.assign {
            Some(assign) => assign(item, raw),
            None => Ok(()),
        }
    }
}

impl<T> fmt::Debug for ColumnDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("header", &self.header)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .finish()
    }
}

/// Ordered set of column descriptors with unique, case-insensitive headers.
#[derive(Debug)]
pub struct ColumnRegistry<T> {
    columns: Vec<ColumnDescriptor<T>>,
}

impl<T> Default for ColumnRegistry<T> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
        }
    }
}

impl<T> ColumnRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, column: ColumnDescriptor<T>) -> Result<Self, BatchError> {
        if self.find(column.header).is_some() {
            return Err(BatchError::DuplicateColumn(column.header.to_string()));
        }
        self.columns.push(column);
        Ok(self)
    }

    /// All registered columns, in registration order.
    pub fn columns(&self) -> &[ColumnDescriptor<T>] {
        &self.columns
    }

    /// Every column meaningful to a human: internal identifiers excluded.
    pub fn display_columns(&self) -> Vec<&ColumnDescriptor<T>> {
        self.columns
            .iter()
            .filter(|column| column.kind != ColumnKind::Internal)
            .collect()
    }

    /// The minimal column set guaranteed to survive export then import.
    pub fn exchange_columns(&self) -> Vec<&ColumnDescriptor<T>> {
        self.columns
            .iter()
            .filter(|column| column.kind == ColumnKind::Exchange)
            .collect()
    }

    pub fn select(&self, set: ColumnSet) -> Vec<&ColumnDescriptor<T>> {
        match set {
            ColumnSet::Display => self.display_columns(),
            ColumnSet::Exchange => self.exchange_columns(),
        }
    }

    /// Case-insensitive lookup on the trimmed header name.
    pub fn find(&self, header: &str) -> Option<&ColumnDescriptor<T>> {
        let header = header.trim();
        self.columns
            .iter()
            .find(|column| column.header.eq_ignore_ascii_case(header))
    }

    /// Whether `header` names an exchange column.
    pub fn is_exchange_header(&self, header: &str) -> bool {
        self.find(header)
            .is_some_and(|column| column.kind == ColumnKind::Exchange)
    }
}

/// A type that can be exchanged as CSV rows.
pub trait CsvRecord: Default + 'static {
    fn columns() -> &'static ColumnRegistry<Self>;
}

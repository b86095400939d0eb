use crate::{
    core::report::RowOutcome,
    item::csv::{
        column::{ColumnRegistry, CsvRecord},
        csv_reader::{HeaderMap, SourceLine, tokenize_line},
    },
};

/// Default ceiling on the number of fields a data row may carry.
pub const DEFAULT_MAX_COLUMNS: usize = 100;

pub const BLANK_LINE: &str = "blank line";
pub const COMMENT_LINE: &str = "comment line";

/// A converted row awaiting validation and storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    pub row_number: usize,
    pub raw_line: String,
    pub item: T,
}

/// What became of one data line.
#[derive(Debug, Clone, PartialEq)]
pub enum RowMapping<T> {
    Skipped(&'static str),
    Failed(RowOutcome, String),
    Mapped(Candidate<T>),
}

/// Converts data lines into candidates using the column positions of the header.
pub struct RowMapper<'a, T: 'static> {
    registry: &'a ColumnRegistry<T>,
    header: &'a HeaderMap,
    missing: Vec<&'static str>,
    min_columns: usize,
    max_columns: usize,
}

impl<'a, T: CsvRecord> RowMapper<'a, T> {
    pub fn new(header: &'a HeaderMap) -> Self {
        Self::with_registry(T::columns(), header)
    }
}

impl<'a, T: Default> RowMapper<'a, T> {
    pub fn with_registry(registry: &'a ColumnRegistry<T>, header: &'a HeaderMap) -> Self {
        let missing = registry
            .exchange_columns()
            .iter()
            .filter(|column| column.is_required() && header.index_of(column.header()).is_none())
            .map(|column| column.header())
            .collect();

        // Every required column the header declares has to be reachable.
        let min_columns = registry
            .exchange_columns()
            .iter()
            .filter(|column| column.is_required())
            .filter_map(|column| header.index_of(column.header()))
            .max()
            .map_or(0, |index| index + 1);

        Self {
            registry,
            header,
            missing,
            min_columns,
            max_columns: DEFAULT_MAX_COLUMNS,
        }
    }

    pub fn max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns.max(self.header.width());
        self
    }

    pub fn min_columns(&self) -> usize {
        self.min_columns
    }

    /// Required exchange columns the header does not name.
    pub fn missing_columns(&self) -> &[&'static str] {
        &self.missing
    }

    pub fn map_line(&self, line: &SourceLine<'_>) -> RowMapping<T> {
        if line.is_blank() {
            return RowMapping::Skipped(BLANK_LINE);
        }
        if line.is_comment() {
            return RowMapping::Skipped(COMMENT_LINE);
        }

        let fields = match tokenize_line(line.text) {
            Ok(fields) => fields,
            Err(error) => return RowMapping::Failed(RowOutcome::ParseError, error.to_string()),
        };

        if !self.missing.is_empty() {
            return RowMapping::Failed(
                RowOutcome::WrongColumnCount,
                format!("Missing required columns: {}", self.missing.join(", ")),
            );
        }
        if fields.len() < self.min_columns {
            return RowMapping::Failed(
                RowOutcome::WrongColumnCount,
                format!(
                    "Expected at least {} columns, found {}",
                    self.min_columns,
                    fields.len()
                ),
            );
        }
        if fields.len() > self.max_columns {
            return RowMapping::Failed(
                RowOutcome::WrongColumnCount,
                format!(
                    "Expected at most {} columns, found {}",
                    self.max_columns,
                    fields.len()
                ),
            );
        }

        match self.map_fields(&fields) {
            Ok(item) => RowMapping::Mapped(Candidate {
                row_number: line.number,
                raw_line: line.text.to_string(),
                item,
            }),
            Err(message) => RowMapping::Failed(RowOutcome::ParseError, message),
        }
    }

    fn map_fields(&self, fields: &[String]) -> Result<T, String> {
        let mut item = T::default();

        for column in self.registry.exchange_columns() {
            let raw = self
                .header
                .index_of(column.header())
                .and_then(|index| fields.get(index))
                .map_or("", String::as_str);

            column
                .assign(&mut item, raw)
                .map_err(|error| error.to_string())?;
        }

        Ok(item)
    }
}

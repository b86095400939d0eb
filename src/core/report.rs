use std::{
    fmt::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::BatchError;

/// Suffix appended to the source file stem to name the companion report file.
pub const REPORT_FILE_SUFFIX: &str = "_import_report.txt";

/// Default number of characters of a raw source line echoed in a report.
pub const DEFAULT_RAW_LINE_LIMIT: usize = 80;

/// Kind of result recorded for one physical input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowOutcome {
    Success,
    Skipped,
    WrongColumnCount,
    ParseError,
    ValidationError,
    DuplicateKey,
    UnexpectedError,
}

impl RowOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowOutcome::Success => "SUCCESS",
            RowOutcome::Skipped => "SKIPPED",
            RowOutcome::WrongColumnCount => "WRONG_COLUMN_COUNT",
            RowOutcome::ParseError => "PARSE_ERROR",
            RowOutcome::ValidationError => "VALIDATION_ERROR",
            RowOutcome::DuplicateKey => "DUPLICATE_KEY",
            RowOutcome::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, RowOutcome::Success | RowOutcome::Skipped)
    }
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recorded result of one input line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowResult {
    /// 1-based physical line number, 0 for a file-level entry.
    pub row_number: usize,
    /// Source text, truncated for display.
    pub raw_line: String,
    pub outcome: RowOutcome,
    pub message: String,
}

/// Immutable outcome of one import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    source: String,
    completed_at: DateTime<Local>,
    total_rows: usize,
    success_count: usize,
    failure_count: usize,
    skipped_count: usize,
    fatal_error: Option<String>,
    results: Vec<RowResult>,
}

impl ImportReport {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn completed_at(&self) -> DateTime<Local> {
        self.completed_at
    }

    /// Data rows that were attempted. Skipped lines are not counted.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    /// The file-level failure that aborted the run before any row was processed.
    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.as_deref()
    }

    /// Every recorded result, in file order.
    pub fn results(&self) -> &[RowResult] {
        &self.results
    }

    pub fn failed_rows(&self) -> Vec<&RowResult> {
        self.results
            .iter()
            .filter(|result| result.outcome.is_failure())
            .collect()
    }

    pub fn is_full_success(&self) -> bool {
        self.failure_count == 0 && self.fatal_error.is_none()
    }

    pub fn is_full_failure(&self) -> bool {
        self.fatal_error.is_some() || (self.success_count == 0 && self.total_rows > 0)
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count > 0 || self.fatal_error.is_some()
    }

    /// One-line status text.
    pub fn summary(&self) -> String {
        match &self.fatal_error {
            Some(error) => format!("Import failed: {}", error),
            None => format!(
                "Imported {} of {} rows ({} failed, {} skipped)",
                self.success_count, self.total_rows, self.failure_count, self.skipped_count
            ),
        }
    }

    /// Multi-line audit text: a block of counts followed by one line per failed row.
    pub fn format_text(&self) -> String {
        let mut text = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(text, "CSV Import Report");
        let _ = writeln!(text, "=================");
        let _ = writeln!(text, "Source:    {}", self.source);
        let _ = writeln!(text, "Completed: {}", self.completed_at.to_rfc3339());
        let _ = writeln!(text, "Total:     {}", self.total_rows);
        let _ = writeln!(text, "Succeeded: {}", self.success_count);
        let _ = writeln!(text, "Failed:    {}", self.failure_count);
        let _ = writeln!(text, "Skipped:   {}", self.skipped_count);

        if let Some(error) = &self.fatal_error {
            let _ = writeln!(text);
            let _ = writeln!(text, "Import aborted: {}", error);
        }

        let failed = self.failed_rows();
        if !failed.is_empty() {
            let _ = writeln!(text);
            let _ = writeln!(text, "Failed rows:");
            for result in failed {
                let _ = writeln!(
                    text,
                    "  Row {} [{}] {} | {}",
                    result.row_number, result.outcome, result.message, result.raw_line
                );
            }
        }

        text
    }

    pub fn to_json(&self) -> Result<String, BatchError> {
        serde_json::to_string_pretty(self).map_err(|error| BatchError::ItemWriter(error.to_string()))
    }
}

/// Path of the companion report written next to `source`.
pub fn report_path_for(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import".to_string());

    source.with_file_name(format!("{}{}", stem, REPORT_FILE_SUFFIX))
}

/// Truncates `line` to at most `limit` characters, marking the cut with `...`.
pub fn truncate_line(line: &str, limit: usize) -> String {
    if line.chars().count() <= limit {
        return line.to_string();
    }
    let mut truncated: String = line.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

/// Accumulates results during one import run.
///
/// Lives only for the run that owns it and is consumed by `build`.
pub(crate) struct ImportReportBuilder {
    source: String,
    raw_line_limit: usize,
    total_rows: usize,
    success_count: usize,
    failure_count: usize,
    skipped_count: usize,
    fatal_error: Option<String>,
    results: Vec<RowResult>,
}

impl ImportReportBuilder {
    pub(crate) fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            raw_line_limit: DEFAULT_RAW_LINE_LIMIT,
            total_rows: 0,
            success_count: 0,
            failure_count: 0,
            skipped_count: 0,
            fatal_error: None,
            results: Vec::new(),
        }
    }

    pub(crate) fn raw_line_limit(mut self, raw_line_limit: usize) -> Self {
        self.raw_line_limit = raw_line_limit;
        self
    }

    pub(crate) fn add_success(&mut self, row_number: usize, raw_line: &str) {
        self.total_rows += 1;
        self.success_count += 1;
        self.push(row_number, raw_line, RowOutcome::Success, String::new());
    }

    pub(crate) fn add_skipped(&mut self, row_number: usize, raw_line: &str, reason: &str) {
        self.skipped_count += 1;
        self.push(row_number, raw_line, RowOutcome::Skipped, reason.to_string());
    }

    pub(crate) fn add_failure(
        &mut self,
        row_number: usize,
        raw_line: &str,
        outcome: RowOutcome,
        message: impl Into<String>,
    ) {
        debug_assert!(outcome.is_failure());
        self.total_rows += 1;
        self.failure_count += 1;
        self.push(row_number, raw_line, outcome, message.into());
    }

    /// Records a file-level failure. Row counters are left untouched.
    pub(crate) fn fail_file(&mut self, outcome: RowOutcome, message: impl Into<String>) {
        let message = message.into();
        self.results.push(RowResult {
            row_number: 0,
            raw_line: String::new(),
            outcome,
            message: message.clone(),
        });
        self.fatal_error = Some(message);
    }

    fn push(&mut self, row_number: usize, raw_line: &str, outcome: RowOutcome, message: String) {
        self.results.push(RowResult {
            row_number,
            raw_line: truncate_line(raw_line, self.raw_line_limit),
            outcome,
            message,
        });
    }

    /// Seals the report. Results are ordered by row number; rows finalized in a
    /// later phase keep their file position.
    pub(crate) fn build(mut self) -> ImportReport {
        self.results.sort_by_key(|result| result.row_number);

        ImportReport {
            source: self.source,
            completed_at: Local::now(),
            total_rows: self.total_rows,
            success_count: self.success_count,
            failure_count: self.failure_count,
            skipped_count: self.skipped_count,
            fatal_error: self.fatal_error,
            results: self.results,
        }
    }
}

use std::{
    any::Any,
    fs,
    panic::{AssertUnwindSafe, catch_unwind},
    path::Path,
    time::Instant,
};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::{
    BatchError,
    core::{
        item::{
            AcceptAllValidator, BatchResult, BatchStore, BatchStoreResult, FieldError,
            ItemValidator,
        },
        report::{DEFAULT_RAW_LINE_LIMIT, ImportReport, ImportReportBuilder, RowOutcome, report_path_for},
    },
    item::csv::{
        column::CsvRecord,
        csv_reader::{SourceLine, detect_header, read_source, split_lines},
        row_mapper::{Candidate, DEFAULT_MAX_COLUMNS, RowMapper, RowMapping},
    },
};

use super::build_name;

/// Reason recorded for lines skipped before the header.
pub const HEADER_SKIP_REASON: &str = "comment/blank";

static ACCEPT_ALL: AcceptAllValidator = AcceptAllValidator {};

/// How imported rows relate to data already in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Add the imported rows to the existing records.
    #[default]
    Append,
    /// Delete every existing record once the rows are parsed, then validate
    /// and store the imported rows.
    ///
    /// Destructive: callers obtain user confirmation before choosing it.
    ReplaceAll,
}

/// Steps of one import run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    ReadingFile,
    HeaderSearch,
    RowParsing,
    ClearAll,
    ValidateAndPersist,
    Reconcile,
    ReportFinalized,
}

/// Imports one CSV source into a [`BatchStore`] and reports every row's outcome.
///
/// A run is sequential: rows are parsed in file order, validated one by one
/// and sent to the store in a single call. File-level failures end the run
/// with a single fatal entry; row-level failures are recorded and the run
/// continues with the next row.
pub struct ImportJob<'a, T> {
    id: Uuid,
    name: String,
    validator: &'a dyn ItemValidator<T>,
    store: &'a dyn BatchStore<T>,
    mode: ImportMode,
    write_report_file: bool,
    max_columns: usize,
    raw_line_limit: usize,
}

/// Row identity kept alongside each item submitted to the store.
struct SubmittedRow {
    row_number: usize,
    raw_line: String,
}

impl<T: CsvRecord> ImportJob<'_, T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ImportMode {
        self.mode
    }

    /// Imports the file at `path`.
    ///
    /// When the report has failures and report files are enabled, its audit
    /// text is also written next to the source (see [`report_path_for`]).
    pub fn run<P: AsRef<Path>>(&self, path: P) -> ImportReport {
        let path = path.as_ref();
        let source = path.display().to_string();
        let start = Instant::now();

        info!("Start of import job: {}, id: {}, source: {}", self.name, self.id, source);
        self.enter(ImportPhase::ReadingFile);

        let report = match read_source(path) {
            Ok(text) => self.process(&source, &text),
            Err(error) => {
                warn!("Import of {} aborted: {}", source, error);
                let mut report = self.report_builder(&source);
                report.fail_file(RowOutcome::UnexpectedError, error.to_string());
                self.finalize(report)
            }
        };

        if self.write_report_file && report.has_failures() {
            self.write_report(path, &report);
        }

        info!(
            "End of import job: {}, id: {}, {} in {:?}",
            self.name,
            self.id,
            report.summary(),
            start.elapsed()
        );
        report
    }

    /// Imports CSV `text` already in memory. `source` only labels the report.
    pub fn run_str(&self, source: &str, text: &str) -> ImportReport {
        info!("Start of import job: {}, id: {}, source: {}", self.name, self.id, source);
        let report = self.process(source, text);
        info!("End of import job: {}, id: {}, {}", self.name, self.id, report.summary());
        report
    }

    fn process(&self, source: &str, text: &str) -> ImportReport {
        let mut report = self.report_builder(source);
        let lines = split_lines(text);

        self.enter(ImportPhase::HeaderSearch);
        let header = match detect_header(T::columns(), &lines, |line| {
            report.add_skipped(line.number, line.text, HEADER_SKIP_REASON)
        }) {
            Ok(header) => header,
            Err(error) => {
                warn!("Import of {} aborted: {}", source, error);
                report.fail_file(RowOutcome::ParseError, error.to_string());
                return self.finalize(report);
            }
        };

        self.enter(ImportPhase::RowParsing);
        let mapper = RowMapper::<T>::new(&header.map).max_columns(self.max_columns);
        if !mapper.missing_columns().is_empty() {
            warn!(
                "Header of {} lacks required columns: {}",
                source,
                mapper.missing_columns().join(", ")
            );
        }
        let candidates = self.map_rows(&mapper, &lines[header.position + 1..], &mut report);
        debug!("{} candidate rows after parsing", candidates.len());

        if self.mode == ImportMode::ReplaceAll {
            self.enter(ImportPhase::ClearAll);
            if let Err(error) = self.clear_all() {
                warn!("Unable to clear the store, no row is imported: {}", error);
                for candidate in &candidates {
                    report.add_failure(
                        candidate.row_number,
                        &candidate.raw_line,
                        RowOutcome::UnexpectedError,
                        error.to_string(),
                    );
                }
                return self.finalize(report);
            }
        }

        self.enter(ImportPhase::ValidateAndPersist);
        let accepted = self.validate(candidates, &mut report);
        let (rows, items): (Vec<SubmittedRow>, Vec<T>) = accepted
            .into_iter()
            .map(|candidate| {
                (
                    SubmittedRow {
                        row_number: candidate.row_number,
                        raw_line: candidate.raw_line,
                    },
                    candidate.item,
                )
            })
            .unzip();
        let result = self.persist(&items);

        self.enter(ImportPhase::Reconcile);
        self.reconcile(&rows, result, &mut report);

        self.finalize(report)
    }

    fn map_rows(
        &self,
        mapper: &RowMapper<'_, T>,
        lines: &[SourceLine<'_>],
        report: &mut ImportReportBuilder,
    ) -> Vec<Candidate<T>> {
        let mut candidates = Vec::with_capacity(lines.len());

        for line in lines {
            match catch_unwind(AssertUnwindSafe(|| mapper.map_line(line))) {
                Ok(RowMapping::Skipped(reason)) => report.add_skipped(line.number, line.text, reason),
                Ok(RowMapping::Failed(outcome, message)) => {
                    debug!("Row {} rejected: {} {}", line.number, outcome, message);
                    report.add_failure(line.number, line.text, outcome, message)
                }
                Ok(RowMapping::Mapped(candidate)) => candidates.push(candidate),
                Err(panic) => report.add_failure(
                    line.number,
                    line.text,
                    RowOutcome::UnexpectedError,
                    panic_message(panic.as_ref()),
                ),
            }
        }

        candidates
    }

    /// Keeps the candidates the validator accepts; the others never reach the store.
    fn validate(
        &self,
        candidates: Vec<Candidate<T>>,
        report: &mut ImportReportBuilder,
    ) -> Vec<Candidate<T>> {
        let mut accepted = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match catch_unwind(AssertUnwindSafe(|| self.validator.validate(&candidate.item))) {
                Ok(errors) if errors.is_empty() => accepted.push(candidate),
                Ok(errors) => report.add_failure(
                    candidate.row_number,
                    &candidate.raw_line,
                    RowOutcome::ValidationError,
                    join_field_errors(&errors),
                ),
                Err(panic) => report.add_failure(
                    candidate.row_number,
                    &candidate.raw_line,
                    RowOutcome::UnexpectedError,
                    panic_message(panic.as_ref()),
                ),
            }
        }

        accepted
    }

    /// Runs before validation so validators see the store as it will be
    /// once the new rows are in.
    fn clear_all(&self) -> Result<(), BatchError> {
        warn!("Import job {} deletes all existing records", self.name);
        catch_unwind(AssertUnwindSafe(|| self.store.delete_all()))
            .unwrap_or_else(|panic| Err(BatchError::Store(panic_message(panic.as_ref()))))
    }

    fn persist(&self, items: &[T]) -> BatchStoreResult {
        if items.is_empty() {
            debug!("Nothing to persist");
            return Ok(BatchResult::all_stored());
        }

        catch_unwind(AssertUnwindSafe(|| self.store.persist(items)))
            .unwrap_or_else(|panic| Err(BatchError::Store(panic_message(panic.as_ref()))))
    }

    /// Maps batch-relative store failures back to their source rows.
    fn reconcile(
        &self,
        rows: &[SubmittedRow],
        result: BatchStoreResult,
        report: &mut ImportReportBuilder,
    ) {
        let batch = match result {
            Ok(batch) => batch,
            Err(error) => {
                warn!("Store rejected the batch of {} rows: {}", rows.len(), error);
                for row in rows {
                    report.add_failure(
                        row.row_number,
                        &row.raw_line,
                        RowOutcome::UnexpectedError,
                        error.to_string(),
                    );
                }
                return;
            }
        };

        for index in batch.failed_indices() {
            if *index >= rows.len() {
                warn!(
                    "Store reported failed index {} outside a batch of {} rows",
                    index,
                    rows.len()
                );
            }
        }

        for (index, row) in rows.iter().enumerate() {
            if batch.is_failed(index) {
                report.add_failure(
                    row.row_number,
                    &row.raw_line,
                    RowOutcome::DuplicateKey,
                    "Rejected by store: duplicate key",
                );
            } else {
                report.add_success(row.row_number, &row.raw_line);
            }
        }
    }

    fn report_builder(&self, source: &str) -> ImportReportBuilder {
        ImportReportBuilder::new(source).raw_line_limit(self.raw_line_limit)
    }

    fn finalize(&self, report: ImportReportBuilder) -> ImportReport {
        self.enter(ImportPhase::ReportFinalized);
        report.build()
    }

    fn write_report(&self, source: &Path, report: &ImportReport) {
        let report_path = report_path_for(source);
        match fs::write(&report_path, report.format_text()) {
            Ok(()) => info!("Import report written to {}", report_path.display()),
            Err(error) => warn!(
                "Unable to write import report {}: {}",
                report_path.display(),
                error
            ),
        }
    }

    fn enter(&self, phase: ImportPhase) {
        debug!("Import job {}: {:?}", self.name, phase);
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Unexpected error: {}", detail)
}

/// Configures an [`ImportJob`].
///
/// Defaults: random name, validator accepting everything, append mode, no
/// report file, at most 100 columns per row, raw lines echoed up to 80 chars.
pub struct ImportJobBuilder<'a, T> {
    name: Option<String>,
    validator: &'a dyn ItemValidator<T>,
    store: &'a dyn BatchStore<T>,
    mode: ImportMode,
    write_report_file: bool,
    max_columns: usize,
    raw_line_limit: usize,
}

impl<'a, T: CsvRecord> ImportJobBuilder<'a, T> {
    pub fn new(store: &'a dyn BatchStore<T>) -> Self {
        Self {
            name: None,
            validator: &ACCEPT_ALL,
            store,
            mode: ImportMode::default(),
            write_report_file: false,
            max_columns: DEFAULT_MAX_COLUMNS,
            raw_line_limit: DEFAULT_RAW_LINE_LIMIT,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn validator(mut self, validator: &'a dyn ItemValidator<T>) -> Self {
        self.validator = validator;
        self
    }

    pub fn mode(mut self, mode: ImportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn write_report_file(mut self, yes: bool) -> Self {
        self.write_report_file = yes;
        self
    }

    pub fn max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns;
        self
    }

    pub fn raw_line_limit(mut self, raw_line_limit: usize) -> Self {
        self.raw_line_limit = raw_line_limit;
        self
    }

    pub fn build(self) -> ImportJob<'a, T> {
        ImportJob {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            validator: self.validator,
            store: self.store,
            mode: self.mode,
            write_report_file: self.write_report_file,
            max_columns: self.max_columns,
            raw_line_limit: self.raw_line_limit,
        }
    }
}

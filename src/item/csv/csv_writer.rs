use std::{
    io::{self, BufWriter, Write},
    marker::PhantomData,
    path::Path,
};

use chrono::{DateTime, Local};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::{
    BatchError,
    item::csv::column::{ColumnSet, CsvRecord},
};

/// UTF-8 byte-order marker written as the first bytes of every export.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// What an export wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
    pub columns: usize,
}

fn write_error(error: impl ToString) -> BatchError {
    BatchError::ItemWriter(error.to_string())
}

/// Writes records as RFC4180 text: BOM, a `#` metadata line, the header line,
/// then one line per record. Every line ends with CRLF.
///
/// Fields holding a comma, a double quote, CR or LF are quoted with inner
/// quotes doubled. Empty values are written as empty, unquoted fields.
pub struct CsvItemWriter<T, W: Write> {
    sink: W,
    column_set: ColumnSet,
    generated_at: DateTime<Local>,
    _record: PhantomData<fn(&T)>,
}

impl<T: CsvRecord, W: Write> CsvItemWriter<T, W> {
    /// Writes the complete document for `items` and flushes the sink.
    pub fn write(mut self, items: &[T]) -> Result<ExportSummary, BatchError> {
        let columns = T::columns().select(self.column_set);

        self.sink.write_all(UTF8_BOM).map_err(write_error)?;
        write!(
            self.sink,
            "# Generated {} | rows={} | columns={}\r\n",
            self.generated_at.to_rfc3339(),
            items.len(),
            columns.len()
        )
        .map_err(write_error)?;

        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .flexible(false)
            .terminator(Terminator::CRLF)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(&mut self.sink);

        wtr.write_record(columns.iter().map(|column| column.header()))
            .map_err(write_error)?;

        for item in items {
            wtr.write_record(columns.iter().map(|column| column.extract(item)))
                .map_err(write_error)?;
        }

        wtr.flush().map_err(write_error)?;
        drop(wtr);
        self.sink.flush().map_err(write_error)?;

        debug!("Wrote {} rows with {} columns", items.len(), columns.len());

        Ok(ExportSummary {
            rows: items.len(),
            columns: columns.len(),
        })
    }
}

/// Configures a [`CsvItemWriter`].
///
/// Defaults: exchange column set, generation timestamp taken when the writer
/// is created.
pub struct CsvItemWriterBuilder<T> {
    column_set: ColumnSet,
    generated_at: Option<DateTime<Local>>,
    _record: PhantomData<fn(&T)>,
}

impl<T> Default for CsvItemWriterBuilder<T> {
    fn default() -> Self {
        Self {
            column_set: ColumnSet::default(),
            generated_at: None,
            _record: PhantomData,
        }
    }
}

impl<T: CsvRecord> CsvItemWriterBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column_set(mut self, column_set: ColumnSet) -> Self {
        self.column_set = column_set;
        self
    }

    /// Fixes the timestamp of the metadata line.
    pub fn generated_at(mut self, generated_at: DateTime<Local>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> CsvItemWriter<T, W> {
        CsvItemWriter {
            sink: wtr,
            column_set: self.column_set,
            generated_at: self.generated_at.unwrap_or_else(Local::now),
            _record: PhantomData,
        }
    }

    /// Exports `items` to `path`.
    ///
    /// The document is written to a temporary file in the same directory and
    /// renamed over `path` once complete, so `path` never holds a partial export.
    pub fn write_to_path<P: AsRef<Path>>(
        self,
        path: P,
        items: &[T],
    ) -> Result<ExportSummary, BatchError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
        let summary = self
            .from_writer(BufWriter::new(tmp.as_file_mut()))
            .write(items)?;

        tmp.persist(path)
            .map_err(|error| write_error(io::Error::from(error)))?;

        info!(
            "Exported {} rows to {}",
            summary.rows,
            path.display()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::{env::temp_dir, error::Error, fs};

    use chrono::TimeZone;
    use rand::distr::{Alphanumeric, SampleString};

    use crate::{
        item::csv::{column::ColumnSet, csv_reader::tokenize_line},
        model::student::{Student, StudentStatus},
    };

    use super::*;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn student() -> Student {
        Student {
            id: Some(7),
            student_id: "S-1001".to_string(),
            first_name: "John".to_string(),
            last_name: "Smith, Jr.".to_string(),
            email: "john@example.com".to_string(),
            phone: None,
            course: r#"He said "hi""#.to_string(),
            year_level: 2,
            gpa: 3.25,
            status: StudentStatus::OnLeave,
            created_at: None,
        }
    }

    fn export(items: &[Student], column_set: ColumnSet) -> Result<String, Box<dyn Error>> {
        let mut buffer = Vec::new();
        CsvItemWriterBuilder::new()
            .column_set(column_set)
            .generated_at(fixed_time())
            .from_writer(&mut buffer)
            .write(items)?;
        Ok(String::from_utf8(buffer)?)
    }

    #[test]
    fn test_empty_export() -> Result<(), Box<dyn Error>> {
        let data = export(&[], ColumnSet::Exchange)?;

        assert!(data.starts_with('\u{feff}'));
        let lines: Vec<&str> = data.trim_start_matches('\u{feff}').split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("# Generated "));
        assert!(lines[0].ends_with("| rows=0 | columns=9"));
        assert_eq!(
            lines[1],
            "Student ID,First Name,Last Name,Email,Phone,Course,Year Level,GPA,Status"
        );
        assert_eq!(lines[2], "");
        Ok(())
    }

    #[test]
    fn test_escaping_only_when_needed() -> Result<(), Box<dyn Error>> {
        let data = export(&[student()], ColumnSet::Exchange)?;
        let row = data.split("\r\n").nth(2).unwrap();

        assert_eq!(
            row,
            r#"S-1001,John,"Smith, Jr.",john@example.com,,"He said ""hi""",2,3.25,On Leave"#
        );
        Ok(())
    }

    #[test]
    fn test_crlf_line_endings() -> Result<(), Box<dyn Error>> {
        let data = export(&[student(), student()], ColumnSet::Display)?;

        assert!(data.ends_with("\r\n"));
        assert_eq!(data.matches("\r\n").count(), 4);
        assert_eq!(data.matches('\n').count(), 4);
        Ok(())
    }

    #[test]
    fn test_display_set_skips_internal_id() -> Result<(), Box<dyn Error>> {
        let data = export(&[student()], ColumnSet::Display)?;
        let header = data.split("\r\n").nth(1).unwrap();

        assert!(header.ends_with(",Status,Created At"));
        assert!(!header.starts_with("ID,"));
        Ok(())
    }

    #[test]
    fn test_special_characters_survive_tokenizing() -> Result<(), Box<dyn Error>> {
        for value in ["a,b", r#"say "x""#, "line\rbreak", "line\nbreak", "\"", ",", "plain"] {
            let mut item = student();
            item.first_name = value.to_string();
            let data = export(&[item], ColumnSet::Exchange)?;

            // The data row is everything after the header line's terminator.
            let body = data.splitn(3, "\r\n").nth(2).unwrap();
            let row = body.strip_suffix("\r\n").unwrap();
            let fields = tokenize_line(row)?;
            assert_eq!(fields[1], value);
        }
        Ok(())
    }

    #[test]
    fn test_write_to_path_atomic_replace() -> Result<(), Box<dyn Error>> {
        let file_name = Alphanumeric.sample_string(&mut rand::rng(), 16);
        let path = temp_dir().join(format!("{}.csv", file_name));
        fs::write(&path, "old content")?;

        let summary = CsvItemWriterBuilder::new()
            .generated_at(fixed_time())
            .write_to_path(&path, &[student()])?;

        assert_eq!(summary, ExportSummary { rows: 1, columns: 9 });
        let bytes = fs::read(&path)?;
        assert_eq!(&bytes[..3], UTF8_BOM);
        assert!(String::from_utf8(bytes)?.contains("S-1001"));

        fs::remove_file(&path).ok();
        Ok(())
    }
}

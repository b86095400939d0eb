use std::{
    collections::{HashMap, HashSet},
    fs,
    io::ErrorKind,
    path::Path,
};

use log::debug;
use thiserror::Error;

use crate::{
    error::BatchError,
    item::csv::column::ColumnRegistry,
};

/// Minimum number of known exchange headers a line needs to be taken as the header.
pub const HEADER_MATCH_THRESHOLD: usize = 3;

/// UTF-8 byte-order marker as a character.
pub const BOM: char = '\u{feff}';

/// Failure to tokenize a single line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsvParseError {
    /// The line ended inside a quoted field that opened in field `column` (1-based).
    #[error("Unterminated quoted field in column {column}")]
    UnterminatedQuote { column: usize },
}

/// A physical line of the source with its 1-based number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'a> {
    pub number: usize,
    pub text: &'a str,
}

impl SourceLine<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_comment(&self) -> bool {
        self.text.starts_with('#')
    }
}

/// Reads the whole file as UTF-8 text.
pub fn read_source(path: &Path) -> Result<String, BatchError> {
    let bytes = fs::read(path).map_err(|error| match error.kind() {
        ErrorKind::NotFound => BatchError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => BatchError::FileRead {
            path: path.to_path_buf(),
            message: error.to_string(),
        },
    })?;

    String::from_utf8(bytes).map_err(|error| BatchError::FileRead {
        path: path.to_path_buf(),
        message: format!("not valid UTF-8 ({})", error.utf8_error()),
    })
}

/// Splits `text` into numbered lines, accepting CRLF and LF terminators.
///
/// A byte-order marker is stripped from the first line only.
pub fn split_lines(text: &str) -> Vec<SourceLine<'_>> {
    text.lines()
        .enumerate()
        .map(|(index, line)| SourceLine {
            number: index + 1,
            text: if index == 0 {
                line.strip_prefix(BOM).unwrap_or(line)
            } else {
                line
            },
        })
        .collect()
}

/// Splits one line into fields with a quote-aware state machine.
///
/// Outside quotes a comma ends the field and a double quote opens quoted mode.
/// Inside quotes a doubled quote yields one literal quote and a lone quote
/// closes quoted mode. Every other character is kept as is.
pub fn tokenize_line(line: &str) -> Result<Vec<String>, CsvParseError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => {
                in_quotes = true;
            }
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => {
                current.push(c);
            }
        }
    }

    if in_quotes {
        return Err(CsvParseError::UnterminatedQuote {
            column: fields.len() + 1,
        });
    }

    // The last field has no trailing delimiter.
    fields.push(current);
    Ok(fields)
}

/// Lower-cased, trimmed header name to column position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    indices: HashMap<String, usize>,
    width: usize,
}

impl HeaderMap {
    pub fn from_fields(fields: &[String]) -> Self {
        let mut indices = HashMap::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            // First occurrence wins when a header is repeated.
            indices
                .entry(normalize_header(field))
                .or_insert(index);
        }
        Self {
            indices,
            width: fields.len(),
        }
    }

    pub fn index_of(&self, header: &str) -> Option<usize> {
        self.indices.get(&normalize_header(header)).copied()
    }

    /// Number of fields on the header line.
    pub fn width(&self) -> usize {
        self.width
    }
}

/// The detected header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedHeader {
    /// Index into the line list of the header line.
    pub position: usize,
    pub map: HeaderMap,
}

pub fn normalize_header(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Number of distinct exchange columns of `registry` named by `fields`.
pub fn count_known_headers<T>(registry: &ColumnRegistry<T>, fields: &[String]) -> usize {
    fields
        .iter()
        .filter(|field| registry.is_exchange_header(field))
        .map(|field| normalize_header(field))
        .collect::<HashSet<_>>()
        .len()
}

/// Finds the header among `lines`.
///
/// Blank and `#` lines before it are passed to `on_skipped`. The first
/// substantive line must carry at least [`HEADER_MATCH_THRESHOLD`] known
/// headers; otherwise detection fails without guessing a column order.
pub fn detect_header<T>(
    registry: &ColumnRegistry<T>,
    lines: &[SourceLine<'_>],
    mut on_skipped: impl FnMut(&SourceLine<'_>),
) -> Result<DetectedHeader, BatchError> {
    for (position, line) in lines.iter().enumerate() {
        if line.is_blank() || line.is_comment() {
            on_skipped(line);
            continue;
        }

        let fields = tokenize_line(line.text).map_err(|error| {
            BatchError::HeaderNotFound(format!("line {}: {}", line.number, error))
        })?;

        let known = count_known_headers(registry, &fields);
        if known < HEADER_MATCH_THRESHOLD {
            return Err(BatchError::HeaderNotFound(format!(
                "line {} matches {} known column(s), at least {} required",
                line.number, known, HEADER_MATCH_THRESHOLD
            )));
        }

        debug!("Header found at line {} ({} columns)", line.number, fields.len());
        return Ok(DetectedHeader {
            position,
            map: HeaderMap::from_fields(&fields),
        });
    }

    Err(BatchError::HeaderNotFound(
        "no header line before end of file".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use crate::{
        item::csv::column::CsvRecord,
        model::student::Student,
    };

    use super::*;

    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_quoted_comma() {
        assert_eq!(
            tokenize_line(r#""Smith, Jr.",John"#).unwrap(),
            fields(&["Smith, Jr.", "John"])
        );
    }

    #[test]
    fn test_doubled_quote() {
        assert_eq!(
            tokenize_line(r#""He said ""hi""""#).unwrap(),
            fields(&[r#"He said "hi""#])
        );
    }

    #[test]
    fn test_empty_fields_kept() {
        assert_eq!(tokenize_line("a,,c,").unwrap(), fields(&["a", "", "c", ""]));
        assert_eq!(tokenize_line("").unwrap(), fields(&[""]));
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            tokenize_line(r#"S-1,"open field"#),
            Err(CsvParseError::UnterminatedQuote { column: 2 })
        );
    }

    #[test]
    fn test_split_lines_strips_first_bom_only() {
        let text = "\u{feff}# meta\r\nheader\r\n\u{feff}data\n";
        let lines = split_lines(text);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], SourceLine { number: 1, text: "# meta" });
        assert_eq!(lines[1], SourceLine { number: 2, text: "header" });
        assert_eq!(lines[2].text, "\u{feff}data");
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn test_header_map_case_insensitive() {
        let map = HeaderMap::from_fields(&fields(&[" GPA ", "student id", "Email"]));

        assert_eq!(map.index_of("gpa"), Some(0));
        assert_eq!(map.index_of("Student ID"), Some(1));
        assert_eq!(map.index_of("Phone"), None);
        assert_eq!(map.width(), 3);
    }

    #[test]
    fn test_detect_header_skips_comments_and_blanks() {
        let lines = split_lines("# exported\r\n\r\nEmail,GPA,Status,Notes\r\nx,1,Active,\r\n");
        let mut skipped = Vec::new();

        let header = detect_header(Student::columns(), &lines, |line| skipped.push(line.number))
            .unwrap();

        assert_eq!(skipped, vec![1, 2]);
        assert_eq!(header.position, 2);
        assert_eq!(header.map.index_of("status"), Some(2));
    }

    #[test]
    fn test_detect_header_no_positional_fallback() {
        let lines = split_lines("S-1,Ann,Lee,ann@example.com\r\nEmail,GPA,Status\r\n");

        let result = detect_header(Student::columns(), &lines, |_| {});

        assert!(matches!(result, Err(BatchError::HeaderNotFound(_))));
    }

    #[test]
    fn test_repeated_header_counts_once() {
        let known = count_known_headers(Student::columns(), &fields(&["Email", "email ", "EMAIL"]));
        assert_eq!(known, 1);

        let lines = split_lines("Email,Email,Email
x,y,z
");
        let result = detect_header(Student::columns(), &lines, |_| {});
        assert!(matches!(result, Err(BatchError::HeaderNotFound(_))));
    }

    #[test]
    fn test_only_leading_hash_marks_a_comment() {
        let comment = SourceLine { number: 1, text: "# note" };
        let indented = SourceLine { number: 2, text: "  #S-1,Ann" };

        assert!(comment.is_comment());
        assert!(!indented.is_comment());
    }

    #[test]
    fn test_detect_header_empty_input() {
        let lines = split_lines("# only a comment\r\n");
        let result = detect_header(Student::columns(), &lines, |_| {});
        assert!(matches!(result, Err(BatchError::HeaderNotFound(msg)) if msg.contains("end of file")));
    }

    #[test]
    fn test_read_source_missing_file() {
        let result = read_source(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(BatchError::FileNotFound { .. })));
    }
}

//! CSV interchange for records described by a column registry.
//!
//! # Module Architecture
//!
//! 1. **column**: the `ColumnRegistry` binding header names to entity fields,
//!    with a display subset and a minimal exchange subset.
//!
//! 2. **csv_writer**: the encoder. Output starts with a UTF-8 BOM and a `#`
//!    metadata line, followed by the header and one line per record. Every
//!    line ends with CRLF.
//!
//! 3. **csv_reader**: line splitting, the quote-aware field tokenizer and
//!    header detection.
//!
//! 4. **row_mapper**: turns a tokenized data line into a candidate entity,
//!    or into a skipped / failed row outcome.
//!
//! # File layout
//!
//! ```text
//! EF BB BF # Generated 2024-05-06T07:08:09+00:00 | rows=1 | columns=9\r\n
//! Student ID,First Name,Last Name,Email,Phone,Course,Year Level,GPA,Status\r\n
//! S-1001,John,"Smith, Jr.",john@example.com,,BSCS,2,3.25,Active\r\n
//! ```
//!
//! # Examples
//!
//! ## Writing students
//!
//! ```
//! use roster_csv::item::csv::csv_writer::CsvItemWriterBuilder;
//! use roster_csv::model::student::Student;
//!
//! let students = vec![Student {
//!     student_id: "S-1001".to_string(),
//!     first_name: "John".to_string(),
//!     last_name: "Smith, Jr.".to_string(),
//!     ..Default::default()
//! }];
//!
//! let mut buffer = Vec::new();
//! let summary = CsvItemWriterBuilder::<Student>::new()
//!     .from_writer(&mut buffer)
//!     .write(&students)
//!     .unwrap();
//!
//! assert_eq!(summary.rows, 1);
//! let text = String::from_utf8(buffer).unwrap();
//! assert!(text.contains("S-1001,John,\"Smith, Jr.\""));
//! ```
//!
//! ## Tokenizing a line
//!
//! ```
//! use roster_csv::item::csv::csv_reader::tokenize_line;
//!
//! let fields = tokenize_line(r#""Smith, Jr.",John"#).unwrap();
//! assert_eq!(fields, vec!["Smith, Jr.", "John"]);
//! ```

/// Column descriptors and the registry binding them to entity fields.
pub mod column;

/// A module providing facilities for reading CSV text.
pub mod csv_reader;

/// A module providing facilities for writing CSV documents.
pub mod csv_writer;

/// Conversion of data lines into candidate entities.
pub mod row_mapper;

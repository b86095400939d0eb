#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # Roster CSV

 CSV interchange for student records: a strict encoder, a tolerant quote-aware
 parser, a column registry binding interchange columns to entity fields, and a
 batch import coordinator that turns every input line into an auditable outcome.

 ## Core Concepts

- **ColumnRegistry:** The fixed set of named columns of an entity. Each column knows its header and how to read, and for import write, the matching field.
- **CsvItemWriter:** Serializes entities as RFC4180 text with a UTF-8 BOM, a `#` metadata line and CRLF line endings.
- **RowMapper:** Converts a tokenized data line into a candidate entity, or a row outcome when it cannot.
- **ImportJob:** Reads a file, finds the header, maps rows, validates candidates and sends them to a `BatchStore` in one call, then maps store rejections back to file lines.
- **ImportReport:** The immutable result of an import: counts, one outcome per line and an audit text.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| logger        | Enables a logger `BatchStore`, useful for dry runs            |
| full          | Enables all available features                                |

 ## Getting Started

```rust
# use std::cell::RefCell;
# use roster_csv::{
#     core::{
#         item::{BatchResult, BatchStore, BatchStoreResult, FieldError, ItemValidator},
#         job::{ImportJobBuilder, ImportMode},
#     },
#     error::BatchError,
#     model::student::Student,
# };
# #[derive(Default)]
# struct MemoryStore {
#     students: RefCell<Vec<Student>>,
# }
# impl BatchStore<Student> for MemoryStore {
#     fn persist(&self, items: &[Student]) -> BatchStoreResult {
#         self.students.borrow_mut().extend_from_slice(items);
#         Ok(BatchResult::all_stored())
#     }
#     fn delete_all(&self) -> Result<(), BatchError> {
#         self.students.borrow_mut().clear();
#         Ok(())
#     }
# }
struct GpaValidator;

impl ItemValidator<Student> for GpaValidator {
    fn validate(&self, item: &Student) -> Vec<FieldError> {
        if (0.0..=4.0).contains(&item.gpa) {
            Vec::new()
        } else {
            vec![FieldError::new("GPA", "must be between 0 and 4")]
        }
    }
}

fn main() {
    let csv = "\u{feff}# Generated 2024-05-06T07:08:09+00:00 | rows=2 | columns=9\r
Student ID,First Name,Last Name,Email,Phone,Course,Year Level,GPA,Status\r
S-1001,John,\"Smith, Jr.\",john@example.com,,BSCS,2,3.25,Active\r
S-1002,Mary,Jones,mary@example.com,,BSIT,1,4.5,Active\r
";

    let store = MemoryStore::default();
    let validator = GpaValidator;

    let job = ImportJobBuilder::<Student>::new(&store)
        .validator(&validator)
        .mode(ImportMode::Append)
        .build();

    let report = job.run_str("students.csv", csv);

    assert_eq!(report.total_rows(), 2);
    assert_eq!(report.success_count(), 1);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.total_rows(), report.success_count() + report.failure_count());
    println!("{}", report.format_text());
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for import operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// CSV interchange and optional stores
pub mod item;

/// Entities exchanged through CSV files
pub mod model;

#![allow(dead_code)]

pub mod mocks;

use std::{
    cell::RefCell,
    env::temp_dir,
    fs,
    path::PathBuf,
};

use rand::distr::{Alphanumeric, SampleString};
use roster_csv::{
    BatchError,
    core::item::{BatchResult, BatchStore, BatchStoreResult},
    model::student::{Student, StudentStatus},
};

pub const HEADER: &str =
    "Student ID,First Name,Last Name,Email,Phone,Course,Year Level,GPA,Status";

/// Store keeping students in memory with a unique Student ID constraint.
#[derive(Default)]
pub struct MemoryStore {
    pub students: RefCell<Vec<Student>>,
}

impl BatchStore<Student> for MemoryStore {
    fn persist(&self, items: &[Student]) -> BatchStoreResult {
        let mut students = self.students.borrow_mut();
        let mut failed = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if students.iter().any(|s| s.student_id == item.student_id) {
                failed.push(index);
            } else {
                let mut stored = item.clone();
                stored.id = Some(students.len() as i64 + 1);
                students.push(stored);
            }
        }
        Ok(BatchResult::with_failures(failed))
    }

    fn delete_all(&self) -> Result<(), BatchError> {
        self.students.borrow_mut().clear();
        Ok(())
    }
}

pub fn temp_path(extension: &str) -> PathBuf {
    let file_name = Alphanumeric.sample_string(&mut rand::rng(), 16);
    temp_dir().join(format!("{}.{}", file_name, extension))
}

/// Writes `content` to a fresh temporary CSV file.
pub fn write_temp_csv(content: &str) -> PathBuf {
    let path = temp_path("csv");
    fs::write(&path, content).expect("Failed to write CSV file");
    path
}

/// A document in export layout with the given data rows.
pub fn csv_document(rows: &[&str]) -> String {
    let mut text = format!(
        "\u{feff}# Generated 2024-05-06T07:08:09+00:00 | rows={} | columns=9\r\n{}\r\n",
        rows.len(),
        HEADER
    );
    for row in rows {
        text.push_str(row);
        text.push_str("\r\n");
    }
    text
}

pub fn student(student_id: &str, first_name: &str, last_name: &str) -> Student {
    Student {
        id: None,
        student_id: student_id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!("{}@example.com", student_id.to_lowercase()),
        phone: None,
        course: "BSCS".to_string(),
        year_level: 1,
        gpa: 3.0,
        status: StudentStatus::Active,
        created_at: None,
    }
}

pub fn sample_students() -> Vec<Student> {
    vec![
        Student {
            phone: Some("+1 555 0100".to_string()),
            status: StudentStatus::Graduated,
            gpa: 3.875,
            year_level: 4,
            ..student("S-1001", "John", "Smith, Jr.")
        },
        Student {
            course: r#"Computer "Science""#.to_string(),
            status: StudentStatus::OnLeave,
            ..student("S-1002", "Mary-Ann", "O'Neil")
        },
        Student {
            first_name: "Zoë".to_string(),
            course: "Data, Systems & Networks".to_string(),
            gpa: 0.1,
            status: StudentStatus::Suspended,
            ..student("S-1003", "Zoe", "Ng")
        },
        Student {
            email: String::new(),
            status: StudentStatus::Inactive,
            ..student("S-1004", "", "Blank")
        },
    ]
}

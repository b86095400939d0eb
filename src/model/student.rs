use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::item::csv::column::{ColumnDescriptor, ColumnRegistry, CsvRecord, FieldConversionError};

/// Enrollment status of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
    Suspended,
    OnLeave,
}

impl StudentStatus {
    pub const ALL: [StudentStatus; 5] = [
        StudentStatus::Active,
        StudentStatus::Inactive,
        StudentStatus::Graduated,
        StudentStatus::Suspended,
        StudentStatus::OnLeave,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            StudentStatus::Active => "Active",
            StudentStatus::Inactive => "Inactive",
            StudentStatus::Graduated => "Graduated",
            StudentStatus::Suspended => "Suspended",
            StudentStatus::OnLeave => "On Leave",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            StudentStatus::Active => "ACTIVE",
            StudentStatus::Inactive => "INACTIVE",
            StudentStatus::Graduated => "GRADUATED",
            StudentStatus::Suspended => "SUSPENDED",
            StudentStatus::OnLeave => "ON_LEAVE",
        }
    }

    /// Never fails: blank or unknown text becomes the default status.
    pub fn from_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for StudentStatus {
    type Err = FieldConversionError;

    /// Accepts the display name or the upper-case code, ignoring case.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        StudentStatus::ALL
            .into_iter()
            .find(|status| {
                status.display_name().eq_ignore_ascii_case(raw) || status.code().eq_ignore_ascii_case(raw)
            })
            .ok_or_else(|| FieldConversionError::Invalid {
                column: STATUS.to_string(),
                value: raw.to_string(),
                reason: "unknown status".to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Student {
    /// Persistence identity, absent until stored.
    pub id: Option<i64>,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: String,
    pub year_level: i32,
    pub gpa: f64,
    pub status: StudentStatus,
    pub created_at: Option<NaiveDateTime>,
}


pub const ID: &str = "ID";
pub const STUDENT_ID: &str = "Student ID";
pub const FIRST_NAME: &str = "First Name";
pub const LAST_NAME: &str = "Last Name";
pub const EMAIL: &str = "Email";
pub const PHONE: &str = "Phone";
pub const COURSE: &str = "Course";
pub const YEAR_LEVEL: &str = "Year Level";
pub const GPA: &str = "GPA";
pub const STATUS: &str = "Status";
pub const CREATED_AT: &str = "Created At";

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_year_level(student: &mut Student, raw: &str) -> Result<(), FieldConversionError> {
    student.year_level =
        raw.trim()
            .parse::<i32>()
            .map_err(|_| FieldConversionError::NotAnInteger {
                column: YEAR_LEVEL.to_string(),
                value: raw.to_string(),
            })?;
    Ok(())
}

fn parse_gpa(student: &mut Student, raw: &str) -> Result<(), FieldConversionError> {
    let gpa = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| FieldConversionError::NotADecimal {
            column: GPA.to_string(),
            value: raw.to_string(),
        })?;

    if !gpa.is_finite() {
        return Err(FieldConversionError::Invalid {
            column: GPA.to_string(),
            value: raw.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    student.gpa = gpa;
    Ok(())
}

static STUDENT_COLUMNS: LazyLock<ColumnRegistry<Student>> = LazyLock::new(build_columns);

fn build_columns() -> ColumnRegistry<Student> {
    let columns: [ColumnDescriptor<Student>; 11] = [
        ColumnDescriptor::internal(ID, |s: &Student| {
            s.id.map(|id| id.to_string()).unwrap_or_default()
        }),
        ColumnDescriptor::required(
            STUDENT_ID,
            |s: &Student| s.student_id.clone(),
            |s, raw| {
                s.student_id = raw.to_string();
                Ok(())
            },
        ),
        ColumnDescriptor::required(
            FIRST_NAME,
            |s: &Student| s.first_name.clone(),
            |s, raw| {
                s.first_name = raw.to_string();
                Ok(())
            },
        ),
        ColumnDescriptor::required(
            LAST_NAME,
            |s: &Student| s.last_name.clone(),
            |s, raw| {
                s.last_name = raw.to_string();
                Ok(())
            },
        ),
        ColumnDescriptor::required(
            EMAIL,
            |s: &Student| s.email.clone(),
            |s, raw| {
                s.email = raw.to_string();
                Ok(())
            },
        ),
        ColumnDescriptor::optional(
            PHONE,
            |s: &Student| s.phone.clone().unwrap_or_default(),
            |s, raw| {
                s.phone = (!raw.is_empty()).then(|| raw.to_string());
                Ok(())
            },
        ),
        ColumnDescriptor::required(
            COURSE,
            |s: &Student| s.course.clone(),
            |s, raw| {
                s.course = raw.to_string();
                Ok(())
            },
        ),
        ColumnDescriptor::required(
            YEAR_LEVEL,
            |s: &Student| s.year_level.to_string(),
            parse_year_level,
        ),
        ColumnDescriptor::required(GPA, |s: &Student| s.gpa.to_string(), parse_gpa),
        ColumnDescriptor::required(
            STATUS,
            |s: &Student| s.status.display_name().to_string(),
            |s, raw| {
                s.status = StudentStatus::from_lenient(raw);
                Ok(())
            },
        ),
        ColumnDescriptor::display_only(CREATED_AT, |s: &Student| {
            s.created_at
                .map(|at| at.format(CREATED_AT_FORMAT).to_string())
                .unwrap_or_default()
        }),
    ];

    columns
        .into_iter()
        .try_fold(ColumnRegistry::new(), ColumnRegistry::register)
        .expect("student column headers are unique")
}

impl CsvRecord for Student {
    fn columns() -> &'static ColumnRegistry<Self> {
        &STUDENT_COLUMNS
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::item::csv::column::ColumnKind;

    use super::*;

    #[test]
    fn test_exchange_headers_in_order() {
        let headers: Vec<&str> = Student::columns()
            .exchange_columns()
            .iter()
            .map(|c| c.header())
            .collect();

        assert_eq!(
            headers,
            vec![
                "Student ID", "First Name", "Last Name", "Email", "Phone", "Course", "Year Level",
                "GPA", "Status"
            ]
        );
    }

    #[test]
    fn test_display_columns_and_kinds() {
        let headers: Vec<&str> = Student::columns()
            .display_columns()
            .iter()
            .map(|c| c.header())
            .collect();

        assert!(!headers.contains(&ID));
        assert!(headers.contains(&CREATED_AT));
        assert_eq!(headers.len(), 10);

        let registry = Student::columns();
        assert_eq!(registry.find(ID).unwrap().kind(), ColumnKind::Internal);
        assert_eq!(registry.find(CREATED_AT).unwrap().kind(), ColumnKind::DisplayOnly);
        assert_eq!(registry.find(GPA).unwrap().kind(), ColumnKind::Exchange);
    }

    #[test]
    fn test_only_phone_is_optional() {
        let optional: Vec<&str> = Student::columns()
            .exchange_columns()
            .iter()
            .filter(|c| !c.is_required())
            .map(|c| c.header())
            .collect();
        assert_eq!(optional, vec![PHONE]);
    }

    #[test]
    fn test_absent_values_extract_as_empty() {
        let student = Student::default();
        let registry = Student::columns();

        assert_eq!(registry.find(PHONE).unwrap().extract(&student), "");
        assert_eq!(registry.find(ID).unwrap().extract(&student), "");
        assert_eq!(registry.find(CREATED_AT).unwrap().extract(&student), "");
        assert_eq!(registry.find(STATUS).unwrap().extract(&student), "Active");
    }

    #[test]
    fn test_created_at_renders_with_seconds() {
        let student = Student {
            created_at: NaiveDate::from_ymd_opt(2024, 9, 1)
                .and_then(|d| d.and_hms_opt(8, 30, 0)),
            ..Default::default()
        };
        let value = Student::columns().find(CREATED_AT).unwrap().extract(&student);
        assert_eq!(value, "2024-09-01 08:30:00");
    }

    #[test]
    fn test_numeric_columns_parse_strictly() {
        let registry = Student::columns();
        let mut student = Student::default();

        registry.find(YEAR_LEVEL).unwrap().assign(&mut student, " 3 ").unwrap();
        registry.find(GPA).unwrap().assign(&mut student, "3.75").unwrap();
        assert_eq!(student.year_level, 3);
        assert_eq!(student.gpa, 3.75);

        let error = registry.find(YEAR_LEVEL).unwrap().assign(&mut student, "3rd").unwrap_err();
        assert!(error.to_string().contains("'3rd'"));

        let error = registry.find(GPA).unwrap().assign(&mut student, "abc").unwrap_err();
        assert!(matches!(error, FieldConversionError::NotADecimal { .. }));

        let error = registry.find(GPA).unwrap().assign(&mut student, "NaN").unwrap_err();
        assert!(matches!(error, FieldConversionError::Invalid { .. }));
    }

    #[test]
    fn test_status_parses_leniently() {
        assert_eq!(StudentStatus::from_lenient("graduated"), StudentStatus::Graduated);
        assert_eq!(StudentStatus::from_lenient("ON_LEAVE"), StudentStatus::OnLeave);
        assert_eq!(StudentStatus::from_lenient(" On Leave "), StudentStatus::OnLeave);
        assert_eq!(StudentStatus::from_lenient("expelled"), StudentStatus::Active);
        assert_eq!(StudentStatus::from_lenient(""), StudentStatus::Active);
        assert!("expelled".parse::<StudentStatus>().is_err());
    }

    #[test]
    fn test_phone_none_only_when_empty() {
        let mut student = Student::default();
        let phone = Student::columns().find(PHONE).unwrap();

        phone.assign(&mut student, "").unwrap();
        assert_eq!(student.phone, None);

        phone.assign(&mut student, "  ").unwrap();
        assert_eq!(student.phone.as_deref(), Some("  "));

        phone.assign(&mut student, "+1 555 0100").unwrap();
        assert_eq!(student.phone.as_deref(), Some("+1 555 0100"));
    }
}

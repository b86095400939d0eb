/// The student record exchanged through CSV files
pub mod student;

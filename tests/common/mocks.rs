//! Mock versions of the import collaborators.
use mockall::mock;

use roster_csv::{
    BatchError,
    core::item::{BatchStore, BatchStoreResult, FieldError, ItemValidator},
    model::student::Student,
};

mock! {
    pub Store {}
    impl BatchStore<Student> for Store {
        fn persist(&self, items: &[Student]) -> BatchStoreResult;
        fn delete_all(&self) -> Result<(), BatchError>;
    }
}

mock! {
    pub Validator {}
    impl ItemValidator<Student> for Validator {
        fn validate(&self, item: &Student) -> Vec<FieldError>;
    }
}

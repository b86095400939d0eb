use std::fmt::Debug;

use log::info;

use crate::{
    BatchError,
    core::item::{BatchResult, BatchStore, BatchStoreResult},
};

/// A store that logs every record instead of keeping it. Useful for dry runs.
#[derive(Default)]
pub struct LoggerStore {}

impl<T> BatchStore<T> for LoggerStore
where
    T: Debug,
{
    fn persist(&self, items: &[T]) -> BatchStoreResult {
        items.iter().for_each(|item| info!("Record:{:?}", item));
        Ok(BatchResult::all_stored())
    }

    fn delete_all(&self) -> Result<(), BatchError> {
        info!("Delete all records");
        Ok(())
    }
}

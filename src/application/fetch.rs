//! Fetch use case: read whole collections as typed records

use crate::domain::{Notebook, Page, Record, CREATED_AT_FIELD};
use crate::error::{NotePageError, Result};
use crate::infrastructure::{CollectionQuery, DocumentCursor, DocumentStore};

/// Read every record of `T`'s collection ordered ascending by `order_by`.
///
/// The first iteration or decode failure aborts the whole read.
pub fn read_collection<T: Record>(store: &dyn DocumentStore, order_by: &str) -> Result<Vec<T>> {
    let query = CollectionQuery::new(T::COLLECTION).order_by(order_by);
    decode_all(DocumentCursor::new(store, query))
}

/// Decode every document a cursor yields, attaching each identifier
pub fn decode_all<T: Record>(cursor: DocumentCursor<'_>) -> Result<Vec<T>> {
    let mut records = Vec::new();

    for document in cursor {
        let document =
            document.map_err(|e| NotePageError::Read(format!("failed to iterate: {}", e)))?;
        let mut record = document.decode::<T>().map_err(|e| {
            NotePageError::Read(format!(
                "failed to convert {} to {}: {}",
                document.id,
                T::KIND,
                e
            ))
        })?;
        record.set_id(document.id);
        records.push(record);
    }

    tracing::debug!(collection = T::COLLECTION, count = records.len(), "read collection");
    Ok(records)
}

pub fn fetch_notebooks(store: &dyn DocumentStore) -> Result<Vec<Notebook>> {
    read_collection(store, CREATED_AT_FIELD)
}

pub fn fetch_pages(store: &dyn DocumentStore) -> Result<Vec<Page>> {
    read_collection(store, CREATED_AT_FIELD)
}

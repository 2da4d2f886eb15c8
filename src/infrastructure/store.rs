//! Document store abstraction and the lazy collection cursor

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Plain JSON view of a document's fields
pub type Fields = Map<String, Value>;

/// Documents fetched per round trip when scanning a collection
pub const DEFAULT_PAGE_SIZE: usize = 300;

/// A stored document: its identifier plus decoded fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    /// Store-encoded value of the ordering field, used to resume a scan after this document
    pub cursor_value: Option<Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Document {
            id: id.into(),
            fields,
            cursor_value: None,
        }
    }

    /// Field value, treating an explicit null the same as an absent field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Decode the fields into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

/// Full-collection scan, optionally ordered ascending by one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection: String,
    pub order_by: Option<String>,
    pub page_size: usize,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        CollectionQuery {
            collection: collection.into(),
            order_by: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }
}

/// Opaque handle of an open transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

/// Merge of `fields` into an existing document; only the listed fields change
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub collection: String,
    pub document_id: String,
    pub fields: Fields,
}

/// Operations the application needs from the remote document database.
///
/// Implementations are blocking; every call completes or fails before returning.
pub trait DocumentStore {
    /// Fetch up to `query.page_size` documents that sort after `after`.
    ///
    /// Documents lacking the ordering field are not part of an ordered scan.
    /// Ties on the ordering field are broken by document id.
    fn fetch_page(
        &self,
        query: &CollectionQuery,
        after: Option<&Document>,
        transaction: Option<&TransactionId>,
    ) -> Result<Vec<Document>>;

    /// Open a read-write transaction. `retry` names an aborted transaction being re-run.
    fn begin_transaction(&self, retry: Option<&TransactionId>) -> Result<TransactionId>;

    /// Apply all writes atomically. Fails with `NotePageError::Aborted` on contention.
    fn commit(&self, transaction: &TransactionId, writes: &[Write]) -> Result<()>;

    fn rollback(&self, transaction: &TransactionId) -> Result<()>;
}

/// Lazy, finite, restartable scan over a collection.
///
/// Pages are requested only when the buffered documents run out. Once a short
/// page comes back the cursor is exhausted and `next_document` returns `Ok(None)`.
pub struct DocumentCursor<'a> {
    store: &'a dyn DocumentStore,
    query: CollectionQuery,
    transaction: Option<TransactionId>,
    buffered: VecDeque<Document>,
    last: Option<Document>,
    exhausted: bool,
}

impl<'a> DocumentCursor<'a> {
    pub fn new(store: &'a dyn DocumentStore, query: CollectionQuery) -> Self {
        DocumentCursor {
            store,
            query,
            transaction: None,
            buffered: VecDeque::new(),
            last: None,
            exhausted: false,
        }
    }

    /// Read within the given transaction
    pub fn in_transaction(mut self, transaction: TransactionId) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.buffered.is_empty()
    }

    /// Start the scan again from the beginning
    pub fn rewind(&mut self) {
        self.buffered.clear();
        self.last = None;
        self.exhausted = false;
    }

    pub fn next_document(&mut self) -> Result<Option<Document>> {
        loop {
            if let Some(document) = self.buffered.pop_front() {
                self.last = Some(document.clone());
                return Ok(Some(document));
            }

            if self.exhausted {
                return Ok(None);
            }

            let page = self.store.fetch_page(
                &self.query,
                self.last.as_ref(),
                self.transaction.as_ref(),
            )?;
            tracing::debug!(
                collection = %self.query.collection,
                fetched = page.len(),
                "fetched page"
            );

            if page.len() < self.query.page_size {
                self.exhausted = true;
            }
            self.buffered.extend(page);
        }
    }

    /// Drain the remaining documents into a vector
    pub fn collect_all(mut self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        while let Some(document) = self.next_document()? {
            documents.push(document);
        }
        Ok(documents)
    }
}

impl Iterator for DocumentCursor<'_> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_document() {
            Ok(Some(document)) => Some(Ok(document)),
            Ok(None) => None,
            Err(e) => {
                // A failed fetch ends the sequence
                self.buffered.clear();
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

/// Build a `Fields` map from key/value pairs
pub fn fields<I, K>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

//! In-memory document store for tests and offline runs

use crate::error::{NotePageError, Result};
use crate::infrastructure::store::{
    CollectionQuery, Document, DocumentStore, Fields, TransactionId, Write,
};
use serde_json::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<String, BTreeMap<String, Fields>>,
    open_transactions: BTreeSet<String>,
    next_transaction: u64,
    page_requests: usize,
    commits: usize,
    rollbacks: usize,
    written_documents: usize,
    aborts_remaining: usize,
    fetch_failure: Option<String>,
    retried: Vec<String>,
}

/// Document store holding collections in memory.
///
/// Commits apply all staged writes at once, so a failed unit of work leaves
/// the data untouched just like the remote engine.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        self.state
            .borrow_mut()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Builder form of `insert`
    pub fn with_document(self, collection: &str, id: &str, fields: Fields) -> Self {
        self.insert(collection, id, fields);
        self
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.state
            .borrow()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone()))
    }

    /// Number of fetch_page calls served so far
    pub fn page_requests(&self) -> usize {
        self.state.borrow().page_requests
    }

    pub fn commits(&self) -> usize {
        self.state.borrow().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.borrow().rollbacks
    }

    /// Total documents modified by successful commits
    pub fn written_documents(&self) -> usize {
        self.state.borrow().written_documents
    }

    /// Aborted transactions named by later begin_transaction calls
    pub fn retried_transactions(&self) -> Vec<String> {
        self.state.borrow().retried.clone()
    }

    /// Make the next `count` commits fail as aborted
    pub fn abort_next_commits(&self, count: usize) {
        self.state.borrow_mut().aborts_remaining = count;
    }

    /// Make every fetch fail with the given message until cleared
    pub fn fail_fetches(&self, message: Option<&str>) {
        self.state.borrow_mut().fetch_failure = message.map(str::to_string);
    }

    fn check_open(state: &MemoryState, transaction: &TransactionId) -> Result<()> {
        if state.open_transactions.contains(&transaction.0) {
            Ok(())
        } else {
            Err(NotePageError::Transaction(format!(
                "transaction {} is not open",
                transaction.0
            )))
        }
    }
}

impl DocumentStore for MemoryStore {
    fn fetch_page(
        &self,
        query: &CollectionQuery,
        after: Option<&Document>,
        transaction: Option<&TransactionId>,
    ) -> Result<Vec<Document>> {
        let mut state = self.state.borrow_mut();
        state.page_requests += 1;

        if let Some(message) = &state.fetch_failure {
            return Err(NotePageError::Remote {
                operation: "runQuery",
                status: 500,
                message: message.clone(),
            });
        }
        if let Some(transaction) = transaction {
            Self::check_open(&state, transaction)?;
        }

        let Some(documents) = state.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let sort_key = |fields: &Fields| -> Option<Value> {
            match &query.order_by {
                Some(field) => fields.get(field).filter(|v| !v.is_null()).cloned(),
                None => Some(Value::Null),
            }
        };

        let mut keyed: Vec<(Value, &String, &Fields)> = documents
            .iter()
            .filter_map(|(id, fields)| sort_key(fields).map(|key| (key, id, fields)))
            .collect();
        keyed.sort_by(|a, b| compare_values(&a.0, &b.0).then_with(|| a.1.cmp(b.1)));

        let resume = after.map(|doc| {
            let key = doc
                .cursor_value
                .clone()
                .or_else(|| sort_key(&doc.fields))
                .unwrap_or(Value::Null);
            (key, doc.id.clone())
        });

        Ok(keyed
            .into_iter()
            .filter(|(key, id, _)| match &resume {
                Some((after_key, after_id)) => {
                    compare_values(key, after_key).then_with(|| id.as_str().cmp(after_id))
                        == Ordering::Greater
                }
                None => true,
            })
            .take(query.page_size)
            .map(|(key, id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
                cursor_value: Some(key),
            })
            .collect())
    }

    fn begin_transaction(&self, retry: Option<&TransactionId>) -> Result<TransactionId> {
        let mut state = self.state.borrow_mut();
        if let Some(previous) = retry {
            state.retried.push(previous.0.clone());
        }
        state.next_transaction += 1;
        let id = format!("tx-{}", state.next_transaction);
        state.open_transactions.insert(id.clone());
        Ok(TransactionId(id))
    }

    fn commit(&self, transaction: &TransactionId, writes: &[Write]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        Self::check_open(&state, transaction)?;
        state.open_transactions.remove(&transaction.0);

        if state.aborts_remaining > 0 {
            state.aborts_remaining -= 1;
            return Err(NotePageError::Aborted(
                "too much contention on these documents".to_string(),
            ));
        }

        for write in writes {
            let document = state
                .collections
                .entry(write.collection.clone())
                .or_default()
                .entry(write.document_id.clone())
                .or_default();
            for (key, value) in &write.fields {
                document.insert(key.clone(), value.clone());
            }
        }
        state.commits += 1;
        state.written_documents += writes.len();
        Ok(())
    }

    fn rollback(&self, transaction: &TransactionId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        Self::check_open(&state, transaction)?;
        state.open_transactions.remove(&transaction.0);
        state.rollbacks += 1;
        Ok(())
    }
}

/// Ordering across JSON types: null < bool < number < string < array < object
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::fields;
    use serde_json::json;

    #[test]
    fn test_ordered_scan_skips_documents_without_order_field() {
        let store = MemoryStore::new()
            .with_document("pages", "b", fields([("createdAt", json!(2))]))
            .with_document("pages", "a", fields([("createdAt", json!(1))]))
            .with_document("pages", "c", fields([("name", json!("no timestamp"))]));

        let query = CollectionQuery::new("pages").order_by("createdAt");
        let page = store.fetch_page(&query, None, None).unwrap();
        let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_unordered_scan_returns_every_document_by_id() {
        let store = MemoryStore::new()
            .with_document("pages", "b", fields([("createdAt", json!(2))]))
            .with_document("pages", "c", Fields::new())
            .with_document("pages", "a", fields([("createdAt", json!(1))]));

        let page = store
            .fetch_page(&CollectionQuery::new("pages"), None, None)
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_resume_by_id() {
        let store = MemoryStore::new()
            .with_document("pages", "x", fields([("createdAt", json!("t"))]))
            .with_document("pages", "y", fields([("createdAt", json!("t"))]))
            .with_document("pages", "z", fields([("createdAt", json!("t"))]));

        let query = CollectionQuery::new("pages").order_by("createdAt").page_size(1);
        let first = store.fetch_page(&query, None, None).unwrap();
        let second = store.fetch_page(&query, first.first(), None).unwrap();

        assert_eq!(first[0].id, "x");
        assert_eq!(second[0].id, "y");
    }

    #[test]
    fn test_commit_merges_fields() {
        let store = MemoryStore::new().with_document(
            "pages",
            "p1",
            fields([("name", json!("n")), ("content", json!("c"))]),
        );

        let tx = store.begin_transaction(None).unwrap();
        store
            .commit(
                &tx,
                &[Write {
                    collection: "pages".to_string(),
                    document_id: "p1".to_string(),
                    fields: fields([("noteBookId", json!("A"))]),
                }],
            )
            .unwrap();

        let doc = store.document("pages", "p1").unwrap();
        assert_eq!(doc.fields["name"], json!("n"));
        assert_eq!(doc.fields["content"], json!("c"));
        assert_eq!(doc.fields["noteBookId"], json!("A"));
        assert_eq!(store.commits(), 1);
        assert_eq!(store.written_documents(), 1);
    }

    #[test]
    fn test_commit_requires_open_transaction() {
        let store = MemoryStore::new();
        let tx = store.begin_transaction(None).unwrap();
        store.rollback(&tx).unwrap();

        assert!(matches!(
            store.commit(&tx, &[]),
            Err(NotePageError::Transaction(_))
        ));
    }

    #[test]
    fn test_aborted_commit_writes_nothing() {
        let store = MemoryStore::new().with_document("pages", "p1", Fields::new());
        store.abort_next_commits(1);

        let tx = store.begin_transaction(None).unwrap();
        let result = store.commit(
            &tx,
            &[Write {
                collection: "pages".to_string(),
                document_id: "p1".to_string(),
                fields: fields([("noteBookId", json!("A"))]),
            }],
        );

        assert!(matches!(result, Err(NotePageError::Aborted(_))));
        assert!(!store.document("pages", "p1").unwrap().has_field("noteBookId"));
        assert_eq!(store.commits(), 0);
    }
}

//! Unit-of-work runner on top of a document store

use crate::error::{NotePageError, Result};
use crate::infrastructure::store::{
    CollectionQuery, DocumentCursor, DocumentStore, Fields, TransactionId, Write,
};

/// Attempts made when the store reports contention
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct TransactionOptions {
    pub max_attempts: usize,
    /// Run the unit of work but roll back instead of committing
    pub dry_run: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        TransactionOptions {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            dry_run: false,
        }
    }
}

/// Capability handed to a unit of work: read inside the transaction and stage writes
pub struct Transaction<'a> {
    store: &'a dyn DocumentStore,
    id: TransactionId,
    writes: Vec<Write>,
}

impl<'a> Transaction<'a> {
    fn new(store: &'a dyn DocumentStore, id: TransactionId) -> Self {
        Transaction {
            store,
            id,
            writes: Vec::new(),
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    /// Scan a collection with reads bound to this transaction
    pub fn documents(&self, query: CollectionQuery) -> DocumentCursor<'a> {
        DocumentCursor::new(self.store, query).in_transaction(self.id.clone())
    }

    /// Stage a merge of `fields` into a document; other fields are untouched
    pub fn set_merge(&mut self, collection: &str, document_id: &str, fields: Fields) {
        self.writes.push(Write {
            collection: collection.to_string(),
            document_id: document_id.to_string(),
            fields,
        });
    }

    pub fn staged_writes(&self) -> &[Write] {
        &self.writes
    }
}

/// Run `work` inside a transaction.
///
/// The staged writes are committed atomically when `work` succeeds. When it
/// fails the transaction is rolled back and nothing is written. A commit
/// rejected as aborted re-runs `work` from scratch, up to `max_attempts` times.
pub fn run_transaction<T, F>(
    store: &dyn DocumentStore,
    options: TransactionOptions,
    mut work: F,
) -> Result<T>
where
    F: FnMut(&mut Transaction<'_>) -> Result<T>,
{
    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 0;
    let mut aborted: Option<TransactionId> = None;

    loop {
        attempt += 1;
        let id = store.begin_transaction(aborted.as_ref())?;
        let mut tx = Transaction::new(store, id);

        let value = match work(&mut tx) {
            Ok(value) => value,
            Err(e) => {
                if let Err(rollback_err) = store.rollback(tx.id()) {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                return Err(e);
            }
        };

        if options.dry_run {
            store.rollback(tx.id())?;
            tracing::info!(staged = tx.staged_writes().len(), "dry run, transaction rolled back");
            return Ok(value);
        }

        match store.commit(tx.id(), tx.staged_writes()) {
            Ok(()) => {
                tracing::info!(
                    transaction = %tx.id().0,
                    writes = tx.staged_writes().len(),
                    attempt,
                    "transaction committed"
                );
                return Ok(value);
            }
            Err(NotePageError::Aborted(reason)) if attempt < max_attempts => {
                tracing::warn!(transaction = %tx.id().0, %reason, attempt, "transaction aborted, retrying");
                aborted = Some(tx.id().clone());
            }
            Err(e) => return Err(e),
        }
    }
}

//! Migration use case: backfill `noteBookId` on legacy pages.
//!
//! Every page without a notebook is assigned to the notebook named "default".
//! All updates land in one transaction, so either every eligible page is
//! updated or none is. Pages that already carry the field are never touched,
//! which makes a second run a no-op.

use crate::application::fetch::fetch_notebooks;
use crate::domain::{find_default, Page, Record, DEFAULT_NOTEBOOK_NAME, NOTEBOOK_ID_FIELD};
use crate::error::{NotePageError, Result};
use crate::infrastructure::store::fields;
use crate::infrastructure::{
    run_transaction, CollectionQuery, DocumentStore, Transaction, TransactionOptions,
};
use serde_json::json;

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    /// Scan and report without committing
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub default_notebook_id: String,
    pub scanned: usize,
    /// Pages that were (or, in a dry run, would be) assigned to the default notebook
    pub updated: Vec<String>,
    pub dry_run: bool,
}

pub fn migrate(store: &dyn DocumentStore, options: MigrationOptions) -> Result<MigrationReport> {
    let notebooks = fetch_notebooks(store)?;
    let default_book = find_default(&notebooks)
        .ok_or_else(|| NotePageError::DefaultNotebookMissing(DEFAULT_NOTEBOOK_NAME.to_string()))?;
    let notebook_id = default_book.id.clone();
    tracing::info!(notebook = %notebook_id, dry_run = options.dry_run, "backfilling pages");

    let tx_options = TransactionOptions {
        dry_run: options.dry_run,
        ..TransactionOptions::default()
    };

    let (scanned, updated) =
        run_transaction(store, tx_options, |tx| backfill(tx, &notebook_id)).map_err(|e| match e {
            NotePageError::Read(_) => e,
            other => NotePageError::Transaction(format!("migration transaction failed: {}", other)),
        })?;

    Ok(MigrationReport {
        default_notebook_id: notebook_id,
        scanned,
        updated,
        dry_run: options.dry_run,
    })
}

/// Unit of work: stage a merge for every page missing the notebook id
fn backfill(tx: &mut Transaction<'_>, notebook_id: &str) -> Result<(usize, Vec<String>)> {
    let mut scanned = 0;
    let mut updated = Vec::new();

    for document in tx.documents(CollectionQuery::new(Page::COLLECTION)) {
        let document =
            document.map_err(|e| NotePageError::Read(format!("failed to iterate: {}", e)))?;
        scanned += 1;

        if document.has_field(NOTEBOOK_ID_FIELD) {
            continue;
        }

        tx.set_merge(
            Page::COLLECTION,
            &document.id,
            fields([(NOTEBOOK_ID_FIELD, json!(notebook_id))]),
        );
        updated.push(document.id);
    }

    Ok((scanned, updated))
}

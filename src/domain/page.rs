//! Page records

use super::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Foreign key from a page to its notebook
pub const NOTEBOOK_ID_FIELD: &str = "noteBookId";

/// A content record, optionally filed under a notebook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Page {
    #[serde(skip)]
    pub id: String,
    pub content: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Absent on pages created before notebooks existed
    pub note_book_id: Option<String>,
}

impl Record for Page {
    const COLLECTION: &'static str = "pages";
    const KIND: &'static str = "Page";

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

//! Notebook records

use super::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the notebook legacy pages are assigned to
pub const DEFAULT_NOTEBOOK_NAME: &str = "default";

/// A named grouping of pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Notebook {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Notebook {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_NOTEBOOK_NAME
    }
}

impl Record for Notebook {
    const COLLECTION: &'static str = "notebooks";
    const KIND: &'static str = "Notebook";

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// First notebook named "default", if any
pub fn find_default(notebooks: &[Notebook]) -> Option<&Notebook> {
    notebooks.iter().find(|book| book.is_default())
}

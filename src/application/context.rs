//! Application context: the connected store

use crate::error::{NotePageError, Result};
use crate::infrastructure::{Config, DocumentStore, FirestoreClient};

/// Everything a fetch or migration run needs, passed explicitly
pub struct AppContext {
    store: Box<dyn DocumentStore>,
}

impl AppContext {
    /// Authenticate against Firestore with the configured key file
    pub fn connect(config: &Config) -> Result<Self> {
        let key_file = config.key_file().ok_or(NotePageError::KeyFileUnset)?;
        let client = FirestoreClient::connect(key_file)?;
        Ok(Self::with_store(Box::new(client)))
    }

    pub fn with_store(store: Box<dyn DocumentStore>) -> Self {
        AppContext { store }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}

//! Infrastructure layer - External I/O and persistence

pub mod config;
pub mod editor;
pub mod firestore;
pub mod memory;
pub mod store;
pub mod transaction;

pub use config::{Config, ConfigStore};
pub use editor::EditorSession;
pub use firestore::FirestoreClient;
pub use memory::MemoryStore;
pub use store::{CollectionQuery, Document, DocumentCursor, DocumentStore, Fields, TransactionId, Write};
pub use transaction::{run_transaction, Transaction, TransactionOptions};

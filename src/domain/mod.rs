//! Domain layer - Records and their invariants

pub mod notebook;
pub mod page;
pub mod record;

pub use notebook::{find_default, Notebook, DEFAULT_NOTEBOOK_NAME};
pub use page::{Page, NOTEBOOK_ID_FIELD};
pub use record::{Record, CREATED_AT_FIELD};

//! Application layer - Use cases and orchestration

pub mod context;
pub mod edit_config;
pub mod fetch;
pub mod migrate;

pub use context::AppContext;
pub use edit_config::edit_config;
pub use fetch::{fetch_notebooks, fetch_pages, read_collection};
pub use migrate::{migrate, MigrationOptions, MigrationReport};

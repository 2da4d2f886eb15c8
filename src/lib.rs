//! note-page-cli - Firestore notebooks and pages from the terminal
//!
//! Prints the `notebooks` and `pages` collections of a Firestore database and
//! carries the one-shot migration that assigns legacy pages to the default
//! notebook.

pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::NotePageError;

//! Error types for note-page-cli

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for note-page-cli
#[derive(Debug, Error)]
pub enum NotePageError {
    #[error("please set key file to config file")]
    KeyFileUnset,

    #[error("failed to load config: {0}")]
    Config(String),

    #[error("Editor error: {0}")]
    Editor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid key file {}: {}", .path.display(), .message)]
    KeyFile { path: PathBuf, message: String },

    #[error("error initializing app: {0}")]
    Client(String),

    #[error("{operation} failed with HTTP {status}: {message}")]
    Remote {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("transaction aborted: {0}")]
    Aborted(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported document value: {0}")]
    Value(String),

    #[error("{0}")]
    Read(String),

    #[error("{0}")]
    Transaction(String),

    #[error("no notebook named \"{0}\" found")]
    DefaultNotebookMissing(String),
}

impl NotePageError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Get a user-friendly error message with suggestions
    pub fn display_with_suggestions(&self) -> String {
        match self {
            NotePageError::KeyFileUnset => format!(
                "{}\n\n\
                Suggestions:\n\
                • Run 'note-page-cli -c' and set account_key_file\n\
                • Point it at a service account JSON key with Firestore access",
                self
            ),
            NotePageError::KeyFile { .. } => format!(
                "{}\n\n\
                Suggestions:\n\
                • Download a fresh key from the service account page of your project\n\
                • Run 'note-page-cli -c' to fix the account_key_file path",
                self
            ),
            NotePageError::Editor(_) => format!(
                "{}\n\n\
                Suggestions:\n\
                • Check that your editor is installed and in PATH\n\
                • Set EDITOR environment variable (e.g., export EDITOR=nano)",
                self
            ),
            NotePageError::DefaultNotebookMissing(name) => format!(
                "{}\n\n\
                Pages can only be backfilled with an existing notebook id.\n\
                Create a notebook named '{}' and run 'note-page-cli -m' again.",
                self, name
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type using NotePageError
pub type Result<T> = std::result::Result<T, NotePageError>;

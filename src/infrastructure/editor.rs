//! Editor integration for the config file

use crate::error::{NotePageError, Result};
use std::path::Path;
use std::process::Command;

/// Editor used when EDITOR is unset
pub const DEFAULT_EDITOR: &str = "vim";

/// Session for opening files in an external editor
pub struct EditorSession {
    command: String,
}

impl EditorSession {
    /// Create a new editor session with the given command
    pub fn new(editor_command: String) -> Self {
        EditorSession {
            command: editor_command,
        }
    }

    /// Editor from the EDITOR environment variable, falling back to vim
    pub fn from_env() -> Self {
        let command = std::env::var("EDITOR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
        EditorSession::new(command)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Open a file in the editor and block until the editor exits
    pub fn open_and_wait(&self, file_path: &Path) -> Result<()> {
        let (program, args) = self.parse_command();
        tracing::debug!(editor = %program, file = %file_path.display(), "launching editor");

        // On Windows, use cmd /c to ensure .bat and .cmd files are found
        #[cfg(windows)]
        let status = Command::new("cmd")
            .arg("/C")
            .arg(&program)
            .args(&args)
            .arg(file_path)
            .status();

        #[cfg(not(windows))]
        let status = Command::new(&program).args(&args).arg(file_path).status();

        let status = status.map_err(|e| {
            NotePageError::Editor(format!("Failed to launch editor '{}': {}", program, e))
        })?;

        if !status.success() {
            return Err(NotePageError::Editor(format!(
                "Editor '{}' exited with {}",
                program, status
            )));
        }

        Ok(())
    }

    /// Parse command into program and arguments
    fn parse_command(&self) -> (String, Vec<String>) {
        let parts: Vec<&str> = self.command.split_whitespace().collect();

        if parts.is_empty() {
            return (DEFAULT_EDITOR.to_string(), vec![]);
        }

        let program = parts[0].to_string();
        let args = parts[1..].iter().map(|s| s.to_string()).collect();

        (program, args)
    }
}

//! Edit-config use case

use crate::error::Result;
use crate::infrastructure::{ConfigStore, EditorSession};

/// Open the config file in $EDITOR (vim when unset) and wait for it to close
pub fn edit_config(store: &ConfigStore) -> Result<()> {
    let editor = EditorSession::from_env();
    tracing::debug!(editor = editor.command(), path = %store.path().display(), "editing config");
    store.edit(&editor)
}

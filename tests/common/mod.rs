use assert_cmd::Command;
use std::path::Path;

pub fn note_page_cmd(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("note-page-cli").unwrap();
    cmd.env("NOTE_PAGE_CLI_CONFIG_DIR", config_dir);
    cmd.env_remove("EDITOR");
    cmd.env_remove("FIRESTORE_EMULATOR_HOST");
    cmd.env_remove("GOOGLE_CLOUD_PROJECT");
    cmd.env_remove("RUST_LOG");
    cmd
}

//! CLI flag definitions

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "note-page-cli")]
#[command(about = "Print notebooks and pages from Firestore, or backfill page notebook ids", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Edit config
    #[arg(short = 'c', long = "config")]
    pub edit_config: bool,

    /// Migrate data: assign pages without a notebook to the "default" notebook
    #[arg(short = 'm', long = "migrate")]
    pub migrate: bool,

    /// With -m, report what would change without writing
    #[arg(long, requires = "migrate")]
    pub dry_run: bool,
}

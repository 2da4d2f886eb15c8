//! CLI layer - Command-line interface

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::{
    format_migration_footer, format_migration_report, format_notebook_list, format_page_list,
};

//! Output formatting utilities

use crate::application::MigrationReport;
use crate::domain::{Notebook, Page};
use chrono::{DateTime, SecondsFormat, Utc};

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

/// Format notebooks, one per line, in the order given
pub fn format_notebook_list(notebooks: &[Notebook]) -> String {
    if notebooks.is_empty() {
        return "No notebooks found\n".to_string();
    }

    let mut output = format!("Notebooks ({}):\n", notebooks.len());
    for book in notebooks {
        output.push_str(&format!(
            "  {}  {}  created {}  updated {}\n",
            book.id,
            book.name,
            timestamp(book.created_at),
            timestamp(book.updated_at)
        ));
    }
    output
}

/// Format pages with their content indented below the header line
pub fn format_page_list(pages: &[Page]) -> String {
    if pages.is_empty() {
        return "No pages found\n".to_string();
    }

    let mut output = format!("Pages ({}):\n", pages.len());
    for page in pages {
        output.push_str(&format!(
            "  {}  {}  notebook {}  created {}  updated {}\n",
            page.id,
            page.name,
            page.note_book_id.as_deref().unwrap_or("-"),
            timestamp(page.created_at),
            timestamp(page.updated_at)
        ));
        for line in page.content.lines() {
            output.push_str(&format!("      {}\n", line));
        }
    }
    output
}

pub fn format_migration_report(report: &MigrationReport) -> String {
    let verb = if report.dry_run { "would set" } else { "set" };
    let mut output = format!(
        "{} noteBookId={} on {} of {} pages\n",
        verb,
        report.default_notebook_id,
        report.updated.len(),
        report.scanned
    );
    for id in &report.updated {
        output.push_str(&format!("  {}\n", id));
    }
    output
}

/// Closing line of a migration run; a dry run must not claim it finished writing
pub fn format_migration_footer(report: &MigrationReport) -> &'static str {
    if report.dry_run {
        "dry run finished, nothing written."
    } else {
        "migrate finished."
    }
}

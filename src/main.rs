use clap::Parser;
use note_page_cli::application::{
    edit_config, fetch_notebooks, fetch_pages, migrate, AppContext, MigrationOptions,
};
use note_page_cli::cli::{
    format_migration_footer, format_migration_report, format_notebook_list, format_page_list, Cli,
};
use note_page_cli::error::NotePageError;
use note_page_cli::infrastructure::{Config, ConfigStore};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Usage errors exit with 2
    let cli = Cli::parse();

    match run(cli) {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e.display_with_suggestions());
            std::process::exit(e.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<(), NotePageError> {
    let config_store = ConfigStore::discover()?;
    if !config_store.exists() {
        config_store.save(&Config::default())?;
    }

    if cli.edit_config {
        return edit_config(&config_store);
    }

    let config = config_store.load()?;
    let ctx = AppContext::connect(&config)?;

    if cli.migrate {
        let report = migrate(
            ctx.store(),
            MigrationOptions {
                dry_run: cli.dry_run,
            },
        )?;
        print!("{}", format_migration_report(&report));
        println!("{}", format_migration_footer(&report));
    } else {
        let notebooks = fetch_notebooks(ctx.store())?;
        print!("{}", format_notebook_list(&notebooks));

        let pages = fetch_pages(ctx.store())?;
        print!("{}", format_page_list(&pages));
    }

    Ok(())
}

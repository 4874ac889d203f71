//! Linkbox CLI
//!
//! Command-line interface for Linkbox - bookmarks kept in a JSON file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use linkbox_core::{Config, EntryId, Library, LoadOutcome, StoreError};

mod commands;
mod metadata;
mod output;
mod prompt;

use commands::link::{normalize_tags, LinkEdits};
use output::{Output, OutputFormat};
use prompt::PromptPicker;

#[derive(Parser)]
#[command(name = "linkbox")]
#[command(about = "Linkbox - bookmarks in a plain JSON file")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Bookmark file to use (defaults to the last opened file)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage links
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },
    /// Manage collections
    Collection {
        #[command(subcommand)]
        command: CollectionCommands,
    },
    /// Write the document to a new file and switch to it
    SaveAs {
        /// Destination (prompts if omitted)
        path: Option<PathBuf>,
    },
    /// Show the open document and settings
    Status,
    /// Follow external changes to the document until Ctrl-C
    Watch,
    /// Back up the document with the git repository it lives in
    Git {
        #[command(subcommand)]
        command: GitCommands,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum LinkCommands {
    /// Create a new link
    #[command(alias = "create")]
    Add {
        /// URL to save
        url: String,
        /// Title (fetched from the page if omitted)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// List all links
    #[command(alias = "ls")]
    List {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Show link details
    Show { id: EntryId },
    /// Edit a link (interactive when no field is given)
    Edit {
        id: EntryId,
        #[arg(long)]
        url: Option<String>,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        note: Option<String>,
        /// Replace tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    /// Delete a link
    #[command(alias = "delete")]
    Rm {
        id: EntryId,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// Create a collection
    #[command(alias = "create")]
    Add {
        title: String,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// List collections
    #[command(alias = "ls")]
    List,
    /// Show a collection and its links
    Show { id: EntryId },
    /// Delete a collection (its links are kept)
    #[command(alias = "delete")]
    Rm {
        id: EntryId,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Add a link to a collection
    Attach { collection: EntryId, link: EntryId },
    /// Remove a link from a collection
    Detach { collection: EntryId, link: EntryId },
}

#[derive(Subcommand)]
enum GitCommands {
    /// Pull the repository and reload the document
    Pull,
    /// Commit the document and push it
    Push,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (settings_path, document_debounce_ms, settings_debounce_ms, self_write_window_ms)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        if let Some(hint) = recovery_hint(&err) {
            eprintln!();
            eprintln!("{}", hint);
        }
        std::process::exit(1);
    }
}

/// Suggestion for the first store error in the chain, if any
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .and_then(StoreError::recovery_suggestion)
}

async fn run(cli: Cli) -> Result<()> {

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;

    // Commands that don't need the library
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => {
                commands::config::show(&config, cli.config.as_ref(), &output)
            }
            Some(ConfigCommands::Set { key, value }) => commands::config::set(
                &config,
                key.clone(),
                value.clone(),
                cli.config.as_ref(),
                &output,
            ),
        };
    }

    let mut library = Library::new(&config);
    library.init().await.context("Failed to load settings")?;
    open_document(&mut library, cli.file, &output).await?;

    match cli.command {
        Commands::Link { command } => handle_link_command(command, &mut library, &output).await,
        Commands::Collection { command } => {
            handle_collection_command(command, &mut library, &output).await
        }
        Commands::SaveAs { path } => save_as(&mut library, path, &output).await,
        Commands::Status => commands::status::show(&library, &output),
        Commands::Watch => {
            commands::require_document(&library)?;
            commands::watch::run(&mut library, &output).await
        }
        Commands::Git { command } => {
            commands::require_document(&library)?;
            match command {
                GitCommands::Pull => commands::git::pull(&mut library, &output).await,
                GitCommands::Push => commands::git::push(&library, &output),
            }
        }
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

/// Open `--file`, or fall back to the last opened file
async fn open_document(
    library: &mut Library,
    file: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let outcome = match file {
        Some(path) => Some(
            library
                .open_path(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => library
            .restore_last()
            .await
            .context("Failed to reopen last file")?,
    };

    if outcome == Some(LoadOutcome::Created) {
        output.message(&format!("Created new bookmark file {}", library.display_name()));
    }
    Ok(())
}

async fn save_as(library: &mut Library, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let mut picker = PromptPicker::new(path);
    if !library
        .save_as(&mut picker)
        .await
        .context("Failed to save document")?
    {
        output.message("Cancelled.");
        return Ok(());
    }

    if let Some(path) = library.documents().path() {
        output.success(&format!("Saved to {}", path.display()));
    }
    Ok(())
}

async fn handle_link_command(
    command: LinkCommands,
    library: &mut Library,
    output: &Output,
) -> Result<()> {
    commands::require_document(library)?;

    match command {
        LinkCommands::Add {
            url,
            title,
            note,
            tag,
        } => commands::link::add(library, url, title, note, tag, output).await,
        LinkCommands::List { tag } => commands::link::list(library, tag, output),
        LinkCommands::Show { id } => commands::link::show(library, id, output),
        LinkCommands::Edit {
            id,
            url,
            title,
            note,
            tags,
        } => {
            let edits = LinkEdits {
                url,
                title,
                note,
                tags: tags.map(normalize_tags),
            };
            commands::link::edit(library, id, edits, output).await
        }
        LinkCommands::Rm { id, yes } => commands::link::delete(library, id, yes, output).await,
    }
}

async fn handle_collection_command(
    command: CollectionCommands,
    library: &mut Library,
    output: &Output,
) -> Result<()> {
    commands::require_document(library)?;

    match command {
        CollectionCommands::Add { title, note } => {
            commands::collection::add(library, title, note, output).await
        }
        CollectionCommands::List => commands::collection::list(library, output),
        CollectionCommands::Show { id } => commands::collection::show(library, id, output),
        CollectionCommands::Rm { id, yes } => {
            commands::collection::delete(library, id, yes, output).await
        }
        CollectionCommands::Attach { collection, link } => {
            commands::collection::attach(library, collection, link, output).await
        }
        CollectionCommands::Detach { collection, link } => {
            commands::collection::detach(library, collection, link, output).await
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("linkbox_core={},linkbox_cli={}", level, level))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use promptkit::config::{self, AppConfig};
use promptkit::index::stats::{LibraryStats, show_stats};
use promptkit::index::types::Subkind;
use promptkit::library::{self, LibraryStore, archive, compose, editor};
use promptkit::output::{self, OutputFormat};
use promptkit::query::types::SearchHit;
use promptkit::search::SearchEngine;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

const QUERY_HELP: &str = "\
Query syntax:
  tag:api            items with a tag starting with 'api'
  type:prompt        pipeline, component, prompts, contexts or rules
  name:auth          display name contains 'auth'
  content:\"a b\"      content contains the phrase; bare words work too
  modified:>7d       modified WITHIN the last 7 days (d, w, m, y)
  modified:<30d      NOT modified for more than 30 days
  status:archived    search the archive as well
  AND, OR, NOT       combine left to right; AND is implied";

#[derive(Parser)]
#[command(name = "promptkit")]
#[command(about = "Local library of reusable LLM prompt components and pipelines")]
#[command(after_help = QUERY_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Query for the browser (when no subcommand is given)
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,

    /// Library root (default: $PROMPTKIT_LIBRARY, config, or nearest parent with components/)
    #[arg(short, long, global = true)]
    library: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the library directory layout
    Init,
    /// Search the library
    #[command(after_help = QUERY_HELP)]
    Search {
        /// Query words, joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,

        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Only return one kind of item
        #[arg(short, long)]
        kind: Option<KindFilter>,
    },
    /// List library items
    List {
        /// Include archived items
        #[arg(short, long)]
        archived: bool,

        #[arg(short, long)]
        output: Option<OutputFormat>,
    },
    /// Show an item's metadata and content
    Show {
        /// Library path, e.g. components/prompts/api-prompt.md
        path: String,
    },
    /// Compose a pipeline or component into the output file
    Activate {
        path: String,

        /// Output file (default: config output_file under the library root)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create a new component or pipeline and open it in $EDITOR
    New {
        /// prompts, contexts, rules or pipeline
        kind: String,

        /// Display name; the file name is derived from it
        name: String,

        /// Comma-separated tags
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Do not open the editor
        #[arg(long)]
        no_edit: bool,
    },
    /// Open an item in $EDITOR
    Edit { path: String },
    /// Move an item into archive/
    Archive { path: String },
    /// Move an item out of archive/
    Unarchive { path: String },
    /// Show library statistics
    Stats {
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },
    /// Browse and search interactively
    Browse {
        #[arg(trailing_var_arg = true)]
        query: Vec<String>,
    },
}

/// Restriction for `search --kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindFilter {
    Pipelines,
    Components,
    Prompts,
    Contexts,
    Rules,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    promptkit::logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if is_parse_error(&err) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn is_parse_error(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<promptkit::Error>().is_some_and(|e| e.is_parse()))
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "using default configuration");
        AppConfig::default()
    });
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let env = std::env::var(config::LIBRARY_ENV).ok();
    let root = config::resolve_library_root(cli.library.as_deref(), env.as_deref(), &config, &cwd);
    let color = !cli.no_color;

    let command = match cli.command {
        Some(command) => command,
        None => Commands::Browse { query: cli.query },
    };

    if let Commands::Init = command {
        let store = LibraryStore::init(&root)
            .with_context(|| format!("Failed to initialize library at {}", root.display()))?;
        println!("Initialized library at {}", store.root().display());
        return Ok(());
    }

    let store = LibraryStore::open(&root)
        .with_context(|| format!("No library at {} (run 'promptkit init')", root.display()))?;
    let show_progress = matches!(command, Commands::List { .. } | Commands::Stats { .. });
    let engine = SearchEngine::new(store.clone())
        .with_weights(config.scoring.clone())
        .with_options(config.eval_options())
        .with_progress(show_progress);

    match command {
        Commands::Init => {}
        Commands::Search {
            query,
            output,
            kind,
        } => {
            let query = query.join(" ");
            let hits = search(&engine, &query, kind)?;
            output::print_hits(&hits, output.unwrap_or(config.default_output), color)
                .context("Failed to write results")?;
        }
        Commands::List { archived, output } => {
            let query = if archived {
                "status:active OR status:archived"
            } else {
                ""
            };
            let hits = engine.search(query)?;
            output::print_hits(&hits, output.unwrap_or(config.default_output), color)
                .context("Failed to write results")?;
        }
        Commands::Show { path } => {
            let logical = logical_path(&store, &path)?;
            let item = engine
                .get(&logical)?
                .ok_or_else(|| promptkit::Error::NotFound(logical.clone()))?;
            let entry = store.entry(&logical)?;
            let raw = entry.read_to_string()?;
            let mut out = output::stdout(color);
            output::write_item(&mut out, &item, &raw, chrono::Utc::now())
                .context("Failed to write item")?;
        }
        Commands::Activate { path, out } => {
            let logical = logical_path(&store, &path)?;
            let composition = compose::activate(&store, &logical)
                .with_context(|| format!("Failed to activate {logical}"))?;
            let target = out.unwrap_or_else(|| config.output_path(store.root()));
            compose::write_output(&target, &composition.text)?;

            println!(
                "Wrote {} component(s) from {logical} to {}",
                composition.included.len(),
                target.display()
            );
            for missing in &composition.missing {
                eprintln!("warning: missing component {missing}");
            }
        }
        Commands::New {
            kind,
            name,
            tags,
            no_edit,
        } => {
            let tags: Vec<String> = tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            let file = match kind.trim().to_lowercase().as_str() {
                "pipeline" | "pipelines" => editor::scaffold_pipeline(&store, &name, &tags)?,
                other => {
                    let subkind: Subkind = other.parse().map_err(anyhow::Error::msg)?;
                    editor::scaffold_component(&store, subkind, &name, &tags)?
                }
            };
            println!("Created {}", file.display());
            if !no_edit {
                editor::open(&file)?;
            }
        }
        Commands::Edit { path } => {
            let logical = logical_path(&store, &path)?;
            let entry = store.entry(&logical)?;
            editor::open(&entry.file)?;
        }
        Commands::Archive { path } => {
            let logical = logical_path(&store, &path)?;
            let moved = archive::archive(&store, &logical)?;
            println!("Archived {logical} -> {moved}");
        }
        Commands::Unarchive { path } => {
            let logical = logical_path(&store, &path)?;
            let moved = archive::unarchive(&store, &logical)?;
            println!("Restored {logical} -> {moved}");
        }
        Commands::Stats { output } => {
            let index = engine.ensure_index(true)?;
            let stats = LibraryStats::from_index(&index);
            match output.unwrap_or(OutputFormat::Text) {
                OutputFormat::Text => show_stats(store.root(), &stats),
                format => output::write_stats(&mut std::io::stdout(), &stats, format)
                    .context("Failed to write stats")?,
            }
        }
        Commands::Browse { query } => {
            let query = (!query.is_empty()).then(|| query.join(" "));
            browse(store, engine, &config, query)?;
        }
    }

    Ok(())
}

fn search(engine: &SearchEngine, query: &str, kind: Option<KindFilter>) -> Result<Vec<SearchHit>> {
    let only = |subkind: Subkind| -> Result<Vec<SearchHit>> {
        let results = engine.search_components_by_kinds(query, &[subkind])?;
        Ok(results.bucket(subkind).to_vec())
    };

    Ok(match kind {
        None => engine.search(query)?,
        Some(KindFilter::Pipelines) => engine.search_pipelines(query)?,
        Some(KindFilter::Components) => {
            let mut hits = engine.search(query)?;
            hits.retain(|hit| hit.item.is_component());
            hits
        }
        Some(KindFilter::Prompts) => only(Subkind::Prompts)?,
        Some(KindFilter::Contexts) => only(Subkind::Contexts)?,
        Some(KindFilter::Rules) => only(Subkind::Rules)?,
    })
}

/// Accept logical paths as well as filesystem paths inside the library
fn logical_path(store: &LibraryStore, arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if path.is_absolute() {
        return store
            .logical_path(path)
            .with_context(|| {
                format!("{arg} is not inside the library at {}", store.root().display())
            });
    }
    Ok(library::normalize_logical(arg))
}

#[cfg(feature = "interactive")]
fn browse(
    store: LibraryStore,
    engine: SearchEngine,
    config: &AppConfig,
    query: Option<String>,
) -> Result<()> {
    let output_path = config.output_path(store.root());
    promptkit::tui::run(store, std::sync::Arc::new(engine), output_path, query)
}

#[cfg(not(feature = "interactive"))]
fn browse(
    _store: LibraryStore,
    _engine: SearchEngine,
    _config: &AppConfig,
    _query: Option<String>,
) -> Result<()> {
    anyhow::bail!("promptkit was built without the 'interactive' feature; use 'promptkit search'")
}

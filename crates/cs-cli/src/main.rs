//! CLI entry point for colsync.
//!
//! Watches collection directories and prints every notification as a JSON
//! line, and exposes the format dispatcher for one-off parsing, conversion
//! and detection.
//!
//! # Usage
//!
//! ```bash
//! colsync [OPTIONS] <COMMAND>
//!
//! # Watch a collection until Ctrl-C
//! colsync watch ./collections/petstore --ignore drafts
//!
//! # Print the canonical JSON of a request
//! colsync parse ./collections/petstore/users/list.bru
//!
//! # Convert a request to the yaml dialect
//! colsync convert ./collections/petstore/users/list.bru --to yaml
//!
//! # Print the detected dialect
//! colsync detect ./collections/petstore/users/list.yml
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, WrapErr};
use cs_core::SyncConfig;
use cs_format::{Document, DocumentKind, Format, FormatChoice, ParseOptions, StringifyOptions};
use cs_lanes::LaneRouter;
use cs_watcher::{ChannelSink, CollectionId, Notification, WatcherRegistry};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Collection synchronization engine.
///
/// Watches collection directories, parses the three supported dialects, and
/// reports changes as JSON lines.
#[derive(Parser)]
#[command(name = "colsync", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file (`{"watch": {...}, "lanes": {...}}`).
    #[arg(short, long, global = true, env = "COLSYNC_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Watch a collection and print notifications as JSON lines.
    Watch {
        /// Collection root directory.
        root: Utf8PathBuf,

        /// Collection id (defaults to the root directory name).
        #[arg(long)]
        collection_id: Option<String>,

        /// Root-relative prefixes to ignore, on top of `node_modules` and `.git`.
        #[arg(long, env = "COLSYNC_IGNORE", value_delimiter = ',')]
        ignore: Vec<String>,

        /// Use the polling backend instead of native notifications.
        #[arg(long)]
        polling: bool,

        /// Parse every file inline instead of on the size lanes.
        #[arg(long)]
        no_lanes: bool,
    },

    /// Parse a file and print its canonical JSON.
    Parse {
        /// File to parse.
        file: Utf8PathBuf,

        /// Document kind (inferred from the path when omitted).
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Source dialect: `auto`, `primary`, `yaml` or `open-collection`.
        #[arg(short, long, default_value = "auto")]
        format: FormatChoice,
    },

    /// Convert a file to another dialect.
    Convert {
        /// File to convert.
        file: Utf8PathBuf,

        /// Target dialect: `primary`, `yaml` or `open-collection`.
        #[arg(short, long)]
        to: Format,

        /// Document kind (inferred from the path when omitted).
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Source dialect.
        #[arg(short, long, default_value = "auto")]
        from: FormatChoice,
    },

    /// Print the dialect detected from a file's content.
    Detect {
        /// File to inspect.
        file: Utf8PathBuf,
    },
}

/// Document kind argument.
#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    /// A request file.
    Request,
    /// A `folder.*` file.
    Folder,
    /// A `collection.*` file.
    Collection,
    /// An environment file.
    Environment,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Request => Self::Request,
            KindArg::Folder => Self::Folder,
            KindArg::Collection => Self::Collection,
            KindArg::Environment => Self::Environment,
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration file, or defaults when none is given.
fn load_config(path: Option<&Utf8Path>) -> color_eyre::Result<SyncConfig> {
    let config = match path {
        Some(path) => SyncConfig::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load configuration from {path}"))?,
        None => SyncConfig::default(),
    };
    Ok(config)
}

/// Infers the document kind from where a file sits in a collection.
fn infer_kind(path: &Utf8Path) -> DocumentKind {
    let name = path.file_name().unwrap_or_default().to_ascii_lowercase();
    let stem = name.split('.').next().unwrap_or_default();
    let in_environments = path
        .parent()
        .and_then(Utf8Path::file_name)
        .is_some_and(|dir| dir == cs_watcher::classify::ENVIRONMENTS_DIR);

    if in_environments {
        DocumentKind::Environment
    } else if stem == "collection" || stem == "opencollection" {
        DocumentKind::Collection
    } else if stem == "folder" {
        DocumentKind::Folder
    } else {
        DocumentKind::Request
    }
}

/// Reads and parses `file` as `kind`.
fn read_document(file: &Utf8Path, kind: DocumentKind, format: FormatChoice) -> color_eyre::Result<Document> {
    let content =
        std::fs::read_to_string(file).wrap_err_with(|| format!("Failed to read {file}"))?;
    let format = match format {
        FormatChoice::Auto => cs_watcher::format_choice(file),
        explicit @ FormatChoice::Explicit(_) => explicit,
    };

    let mut document = cs_format::parse_document(kind, &content, ParseOptions::new(format))
        .wrap_err_with(|| format!("Failed to parse {file}"))?;
    if let Document::Environment(environment) = &mut document {
        if environment.name.is_empty() {
            environment.name = file.file_stem().unwrap_or_default().to_owned();
        }
    }
    Ok(document)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Watches one collection until Ctrl-C (or SIGTERM on Unix).
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the lanes cannot start,
/// or the root cannot be watched.
async fn run_watch(
    mut config: SyncConfig,
    root: &Utf8Path,
    collection_id: Option<String>,
    ignore: &[String],
    polling: bool,
    no_lanes: bool,
) -> color_eyre::Result<()> {
    config.watch.use_polling |= polling;
    config.validate().wrap_err("Invalid configuration")?;

    let collection_id = CollectionId::new(collection_id.unwrap_or_else(|| {
        root.file_name().map_or_else(|| root.to_string(), ToOwned::to_owned)
    }));

    let (sink, mut notifications) = ChannelSink::new();
    let mut registry = WatcherRegistry::new(config.watch.clone(), Arc::new(sink));
    if !no_lanes {
        let lanes = LaneRouter::with_rayon(&config.lanes).wrap_err("Failed to start lanes")?;
        registry = registry.with_lanes(Arc::new(lanes));
    }

    info!(path = %root, collection = %collection_id, polling = config.watch.use_polling, "Starting watch");
    registry
        .start_watch(root, collection_id, ignore)
        .await
        .wrap_err_with(|| format!("Failed to watch {root}"))?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(notification) = notifications.recv() => print_notification(&notification)?,
            result = &mut shutdown => {
                result?;
                info!("Shutting down");
                break;
            }
        }
    }

    registry.shutdown().await;
    while let Ok(notification) = notifications.try_recv() {
        print_notification(&notification)?;
    }
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() -> color_eyre::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

/// Prints the canonical JSON of `file`.
fn run_parse(file: &Utf8Path, kind: Option<KindArg>, format: FormatChoice) -> color_eyre::Result<()> {
    let kind = kind.map_or_else(|| infer_kind(file), DocumentKind::from);
    let document = read_document(file, kind, format)?;
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| eyre!("Failed to serialize JSON: {}", e))?;
    write_stdout(&json)
}

/// Prints `file` stringified in the `to` dialect.
fn run_convert(
    file: &Utf8Path,
    to: Format,
    kind: Option<KindArg>,
    from: FormatChoice,
) -> color_eyre::Result<()> {
    let kind = kind.map_or_else(|| infer_kind(file), DocumentKind::from);
    let document = read_document(file, kind, from)?;
    let content = cs_format::stringify_document(&document, StringifyOptions::new(to))
        .wrap_err_with(|| format!("Failed to write {file} as {to}"))?;
    write_stdout(content.trim_end())
}

/// Prints the dialect detected from the content of `file`.
fn run_detect(file: &Utf8Path) -> color_eyre::Result<()> {
    let content =
        std::fs::read_to_string(file).wrap_err_with(|| format!("Failed to read {file}"))?;
    let format = cs_format::detect_from_content(&content);
    tracing::debug!(
        path = %file,
        by_name = %cs_format::detect_from_filename(file.as_str()),
        "Detected dialect"
    );
    write_stdout(format.as_str())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_notification(notification: &Notification) -> color_eyre::Result<()> {
    let line = serde_json::to_string(notification)
        .map_err(|e| eyre!("Failed to serialize notification: {}", e))?;
    write_stdout(&line)
}

fn write_stdout(text: &str) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{text}")?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match cli.command {
        Commands::Watch {
            root,
            collection_id,
            ignore,
            polling,
            no_lanes,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_watch(config, &root, collection_id, &ignore, polling, no_lanes).await
        }
        Commands::Parse { file, kind, format } => run_parse(&file, kind, format),
        Commands::Convert {
            file,
            to,
            kind,
            from,
        } => run_convert(&file, to, kind, from),
        Commands::Detect { file } => run_detect(&file),
    }
}

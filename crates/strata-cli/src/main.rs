//! Strata - version histories for a hierarchical content repository
//!
//! The `strata` command manages version histories stored in a JSON node store.
//!
//! ## Commands
//!
//! - `init`: Create a version history holding only a root version
//! - `checkin`: Check in a JSON state file as a new version
//! - `label`: Assign, move or remove a version label
//! - `remove`: Remove a version, reconnecting its neighbours
//! - `log`: List the versions of a history
//! - `show`: Show one version and its frozen content
//! - `check`: Verify graph and label invariants

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use strata_core::{
    HistoryConfig, HistoryContext, JsonSnapshotWriter, NoopLifecycle, Version, VersionHistory,
    WorkItem,
};
use strata_state::{FsNodeStore, NodeId, NodeStore, StoreConfig, DEFAULT_STORE_FILE};

#[derive(Parser)]
#[command(name = "strata")]
#[command(author = "Strata Developers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Version histories for hierarchical content", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Store directory
    #[arg(long, global = true, env = "STRATA_HOME", default_value = ".strata")]
    home: PathBuf,

    /// Store file name inside the store directory
    #[arg(long, global = true, env = "STRATA_STORE_FILE", default_value = DEFAULT_STORE_FILE)]
    store_file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a version history for a new versionable item
    Init {
        /// History name
        history: String,

        /// Primary type of the versioned item
        #[arg(short = 't', long, default_value = "document")]
        primary_type: String,
    },

    /// Check in a JSON state file as a new version
    Checkin {
        /// History name
        history: String,

        /// Name of the new version
        name: String,

        /// Path to the state file (JSON)
        #[arg(short, long)]
        state: PathBuf,

        /// Predecessor version names (default: all current heads)
        #[arg(short, long = "pred")]
        predecessors: Vec<String>,
    },

    /// Assign a label to a version, or remove it when no version is given
    Label {
        /// History name
        history: String,

        /// Label name
        label: String,

        /// Version to label
        #[arg(long = "to")]
        target: Option<String>,

        /// Take the label over from the version currently holding it
        #[arg(short, long = "move")]
        move_label: bool,
    },

    /// Remove a version
    Remove {
        /// History name
        history: String,

        /// Version to remove
        name: String,
    },

    /// List versions, oldest first
    Log {
        /// History name
        history: String,
    },

    /// Show a version and its frozen content
    Show {
        /// History name
        history: String,

        /// Version name, or `@label`
        name: String,
    },

    /// Verify graph and label invariants
    Check {
        /// History name
        history: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let env_config = HistoryConfig::from_env();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        env_config.log_level
    };
    let json = cli.json || env_config.log_json;
    let config = env_config.with_log_json(json).with_log_level(level);
    strata_core::telemetry::init_from_config(&config);

    let store_config = StoreConfig::new(&cli.home).with_file_name(&cli.store_file);
    let store = FsNodeStore::open(&store_config)
        .with_context(|| format!("Failed to open store at {:?}", store_config.store_path()))?;
    let ctx = HistoryContext::new(Arc::new(NoopLifecycle))
        .with_writer(Arc::new(JsonSnapshotWriter))
        .with_config(config);

    match cli.command {
        Commands::Init {
            history,
            primary_type,
        } => cmd_init(store, ctx, &history, &primary_type),
        Commands::Checkin {
            history,
            name,
            state,
            predecessors,
        } => cmd_checkin(
            open_history(store, ctx, &history)?,
            &name,
            &state,
            &predecessors,
        ),
        Commands::Label {
            history,
            label,
            target,
            move_label,
        } => cmd_label(
            open_history(store, ctx, &history)?,
            &label,
            target.as_deref(),
            move_label,
        ),
        Commands::Remove { history, name } => {
            cmd_remove(open_history(store, ctx, &history)?, &name)
        }
        Commands::Log { history } => cmd_log(&open_history(store, ctx, &history)?, cli.json),
        Commands::Show { history, name } => {
            cmd_show(&open_history(store, ctx, &history)?, &name, cli.json)
        }
        Commands::Check { history } => cmd_check(&open_history(store, ctx, &history)?),
    }
}

type History = VersionHistory<FsNodeStore>;

/// Open the history stored under the store root as `name`.
fn open_history(store: FsNodeStore, ctx: HistoryContext, name: &str) -> Result<History> {
    let root = store.root_id();
    let node = store
        .child(&root, name)?
        .with_context(|| format!("No version history named '{}'", name))?;
    VersionHistory::load(store, &node.id, ctx)
        .with_context(|| format!("Failed to load version history '{}'", name))
}

/// Create a version history for a fresh versionable item
fn cmd_init(store: FsNodeStore, ctx: HistoryContext, name: &str, primary_type: &str) -> Result<()> {
    info!("Initializing version history '{}'", name);

    let item = WorkItem::new(NodeId::new(), primary_type);
    let root = store.root_id();
    let history = VersionHistory::create(store, &root, name, &item, ctx)
        .with_context(|| format!("Failed to create version history '{}'", name))?;

    println!("Initialized version history '{}'", name);
    println!("History id:     {}", history.history_id());
    println!("Versionable id: {}", history.versionable_id());
    Ok(())
}

fn read_state(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse state as JSON")
}

/// Check in a state file
fn cmd_checkin(
    mut history: History,
    version: &str,
    state_path: &Path,
    predecessors: &[String],
) -> Result<()> {
    let state = read_state(state_path)?;

    let preds: Vec<NodeId> = if predecessors.is_empty() {
        history.heads().iter().map(Version::id).collect()
    } else {
        predecessors
            .iter()
            .map(|name| history.version(name).map(|v| v.id()))
            .collect::<strata_core::Result<_>>()?
    };
    let primary_type = history.root_version()?.frozen()?.primary_type;

    let item = WorkItem::new(history.versionable_id(), primary_type)
        .with_predecessors(preds)
        .with_state(state);
    let created = history
        .checkin(version, &item)
        .with_context(|| format!("Failed to check in '{}'", version))?;

    println!("Checked in {} ({})", version, created.id().short());
    Ok(())
}

/// Assign, move or remove a label
fn cmd_label(
    mut history: History,
    label: &str,
    version: Option<&str>,
    move_label: bool,
) -> Result<()> {
    let prev = history.set_label(version, label, move_label)?;
    let prev_name = prev.map(|v| v.name()).transpose()?;

    match (version, prev_name) {
        (Some(v), Some(p)) if p != v => println!("Moved label '{}' from {} to {}", label, p, v),
        (Some(v), _) => println!("Label '{}' -> {}", label, v),
        (None, Some(p)) => println!("Removed label '{}' from {}", label, p),
        (None, None) => println!("Label '{}' was not assigned", label),
    }
    Ok(())
}

/// Remove a version
fn cmd_remove(mut history: History, version: &str) -> Result<()> {
    history
        .remove_version(version)
        .with_context(|| format!("Failed to remove '{}'", version))?;
    println!("Removed version {}", version);
    Ok(())
}

#[derive(Serialize)]
struct VersionView {
    id: String,
    name: String,
    created_at: String,
    predecessors: Vec<String>,
    successors: Vec<String>,
    labels: Vec<String>,
    digest: String,
}

impl VersionView {
    fn new(history: &History, version: &Version) -> Result<Self> {
        let names = |ids: Vec<NodeId>| -> Result<Vec<String>> {
            let mut names = ids
                .iter()
                .map(|id| history.version_by_id(id).and_then(|v| v.name()))
                .collect::<strata_core::Result<Vec<_>>>()?;
            names.sort();
            Ok(names)
        };
        Ok(Self {
            id: version.id().to_string(),
            name: version.name()?,
            created_at: version
                .created_at()?
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            predecessors: names(version.predecessors()?)?,
            successors: names(version.successors()?)?,
            labels: version.labels()?,
            digest: version.frozen()?.digest,
        })
    }
}

/// List versions
fn cmd_log(history: &History, json: bool) -> Result<()> {
    let views = history
        .versions()
        .iter()
        .map(|v| VersionView::new(history, v))
        .collect::<Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    for view in views {
        println!("version {} ({})", view.name, &view.id[..8]);
        println!("Date:   {}", view.created_at);
        if !view.predecessors.is_empty() {
            println!("Parents: {}", view.predecessors.join(", "));
        }
        if !view.labels.is_empty() {
            println!("Labels:  {}", view.labels.join(", "));
        }
        println!();
    }
    Ok(())
}

/// Show a version and its frozen content
fn cmd_show(history: &History, reference: &str, json: bool) -> Result<()> {
    let version = match reference.strip_prefix('@') {
        Some(label) => match history.version_by_label(label) {
            Some(v) => v,
            None => bail!("No version labelled '{}'", label),
        },
        None => history.version(reference)?,
    };
    let view = VersionView::new(history, &version)?;
    let frozen = version.frozen()?;
    let content: serde_json::Value = if frozen.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&frozen.content).context("Frozen content is not JSON")?
    };

    if json {
        let out = serde_json::json!({ "version": view, "content": content });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("version {}", view.name);
    println!("Id:         {}", view.id);
    println!("Date:       {}", view.created_at);
    println!("Parents:    {}", view.predecessors.join(", "));
    println!("Children:   {}", view.successors.join(", "));
    println!("Labels:     {}", view.labels.join(", "));
    println!("Digest:     {}", view.digest);
    println!("Verified:   {}", frozen.verify());
    println!();
    println!("{}", serde_json::to_string_pretty(&content)?);
    Ok(())
}

/// Verify invariants
fn cmd_check(history: &History) -> Result<()> {
    history.check_invariants()?;
    let corrupt: Vec<String> = history
        .versions()
        .iter()
        .filter(|v| v.frozen().map(|f| !f.verify()).unwrap_or(true))
        .map(|v| v.name().unwrap_or_else(|_| v.id().to_string()))
        .collect();
    if !corrupt.is_empty() {
        bail!("Frozen content digest mismatch: {}", corrupt.join(", "));
    }
    println!(
        "OK: {} versions, {} labels",
        history.num_versions(),
        history.version_labels().len()
    );
    Ok(())
}

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use layermap_app::{BoardSettings, InteractionController};
use layermap_core::{LayoutDirection, NodeStatus};
use layermap_graph::{LayeredLayouter, Layouter, serializer};
use layermap_storage::{SnapshotStore, Storage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Board settings file (kind preset, layout tuning, connect policy)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite snapshot database
    #[arg(long, global = true, default_value = "layermap.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out a document and print it with updated positions
    Layout {
        input: PathBuf,
        /// TB, BT, LR or RL; defaults to the configured direction
        #[arg(short, long)]
        direction: Option<LayoutDirection>,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Run the layout on a worker thread
        #[arg(long)]
        background: bool,
    },
    /// Check a document against the configured kind set
    Validate { input: PathBuf },
    /// Print counts, ranks and crossings for a document
    Stats {
        input: PathBuf,
        #[arg(short, long)]
        direction: Option<LayoutDirection>,
    },
    /// Store a document in the snapshot database
    Save {
        input: PathBuf,
        /// Snapshot key; defaults to the configured storage key
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Print a stored snapshot
    Load {
        #[arg(short, long)]
        key: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List stored snapshots
    Keys,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => BoardSettings::load(path)?,
        None => BoardSettings::default(),
    };

    match args.command {
        Command::Layout {
            input,
            direction,
            output,
            background,
        } => {
            let mut controller = open_board(&settings, &input)?;
            let direction = direction.unwrap_or(settings.layout.direction);
            let summary = if background {
                let job = controller.spawn_relayout(direction);
                controller.commit_layout(job.wait()?)?
            } else {
                controller.relayout(direction)
            };
            tracing::info!(
                "Laid out {} nodes in {} ranks ({} crossings)",
                summary.nodes,
                summary.layers,
                summary.crossings
            );
            let json = serializer::to_json_pretty(&controller.export())?;
            emit(&json, output.as_deref())?;
        }
        Command::Validate { input } => {
            let controller = open_board(&settings, &input)?;
            println!(
                "{}: valid ({} nodes, {} edges, kind set: {})",
                input.display(),
                controller.model().node_count(),
                controller.model().edge_count(),
                controller
                    .model()
                    .kind_set()
                    .map_or("any", |set| set.name.as_str())
            );
        }
        Command::Stats { input, direction } => {
            let controller = open_board(&settings, &input)?;
            print_stats(&settings, &controller, direction);
        }
        Command::Save { input, key } => {
            let controller = open_board(&settings, &input)?;
            let key = key.unwrap_or_else(|| settings.storage_key.clone());
            let storage = Storage::open(&args.db)?;
            controller.save(&storage, &key)?;
            println!("Saved `{}` to {}", key, args.db.display());
        }
        Command::Load { key, output } => {
            let key = key.unwrap_or_else(|| settings.storage_key.clone());
            let storage = Storage::open(&args.db)?;
            let mut controller = settings.controller();
            if !controller.load(&storage, &key)? {
                bail!("No snapshot stored under `{}` in {}", key, args.db.display());
            }
            let json = serializer::to_json_pretty(&controller.export())?;
            emit(&json, output.as_deref())?;
        }
        Command::Keys => {
            let storage = Storage::open(&args.db)?;
            let infos = storage.list()?;
            if infos.is_empty() {
                println!("No snapshots in {}", args.db.display());
            }
            for info in infos {
                println!(
                    "{}\t{} nodes\t{} edges\tv{}\t{}",
                    info.key,
                    info.node_count,
                    info.edge_count,
                    info.version.as_deref().unwrap_or("-"),
                    info.saved_at.to_rfc3339()
                );
            }
            tracing::debug!("{} key(s) in store", storage.keys()?.len());
        }
    }

    Ok(())
}

/// Reads and validates a document into a controller configured by `settings`.
fn open_board(settings: &BoardSettings, input: &Path) -> Result<InteractionController> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document = serializer::from_json(&json)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    let mut controller = settings.controller();
    controller
        .import(document)
        .with_context(|| format!("Rejected {}", input.display()))?;
    Ok(controller)
}

fn emit(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn print_stats(
    settings: &BoardSettings,
    controller: &InteractionController,
    direction: Option<LayoutDirection>,
) {
    let model = controller.model();
    println!("nodes: {}", model.node_count());
    println!("edges: {}", model.edge_count());

    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for node in model.nodes() {
        *by_kind.entry(node.kind.as_str()).or_default() += 1;
    }
    for (kind, count) in by_kind {
        println!("  kind {kind}: {count}");
    }
    for status in NodeStatus::ALL {
        println!("  status {status}: {}", model.nodes_by_status(status).count());
    }

    let mut config = settings.layout.clone();
    if let Some(direction) = direction {
        config.direction = direction;
    }
    let layout = LayeredLayouter::new(config).execute(model);
    println!("ranks: {}", layout.layer_count());
    println!("back edges: {}", layout.back_edges().len());
    println!("self-loops: {}", layout.self_loops().len());
    println!(
        "crossings: {} after {} sweep(s){}",
        layout.crossings(),
        layout.sweeps(),
        if layout.converged() { "" } else { " (budget exhausted)" }
    );
    let bounds = layout.bounds();
    println!("bounds: {} x {}", bounds.width, bounds.height);
}

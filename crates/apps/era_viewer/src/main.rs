use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formats::EraConfig;
use layers::{LayerKey, LoadedLayer};
use scene::ViewerSession;
use streaming::{CommitStatus, LayerStore, LoadSummary, fetcher_for_root, reload};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Historical era map viewer core")]
struct Args {
    /// Era configuration JSON (default: built-in Kilpola eras)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory or base URL the shape archives are resolved against
    #[arg(long)]
    data_root: Option<String>,

    /// Base URL of the era raster tiles
    #[arg(long)]
    tile_root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration as JSON
    Config,

    /// Load every era dataset and report per-shape results
    Load {
        /// Emit the summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Load, apply toggles by layer index and print the resulting view state
    Plan {
        /// Layer indices whose raster tiles are shown
        #[arg(long = "tiles", value_delimiter = ',')]
        tiles: Vec<usize>,

        /// Layer indices whose vector overlay is shown
        #[arg(long = "overlay", value_delimiter = ',')]
        overlays: Vec<usize>,

        /// Use the satellite base map
        #[arg(long)]
        satellite: bool,

        /// Start with music paused
        #[arg(long)]
        music_paused: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .or_else(|| env::var("ERA_CONFIG").ok().map(PathBuf::from));
    let mut config = match config_path {
        Some(path) => {
            info!("reading era config from {}", path.display());
            EraConfig::load(&path)?
        }
        None => EraConfig::default(),
    };
    if let Some(root) = args.tile_root.or_else(|| env::var("ERA_TILE_ROOT").ok()) {
        config.tiles.root = root;
    }
    let data_root = args
        .data_root
        .unwrap_or_else(|| env::var("ERA_DATA_ROOT").unwrap_or_else(|_| "public".to_string()));

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Load { json } => {
            let layers = load(&config, &data_root).await?;
            let summary = LoadSummary::of(&layers);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_report(&layers, &summary);
            }
        }
        Command::Plan {
            tiles,
            overlays,
            satellite,
            music_paused,
        } => {
            let layers = load(&config, &data_root).await?;
            let mut session = ViewerSession::new(config);
            session.replace_layers(layers);

            for index in tiles {
                session.toggle_tiles(&layer_key(&session, index)?);
            }
            for index in overlays {
                session.toggle_overlay(&layer_key(&session, index)?);
            }
            if satellite {
                session.toggle_base_map();
            }
            if music_paused {
                session.toggle_music_paused();
            }

            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
        }
    }

    Ok(())
}

async fn load(
    config: &EraConfig,
    data_root: &str,
) -> Result<Vec<LoadedLayer>, Box<dyn std::error::Error>> {
    let fetcher = fetcher_for_root(data_root);
    let store = LayerStore::shared();
    info!("loading era datasets from {data_root}");

    if reload(&store, fetcher.as_ref(), &config.eras).await == CommitStatus::Discarded {
        return Err("load pass was discarded".into());
    }

    let mut guard = store.write().await;
    if let Some(err) = guard.error() {
        return Err(format!("load failed: {err}").into());
    }
    let layers = guard.layers().to_vec();
    guard.teardown();
    Ok(layers)
}

fn layer_key(session: &ViewerSession, index: usize) -> Result<LayerKey, String> {
    session.era().key_of(index).ok_or_else(|| {
        format!(
            "no layer at index {index} ({} layers configured)",
            session.layers().len()
        )
    })
}

fn print_report(layers: &[LoadedLayer], summary: &LoadSummary) {
    for (index, layer) in layers.iter().enumerate() {
        let key = layer.key(index);
        if let Some(err) = &layer.error {
            warn!("layer {key} failed");
            println!("{key}: FAILED {err}");
            continue;
        }
        let tiles = layer.title().unwrap_or("-");
        println!("{key} (tiles: {tiles})");
        for shape in &layer.shapes {
            match shape.geojson() {
                Some(fc) => println!(
                    "  ok     {:<10} {} ({} features)",
                    shape.spec.name,
                    shape.spec.resource,
                    fc.len()
                ),
                None => println!(
                    "  error  {:<10} {}",
                    shape.spec.name,
                    shape.error().unwrap_or_default()
                ),
            }
        }
    }
    println!(
        "{} layers ({} failed), {}/{} shapes, {} features",
        summary.layers,
        summary.layers_failed,
        summary.shapes_loaded,
        summary.shapes_loaded + summary.shapes_failed,
        summary.features
    );
}

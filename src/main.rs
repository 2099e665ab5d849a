//! tile-courier - fetch vector tiles through a tile source and worker pool.
//!
//! This binary wires the HTTP fetcher, the worker pool and a vector tile
//! source together for one-off fetches and source inspection.

use clap::Parser;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tile_courier::{
    codec,
    config::{Cli, Command, FetchConfig, InspectConfig},
    io::{ByteFetcher, HttpFetcher},
    source::{
        OverscaledTileId, SourceContext, Tile, TileCompletion, TileData, TileDataSink, TileUid,
        VectorTileSource,
    },
    worker::WorkerPool,
    SourceError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Fetch(config) => run_fetch(config).await,
        Command::Inspect(config) => run_inspect(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tile_courier=debug"
    } else {
        "tile_courier=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn http_fetcher() -> Option<Arc<dyn ByteFetcher>> {
    match HttpFetcher::new() {
        Ok(fetcher) => Some(Arc::new(fetcher)),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            None
        }
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

/// Keeps the last payload applied to the tile.
#[derive(Clone, Default)]
struct CapturedTile(Arc<Mutex<Option<Option<TileData>>>>);

impl TileDataSink for CapturedTile {
    fn load_vector_data(&mut self, data: Option<&TileData>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(data.cloned());
        }
    }

    fn unload_vector_data(&mut self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = None;
        }
    }
}

async fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let Ok(tile_id) = config.tile_id() else {
        return ExitCode::FAILURE;
    };

    let Some(fetcher) = http_fetcher() else {
        return ExitCode::FAILURE;
    };
    let (pool, mut completions) = WorkerPool::spawn(config.workers, Arc::clone(&fetcher));
    info!("Started {} tile worker(s)", pool.size());

    let context = SourceContext::new(Arc::new(pool), fetcher)
        .with_refresh_expired_tiles(config.refresh_expired)
        .with_pixel_ratio(config.pixel_ratio);

    let mut source = match VectorTileSource::new("cli", config.options(), context) {
        Ok(source) => source,
        Err(e) => {
            error!("Invalid source: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = source.load().await {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let tile_id = OverscaledTileId::from_canonical(tile_id);
    if !source.has_tile(&tile_id) {
        warn!("Tile {} is outside the source bounds", tile_id);
    }

    let captured = CapturedTile::default();
    let mut tile = Tile::new(TileUid(1), tile_id, Box::new(captured.clone()));

    let (done_tx, done_rx) = oneshot::channel();
    source.load_tile(
        &mut tile,
        Box::new(move |result| {
            let _ = done_tx.send(result);
        }),
    );

    let outcome = drive_tile(&source, &mut tile, &mut completions, done_rx).await;
    source.unload_tile(&mut tile);

    if let Err(e) = outcome {
        error!("Tile {} failed: {}", tile_id, e);
        return ExitCode::FAILURE;
    }

    let data = captured.0.lock().ok().and_then(|slot| slot.clone()).flatten();
    report_tile(&config, &tile, data.as_ref())
}

/// Feed worker completions to the source until the tile callback fires.
async fn drive_tile(
    source: &VectorTileSource,
    tile: &mut Tile,
    completions: &mut mpsc::UnboundedReceiver<TileCompletion>,
    mut done: oneshot::Receiver<Result<(), SourceError>>,
) -> Result<(), String> {
    loop {
        tokio::select! {
            result = &mut done => {
                return match result {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(_) => Err("tile request was dropped".to_string()),
                };
            }
            completion = completions.recv() => match completion {
                Some(completion) if completion.uid == tile.uid() => {
                    source.complete_tile(tile, completion.result);
                }
                Some(_) => {}
                None => return Err("worker pool shut down".to_string()),
            }
        }
    }
}

fn report_tile(config: &FetchConfig, tile: &Tile, data: Option<&TileData>) -> ExitCode {
    let Some(data) = data else {
        println!("Tile {}: no data", tile.tile_id());
        return ExitCode::SUCCESS;
    };

    println!("Tile {}: {} bytes", tile.tile_id(), data.payload.len());
    if codec::is_gzip_framed(&data.payload) {
        warn!("Payload is still gzip-framed after decoding");
    }
    if let Some(timing) = tile.resource_timing() {
        println!("  Fetched {} in {:?}", timing.url, timing.duration);
    }
    if let Some(expiry) = tile.expiry() {
        if let Some(ref cache_control) = expiry.cache_control {
            println!("  Cache-Control: {}", cache_control);
        }
        if let Some(ref expires) = expiry.expires {
            println!("  Expires: {}", expires);
        }
    }

    if let Some(ref path) = config.output {
        if let Err(e) = std::fs::write(path, &data.payload) {
            error!("Failed to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        println!("  Written to {}", path.display());
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(fetcher) = http_fetcher() else {
        return ExitCode::FAILURE;
    };
    let (pool, _completions) = WorkerPool::spawn(1, Arc::clone(&fetcher));
    let context = SourceContext::new(Arc::new(pool), fetcher);

    let mut source = match VectorTileSource::new("inspect", config.source.options(), context) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = source.load().await {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(descriptor) = source.descriptor() else {
        eprintln!("Error: source resolved without metadata");
        return ExitCode::FAILURE;
    };
    let archive = source
        .archive()
        .map(|handle| (handle.location().to_string(), handle.tile_count()));

    if config.json {
        let json = serde_json::json!({
            "tiles": descriptor.tiles,
            "minzoom": descriptor.minzoom,
            "maxzoom": descriptor.maxzoom,
            "scheme": descriptor.scheme,
            "tileSize": descriptor.tile_size,
            "bounds": descriptor.bounds.map(|b| b.to_array()),
            "attribution": descriptor.attribution,
            "vectorLayers": descriptor.vector_layer_ids,
            "archive": archive.as_ref().map(|(location, count)| serde_json::json!({
                "location": location,
                "tiles": count,
            })),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("Source");
    println!("══════");
    for template in &descriptor.tiles {
        println!("  Tiles:   {}", template);
    }
    println!("  Zoom:    {}-{}", descriptor.minzoom, descriptor.maxzoom);
    println!("  Scheme:  {:?}", descriptor.scheme);
    if let Some(bounds) = descriptor.bounds {
        println!("  Bounds:  {:?}", bounds.to_array());
    }
    if let Some(ref attribution) = descriptor.attribution {
        println!("  Attribution: {}", attribution);
    }
    if !descriptor.vector_layer_ids.is_empty() {
        println!("  Layers:  {}", descriptor.vector_layer_ids.join(", "));
    }
    if let Some((location, count)) = archive {
        println!("  Archive: {} ({} tiles)", location, count);
    }

    ExitCode::SUCCESS
}

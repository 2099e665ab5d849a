//! Configuration management for tile-courier.
//!
//! Options come from command-line arguments via clap, with environment
//! variables prefixed `TILE_` as fallbacks:
//!
//! - `TILE_SOURCE` - TileJSON URL of the source
//! - `TILE_TILES` - Inline tile URL templates (comma-separated)
//! - `TILE_SCHEME` - Tile row scheme, `xyz` or `tms` (default: xyz)
//! - `TILE_WORKERS` - Number of tile workers (default: 4)
//! - `TILE_PIXEL_RATIO` - Device pixel ratio passed to workers (default: 1.0)
//! - `TILE_RESOURCE_TIMING` - Record fetch timings (default: false)
//! - `TILE_REFRESH_EXPIRED` - Track cache headers on loaded tiles (default: false)
//! - `TILE_OUTPUT` - Write the fetched tile to this file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::source::{CanonicalTileId, Scheme, SourceOptions};
use crate::worker::DEFAULT_WORKER_COUNT;

// =============================================================================
// Default Values
// =============================================================================

/// Default device pixel ratio.
pub const DEFAULT_PIXEL_RATIO: f32 = 1.0;

/// Highest zoom level accepted on the command line.
pub const MAX_CLI_ZOOM: u8 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// tile-courier - fetch vector tiles from tiled HTTP endpoints and MBTiles archives.
#[derive(Parser, Debug, Clone)]
#[command(name = "tile-courier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load a source and fetch one tile through the worker pool.
    Fetch(FetchConfig),

    /// Load a source and print its resolved metadata.
    Inspect(InspectConfig),
}

/// Where a source's metadata comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// TileJSON URL describing the source.
    #[arg(long, env = "TILE_SOURCE", conflicts_with = "tiles")]
    pub source: Option<String>,

    /// Inline tile URL templates (comma-separated).
    ///
    /// An MBTiles archive is addressed as `<url>.mbtiles?{z}/{x}/{y}`.
    #[arg(long, env = "TILE_TILES", value_delimiter = ',')]
    pub tiles: Vec<String>,

    /// Row scheme of the tile templates (xyz or tms).
    #[arg(long, env = "TILE_SCHEME")]
    pub scheme: Option<Scheme>,
}

impl SourceArgs {
    pub fn validate(&self) -> Result<(), String> {
        match (&self.source, self.tiles.is_empty()) {
            (None, true) => {
                return Err(
                    "No source given. Set --source or TILE_SOURCE, or --tiles or TILE_TILES"
                        .to_string(),
                )
            }
            (Some(_), false) => {
                return Err("--source and --tiles are mutually exclusive".to_string());
            }
            _ => {}
        }

        if let Some(ref source) = self.source {
            url::Url::parse(source)
                .map_err(|e| format!("Invalid source URL '{}': {}", source, e))?;
        }

        for template in &self.tiles {
            let has_xyz = ["{z}", "{x}", "{y}"].iter().all(|p| template.contains(p));
            if !has_xyz && !template.contains("{quadkey}") {
                return Err(format!(
                    "Tile template '{}' must contain {{z}}, {{x}} and {{y}}, or {{quadkey}}",
                    template
                ));
            }
        }

        Ok(())
    }

    /// Source options as a map style would declare them.
    pub fn options(&self) -> SourceOptions {
        let mut options = match self.source {
            Some(ref url) => SourceOptions::from_url(url.clone()),
            None => SourceOptions::from_tiles(self.tiles.iter().cloned()),
        };
        options.scheme = self.scheme;
        options
    }
}

/// Configuration for the `fetch` command.
#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Tile coordinate as `z/x/y` (XYZ rows).
    pub tile: String,

    /// Number of tile workers.
    #[arg(long, default_value_t = DEFAULT_WORKER_COUNT, env = "TILE_WORKERS")]
    pub workers: usize,

    /// Device pixel ratio passed to workers.
    #[arg(long, default_value_t = DEFAULT_PIXEL_RATIO, env = "TILE_PIXEL_RATIO")]
    pub pixel_ratio: f32,

    /// Record how long the tile fetch took.
    #[arg(long, default_value_t = false, env = "TILE_RESOURCE_TIMING")]
    pub resource_timing: bool,

    /// Record cache-control and expires headers on the tile.
    #[arg(long, default_value_t = false, env = "TILE_REFRESH_EXPIRED")]
    pub refresh_expired: bool,

    /// Write the tile payload to this file.
    #[arg(short, long, env = "TILE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FetchConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;

        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }

        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            return Err(format!(
                "pixel_ratio must be a positive number, got {}",
                self.pixel_ratio
            ));
        }

        self.tile_id()?;
        Ok(())
    }

    /// Parse the requested tile coordinate.
    pub fn tile_id(&self) -> Result<CanonicalTileId, String> {
        parse_tile_coordinate(&self.tile)
    }

    pub fn options(&self) -> SourceOptions {
        let mut options = self.source.options();
        options.collect_resource_timing = self.resource_timing;
        options
    }
}

/// Configuration for the `inspect` command.
#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the descriptor as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()
    }
}

/// Parse `z/x/y` into a tile id, checking that `x` and `y` exist at `z`.
pub fn parse_tile_coordinate(value: &str) -> Result<CanonicalTileId, String> {
    let parts: Vec<&str> = value.trim().split('/').collect();
    let [z, x, y] = parts.as_slice() else {
        return Err(format!("Tile coordinate '{}' must look like z/x/y", value));
    };

    let z: u8 = z
        .parse()
        .map_err(|_| format!("Invalid zoom '{}' in '{}'", z, value))?;
    if z > MAX_CLI_ZOOM {
        return Err(format!("Zoom {} exceeds the maximum of {}", z, MAX_CLI_ZOOM));
    }

    let x: u32 = x
        .parse()
        .map_err(|_| format!("Invalid column '{}' in '{}'", x, value))?;
    let y: u32 = y
        .parse()
        .map_err(|_| format!("Invalid row '{}' in '{}'", y, value))?;

    let dim = 1u32 << z;
    if x >= dim || y >= dim {
        return Err(format!(
            "Tile {}/{}/{} is outside the grid at zoom {}",
            z, x, y, z
        ));
    }

    Ok(CanonicalTileId::new(z, x, y))
}

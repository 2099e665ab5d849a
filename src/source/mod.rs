//! Tile sources.
//!
//! This module holds the tile request lifecycle: how a renderer tile becomes
//! a worker request and how the worker's answer comes back.
//!
//! # Components
//!
//! - [`VectorTileSource`]: resolves metadata, owns the archive handle, drives
//!   tile loads, aborts and unloads
//! - [`TileRequest`]: per-tile state machine enforcing one request in flight
//! - [`Tile`]: the renderer-visible tile record with its data sink
//! - [`Dispatcher`]: the narrow interface to background workers
//! - [`TileSourceDescriptor`] / [`SourceOptions`]: resolved and supplied config

mod bounds;
mod descriptor;
mod dispatcher;
mod request;
mod tile;
mod tile_id;
mod vector;

pub use bounds::TileBounds;
pub use descriptor::{
    Scheme, SourceOptions, TileSourceDescriptor, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM,
    VECTOR_TILE_SIZE,
};
pub use dispatcher::{
    Dispatcher, ResourceTiming, TileCompletion, TileData, TileRef, TileResult, WorkerId,
    WorkerMessage, WorkerTileParams,
};
pub use request::{TileCallback, TileRequest, TileState};
pub use tile::{ExpiryData, Tile, TileDataSink};
pub use tile_id::{CanonicalTileId, OverscaledTileId, TileUid};
pub use vector::{SourceContext, SourceStatus, VectorTileSource};

//! # tile-courier
//!
//! Tile-fetch orchestration for vector map renderers.
//!
//! Given a tile coordinate, a source produces the tile's bytes either from a
//! tiled HTTP endpoint or from an MBTiles archive held in memory, hands them to
//! a background worker and tracks the request until its result is applied.
//!
//! ## Features
//!
//! - **One request per tile**: a per-tile state machine never dispatches a
//!   second request while one is in flight; later loads are queued and sent
//!   as soon as the outstanding one completes
//! - **Archive sources**: `<archive>.mbtiles?{z}/{x}/{y}` sources are
//!   downloaded once and answered synchronously, with the TMS row flip
//! - **Transparent gzip**: payloads and glyph ranges are decompressed when
//!   gzip-framed and passed through untouched otherwise
//! - **Worker pool**: a tokio-backed dispatcher with worker affinity, aborts
//!   and payload reuse on reload
//!
//! ## Architecture
//!
//! - [`codec`] - gzip detection and decoding with raw fallback
//! - [`io`] - byte fetcher trait, HTTP implementation and TileJSON loading
//! - [`archive`] - MBTiles opener, in-memory tile store and row flip
//! - [`source`] - tile ids, request state machine and the vector tile source
//! - [`worker`] - tokio worker pool implementing the dispatcher
//! - [`glyph`] - glyph range loading
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tile_courier::io::{ByteFetcher, HttpFetcher};
//! use tile_courier::source::{
//!     CanonicalTileId, OverscaledTileId, SourceContext, SourceOptions, Tile, TileData,
//!     TileDataSink, TileUid, VectorTileSource,
//! };
//! use tile_courier::worker::WorkerPool;
//!
//! struct Discard;
//!
//! impl TileDataSink for Discard {
//!     fn load_vector_data(&mut self, _data: Option<&TileData>) {}
//!     fn unload_vector_data(&mut self) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher: Arc<dyn ByteFetcher> = Arc::new(HttpFetcher::new()?);
//!     let (pool, mut completions) = WorkerPool::spawn(4, Arc::clone(&fetcher));
//!
//!     let options = SourceOptions::from_url("https://tiles.example.com/streets.json");
//!     let context = SourceContext::new(Arc::new(pool), fetcher);
//!     let mut source = VectorTileSource::new("streets", options, context)?;
//!     source.load().await?;
//!
//!     let id = OverscaledTileId::from_canonical(CanonicalTileId::new(3, 5, 2));
//!     let mut tile = Tile::new(TileUid(1), id, Box::new(Discard));
//!     source.load_tile(&mut tile, Box::new(|result| println!("loaded: {:?}", result)));
//!
//!     if let Some(completion) = completions.recv().await {
//!         source.complete_tile(&mut tile, completion.result);
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod codec;
pub mod config;
pub mod error;
pub mod glyph;
pub mod io;
pub mod source;
pub mod worker;

pub use archive::{ArchiveHandle, ArchiveOpener, MbtilesOpener};
pub use codec::{decode_if_compressed, CodecResult};
pub use config::{Cli, Command, FetchConfig, InspectConfig};
pub use error::{ArchiveError, FetchError, SourceError};
pub use glyph::{load_glyph_range, GlyphParser, StyleGlyph};
pub use io::{ByteFetcher, HttpFetcher};
pub use source::{SourceContext, Tile, TileState, VectorTileSource};
pub use worker::WorkerPool;

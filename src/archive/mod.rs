//! Embedded tile archives.
//!
//! An archive-backed source advertises a single tile URL template of the form
//! `<archive-url>?{z}/{x}/{y}`. The whole archive is downloaded once, opened
//! into an immutable in-memory store and then queried synchronously for every
//! tile.
//!
//! ```text
//! ┌───────────────────┐   blob   ┌────────────────┐   Arc<dyn TileStore>
//! │  ByteFetcher      │ ───────▶ │ ArchiveOpener  │ ─────────────────────┐
//! └───────────────────┘          └────────────────┘                      ▼
//!                                                              ┌──────────────────┐
//!   (z, x, y) XYZ ──▶ flip_row ──▶ (zoom, column, row) ──────▶ │  ArchiveHandle   │
//!                                                              └──────────────────┘
//! ```
//!
//! Stored tile bytes may or may not be gzip-compressed; decoding is left to
//! [`crate::codec`] at the call site.

mod mbtiles;
mod reader;
mod url;

pub use mbtiles::{MbtilesOpener, SQLITE_MAGIC};
pub use reader::{
    flip_row, read_tile, ArchiveHandle, ArchiveOpener, MemoryTileStore, TileStore,
};
pub use url::ArchiveUrl;

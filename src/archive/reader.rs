use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::error::ArchiveError;

/// Query-by-key access to stored tiles.
///
/// Keys use the archive's native TMS addressing: `row` counts from the bottom
/// of the tile grid. Implementations are immutable once built, so one store can
/// be shared across any number of concurrent tile loads.
pub trait TileStore: Send + Sync {
    /// Look up the tile stored at `(zoom, column, row)`.
    fn get(&self, zoom: u8, column: u32, row: u32) -> Result<Option<Bytes>, ArchiveError>;

    /// Number of stored tiles.
    fn tile_count(&self) -> usize;
}

/// A [`TileStore`] held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTileStore {
    tiles: HashMap<(u8, u32, u32), Bytes>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` at the TMS key `(zoom, column, row)`.
    pub fn insert(&mut self, zoom: u8, column: u32, row: u32, data: impl Into<Bytes>) {
        self.tiles.insert((zoom, column, row), data.into());
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_tile(mut self, zoom: u8, column: u32, row: u32, data: impl Into<Bytes>) -> Self {
        self.insert(zoom, column, row, data);
        self
    }
}

impl TileStore for MemoryTileStore {
    fn get(&self, zoom: u8, column: u32, row: u32) -> Result<Option<Bytes>, ArchiveError> {
        Ok(self.tiles.get(&(zoom, column, row)).cloned())
    }

    fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

/// Shared, read-only handle on an opened archive.
#[derive(Clone)]
pub struct ArchiveHandle {
    location: Arc<str>,
    store: Arc<dyn TileStore>,
}

impl ArchiveHandle {
    pub fn new(location: impl Into<Arc<str>>, store: Arc<dyn TileStore>) -> Self {
        Self {
            location: location.into(),
            store,
        }
    }

    /// Where the archive was loaded from.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Number of tiles in the archive.
    pub fn tile_count(&self) -> usize {
        self.store.tile_count()
    }

    /// Raw key lookup, no row conversion.
    pub fn query(&self, zoom: u8, column: u32, row: u32) -> Result<Option<Bytes>, ArchiveError> {
        self.store.get(zoom, column, row)
    }
}

impl fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("location", &self.location)
            .field("tiles", &self.store.tile_count())
            .finish()
    }
}

/// Turns a downloaded archive blob into an [`ArchiveHandle`].
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, location: &str, blob: Bytes) -> Result<ArchiveHandle, ArchiveError>;
}

/// Convert an XYZ row to the archive's TMS row: `(1 << z) - 1 - y`.
///
/// The conversion is its own inverse. Returns `None` when `y` lies outside the
/// `2^z` rows of zoom `z`.
pub fn flip_row(z: u8, y: u32) -> Option<u32> {
    let rows = 1u64.checked_shl(u32::from(z))?;
    let last = rows - 1;
    let y = u64::from(y);
    if y > last {
        return None;
    }
    u32::try_from(last - y).ok()
}

/// Read the XYZ tile `(z, x, y)` from an archive.
///
/// `Ok(None)` means the archive holds no such tile and must be handled like a
/// network 404. The returned bytes are exactly what the archive stores.
pub fn read_tile(
    handle: &ArchiveHandle,
    z: u8,
    x: u32,
    y: u32,
) -> Result<Option<Bytes>, ArchiveError> {
    let Some(row) = flip_row(z, y) else {
        trace!(z, x, y, "row outside tile grid");
        return Ok(None);
    };

    let data = handle.query(z, x, row)?;
    if data.is_none() {
        trace!(z, column = x, row, archive = handle.location(), "no tile in archive");
    }
    Ok(data)
}

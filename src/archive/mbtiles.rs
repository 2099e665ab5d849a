use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use rusqlite::{Connection, OpenFlags};
use tracing::info;

use super::reader::{ArchiveHandle, ArchiveOpener, MemoryTileStore, TileStore};
use crate::error::ArchiveError;

/// Header every SQLite 3 database file starts with.
pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

const TILES_QUERY: &str = "SELECT zoom_level, tile_column, tile_row, tile_data FROM tiles";

/// Opens MBTiles (SQLite) blobs.
///
/// The `tiles` table is read once into a [`MemoryTileStore`]; the SQLite
/// connection and its temporary file are gone by the time `open` returns, so
/// lookups never touch SQLite or take a lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MbtilesOpener;

impl MbtilesOpener {
    pub fn new() -> Self {
        Self
    }

    fn materialize(path: &std::path::Path) -> Result<MemoryTileStore, rusqlite::Error> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let mut store = MemoryTileStore::new();
        let mut stmt = conn.prepare(TILES_QUERY)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u8>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;
        for row in rows {
            let (zoom, column, tile_row, data) = row?;
            store.insert(zoom, column, tile_row, data);
        }
        Ok(store)
    }
}

impl ArchiveOpener for MbtilesOpener {
    fn open(&self, location: &str, blob: Bytes) -> Result<ArchiveHandle, ArchiveError> {
        if blob.len() < SQLITE_MAGIC.len() || &blob[..SQLITE_MAGIC.len()] != SQLITE_MAGIC {
            return Err(ArchiveError::InvalidArchive {
                location: location.to_string(),
                reason: "missing SQLite header".to_string(),
            });
        }

        // SQLite needs a file to open; it only lives for the duration of the load
        let mut file =
            tempfile::NamedTempFile::new().map_err(|e| ArchiveError::Io(e.to_string()))?;
        file.write_all(&blob)
            .and_then(|_| file.flush())
            .map_err(|e| ArchiveError::Io(e.to_string()))?;

        let store = Self::materialize(file.path()).map_err(|e| ArchiveError::InvalidArchive {
            location: location.to_string(),
            reason: e.to_string(),
        })?;

        info!(
            archive = location,
            tiles = store.tile_count(),
            bytes = blob.len(),
            "opened MBTiles archive"
        );
        Ok(ArchiveHandle::new(location, Arc::new(store)))
    }
}

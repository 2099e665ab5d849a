use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use super::tile_id::{OverscaledTileId, TileUid};
use crate::error::FetchError;
use crate::io::ResourceRequest;

/// Index of a worker in the dispatcher's registry.
///
/// A tile keeps the id of the worker that parsed it so reloads and aborts are
/// routed to the worker holding its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Everything a worker needs to produce one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerTileParams {
    pub uid: TileUid,
    pub source_id: String,
    pub tile_id: OverscaledTileId,

    /// Zoom the tile is rendered at
    pub zoom: u8,

    /// Tile size in pixels times the overscale factor
    pub tile_size: u32,

    pub pixel_ratio: f32,
    pub show_collision_boxes: bool,

    /// The tile request after the transform hook
    pub request: ResourceRequest,

    /// Bytes resolved from an archive, already decoded
    pub tile_data: Option<Bytes>,

    /// Set for archive-backed sources: the worker must not fetch
    pub archive_backed: bool,
}

/// Addresses a tile already known to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRef {
    pub uid: TileUid,
    pub source_id: String,
}

/// Messages a tile source sends to workers.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    LoadTile(WorkerTileParams),
    ReloadTile(WorkerTileParams),
    AbortTile(TileRef),
    RemoveTile(TileRef),
}

impl WorkerMessage {
    /// Message name as used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::LoadTile(_) => "loadTile",
            WorkerMessage::ReloadTile(_) => "reloadTile",
            WorkerMessage::AbortTile(_) => "abortTile",
            WorkerMessage::RemoveTile(_) => "removeTile",
        }
    }

    /// The tile this message is about.
    pub fn uid(&self) -> TileUid {
        match self {
            WorkerMessage::LoadTile(p) | WorkerMessage::ReloadTile(p) => p.uid,
            WorkerMessage::AbortTile(t) | WorkerMessage::RemoveTile(t) => t.uid,
        }
    }
}

/// How long a tile fetch took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTiming {
    pub url: String,
    pub duration: Duration,
}

/// A worker's result for one tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileData {
    pub payload: Bytes,
    pub resource_timing: Option<ResourceTiming>,
    pub cache_control: Option<String>,
    pub expires: Option<String>,
}

impl TileData {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }
}

/// Result of a worker request. `Ok(None)` is a tile with no data.
pub type TileResult = Result<Option<TileData>, FetchError>;

/// A finished worker request, handed back to the tile source.
#[derive(Debug, Clone, PartialEq)]
pub struct TileCompletion {
    pub uid: TileUid,
    pub worker: WorkerId,
    pub result: TileResult,
}

/// Sends work to background workers.
///
/// `send` never blocks. Without an affinity the dispatcher picks a worker;
/// with one, the message goes to that worker. The id of the worker that
/// received the message is returned. Results travel back separately as
/// [`TileCompletion`] values.
pub trait Dispatcher: Send + Sync {
    fn send(&self, message: WorkerMessage, affinity: Option<WorkerId>) -> WorkerId;
}

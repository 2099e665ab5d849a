use std::time::{Duration, Instant};

use super::dispatcher::{ResourceTiming, TileData, WorkerId};
use super::request::{TileRequest, TileState};
use super::tile_id::{OverscaledTileId, TileUid};

/// Receives decoded tile data on behalf of the renderer.
pub trait TileDataSink: Send {
    /// Apply the result of a load. `None` means the tile exists but is empty.
    fn load_vector_data(&mut self, data: Option<&TileData>);

    /// Drop whatever the last load applied.
    fn unload_vector_data(&mut self);
}

/// Caching headers recorded from the last successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiryData {
    pub cache_control: Option<String>,
    pub expires: Option<String>,

    /// Derived from `max-age`
    pub expires_at: Option<Instant>,
}

fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.trim_matches('"').parse().ok())
        .map(Duration::from_secs)
}

/// A renderer-visible tile and its fetch status.
pub struct Tile {
    uid: TileUid,
    tile_id: OverscaledTileId,
    request: TileRequest,
    resource_timing: Option<ResourceTiming>,
    expiry: Option<ExpiryData>,
    sink: Box<dyn TileDataSink>,
}

impl Tile {
    pub fn new(uid: TileUid, tile_id: OverscaledTileId, sink: Box<dyn TileDataSink>) -> Self {
        Self {
            uid,
            tile_id,
            request: TileRequest::new(),
            resource_timing: None,
            expiry: None,
            sink,
        }
    }

    pub fn uid(&self) -> TileUid {
        self.uid
    }

    pub fn tile_id(&self) -> &OverscaledTileId {
        &self.tile_id
    }

    pub fn state(&self) -> TileState {
        self.request.state()
    }

    pub fn worker(&self) -> Option<WorkerId> {
        self.request.worker()
    }

    pub fn request(&self) -> &TileRequest {
        &self.request
    }

    pub(crate) fn request_mut(&mut self) -> &mut TileRequest {
        &mut self.request
    }

    pub fn resource_timing(&self) -> Option<&ResourceTiming> {
        self.resource_timing.as_ref()
    }

    pub(crate) fn set_resource_timing(&mut self, timing: ResourceTiming) {
        self.resource_timing = Some(timing);
    }

    pub fn expiry(&self) -> Option<&ExpiryData> {
        self.expiry.as_ref()
    }

    /// Record caching headers from a worker result. A result without any
    /// caching header leaves the recorded expiry untouched.
    pub fn set_expiry_data(&mut self, data: &TileData) {
        if data.cache_control.is_none() && data.expires.is_none() {
            return;
        }

        let expires_at = data
            .cache_control
            .as_deref()
            .and_then(parse_max_age)
            .map(|max_age| Instant::now() + max_age);

        self.expiry = Some(ExpiryData {
            cache_control: data.cache_control.clone(),
            expires: data.expires.clone(),
            expires_at,
        });
    }

    /// Whether recorded cache headers say the data is stale at `now`.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.expiry
            .as_ref()
            .and_then(|e| e.expires_at)
            .is_some_and(|at| now >= at)
    }

    /// Flag the tile's data as stale. See [`TileRequest::mark_expired`].
    pub fn mark_expired(&mut self) -> bool {
        self.request.mark_expired()
    }

    pub(crate) fn load_vector_data(&mut self, data: Option<TileData>) {
        self.sink.load_vector_data(data.as_ref());
        self.request.mark_loaded();
    }

    pub(crate) fn unload_vector_data(&mut self) {
        self.sink.unload_vector_data();
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("uid", &self.uid)
            .field("tile_id", &self.tile_id)
            .field("state", &self.request.state())
            .field("worker", &self.request.worker())
            .finish()
    }
}

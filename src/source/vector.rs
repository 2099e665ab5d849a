//! Vector tile source.
//!
//! The source resolves its metadata once, attaches an archive when the tiles
//! live in one, and then turns renderer tile requests into worker messages.
//!
//! ```text
//!  renderer ──load_tile──▶ VectorTileSource ──send──▶ Dispatcher ──▶ workers
//!      ▲                        │    ▲                                  │
//!      │                        │    └──────── complete_tile ◀──────────┘
//!      │                        ▼                                (TileCompletion)
//!      │                 ArchiveHandle (sync)
//!      └──── TileCallback ◀─────┘
//! ```
//!
//! All methods run on the caller's task and never wait on workers.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::descriptor::{Scheme, SourceOptions, TileSourceDescriptor};
use super::dispatcher::{Dispatcher, TileRef, TileResult, WorkerMessage, WorkerTileParams};
use super::request::{Dispatch, Finished, TileCallback};
use super::tile::Tile;
use super::tile_id::{CanonicalTileId, OverscaledTileId};
use crate::archive::{self, ArchiveHandle, ArchiveOpener, ArchiveUrl, MbtilesOpener};
use crate::codec;
use crate::error::SourceError;
use crate::io::{
    identity_transform, ByteFetcher, MetadataFetcher, RequestTransform, ResourceKind,
    TileJsonLoader,
};

/// Lifecycle of a source as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Idle,
    Loading,
    /// Metadata resolved and archive (if any) attached
    Ready,
    Failed(String),
    Removed,
}

/// Collaborators a source works with.
#[derive(Clone)]
pub struct SourceContext {
    pub dispatcher: Arc<dyn Dispatcher>,
    pub fetcher: Arc<dyn ByteFetcher>,
    pub metadata: Arc<dyn MetadataFetcher>,
    pub archive_opener: Arc<dyn ArchiveOpener>,
    pub transform: RequestTransform,

    /// Record cache headers on loaded tiles
    pub refresh_expired_tiles: bool,

    pub show_collision_boxes: bool,
    pub pixel_ratio: f32,
}

impl SourceContext {
    /// Context with TileJSON loading over `fetcher`, MBTiles archives and an
    /// identity transform.
    pub fn new(dispatcher: Arc<dyn Dispatcher>, fetcher: Arc<dyn ByteFetcher>) -> Self {
        Self {
            metadata: Arc::new(TileJsonLoader::new(Arc::clone(&fetcher))),
            archive_opener: Arc::new(MbtilesOpener::new()),
            transform: identity_transform(),
            refresh_expired_tiles: false,
            show_collision_boxes: false,
            pixel_ratio: 1.0,
            dispatcher,
            fetcher,
        }
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataFetcher>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_archive_opener(mut self, opener: Arc<dyn ArchiveOpener>) -> Self {
        self.archive_opener = opener;
        self
    }

    pub fn with_transform(mut self, transform: RequestTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_refresh_expired_tiles(mut self, enabled: bool) -> Self {
        self.refresh_expired_tiles = enabled;
        self
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f32) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    pub fn with_collision_boxes(mut self, show: bool) -> Self {
        self.show_collision_boxes = show;
        self
    }
}

/// A source of 512px vector tiles.
pub struct VectorTileSource {
    id: String,
    options: SourceOptions,
    tile_size: u32,
    context: SourceContext,
    descriptor: Option<TileSourceDescriptor>,
    archive: Option<ArchiveHandle>,
    status: watch::Sender<SourceStatus>,
}

impl VectorTileSource {
    /// Create a source. Fails immediately on a tile size other than 512.
    pub fn new(
        id: impl Into<String>,
        options: SourceOptions,
        context: SourceContext,
    ) -> Result<Self, SourceError> {
        let tile_size = options.validated_tile_size()?;
        let (status, _) = watch::channel(SourceStatus::Idle);
        Ok(Self {
            id: id.into(),
            options,
            tile_size,
            context,
            descriptor: None,
            archive: None,
            status,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolved metadata, once [`load`](Self::load) succeeded.
    pub fn descriptor(&self) -> Option<&TileSourceDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn archive(&self) -> Option<&ArchiveHandle> {
        self.archive.as_ref()
    }

    pub fn status(&self) -> SourceStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<SourceStatus> {
        self.status.subscribe()
    }

    fn set_status(&self, status: SourceStatus) {
        self.status.send_replace(status);
    }

    /// Resolve metadata and, for archive-backed sources, download and open
    /// the archive. The source is `Ready` only after both succeeded.
    ///
    /// Calling `load` again after success is a no-op; after a failure it
    /// retries.
    pub async fn load(&mut self) -> Result<(), SourceError> {
        if self.descriptor.is_some() {
            return Ok(());
        }

        self.set_status(SourceStatus::Loading);
        match self.resolve().await {
            Ok(descriptor) => {
                info!(
                    source = %self.id,
                    minzoom = descriptor.minzoom,
                    maxzoom = descriptor.maxzoom,
                    archive = descriptor.is_archive_backed(),
                    "source ready"
                );
                self.descriptor = Some(descriptor);
                self.set_status(SourceStatus::Ready);
                Ok(())
            }
            Err(e) => {
                warn!(source = %self.id, error = %e, "source failed to load");
                self.set_status(SourceStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn resolve(&mut self) -> Result<TileSourceDescriptor, SourceError> {
        let tilejson = self
            .context
            .metadata
            .fetch_metadata(&self.options, &self.context.transform)
            .await
            .map_err(|error| SourceError::Metadata {
                source_id: self.id.clone(),
                error,
            })?;

        let descriptor = TileSourceDescriptor::from_tilejson(&self.id, self.tile_size, tilejson)?;

        if let Some(archive_url) = descriptor.archive() {
            if self.archive.is_none() {
                self.archive = Some(self.open_archive(archive_url).await?);
            }
        }

        Ok(descriptor)
    }

    async fn open_archive(&self, archive_url: &ArchiveUrl) -> Result<ArchiveHandle, SourceError> {
        let location = archive_url.location();
        debug!(source = %self.id, archive = location, "fetching archive");

        let request = (self.context.transform)(location, ResourceKind::Archive);
        let response =
            self.context
                .fetcher
                .fetch(&request)
                .await
                .map_err(|error| SourceError::ArchiveFetch {
                    location: location.to_string(),
                    error,
                })?;

        Ok(self.context.archive_opener.open(location, response.data)?)
    }

    /// Release the archive and the resolved metadata and mark the source
    /// removed. A later [`load`](Self::load) resolves both again.
    pub fn on_remove(&mut self) {
        self.archive = None;
        self.descriptor = None;
        self.set_status(SourceStatus::Removed);
    }

    /// Whether the tile lies inside the source bounds. Sources without bounds
    /// cover everything.
    pub fn has_tile(&self, tile_id: &OverscaledTileId) -> bool {
        self.descriptor
            .as_ref()
            .and_then(|d| d.bounds)
            .map_or(true, |bounds| bounds.contains(&tile_id.canonical))
    }

    /// The options this source was created with, unchanged.
    pub fn serialize(&self) -> SourceOptions {
        self.options.clone()
    }

    /// Request data for `tile`. `callback` runs once the request completes,
    /// is superseded, or is discarded by an abort.
    pub fn load_tile(&self, tile: &mut Tile, callback: TileCallback) {
        let affinity = match tile.request_mut().begin(callback) {
            Dispatch::Load => None,
            Dispatch::Reload(worker) => Some(worker),
            Dispatch::Queued => {
                debug!(source = %self.id, tile = %tile.tile_id(), "reload queued behind in-flight request");
                return;
            }
            Dispatch::Skipped => {
                debug!(source = %self.id, tile = %tile.tile_id(), "tile is aborted, load skipped");
                return;
            }
        };

        let params = match self.tile_params(tile) {
            Ok(params) => params,
            Err(e) => {
                warn!(source = %self.id, tile = %tile.tile_id(), error = %e, "cannot build tile request");
                self.fail_request(tile, e);
                return;
            }
        };

        let message = match affinity {
            None => WorkerMessage::LoadTile(params),
            Some(_) => WorkerMessage::ReloadTile(params),
        };
        let kind = message.kind();
        let worker = self.context.dispatcher.send(message, affinity);
        if affinity.is_none() {
            tile.request_mut().assign_worker(worker);
        }
        debug!(source = %self.id, tile = %tile.tile_id(), %worker, kind, "dispatched");
    }

    /// Unwind a request that was registered but could not be dispatched.
    fn fail_request(&self, tile: &mut Tile, error: SourceError) {
        match tile.request_mut().finish() {
            Some(Finished::Active { callback, prior }) => {
                tile.request_mut().restore(prior);
                callback(Err(error));
            }
            Some(Finished::Discarded(callback)) => callback(Ok(())),
            None => {}
        }
    }

    fn tile_params(&self, tile: &Tile) -> Result<WorkerTileParams, SourceError> {
        let descriptor = self.descriptor.as_ref().ok_or_else(|| SourceError::NotLoaded {
            source_id: self.id.clone(),
        })?;
        let tile_id = *tile.tile_id();

        let url = tile_id
            .canonical
            .url(&descriptor.tiles, descriptor.scheme)
            .ok_or_else(|| SourceError::MissingTiles {
                source_id: self.id.clone(),
            })?;
        let mut request = (self.context.transform)(&url, ResourceKind::Tile);
        request.collect_resource_timing = self.options.collect_resource_timing;

        let archive_backed = descriptor.is_archive_backed();
        let tile_data = if archive_backed {
            let handle = self.archive.as_ref().ok_or_else(|| SourceError::NotLoaded {
                source_id: self.id.clone(),
            })?;
            self.read_archive_tile(handle, descriptor, &tile_id.canonical)?
        } else {
            None
        };

        Ok(WorkerTileParams {
            uid: tile.uid(),
            source_id: self.id.clone(),
            tile_id,
            zoom: tile_id.overscaled_z,
            tile_size: self.tile_size * tile_id.overscale_factor(),
            pixel_ratio: self.context.pixel_ratio,
            show_collision_boxes: self.context.show_collision_boxes,
            request,
            tile_data,
            archive_backed,
        })
    }

    /// Resolve a tile from the attached archive, decoding gzip payloads.
    fn read_archive_tile(
        &self,
        handle: &ArchiveHandle,
        descriptor: &TileSourceDescriptor,
        canonical: &CanonicalTileId,
    ) -> Result<Option<Bytes>, SourceError> {
        // The archive address is always XYZ; the reader applies the row flip
        let Some(url) = canonical.url(&descriptor.tiles, Scheme::Xyz) else {
            return Ok(None);
        };
        let Some((_, z, x, y)) = ArchiveUrl::split_tile_url(&url) else {
            warn!(source = %self.id, %url, "tile URL does not follow the archive convention");
            return Ok(None);
        };

        let stored = archive::read_tile(handle, z, x, y)?;
        Ok(stored.map(|raw| codec::decode_if_compressed(raw).into_bytes()))
    }

    /// Apply a worker result to `tile`.
    ///
    /// Results for aborted or unloaded tiles are dropped and the callback gets
    /// `Ok(())`. A not-found result loads the tile with no data. Any queued
    /// reload is dispatched afterwards.
    pub fn complete_tile(&self, tile: &mut Tile, result: TileResult) {
        let Some(finished) = tile.request_mut().finish() else {
            debug!(source = %self.id, tile = %tile.tile_id(), "ignoring completion with no request in flight");
            return;
        };

        let (callback, prior) = match finished {
            Finished::Discarded(callback) => {
                debug!(source = %self.id, tile = %tile.tile_id(), "discarding result for aborted tile");
                callback(Ok(()));
                if let Some(reload) = tile.request_mut().take_reload() {
                    reload(Ok(()));
                }
                return;
            }
            Finished::Active { callback, prior } => (callback, prior),
        };

        let data = match result {
            Ok(data) => data,
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!(source = %self.id, tile = %tile.tile_id(), error = %e, "tile request failed");
                tile.request_mut().restore(prior);
                callback(Err(SourceError::Fetch(e)));
                self.start_queued_reload(tile);
                return;
            }
        };

        if let Some(timing) = data.as_ref().and_then(|d| d.resource_timing.clone()) {
            tile.set_resource_timing(timing);
        }
        if self.context.refresh_expired_tiles {
            if let Some(data) = &data {
                tile.set_expiry_data(data);
            }
        }
        tile.load_vector_data(data);

        callback(Ok(()));
        self.start_queued_reload(tile);
    }

    fn start_queued_reload(&self, tile: &mut Tile) {
        if let Some(reload) = tile.request_mut().take_reload() {
            self.load_tile(tile, reload);
        }
    }

    /// Ask the tile's worker to stop working on it. No-op for tiles that were
    /// never dispatched.
    pub fn abort_tile(&self, tile: &mut Tile) {
        if let Some(worker) = tile.request_mut().abort() {
            self.context
                .dispatcher
                .send(WorkerMessage::AbortTile(self.tile_ref(tile)), Some(worker));
        }
    }

    /// Release the tile's data and tell its worker to forget it. Idempotent.
    pub fn unload_tile(&self, tile: &mut Tile) {
        if !tile.request_mut().unload() {
            return;
        }
        tile.unload_vector_data();
        if let Some(worker) = tile.worker() {
            self.context
                .dispatcher
                .send(WorkerMessage::RemoveTile(self.tile_ref(tile)), Some(worker));
        }
    }

    fn tile_ref(&self, tile: &Tile) -> TileRef {
        TileRef {
            uid: tile.uid(),
            source_id: self.id.clone(),
        }
    }
}

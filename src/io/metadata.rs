use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ByteFetcher, RequestTransform, ResourceKind};
use crate::error::FetchError;
use crate::source::{Scheme, SourceOptions};

/// A vector layer advertised by TileJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    pub id: String,
}

/// The subset of TileJSON 3.0 this crate consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileJson {
    #[serde(default)]
    pub tiles: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<Scheme>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector_layers: Vec<VectorLayer>,
}

impl TileJson {
    /// Build metadata straight from inline source options (no `url`).
    pub fn from_options(options: &SourceOptions) -> Self {
        Self {
            tiles: options.tiles.clone().unwrap_or_default(),
            minzoom: options.minzoom,
            maxzoom: options.maxzoom,
            bounds: options.bounds,
            scheme: options.scheme,
            attribution: options.attribution.clone(),
            vector_layers: Vec::new(),
        }
    }

    /// Apply values set explicitly in the source options on top of fetched
    /// metadata. Options always win.
    pub fn overlay(mut self, options: &SourceOptions) -> Self {
        if let Some(tiles) = &options.tiles {
            self.tiles = tiles.clone();
        }
        if options.minzoom.is_some() {
            self.minzoom = options.minzoom;
        }
        if options.maxzoom.is_some() {
            self.maxzoom = options.maxzoom;
        }
        if options.bounds.is_some() {
            self.bounds = options.bounds;
        }
        if options.scheme.is_some() {
            self.scheme = options.scheme;
        }
        if options.attribution.is_some() {
            self.attribution = options.attribution.clone();
        }
        self
    }
}

/// Resolves a source's metadata.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch and parse the metadata described by `options`.
    async fn fetch_metadata(
        &self,
        options: &SourceOptions,
        transform: &RequestTransform,
    ) -> Result<TileJson, FetchError>;
}

/// [`MetadataFetcher`] that downloads TileJSON through a [`ByteFetcher`].
///
/// Sources without a `url` resolve from their inline options and never touch
/// the network.
pub struct TileJsonLoader<F> {
    fetcher: F,
}

impl<F: ByteFetcher> TileJsonLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl<F: ByteFetcher> MetadataFetcher for TileJsonLoader<F> {
    async fn fetch_metadata(
        &self,
        options: &SourceOptions,
        transform: &RequestTransform,
    ) -> Result<TileJson, FetchError> {
        let Some(url) = options.url.as_deref() else {
            return Ok(TileJson::from_options(options));
        };

        let request = transform(url, ResourceKind::Source);
        let response = self.fetcher.fetch(&request).await?;
        let tilejson: TileJson =
            serde_json::from_slice(&response.data).map_err(|e| FetchError::InvalidResponse {
                url: request.url.clone(),
                message: e.to_string(),
            })?;

        debug!(url = %request.url, templates = tilejson.tiles.len(), "loaded TileJSON");
        Ok(tilejson.overlay(options))
    }
}

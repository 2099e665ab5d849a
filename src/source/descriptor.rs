use serde::{Deserialize, Serialize};

use super::bounds::TileBounds;
use crate::archive::ArchiveUrl;
use crate::error::SourceError;
use crate::io::TileJson;

/// The only tile size vector sources support.
pub const VECTOR_TILE_SIZE: u32 = 512;

/// Default zoom range when metadata does not declare one.
pub const DEFAULT_MIN_ZOOM: u8 = 0;
pub const DEFAULT_MAX_ZOOM: u8 = 22;

/// Row numbering of the tile grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Rows count from the top (Google / OSM)
    #[default]
    Xyz,
    /// Rows count from the bottom (OSGeo TMS, MBTiles)
    Tms,
}

impl std::str::FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xyz" => Ok(Scheme::Xyz),
            "tms" => Ok(Scheme::Tms),
            other => Err(format!("unknown tile scheme '{}', expected xyz or tms", other)),
        }
    }
}

/// Source configuration exactly as the caller supplied it.
///
/// Kept verbatim so that [`serialize`](super::VectorTileSource::serialize) can
/// hand it back for reconstruction elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOptions {
    /// TileJSON URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Inline tile URL templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<Scheme>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,

    /// Attach fetch timings to loaded tiles
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub collect_resource_timing: bool,
}

impl SourceOptions {
    /// Options pointing at a TileJSON document.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Options with inline tile templates.
    pub fn from_tiles<I, S>(tiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tiles: Some(tiles.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Tile size after defaulting, validated against [`VECTOR_TILE_SIZE`].
    pub fn validated_tile_size(&self) -> Result<u32, SourceError> {
        let tile_size = self.tile_size.unwrap_or(VECTOR_TILE_SIZE);
        if tile_size != VECTOR_TILE_SIZE {
            return Err(SourceError::InvalidTileSize { tile_size });
        }
        Ok(tile_size)
    }
}

/// Resolved, immutable description of a source.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSourceDescriptor {
    pub tiles: Vec<String>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub scheme: Scheme,
    pub tile_size: u32,
    pub bounds: Option<TileBounds>,
    pub attribution: Option<String>,
    pub vector_layer_ids: Vec<String>,
    archive: Option<ArchiveUrl>,
}

impl TileSourceDescriptor {
    /// Build a descriptor from resolved metadata.
    ///
    /// Fails when there are no tile templates or the zoom range is inverted.
    pub fn from_tilejson(
        source_id: &str,
        tile_size: u32,
        tilejson: TileJson,
    ) -> Result<Self, SourceError> {
        if tilejson.tiles.is_empty() {
            return Err(SourceError::MissingTiles {
                source_id: source_id.to_string(),
            });
        }

        let minzoom = tilejson.minzoom.unwrap_or(DEFAULT_MIN_ZOOM);
        let maxzoom = tilejson.maxzoom.unwrap_or(DEFAULT_MAX_ZOOM);
        if minzoom > maxzoom {
            return Err(SourceError::InvalidZoomRange {
                min: minzoom,
                max: maxzoom,
            });
        }

        let archive = ArchiveUrl::parse(&tilejson.tiles[0]);

        Ok(Self {
            archive,
            minzoom,
            maxzoom,
            tile_size,
            scheme: tilejson.scheme.unwrap_or_default(),
            bounds: tilejson.bounds.map(TileBounds::new),
            attribution: tilejson.attribution,
            vector_layer_ids: tilejson.vector_layers.into_iter().map(|l| l.id).collect(),
            tiles: tilejson.tiles,
        })
    }

    /// Set when the tiles live in a single archive file.
    pub fn archive(&self) -> Option<&ArchiveUrl> {
        self.archive.as_ref()
    }

    pub fn is_archive_backed(&self) -> bool {
        self.archive.is_some()
    }
}

use thiserror::Error;

/// Errors produced when fetching bytes from the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The resource does not exist. Tile loading treats this as an empty tile.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Server answered with a non-success status other than 404
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Response body could not be interpreted
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// The request was cancelled before it completed
    #[error("Request aborted")]
    Aborted,
}

impl FetchError {
    /// Whether this error means "no such resource" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

/// Errors raised while opening or querying a tile archive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// Blob is not an archive this crate can open
    #[error("Invalid archive {location}: {reason}")]
    InvalidArchive { location: String, reason: String },

    /// Local I/O failure while materializing the archive
    #[error("Archive I/O error: {0}")]
    Io(String),

    /// The underlying store rejected a query
    #[error("Archive query failed: {0}")]
    Query(String),
}

/// Errors surfaced by a tile source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Vector tile sources only support 512px tiles
    #[error("vector tile sources must have a tileSize of 512, got {tile_size}")]
    InvalidTileSize { tile_size: u32 },

    /// minzoom is greater than maxzoom
    #[error("Invalid zoom range: minzoom {min} > maxzoom {max}")]
    InvalidZoomRange { min: u8, max: u8 },

    /// Metadata resolved without any tile URL template
    #[error("Source {source_id} has no tile URL templates")]
    MissingTiles { source_id: String },

    /// The source metadata could not be fetched
    #[error("Failed to load metadata for {source_id}: {error}")]
    Metadata { source_id: String, error: FetchError },

    /// The archive blob could not be fetched
    #[error("Failed to fetch archive {location}: {error}")]
    ArchiveFetch { location: String, error: FetchError },

    /// The archive could not be opened or queried
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// A tile request failed
    #[error("Tile fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The source has not finished loading its metadata
    #[error("Source {source_id} is not loaded")]
    NotLoaded { source_id: String },
}

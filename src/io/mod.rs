//! Network I/O layer.
//!
//! Everything that leaves the process goes through the [`ByteFetcher`] trait so
//! that tile sources, workers and the glyph loader can be exercised against
//! in-memory fetchers in tests and against [`HttpFetcher`] in production.

mod fetcher;
mod http_fetcher;
mod metadata;

pub use fetcher::{
    identity_transform, ByteFetcher, FetchResponse, RequestTransform, ResourceKind,
    ResourceRequest,
};
pub use http_fetcher::HttpFetcher;
pub use metadata::{MetadataFetcher, TileJson, TileJsonLoader, VectorLayer};

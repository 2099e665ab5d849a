use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// What a request is for. Passed to the transform hook so callers can attach
/// per-resource credentials or rewrite hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// TileJSON metadata
    Source,
    /// A single tile
    Tile,
    /// A glyph range
    Glyphs,
    /// A whole tile archive blob
    Archive,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Source => "source",
            ResourceKind::Tile => "tile",
            ResourceKind::Glyphs => "glyphs",
            ResourceKind::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// A fully resolved request, after the transform hook has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Absolute URL to fetch
    pub url: String,

    /// Extra request headers
    pub headers: Vec<(String, String)>,

    /// Record how long the fetch took
    pub collect_resource_timing: bool,
}

impl ResourceRequest {
    /// A plain GET request for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            collect_resource_timing: false,
        }
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Body and caching headers of a successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub data: Bytes,
    pub cache_control: Option<String>,
    pub expires: Option<String>,
}

impl FetchResponse {
    /// A response with a body and no caching headers.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            cache_control: None,
            expires: None,
        }
    }
}

/// Hook applied to every URL before it is fetched.
pub type RequestTransform = Arc<dyn Fn(&str, ResourceKind) -> ResourceRequest + Send + Sync>;

/// A transform that leaves URLs untouched.
pub fn identity_transform() -> RequestTransform {
    Arc::new(|url: &str, _kind: ResourceKind| ResourceRequest::new(url))
}

/// Trait for fetching whole resources as bytes.
///
/// Implementations must report a missing resource as [`FetchError::NotFound`]
/// so that callers never need to look at transport status codes. Dropping the
/// returned future cancels the request.
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    /// Fetch the resource described by `request`.
    async fn fetch(&self, request: &ResourceRequest) -> Result<FetchResponse, FetchError>;
}

#[async_trait]
impl<T: ByteFetcher + ?Sized> ByteFetcher for Arc<T> {
    async fn fetch(&self, request: &ResourceRequest) -> Result<FetchResponse, FetchError> {
        (**self).fetch(request).await
    }
}

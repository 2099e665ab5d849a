use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, CACHE_CONTROL, EXPIRES};
use http::StatusCode;
use tracing::debug;

use super::{ByteFetcher, FetchResponse, ResourceRequest};
use crate::error::FetchError;

/// reqwest-backed implementation of [`ByteFetcher`].
///
/// A 404 answer becomes [`FetchError::NotFound`]; any other non-success status
/// becomes [`FetchError::Http`].
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tile-courier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[async_trait]
impl ByteFetcher for HttpFetcher {
    async fn fetch(&self, request: &ResourceRequest) -> Result<FetchResponse, FetchError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status();
        debug!(url = %request.url, status = status.as_u16(), "fetched");

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(request.url.clone()));
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let cache_control = header_string(response.headers(), CACHE_CONTROL);
        let expires = header_string(response.headers(), EXPIRES);

        let data = response
            .bytes()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        Ok(FetchResponse {
            data,
            cache_control,
            expires,
        })
    }
}

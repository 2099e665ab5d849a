use std::collections::HashMap;

use bytes::Bytes;
use tracing::debug;

use crate::codec;
use crate::error::FetchError;
use crate::io::{ByteFetcher, RequestTransform, ResourceKind};

/// Code points per glyph range.
pub const GLYPHS_PER_RANGE: u32 = 256;

/// Placement metrics of a single glyph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub advance: u32,
}

/// One parsed glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleGlyph {
    /// Unicode code point
    pub id: u32,
    /// Signed distance field bitmap, empty for whitespace
    pub bitmap: Bytes,
    pub metrics: GlyphMetrics,
}

/// Turns the bytes of a glyph range into glyph records.
pub trait GlyphParser: Send + Sync {
    fn parse(&self, data: &[u8]) -> Vec<StyleGlyph>;
}

/// Substitute `{fontstack}` and `{range}` into a glyph URL template.
pub fn glyph_range_url(url_template: &str, fontstack: &str, range: u32) -> String {
    let begin = range.saturating_mul(GLYPHS_PER_RANGE);
    let end = begin.saturating_add(GLYPHS_PER_RANGE - 1);
    url_template
        .replace("{fontstack}", fontstack)
        .replace("{range}", &format!("{begin}-{end}"))
}

/// Load one glyph range.
///
/// Fetch errors are returned as-is. A body that is not gzip-framed, or fails
/// to decompress, is parsed as delivered. Glyph ids the parser does not
/// produce are simply absent from the map.
pub async fn load_glyph_range(
    fetcher: &dyn ByteFetcher,
    parser: &dyn GlyphParser,
    fontstack: &str,
    range: u32,
    url_template: &str,
    transform: &RequestTransform,
) -> Result<HashMap<u32, StyleGlyph>, FetchError> {
    let url = glyph_range_url(url_template, fontstack, range);
    let request = transform(&url, ResourceKind::Glyphs);

    let response = fetcher.fetch(&request).await?;
    let decoded = codec::decode_if_compressed(response.data);
    debug!(
        fontstack,
        range,
        compressed = decoded.is_decompressed(),
        "glyph range fetched"
    );

    let glyphs = parser
        .parse(decoded.as_bytes())
        .into_iter()
        .map(|glyph| (glyph.id, glyph))
        .collect();
    Ok(glyphs)
}

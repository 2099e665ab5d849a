//! Glyph range loading tests.

use bytes::Bytes;
use std::sync::Arc;

use super::test_utils::*;
use tile_courier::error::FetchError;
use tile_courier::glyph::{load_glyph_range, GlyphMetrics, GlyphParser, StyleGlyph};
use tile_courier::io::{identity_transform, RequestTransform, ResourceKind, ResourceRequest};

const GLYPH_TEMPLATE: &str = "http://fonts.test/{fontstack}/{range}.pbf";

/// Parses `id:width;` records, ignoring anything malformed.
struct RecordParser;

impl GlyphParser for RecordParser {
    fn parse(&self, data: &[u8]) -> Vec<StyleGlyph> {
        std::str::from_utf8(data)
            .unwrap_or_default()
            .split(';')
            .filter_map(|record| {
                let (id, width) = record.split_once(':')?;
                Some(StyleGlyph {
                    id: id.trim().parse().ok()?,
                    bitmap: Bytes::new(),
                    metrics: GlyphMetrics {
                        width: width.trim().parse().ok()?,
                        advance: 10,
                        ..GlyphMetrics::default()
                    },
                })
            })
            .collect()
    }
}

#[tokio::test]
async fn test_uncompressed_range_is_parsed_directly() {
    let fetcher = MockFetcher::new().with_body("http://fonts.test/Noto Sans/0-255.pbf", "65:12;66:14");

    let glyphs = load_glyph_range(
        &fetcher,
        &RecordParser,
        "Noto Sans",
        0,
        GLYPH_TEMPLATE,
        &identity_transform(),
    )
    .await
    .unwrap();

    assert_eq!(glyphs.len(), 2);
    assert_eq!(glyphs[&65].metrics.width, 12);
    assert_eq!(glyphs[&66].metrics.width, 14);
}

#[tokio::test]
async fn test_gzip_range_is_decompressed() {
    let fetcher = MockFetcher::new()
        .with_body("http://fonts.test/Noto Sans/256-511.pbf", gzip(b"300:9;301:11"));

    let glyphs = load_glyph_range(
        &fetcher,
        &RecordParser,
        "Noto Sans",
        1,
        GLYPH_TEMPLATE,
        &identity_transform(),
    )
    .await
    .unwrap();

    assert_eq!(glyphs[&300].metrics.width, 9);
    assert_eq!(glyphs[&301].metrics.width, 11);
}

#[tokio::test]
async fn test_missing_range_propagates_error() {
    let fetcher = MockFetcher::new();

    let result = load_glyph_range(
        &fetcher,
        &RecordParser,
        "Noto Sans",
        2,
        GLYPH_TEMPLATE,
        &identity_transform(),
    )
    .await;

    assert_eq!(
        result,
        Err(FetchError::NotFound(
            "http://fonts.test/Noto Sans/512-767.pbf".to_string()
        ))
    );
}

#[tokio::test]
async fn test_transform_rewrites_glyph_request() {
    let fetcher = MockFetcher::new().with_body("https://cdn.test/Noto/0-255.pbf", "32:0");
    let transform: RequestTransform = Arc::new(|url: &str, kind: ResourceKind| {
        assert_eq!(kind, ResourceKind::Glyphs);
        ResourceRequest::new(url.replace("http://fonts.test", "https://cdn.test"))
    });

    let glyphs = load_glyph_range(&fetcher, &RecordParser, "Noto", 0, GLYPH_TEMPLATE, &transform)
        .await
        .unwrap();

    assert!(glyphs.contains_key(&32));
    assert_eq!(fetcher.requested_urls(), vec!["https://cdn.test/Noto/0-255.pbf"]);
}

//! Font glyph range loading.
//!
//! Glyphs are served in ranges of 256 code points. A range is fetched,
//! decompressed when it arrives gzip-framed, and handed to a [`GlyphParser`]
//! which turns the bytes into individual glyph records.

mod loader;

pub use loader::{
    glyph_range_url, load_glyph_range, GlyphMetrics, GlyphParser, StyleGlyph, GLYPHS_PER_RANGE,
};

//! Payload decoding.
//!
//! Tile payloads stored in archives and glyph ranges served by static hosts may
//! or may not be gzip-compressed, and nothing in the transport says which. The
//! codec tries gzip and falls back to the original bytes, so callers never have
//! to handle a decompression error.

mod gzip;

pub use gzip::{decode_if_compressed, is_gzip_framed, CodecResult, GZIP_MAGIC};

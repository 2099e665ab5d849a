use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use tracing::debug;

/// The two leading bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Outcome of [`decode_if_compressed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecResult {
    /// The input was a gzip stream; these are the inflated bytes.
    Decompressed(Bytes),

    /// The input could not be inflated and is returned untouched.
    PassThrough(Bytes),
}

impl CodecResult {
    /// Whether the payload was inflated.
    pub fn is_decompressed(&self) -> bool {
        matches!(self, CodecResult::Decompressed(_))
    }

    /// Borrow the resulting bytes.
    pub fn as_bytes(&self) -> &Bytes {
        match self {
            CodecResult::Decompressed(b) | CodecResult::PassThrough(b) => b,
        }
    }

    /// Take the resulting bytes, whichever variant produced them.
    pub fn into_bytes(self) -> Bytes {
        match self {
            CodecResult::Decompressed(b) | CodecResult::PassThrough(b) => b,
        }
    }
}

/// Check whether a buffer starts with the gzip magic bytes.
pub fn is_gzip_framed(buffer: &[u8]) -> bool {
    buffer.len() >= GZIP_MAGIC.len() && buffer[..2] == GZIP_MAGIC
}

/// Inflate `buffer` if it is a gzip stream, otherwise hand it back unchanged.
///
/// This is a total function: wrong magic bytes, truncated members and corrupt
/// deflate data all degrade to [`CodecResult::PassThrough`] carrying the
/// original buffer. Failures are logged at debug level only.
pub fn decode_if_compressed(buffer: Bytes) -> CodecResult {
    if buffer.is_empty() {
        return CodecResult::PassThrough(buffer);
    }

    let inflated = {
        let mut decoder = GzDecoder::new(buffer.as_ref());
        let mut inflated = Vec::new();
        decoder.read_to_end(&mut inflated).map(|_| inflated)
    };

    match inflated {
        Ok(inflated) => CodecResult::Decompressed(Bytes::from(inflated)),
        Err(e) => {
            debug!(len = buffer.len(), error = %e, "gunzip failed, using raw payload");
            CodecResult::PassThrough(buffer)
        }
    }
}

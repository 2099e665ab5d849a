/// The `?{z}/{x}/{y}` suffix every archive tile template carries.
const PLACEHOLDER_SUFFIX: &str = "{z}/{x}/{y}";

/// File extension marking an archive reference.
const ARCHIVE_EXTENSION: &str = ".mbtiles";

/// A tile URL template that points into a single archive file.
///
/// Recognizes templates shaped like `http://host/countries.mbtiles?{z}/{x}/{y}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveUrl {
    location: String,
}

impl ArchiveUrl {
    /// Parse a tile URL template. Returns `None` when the template is an
    /// ordinary per-tile endpoint.
    pub fn parse(template: &str) -> Option<Self> {
        let (location, suffix) = template.split_once('?')?;
        if suffix != PLACEHOLDER_SUFFIX {
            return None;
        }
        if !location.to_ascii_lowercase().ends_with(ARCHIVE_EXTENSION) {
            return None;
        }
        Some(Self {
            location: location.to_string(),
        })
    }

    /// Everything before the `?`: where the archive blob lives.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Split a concrete tile URL into its archive location and `(z, x, y)`.
    pub fn split_tile_url(url: &str) -> Option<(&str, u8, u32, u32)> {
        let (location, address) = url.split_once('?')?;
        let mut parts = address.split('/');
        let z = parts.next()?.parse().ok()?;
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some((location, z, x, y))
    }
}

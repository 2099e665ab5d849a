use std::fmt;

use super::descriptor::Scheme;

/// Identifier the renderer assigns to each tile object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileUid(pub u64);

impl fmt::Display for TileUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tile in the XYZ grid: `y` counts from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalTileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl CanonicalTileId {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Bing-style quadkey, empty at zoom 0.
    pub fn quadkey(&self) -> String {
        (1..=self.z)
            .rev()
            .map(|z| {
                let mask = 1u32 << (z - 1);
                let mut digit = 0u8;
                if self.x & mask != 0 {
                    digit += 1;
                }
                if self.y & mask != 0 {
                    digit += 2;
                }
                char::from(b'0' + digit)
            })
            .collect()
    }

    /// Expand a tile URL template for this tile.
    ///
    /// The template is picked by `(x + y) % templates.len()` so requests spread
    /// over mirror hosts. Supported placeholders: `{z}`, `{x}`, `{y}` (flipped
    /// for TMS), `{prefix}` and `{quadkey}`. Returns `None` for an empty list.
    pub fn url(&self, templates: &[String], scheme: Scheme) -> Option<String> {
        if templates.is_empty() {
            return None;
        }
        let index = (u64::from(self.x) + u64::from(self.y)) % templates.len() as u64;
        let template = &templates[index as usize];

        let y = match scheme {
            Scheme::Xyz => u64::from(self.y),
            Scheme::Tms => (1u64 << self.z) - 1 - u64::from(self.y),
        };
        let prefix = format!("{:x}{:x}", self.x % 16, self.y % 16);

        Some(
            template
                .replace("{prefix}", &prefix)
                .replace("{z}", &self.z.to_string())
                .replace("{x}", &self.x.to_string())
                .replace("{y}", &y.to_string())
                .replace("{quadkey}", &self.quadkey()),
        )
    }
}

impl fmt::Display for CanonicalTileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A canonical tile rendered at a possibly higher zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverscaledTileId {
    pub overscaled_z: u8,
    pub canonical: CanonicalTileId,
}

impl OverscaledTileId {
    /// `overscaled_z` is clamped to be at least the canonical zoom.
    pub fn new(overscaled_z: u8, canonical: CanonicalTileId) -> Self {
        Self {
            overscaled_z: overscaled_z.max(canonical.z),
            canonical,
        }
    }

    /// A tile shown at its own zoom.
    pub fn from_canonical(canonical: CanonicalTileId) -> Self {
        Self::new(canonical.z, canonical)
    }

    /// `2^(overscaled_z - z)`.
    pub fn overscale_factor(&self) -> u32 {
        1u32 << u32::from(self.overscaled_z - self.canonical.z).min(31)
    }
}

impl fmt::Display for OverscaledTileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.canonical, self.overscaled_z)
    }
}

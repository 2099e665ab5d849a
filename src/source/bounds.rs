use std::f64::consts::PI;

use super::tile_id::CanonicalTileId;

/// Geographic extent of a source, used to skip tiles that cannot hold data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
}

fn mercator_x(lng: f64) -> f64 {
    (180.0 + lng) / 360.0
}

fn mercator_y(lat: f64) -> f64 {
    (180.0 - (180.0 / PI * (PI / 4.0 + lat * PI / 360.0).tan().ln())) / 360.0
}

impl TileBounds {
    /// Build from `[west, south, east, north]` in degrees, clamped to the world.
    pub fn new(bounds: [f64; 4]) -> Self {
        let [west, south, east, north] = bounds;
        Self {
            west: west.max(-180.0),
            south: south.max(-90.0),
            east: east.min(180.0),
            north: north.min(90.0),
        }
    }

    /// `[west, south, east, north]` after clamping.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Whether `tile` intersects the bounds at its zoom level.
    pub fn contains(&self, tile: &CanonicalTileId) -> bool {
        let world_size = 2f64.powi(i32::from(tile.z));
        let min_x = (mercator_x(self.west) * world_size).floor();
        let min_y = (mercator_y(self.north) * world_size).floor();
        let max_x = (mercator_x(self.east) * world_size).ceil();
        let max_y = (mercator_y(self.south) * world_size).ceil();

        let x = f64::from(tile.x);
        let y = f64::from(tile.y);
        x >= min_x && x < max_x && y >= min_y && y < max_y
    }
}

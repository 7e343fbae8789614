//! Layout of the tile grid of a world map.

use tessera_types::cartesian::{Point2, Rect};

use crate::options::TileLayerOptions;
use crate::tile_coord::TileCoord;

/// Extent of the world in tiles, with horizontal wrapping and optional clipping bounds.
///
/// The world is square and `world_size * 2^zoom` pixels wide at every zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldGrid {
    world_size: f64,
    no_wrap: bool,
    continuous_world: bool,
    tms: bool,
    bounds: Option<Rect>,
}

impl Default for WorldGrid {
    fn default() -> Self {
        Self::new(256.0)
    }
}

impl WorldGrid {
    /// Creates a wrapping grid for a world `world_size` pixels wide at zoom level 0.
    pub fn new(world_size: f64) -> Self {
        Self {
            world_size,
            no_wrap: false,
            continuous_world: false,
            tms: false,
            bounds: None,
        }
    }

    /// Creates a grid configured from layer options.
    pub fn from_options(options: &TileLayerOptions) -> Self {
        Self {
            world_size: options.world_size,
            no_wrap: options.no_wrap,
            continuous_world: options.continuous_world,
            tms: options.tms,
            bounds: options.bounds,
        }
    }

    /// Disables horizontal wrapping: tiles left or right of the world are not loaded.
    pub fn with_no_wrap(mut self, no_wrap: bool) -> Self {
        self.no_wrap = no_wrap;
        self
    }

    /// Removes all limits, tile coordinates are used as is.
    pub fn with_continuous_world(mut self, continuous_world: bool) -> Self {
        self.continuous_world = continuous_world;
        self
    }

    /// Counts `y` from the bottom of the world in wrapped coordinates.
    pub fn with_tms(mut self, tms: bool) -> Self {
        self.tms = tms;
        self
    }

    /// Only tiles intersecting `bounds` (normalized world coordinates) are loaded.
    pub fn with_bounds(mut self, bounds: Option<Rect>) -> Self {
        self.bounds = bounds;
        self
    }

    /// Width of the world in pixels at the zoom level.
    pub fn world_pixels(&self, zoom: u32) -> f64 {
        self.world_size * 2f64.powi(zoom as i32)
    }

    /// Number of tile columns and rows the world has at the zoom level.
    pub fn tile_count(&self, zoom: u32, tile_size: f64) -> Point2<i32> {
        let count = ((self.world_pixels(zoom) / tile_size).floor() as i32).max(1);
        Point2::new(count, count)
    }

    fn wraps(&self) -> bool {
        !self.continuous_world && !self.no_wrap
    }

    /// Returns true if the tile exists in the world and intersects the bounds.
    pub fn contains(&self, coord: TileCoord, tile_size: f64) -> bool {
        if !self.continuous_world {
            let limit = self.tile_count(coord.z, tile_size);
            let outside_x = self.no_wrap && (coord.x < 0 || coord.x >= limit.x);
            if outside_x || coord.y < 0 || coord.y >= limit.y {
                return false;
            }
        }

        match &self.bounds {
            Some(bounds) => bounds.intersects(self.footprint(coord, tile_size)),
            None => true,
        }
    }

    /// Area covered by the tile in normalized world coordinates.
    pub fn footprint(&self, coord: TileCoord, tile_size: f64) -> Rect {
        let x = if self.wraps() {
            coord.x.rem_euclid(self.tile_count(coord.z, tile_size).x)
        } else {
            coord.x
        };

        let scale = tile_size / self.world_pixels(coord.z);
        Rect::new(
            x as f64 * scale,
            coord.y as f64 * scale,
            (x as f64 + 1.0) * scale,
            (coord.y as f64 + 1.0) * scale,
        )
    }

    /// Coordinate of the tile as the source addresses it: `x` wrapped into the world and `y`
    /// flipped for TMS sources.
    pub fn wrap(&self, coord: TileCoord, tile_size: f64) -> TileCoord {
        let limit = self.tile_count(coord.z, tile_size);
        let x = if self.wraps() {
            coord.x.rem_euclid(limit.x)
        } else {
            coord.x
        };
        let y = if self.tms {
            limit.y - coord.y - 1
        } else {
            coord.y
        };

        TileCoord::new(x, y, coord.z)
    }
}

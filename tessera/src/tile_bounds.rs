//! [`TileBounds`] is the inclusive rectangle of tile positions covering a viewport.

use tessera_types::cartesian::{Point2, Rect};

use crate::tile_coord::TileKey;

/// Inclusive rectangular range of tile positions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TileBounds {
    min: Point2<i32>,
    max: Point2<i32>,
}

impl TileBounds {
    /// Creates bounds from the corner tiles. Returns `None` if `max` is less than `min` on any
    /// axis.
    pub fn new(min: Point2<i32>, max: Point2<i32>) -> Option<Self> {
        if min.x > max.x || min.y > max.y {
            return None;
        }

        Some(Self { min, max })
    }

    /// Largest number of tiles [`TileBounds::from_pixel_bounds`] accepts.
    pub const MAX_LEN: usize = 1 << 20;

    /// Tiles covering the given pixel bounds: `floor(min / tile_size) ..= floor(max / tile_size)`.
    ///
    /// Returns `None` for non-finite or inverted bounds, for a tile size that is not positive,
    /// and for bounds whose tile indices do not fit into `i32` or that cover more than
    /// [`TileBounds::MAX_LEN`] tiles.
    pub fn from_pixel_bounds(pixel_bounds: Rect, tile_size: f64) -> Option<Self> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return None;
        }

        let corners = [
            pixel_bounds.x_min(),
            pixel_bounds.y_min(),
            pixel_bounds.x_max(),
            pixel_bounds.y_max(),
        ];
        if corners.iter().any(|v| !v.is_finite()) || !pixel_bounds.is_valid() {
            return None;
        }

        let to_index = |v: f64| {
            let index = (v / tile_size).floor();
            (index >= i32::MIN as f64 && index <= i32::MAX as f64).then_some(index as i32)
        };
        let bounds = Self::new(
            Point2::new(to_index(pixel_bounds.x_min())?, to_index(pixel_bounds.y_min())?),
            Point2::new(to_index(pixel_bounds.x_max())?, to_index(pixel_bounds.y_max())?),
        )?;

        (bounds.len() <= Self::MAX_LEN).then_some(bounds)
    }

    /// Top-left tile.
    pub fn min(&self) -> Point2<i32> {
        self.min
    }

    /// Bottom-right tile.
    pub fn max(&self) -> Point2<i32> {
        self.max
    }

    /// Number of tile columns. Saturates at `u32::MAX`.
    pub fn width(&self) -> u32 {
        self.max.x.abs_diff(self.min.x).saturating_add(1)
    }

    /// Number of tile rows. Saturates at `u32::MAX`.
    pub fn height(&self) -> u32 {
        self.max.y.abs_diff(self.min.y).saturating_add(1)
    }

    /// Number of tiles in the bounds. Saturates at `usize::MAX`.
    pub fn len(&self) -> usize {
        (self.width() as usize).saturating_mul(self.height() as usize)
    }

    /// Bounds always contain at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Center of the rectangle in tile units. Not rounded.
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min.x as f64 + self.max.x as f64) / 2.0,
            (self.min.y as f64 + self.max.y as f64) / 2.0,
        )
    }

    /// Returns true if the tile lies inside the bounds.
    pub fn contains(&self, key: TileKey) -> bool {
        key.x >= self.min.x && key.x <= self.max.x && key.y >= self.min.y && key.y <= self.max.y
    }

    /// Iterates over all positions row by row: increasing `y`, then increasing `x`.
    pub fn iter(&self) -> impl Iterator<Item = TileKey> {
        let (x_min, x_max) = (self.min.x, self.max.x);
        (self.min.y..=self.max.y).flat_map(move |y| (x_min..=x_max).map(move |x| TileKey::new(x, y)))
    }
}

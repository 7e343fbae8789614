//! Tile identifiers.

use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tessera_types::cartesian::Point2;

/// Position of a tile in the grid of a single zoom level.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileCoord {
    /// X index.
    pub x: i32,
    /// Y index.
    pub y: i32,
    /// Z index.
    pub z: u32,
}

impl TileCoord {
    /// Creates a new coordinate.
    pub fn new(x: i32, y: i32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Cache key of the tile. The zoom level is dropped since all cached tiles belong to the
    /// current zoom level.
    pub fn key(&self) -> TileKey {
        TileKey::new(self.x, self.y)
    }

    /// Grid position of the tile.
    pub fn point(&self) -> Point2<i32> {
        Point2::new(self.x, self.y)
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Key of a tile within one load cycle.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileKey {
    /// X index.
    pub x: i32,
    /// Y index.
    pub y: i32,
}

impl TileKey {
    /// Creates a new key.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Full coordinate of the tile at the given zoom level.
    pub fn at_zoom(&self, z: u32) -> TileCoord {
        TileCoord::new(self.x, self.y, z)
    }

    /// Orders keys row by row: increasing `y`, then increasing `x`.
    pub(crate) fn row_major(&self) -> (i32, i32) {
        (self.y, self.x)
    }
}

impl Display for TileKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

impl From<TileCoord> for TileKey {
    fn from(value: TileCoord) -> Self {
        value.key()
    }
}

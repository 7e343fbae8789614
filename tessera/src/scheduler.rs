//! Tile scheduling: which tiles of the viewport still need loading and in what order.

use tessera_types::cartesian::{CartesianPoint2dFloat, Point2};

use crate::error::TesseraError;
use crate::tile_bounds::TileBounds;
use crate::tile_coord::{TileCoord, TileKey};

/// A tile selected for loading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTile {
    /// Tile to load.
    pub coord: TileCoord,
    /// Euclidean distance from the center of the scheduled bounds, in tile units.
    pub distance_to_center: f64,
}

/// Selects tiles to load and counts outstanding loads of the current batch.
#[derive(Debug, Default)]
pub struct TileScheduler {
    counter: LoadCounter,
}

impl TileScheduler {
    /// Creates a scheduler with no outstanding loads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists tiles in `bounds` that pass `should_load` and are not cached yet, closest to the
    /// center first.
    ///
    /// Tiles at equal distance keep the row-major order of [`TileBounds::iter`].
    pub fn schedule(
        bounds: &TileBounds,
        zoom: u32,
        mut should_load: impl FnMut(TileCoord) -> bool,
        mut is_cached: impl FnMut(TileKey) -> bool,
    ) -> Vec<ScheduledTile> {
        let center = bounds.center();
        let mut queue: Vec<ScheduledTile> = bounds
            .iter()
            .filter(|key| !is_cached(*key))
            .map(|key| key.at_zoom(zoom))
            .filter(|coord| should_load(*coord))
            .map(|coord| ScheduledTile {
                coord,
                distance_to_center: Point2::new(coord.x as f64, coord.y as f64).distance(&center),
            })
            .collect();

        // `sort_by` is stable, so ties stay in enumeration order.
        queue.sort_by(|a, b| a.distance_to_center.total_cmp(&b.distance_to_center));
        queue
    }

    /// Registers `count` new loads. Returns true if the "loading" notification must be sent,
    /// which happens when a non-empty batch starts while nothing is outstanding.
    pub fn begin_batch(&mut self, count: usize) -> bool {
        self.counter.start(count)
    }

    /// Marks one load as resolved. Returns true if it was the last outstanding one.
    pub fn resolve(&mut self) -> Result<bool, TesseraError> {
        self.counter.finish()
    }

    /// Number of loads that did not resolve yet.
    pub fn outstanding(&self) -> usize {
        self.counter.outstanding()
    }
}

/// Number of outstanding loads. Never goes below zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadCounter {
    outstanding: usize,
}

impl LoadCounter {
    /// Adds `count` outstanding loads. Returns true if this starts a new loading period.
    pub fn start(&mut self, count: usize) -> bool {
        if count == 0 {
            return false;
        }

        let was_idle = self.outstanding == 0;
        self.outstanding += count;
        was_idle
    }

    /// Removes one outstanding load. Returns true if no loads remain.
    ///
    /// Fails without changing the counter if nothing is outstanding.
    pub fn finish(&mut self) -> Result<bool, TesseraError> {
        match self.outstanding.checked_sub(1) {
            Some(remaining) => {
                self.outstanding = remaining;
                Ok(remaining == 0)
            }
            None => Err(TesseraError::CounterUnderflow),
        }
    }

    /// Number of outstanding loads.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Returns true if nothing is outstanding.
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0
    }
}

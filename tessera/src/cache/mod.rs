//! Tile cache: the records of all tiles of the current load cycle.
//!
//! The cache evicts by bounds, not by recency. A tile outside the current [`TileBounds`] is
//! removed on the next viewport change no matter how recently it was used. What happens to
//! the removed tile's element is decided by the [`EvictionPolicy`]:
//!
//! * [`EvictionPolicy::Destroy`] hands the record over to the caller, which is expected to
//!   destroy its element.
//! * [`EvictionPolicy::Recycle`] moves the record to `Unused` and keeps it in a [`TilePool`],
//!   so the element can back another tile later.

use std::collections::HashMap;

use futures::future::AbortHandle;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::TesseraError;
use crate::tile_bounds::TileBounds;
use crate::tile_coord::{TileCoord, TileKey};

mod pool;
pub use pool::TilePool;

/// Load state of a tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TileState {
    /// Load was requested and did not finish yet.
    Loading,
    /// Tile loaded successfully.
    Loaded,
    /// Tile failed to load.
    Errored,
    /// Tile was evicted and its element waits to be recycled.
    Unused,
}

impl TileState {
    fn can_become(self, next: TileState) -> bool {
        use TileState::*;

        matches!(
            (self, next),
            (Loading, Loaded)
                | (Loading, Errored)
                | (Loading, Unused)
                | (Loaded, Unused)
                | (Errored, Unused)
                | (Unused, Loading)
        )
    }
}

/// What to do with the element of an evicted tile.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EvictionPolicy {
    /// Evicted elements are given to the renderer for destruction.
    #[default]
    Destroy,
    /// Evicted elements are kept in a pool and reused for new tiles.
    Recycle,
}

/// Identifies one load request. A completion carrying an outdated ticket is ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    /// Key of the requested tile.
    pub key: TileKey,
    /// Generation of the record the request was issued for.
    pub generation: u64,
}

/// State of one tile owned by the [`TileCache`].
#[derive(Debug, Clone)]
pub struct TileRecord<E> {
    coord: TileCoord,
    state: TileState,
    element: E,
    distance_to_center: f64,
    generation: u64,
    abort_handle: Option<AbortHandle>,
    cancelled: bool,
}

impl<E> TileRecord<E> {
    /// Creates a record in the `Loading` state.
    pub fn new(coord: TileCoord, element: E, distance_to_center: f64, generation: u64) -> Self {
        Self {
            coord,
            state: TileState::Loading,
            element,
            distance_to_center,
            generation,
            abort_handle: None,
            cancelled: false,
        }
    }

    /// Tile coordinate.
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Cache key.
    pub fn key(&self) -> TileKey {
        self.coord.key()
    }

    /// Current state.
    pub fn state(&self) -> TileState {
        self.state
    }

    /// Element backing the tile.
    pub fn element(&self) -> &E {
        &self.element
    }

    /// Mutable access to the element backing the tile.
    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }

    /// Consumes the record, returning its element.
    pub fn into_element(self) -> E {
        self.element
    }

    /// Distance from the center of the bounds the tile was scheduled in.
    pub fn distance_to_center(&self) -> f64 {
        self.distance_to_center
    }

    /// Generation of the record. Every new or recycled record gets a new one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ticket for the load of this record.
    pub fn ticket(&self) -> LoadTicket {
        LoadTicket {
            key: self.key(),
            generation: self.generation,
        }
    }

    /// Returns true if the record was evicted before its load finished.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Moves the record to `next` state.
    pub fn transition(&mut self, next: TileState) -> Result<(), TesseraError> {
        if !self.state.can_become(next) {
            return Err(TesseraError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        if next != TileState::Loading {
            self.abort_handle = None;
        }

        self.state = next;
        Ok(())
    }

    /// Assigns an `Unused` record to a new tile and moves it back to `Loading`.
    pub fn reuse(
        &mut self,
        coord: TileCoord,
        distance_to_center: f64,
        generation: u64,
    ) -> Result<(), TesseraError> {
        self.transition(TileState::Loading)?;
        self.coord = coord;
        self.distance_to_center = distance_to_center;
        self.generation = generation;
        self.cancelled = false;

        Ok(())
    }

    pub(crate) fn set_abort_handle(&mut self, handle: AbortHandle) {
        self.abort_handle = Some(handle);
    }

    /// Aborts the in-flight load, if any, and marks the record as cancelled.
    fn cancel_load(&mut self) -> bool {
        if self.state != TileState::Loading {
            return false;
        }

        if let Some(handle) = self.abort_handle.take() {
            handle.abort();
        }

        self.cancelled = true;
        true
    }
}

/// Mapping from tile key to [`TileRecord`].
#[derive(Debug)]
pub struct TileCache<E> {
    records: HashMap<TileKey, TileRecord<E>, ahash::RandomState>,
    policy: EvictionPolicy,
    pool: TilePool<E>,
    last_generation: u64,
}

impl<E> TileCache<E> {
    /// Creates an empty cache.
    pub fn new(policy: EvictionPolicy, pool_capacity: Option<usize>) -> Self {
        Self {
            records: HashMap::default(),
            policy,
            pool: TilePool::new(pool_capacity),
            last_generation: 0,
        }
    }

    /// Eviction policy of the cache.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Record for the key.
    pub fn get(&self, key: TileKey) -> Option<&TileRecord<E>> {
        self.records.get(&key)
    }

    /// Mutable record for the key.
    pub fn get_mut(&mut self, key: TileKey) -> Option<&mut TileRecord<E>> {
        self.records.get_mut(&key)
    }

    /// Returns true if there is a record for the key.
    pub fn contains(&self, key: TileKey) -> bool {
        self.records.contains_key(&key)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keys of all records in row-major order.
    pub fn keys(&self) -> Vec<TileKey> {
        let mut keys: Vec<_> = self.records.keys().copied().collect();
        keys.sort_by_key(TileKey::row_major);
        keys
    }

    /// Iterates over records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &TileRecord<E>> {
        self.records.values()
    }

    /// Records waiting for reuse.
    pub fn pool(&self) -> &TilePool<E> {
        &self.pool
    }

    /// Drops all records waiting for reuse.
    pub fn clear_pool(&mut self) {
        self.pool.clear();
    }

    /// Returns a new unique generation number.
    pub fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    /// Creates a `Loading` record for the tile, recycling a pooled one when possible.
    ///
    /// `reset` is called on the element of a recycled record before it is reused.
    pub fn create_record(
        &mut self,
        coord: TileCoord,
        distance_to_center: f64,
        create: impl FnOnce() -> E,
        reset: impl FnOnce(&mut E),
    ) -> TileRecord<E> {
        let generation = self.next_generation();

        if let Some(mut record) = self.pool.acquire() {
            reset(record.element_mut());
            match record.reuse(coord, distance_to_center, generation) {
                Ok(()) => return record,
                Err(err) => log::warn!("Pooled tile record is not reusable: {err}"),
            }
        }

        TileRecord::new(coord, create(), distance_to_center, generation)
    }

    /// Inserts the record. An existing record for the same key is never overwritten: the call
    /// fails with [`TesseraError::Conflict`] and the rejected record is dropped.
    pub fn put(&mut self, record: TileRecord<E>) -> Result<(), TesseraError> {
        let key = record.key();
        if self.records.contains_key(&key) {
            return Err(TesseraError::Conflict(key));
        }

        self.records.insert(key, record);
        Ok(())
    }

    /// Removes the record for the key.
    ///
    /// A load in flight is aborted. Under [`EvictionPolicy::Recycle`] the record is
    /// returned in the `Unused` state and a copy is kept in the pool.
    pub fn remove(&mut self, key: TileKey) -> Option<TileRecord<E>>
    where
        E: Clone,
    {
        let mut record = self.records.remove(&key)?;
        if record.cancel_load() {
            log::debug!("Cancelled loading of tile {}", record.coord());
        }

        if self.policy == EvictionPolicy::Recycle {
            match record.transition(TileState::Unused) {
                Ok(()) => {
                    self.pool.release(record.clone());
                }
                Err(err) => log::warn!("Failed to release tile {key}: {err}"),
            }
        }

        Some(record)
    }

    /// Removes all records outside the bounds. Returned records are in row-major order.
    pub fn evict_outside(&mut self, bounds: &TileBounds) -> Vec<TileRecord<E>>
    where
        E: Clone,
    {
        let outside: Vec<_> = self
            .keys()
            .into_iter()
            .filter(|key| !bounds.contains(*key))
            .collect();

        outside.into_iter().filter_map(|key| self.remove(key)).collect()
    }

    /// Removes all records. Returned records are in row-major order.
    pub fn drain(&mut self) -> Vec<TileRecord<E>>
    where
        E: Clone,
    {
        self.keys()
            .into_iter()
            .filter_map(|key| self.remove(key))
            .collect()
    }
}

impl<E> Default for TileCache<E> {
    fn default() -> Self {
        Self::new(EvictionPolicy::default(), None)
    }
}

//! Pool of evicted tiles for the recycle eviction policy.

use super::{TileRecord, TileState};

/// Unused tile records kept for recycling their elements.
#[derive(Debug)]
pub struct TilePool<E> {
    unused: Vec<TileRecord<E>>,
    capacity: Option<usize>,
}

impl<E> TilePool<E> {
    /// Creates a pool. With `capacity` set, records released into a full pool are dropped.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            unused: Vec::new(),
            capacity,
        }
    }

    /// Takes the most recently released record, if any.
    pub fn acquire(&mut self) -> Option<TileRecord<E>> {
        self.unused.pop()
    }

    /// Puts an `Unused` record into the pool. Returns false if the record was not accepted:
    /// either it is not `Unused` or the pool is full.
    pub fn release(&mut self, record: TileRecord<E>) -> bool {
        if record.state() != TileState::Unused {
            log::warn!(
                "Tile {} cannot be pooled in state {:?}",
                record.coord(),
                record.state()
            );
            return false;
        }

        if self.capacity.is_some_and(|capacity| self.unused.len() >= capacity) {
            return false;
        }

        self.unused.push(record);
        true
    }

    /// Drops all pooled records.
    pub fn clear(&mut self) {
        self.unused.clear();
    }

    /// Number of pooled records.
    pub fn len(&self) -> usize {
        self.unused.len()
    }

    /// Returns true if the pool has no records.
    pub fn is_empty(&self) -> bool {
        self.unused.is_empty()
    }
}

impl<E> Default for TilePool<E> {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_coord::TileCoord;

    fn unused(x: i32) -> TileRecord<u32> {
        let mut record = TileRecord::new(TileCoord::new(x, 0, 0), x as u32, 0.0, 1);
        record.transition(TileState::Loaded).unwrap();
        record.transition(TileState::Unused).unwrap();
        record
    }

    #[test]
    fn acquires_last_released() {
        let mut pool = TilePool::default();
        assert!(pool.release(unused(1)));
        assert!(pool.release(unused(2)));
        assert_eq!(pool.acquire().map(|r| *r.element()), Some(2));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn respects_capacity() {
        let mut pool = TilePool::new(Some(1));
        assert!(pool.release(unused(1)));
        assert!(!pool.release(unused(2)));
        assert_eq!(pool.len(), 1);
        pool.clear();
        assert!(pool.is_empty());
    }

    #[test]
    fn rejects_records_in_use() {
        let mut pool = TilePool::default();
        let loading = TileRecord::new(TileCoord::new(0, 0, 0), 0u32, 0.0, 1);
        assert!(!pool.release(loading));
        assert!(pool.is_empty());
    }
}

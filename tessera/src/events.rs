//! Notifications sent by the tile set manager.

use maybe_sync::{MaybeSend, MaybeSync};

use crate::cache::TileRecord;
use crate::error::TileLoadError;
use crate::tile_coord::TileCoord;

/// Receives notifications about tile loading. All methods do nothing by default.
pub trait TileEventListener<E>: MaybeSend + MaybeSync {
    /// A batch of loads started while nothing else was loading.
    fn loading(&self) {}

    /// The last outstanding load resolved.
    fn load_complete(&self) {}

    /// A load was requested for the tile.
    fn tile_loading(&self, _coord: TileCoord) {}

    /// The tile loaded successfully.
    fn tile_loaded(&self, _record: &TileRecord<E>) {}

    /// The tile failed to load.
    fn tile_error(&self, _record: &TileRecord<E>, _error: &TileLoadError) {}

    /// The tile was removed from the cache. The renderer should detach its element.
    fn tile_unloaded(&self, _coord: TileCoord, _record: &TileRecord<E>) {}
}

/// Listener that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyListener;

impl<E> TileEventListener<E> for DummyListener {}

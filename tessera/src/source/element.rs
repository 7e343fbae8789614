//! Shared tile image handles filled by [`UrlTileSource`](super::UrlTileSource).

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

/// Shared handle to a tile image: where it comes from and, once loaded, its encoded bytes.
///
/// Clones point to the same tile. The renderer keeps a clone to draw the data and the
/// source writes into it when the load finishes.
#[derive(Debug, Clone, Default)]
pub struct TileElement(Arc<Mutex<ElementState>>);

#[derive(Debug, Default)]
struct ElementState {
    src: Option<String>,
    data: Option<Bytes>,
    loaded: bool,
}

impl TileElement {
    /// Url the element is loading or was loaded from.
    pub fn src(&self) -> Option<String> {
        self.0.lock().src.clone()
    }

    /// Encoded tile data, if loaded.
    pub fn data(&self) -> Option<Bytes> {
        self.0.lock().data.clone()
    }

    /// Returns true if the tile data arrived.
    pub fn is_loaded(&self) -> bool {
        self.0.lock().loaded
    }

    /// Sets the url of the element and drops previous data.
    pub fn set_src(&self, src: &str) {
        let mut state = self.0.lock();
        state.src = Some(src.to_string());
        state.data = None;
        state.loaded = false;
    }

    /// Stores loaded tile data.
    pub fn set_loaded(&self, data: Bytes) {
        let mut state = self.0.lock();
        state.data = Some(data);
        state.loaded = true;
    }

    /// Clears everything so the element can be reused.
    pub fn reset(&self) {
        *self.0.lock() = ElementState::default();
    }

    /// Returns true if both handles point to the same element.
    pub fn ptr_eq(&self, other: &TileElement) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

//! Tile sources: the capability object the tile set manager uses to filter, create and load
//! tiles.

use futures::future::AbortRegistration;
use maybe_sync::{MaybeSend, MaybeSync};

use crate::cache::LoadTicket;
use crate::error::TileLoadError;
use crate::tile_coord::TileCoord;

mod element;
mod fetcher;
mod grid;
mod url;

pub use element::TileElement;
#[cfg(feature = "http")]
pub use fetcher::HttpFetcher;
pub use fetcher::TileFetcher;
pub use grid::WorldGrid;
pub use url::{UrlTemplate, UrlTileSource};

/// Everything a source needs to load one tile.
#[derive(Debug, Clone)]
pub struct TileRequest<E> {
    /// Tile in the grid of the displayed zoom level. Not wrapped.
    pub coord: TileCoord,
    /// Zoom level to use when addressing the tile at its source.
    pub url_zoom: i32,
    /// Size of the tile on screen in pixels.
    pub tile_size: f64,
    /// Element that receives the tile.
    pub element: E,
    /// Ticket to report the result with.
    pub ticket: LoadTicket,
}

/// A load request together with the registration that allows the cache to abort it.
#[derive(Debug)]
pub struct PendingLoad<E> {
    /// The request.
    pub request: TileRequest<E>,
    /// Wrap the load future in [`futures::future::Abortable`] with this registration so that
    /// evicting the tile stops it.
    pub registration: AbortRegistration,
}

/// Source of tiles for a tile layer.
///
/// The source decides which tiles exist, owns the elements that display them and performs
/// the actual loading. The tile set manager only tracks state.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait TileSource: MaybeSend + MaybeSync {
    /// Handle to the visual resource backing a tile. Cloning must produce a handle to the
    /// same resource.
    type Element: Clone + MaybeSend + MaybeSync + 'static;

    /// Returns false for tiles that must not be requested, e.g. outside of the world or of
    /// the layer bounds.
    fn should_load(&self, coord: TileCoord, tile_size: f64) -> bool;

    /// Zoom level used to address tiles of the given map zoom at the source.
    fn zoom_for_url(&self, zoom: u32) -> i32 {
        zoom as i32
    }

    /// Creates a new element.
    fn create_element(&self) -> Self::Element;

    /// Clears the element before it is reused for another tile.
    fn reset_element(&self, _element: &mut Self::Element) {}

    /// Loads the tile into `request.element`.
    async fn load_tile(&self, request: TileRequest<Self::Element>) -> Result<(), TileLoadError>;
}

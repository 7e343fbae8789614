//! Tessera decides which map tiles to show for a viewport, loads them closest to the center
//! first and drops them once they leave the view.
//!
//! # Quick start
//!
//! ```
//! use tessera::tessera_types::cartesian::Rect;
//! use tessera::{TileLayerBuilder, TileLoadError};
//!
//! # tokio_test::block_on(async {
//! let mut layer = TileLayerBuilder::new_osm(|url: String| async move {
//!     // Plug in any http client here, or enable the `http` feature and use `HttpFetcher`.
//!     Ok::<_, TileLoadError>(bytes::Bytes::from(url))
//! })
//! .build()?;
//!
//! // A 1024x768 pixel view at zoom level 4.
//! layer.update_view(Rect::new(1024.0, 512.0, 2047.0, 1279.0), 4);
//! layer.load_pending().await;
//! assert_eq!(layer.manager().cache().len(), 12);
//! # Ok::<(), tessera::TesseraError>(())
//! # }).unwrap();
//! ```
//!
//! # Main components
//!
//! * [`TileSetManager`] is the synchronous core. It converts the viewport into
//!   [`TileBounds`] with the [`ViewportTracker`], selects and orders missing tiles with the
//!   [`TileScheduler`](scheduler::TileScheduler), and keeps every requested tile in the
//!   [`TileCache`](cache::TileCache) until it leaves the view. Load results are reported back
//!   with [`TileSetManager::complete`] in any order. Results for evicted tiles are ignored.
//! * [`TileSource`](source::TileSource) is the collaborator that knows which tiles exist and
//!   how to load them. [`UrlTileSource`](source::UrlTileSource) loads tiles from a url
//!   template through a [`TileFetcher`](source::TileFetcher).
//! * [`TileLayer`] runs the loads started by the manager and feeds their results back.
//! * [`TileEventListener`] receives notifications, e.g. to request a redraw of the map.

mod builder;
pub mod cache;
pub mod error;
mod events;
mod layer;
mod manager;
mod options;
pub mod scheduler;
pub mod source;
mod tile_bounds;
mod tile_coord;
mod viewport;

#[cfg(test)]
mod tests;

pub use builder::TileLayerBuilder;
pub use cache::{EvictionPolicy, LoadTicket, TileRecord, TileState};
pub use error::{TesseraError, TileLoadError};
pub use events::{DummyListener, TileEventListener};
pub use layer::TileLayer;
pub use manager::{Completion, TileSetManager};
pub use options::TileLayerOptions;
pub use tile_bounds::TileBounds;
pub use tile_coord::{TileCoord, TileKey};
pub use viewport::ViewportTracker;

// Reexport tessera_types
pub use tessera_types;

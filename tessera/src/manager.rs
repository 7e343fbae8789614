//! [`TileSetManager`] ties the viewport tracker, scheduler and cache together.

use std::sync::Arc;

use futures::future::AbortHandle;
use tessera_types::cartesian::Rect;

use crate::cache::{LoadTicket, TileCache, TileRecord, TileState};
use crate::error::{TesseraError, TileLoadError};
use crate::events::TileEventListener;
use crate::options::TileLayerOptions;
use crate::scheduler::{ScheduledTile, TileScheduler};
use crate::source::{PendingLoad, TileRequest, TileSource};
use crate::tile_bounds::TileBounds;
use crate::viewport::ViewportTracker;

/// Result of reporting a finished load.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The record moved to the given state.
    Applied(TileState),
    /// The tile was evicted or reloaded since the request was made. Nothing changed.
    Stale,
}

/// Decides which tiles to load for the current viewport and tracks them until eviction.
///
/// The manager never performs loads itself. [`TileSetManager::on_viewport_changed`] returns
/// the loads to start and the caller reports each result with
/// [`TileSetManager::complete`], in any order. [`TileLayer`](crate::TileLayer) does both
/// with the manager's [`TileSource`].
pub struct TileSetManager<S: TileSource> {
    source: Arc<S>,
    tracker: ViewportTracker,
    scheduler: TileScheduler,
    cache: TileCache<S::Element>,
    listener: Option<Box<dyn TileEventListener<S::Element>>>,
    zoom: Option<u32>,
    bounds: Option<TileBounds>,
}

impl<S: TileSource> std::fmt::Debug for TileSetManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSetManager")
            .field("tracker", &self.tracker)
            .field("zoom", &self.zoom)
            .field("bounds", &self.bounds)
            .field("tiles", &self.cache.len())
            .field("outstanding", &self.scheduler.outstanding())
            .finish()
    }
}

impl<S: TileSource> TileSetManager<S> {
    /// Creates a manager for the source configured by `options`.
    pub fn new(source: S, options: &TileLayerOptions) -> Result<Self, TesseraError> {
        options.validate()?;

        Ok(Self::from_parts(
            Arc::new(source),
            ViewportTracker::from_options(options),
            TileCache::new(options.eviction, options.pool_capacity),
        ))
    }

    /// Creates a manager from already configured parts.
    pub fn from_parts(source: Arc<S>, tracker: ViewportTracker, cache: TileCache<S::Element>) -> Self {
        Self {
            source,
            tracker,
            scheduler: TileScheduler::new(),
            cache,
            listener: None,
            zoom: None,
            bounds: None,
        }
    }

    /// Sets the listener for tile notifications.
    pub fn with_listener(mut self, listener: impl TileEventListener<S::Element> + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Replaces the listener for tile notifications.
    pub fn set_listener(&mut self, listener: Box<dyn TileEventListener<S::Element>>) {
        self.listener = Some(listener);
    }

    /// Tile source of the manager.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Tiles of the current load cycle.
    pub fn cache(&self) -> &TileCache<S::Element> {
        &self.cache
    }

    /// Viewport tracker.
    pub fn tracker(&self) -> &ViewportTracker {
        &self.tracker
    }

    /// Zoom level of the cached tiles.
    pub fn zoom(&self) -> Option<u32> {
        self.zoom
    }

    /// Tile bounds of the last viewport update.
    pub fn bounds(&self) -> Option<TileBounds> {
        self.bounds
    }

    /// Number of loads that did not resolve yet.
    pub fn outstanding(&self) -> usize {
        self.scheduler.outstanding()
    }

    /// Returns true while any load is outstanding.
    pub fn is_loading(&self) -> bool {
        self.outstanding() > 0
    }

    /// Updates the tile set for a new viewport.
    ///
    /// Returns the loads to start, closest to the center of the viewport first. Tiles of a
    /// previous zoom level and tiles outside the new bounds are evicted. Calling this again
    /// with the same viewport returns nothing.
    pub fn on_viewport_changed(
        &mut self,
        pixel_bounds: Rect,
        zoom: u32,
    ) -> Vec<PendingLoad<S::Element>> {
        let Some(bounds) = self.tracker.tile_bounds(pixel_bounds, zoom) else {
            if self.zoom.is_some_and(|current| current != zoom) {
                self.unload_all();
                self.zoom = None;
                self.bounds = None;
            }

            return vec![];
        };

        if self.zoom != Some(zoom) {
            if let Some(previous) = self.zoom {
                log::debug!(
                    "Zoom changed from {previous} to {zoom}, unloading {} tiles",
                    self.cache.len()
                );
                self.unload_all();
            }

            self.zoom = Some(zoom);
        }

        let tile_size = self.tracker.tile_size(zoom);
        let source = &self.source;
        let cache = &self.cache;
        let scheduled = TileScheduler::schedule(
            &bounds,
            zoom,
            |coord| source.should_load(coord, tile_size),
            |key| cache.contains(key),
        );

        log::debug!(
            "Viewport {bounds:?} at zoom {zoom}: {} new tiles, {} cached",
            scheduled.len(),
            self.cache.len()
        );

        let loads = self.start_loads(scheduled, zoom, tile_size);
        self.evict_outside(&bounds);
        self.bounds = Some(bounds);

        loads
    }

    /// Reports the result of a load started by [`TileSetManager::on_viewport_changed`].
    ///
    /// Results for tiles that were evicted or reloaded in the meantime are ignored.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: Result<(), TileLoadError>,
    ) -> Completion {
        let Some(record) = self.cache.get_mut(ticket.key) else {
            log::debug!("Ignoring result for evicted tile {}", ticket.key);
            return Completion::Stale;
        };

        if record.generation() != ticket.generation || record.state() != TileState::Loading {
            log::debug!(
                "Ignoring outdated result for tile {} (generation {})",
                ticket.key,
                ticket.generation
            );
            return Completion::Stale;
        }

        let next = match &result {
            Ok(()) => TileState::Loaded,
            Err(_) => TileState::Errored,
        };

        if let Err(err) = record.transition(next) {
            log::warn!("Failed to update tile {}: {err}", ticket.key);
            return Completion::Stale;
        }

        if let Some(listener) = &self.listener {
            match &result {
                Ok(()) => listener.tile_loaded(record),
                Err(err) => listener.tile_error(record, err),
            }
        }

        self.resolve_load();
        Completion::Applied(next)
    }

    /// Removes all tiles outside the bounds. Returns the number of removed tiles.
    pub fn evict_outside(&mut self, bounds: &TileBounds) -> usize {
        let evicted = self.cache.evict_outside(bounds);
        let count = evicted.len();
        for record in evicted {
            self.on_unloaded(record);
        }

        count
    }

    /// Unloads all tiles and forgets the viewport, so the next update loads everything again.
    pub fn redraw(&mut self) {
        self.unload_all();
        self.cache.clear_pool();
        self.zoom = None;
        self.bounds = None;
    }

    fn start_loads(
        &mut self,
        scheduled: Vec<ScheduledTile>,
        zoom: u32,
        tile_size: f64,
    ) -> Vec<PendingLoad<S::Element>> {
        if scheduled.is_empty() {
            return vec![];
        }

        if self.scheduler.begin_batch(scheduled.len()) {
            if let Some(listener) = &self.listener {
                listener.loading();
            }
        }

        let url_zoom = self.source.zoom_for_url(zoom);
        let mut loads = Vec::with_capacity(scheduled.len());
        for tile in scheduled {
            let source = &self.source;
            let mut record = self.cache.create_record(
                tile.coord,
                tile.distance_to_center,
                || source.create_element(),
                |element| source.reset_element(element),
            );

            let (handle, registration) = AbortHandle::new_pair();
            record.set_abort_handle(handle);

            let request = TileRequest {
                coord: tile.coord,
                url_zoom,
                tile_size,
                element: record.element().clone(),
                ticket: record.ticket(),
            };

            if let Err(err) = self.cache.put(record) {
                log::warn!("Not loading tile {}: {err}", tile.coord);
                self.resolve_load();
                continue;
            }

            if let Some(listener) = &self.listener {
                listener.tile_loading(tile.coord);
            }

            loads.push(PendingLoad {
                request,
                registration,
            });
        }

        loads
    }

    fn unload_all(&mut self) {
        for record in self.cache.drain() {
            self.on_unloaded(record);
        }
    }

    fn on_unloaded(&mut self, record: TileRecord<S::Element>) {
        if let Some(listener) = &self.listener {
            listener.tile_unloaded(record.coord(), &record);
        }

        if record.was_cancelled() {
            self.resolve_load();
        }
    }

    fn resolve_load(&mut self) {
        match self.scheduler.resolve() {
            Ok(true) => {
                if let Some(listener) = &self.listener {
                    listener.load_complete();
                }
            }
            Ok(false) => {}
            Err(err) => log::warn!("Tile load resolved twice: {err}"),
        }
    }
}

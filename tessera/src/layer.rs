//! [`TileLayer`] runs the loads requested by a [`TileSetManager`].

use futures::future::{Abortable, LocalBoxFuture};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tessera_types::cartesian::Rect;

use crate::cache::LoadTicket;
use crate::error::{TesseraError, TileLoadError};
use crate::events::TileEventListener;
use crate::manager::{Completion, TileSetManager};
use crate::options::TileLayerOptions;
use crate::source::{PendingLoad, TileFetcher, TileSource, UrlTileSource};

type LoadFuture = LocalBoxFuture<'static, (LoadTicket, Result<(), TileLoadError>)>;

/// Tile layer: a [`TileSetManager`] together with the loads it started.
///
/// Everything runs on the thread that polls the layer. Call [`TileLayer::update_view`] when
/// the map moves and drive the loads with [`TileLayer::next_completion`] or
/// [`TileLayer::load_pending`].
///
/// ```
/// use tessera::tessera_types::cartesian::Rect;
/// use tessera::{TileLayerBuilder, TileLoadError};
///
/// let mut layer = TileLayerBuilder::new_url(
///     "https://{s}.tiles.example/{z}/{x}/{y}.png",
///     |url: String| async move { Ok::<_, TileLoadError>(bytes::Bytes::from(url)) },
/// )
/// .build()?;
///
/// let requested = layer.update_view(Rect::new(0.0, 0.0, 511.0, 511.0), 3);
/// let applied = futures::executor::block_on(layer.load_pending());
/// assert_eq!(requested, 4);
/// assert_eq!(applied, 4);
/// # Ok::<(), tessera::TesseraError>(())
/// ```
pub struct TileLayer<S: TileSource> {
    manager: TileSetManager<S>,
    in_flight: FuturesUnordered<LoadFuture>,
    last_view: Option<(Rect, u32)>,
}

impl<S: TileSource> std::fmt::Debug for TileLayer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLayer")
            .field("manager", &self.manager)
            .field("in_flight", &self.in_flight.len())
            .field("last_view", &self.last_view)
            .finish()
    }
}

impl<S: TileSource + 'static> TileLayer<S> {
    /// Creates a layer loading tiles from `source`.
    pub fn new(source: S, options: &TileLayerOptions) -> Result<Self, TesseraError> {
        Ok(Self::from_manager(TileSetManager::new(source, options)?))
    }

    /// Creates a layer around an existing manager.
    pub fn from_manager(manager: TileSetManager<S>) -> Self {
        Self {
            manager,
            in_flight: FuturesUnordered::new(),
            last_view: None,
        }
    }

    /// Tile set manager of the layer.
    pub fn manager(&self) -> &TileSetManager<S> {
        &self.manager
    }

    /// Mutable access to the tile set manager.
    ///
    /// Loads returned by the manager directly are not tracked by the layer.
    pub fn manager_mut(&mut self) -> &mut TileSetManager<S> {
        &mut self.manager
    }

    /// Replaces the listener for tile notifications.
    pub fn set_listener(&mut self, listener: impl TileEventListener<S::Element> + 'static) {
        self.manager.set_listener(Box::new(listener));
    }

    /// Number of loads that were started and have not been processed yet, including aborted
    /// ones.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Updates the tiles for a new view and starts loading the missing ones. Returns the number
    /// of started loads.
    pub fn update_view(&mut self, pixel_bounds: Rect, zoom: u32) -> usize {
        self.last_view = Some((pixel_bounds, zoom));

        let loads = self.manager.on_viewport_changed(pixel_bounds, zoom);
        let count = loads.len();
        for load in loads {
            self.spawn(load);
        }

        count
    }

    /// Unloads all tiles and loads the last view again.
    pub fn redraw(&mut self) -> usize {
        self.manager.redraw();
        match self.last_view {
            Some((pixel_bounds, zoom)) => self.update_view(pixel_bounds, zoom),
            None => 0,
        }
    }

    /// Waits for the next load to finish and applies its result. Returns `None` if nothing is
    /// in flight.
    pub async fn next_completion(&mut self) -> Option<(LoadTicket, Completion)> {
        let (ticket, result) = self.in_flight.next().await?;
        if let Err(err) = &result {
            if *err != TileLoadError::Aborted {
                log::debug!("Tile {} failed to load: {err}", ticket.key);
            }
        }

        Some((ticket, self.manager.complete(ticket, result)))
    }

    /// Processes loads until none is in flight. Returns the number of applied results.
    pub async fn load_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some((_, completion)) = self.next_completion().await {
            if completion != Completion::Stale {
                applied += 1;
            }
        }

        applied
    }

    fn spawn(&mut self, load: PendingLoad<S::Element>) {
        let PendingLoad {
            request,
            registration,
        } = load;
        let ticket = request.ticket;
        let source = self.manager.source().clone();

        let load = Abortable::new(
            async move { source.load_tile(request).await },
            registration,
        );

        self.in_flight.push(
            async move {
                let result = match load.await {
                    Ok(result) => result,
                    Err(_) => Err(TileLoadError::Aborted),
                };

                (ticket, result)
            }
            .boxed_local(),
        );
    }
}

impl<F: TileFetcher + 'static> TileLayer<UrlTileSource<F>> {
    /// Replaces the url template. All tiles are reloaded unless `no_redraw` is set.
    pub fn set_url(&mut self, url: impl Into<String>, no_redraw: bool) {
        self.manager.source().set_template(url);
        if !no_redraw {
            self.redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio_test::block_on;

    use super::*;
    use crate::cache::TileState;
    use crate::tests::{Event, EventLog, TestSource};
    use crate::tile_coord::{TileCoord, TileKey};

    fn tiles_view(min: (i32, i32), max: (i32, i32)) -> Rect {
        Rect::new(
            min.0 as f64 * 256.0,
            min.1 as f64 * 256.0,
            max.0 as f64 * 256.0 + 255.0,
            max.1 as f64 * 256.0 + 255.0,
        )
    }

    fn layer(source: TestSource) -> (TileLayer<TestSource>, Arc<EventLog>) {
        let log = Arc::new(EventLog::default());
        let mut layer = TileLayer::new(source, &TileLayerOptions::default()).unwrap();
        layer.set_listener(log.clone());
        (layer, log)
    }

    #[test]
    fn loads_all_tiles_of_view() {
        let (mut layer, log) = layer(TestSource::new());
        assert_eq!(layer.update_view(tiles_view((2, 3), (4, 5)), 5), 9);
        assert_eq!(layer.in_flight(), 9);

        assert_eq!(block_on(layer.load_pending()), 9);
        assert_eq!(layer.in_flight(), 0);
        assert_eq!(layer.manager().outstanding(), 0);
        assert_eq!(log.count(Event::Loading), 1);
        assert_eq!(log.count(Event::LoadComplete), 1);

        for record in layer.manager().cache().iter() {
            assert_eq!(record.state(), TileState::Loaded);
            assert_eq!(record.element().loaded(), Some(record.coord()));
        }
    }

    #[test]
    fn failed_tiles_are_errored() {
        let source = TestSource::new().failing([TileKey::new(1, 0)]);
        let (mut layer, log) = layer(source);
        layer.update_view(tiles_view((0, 0), (1, 0)), 5);
        block_on(layer.load_pending());

        let cache = layer.manager().cache();
        assert_eq!(cache.get(TileKey::new(1, 0)).unwrap().state(), TileState::Errored);
        assert_eq!(cache.get(TileKey::new(0, 0)).unwrap().state(), TileState::Loaded);
        assert!(log.contains(Event::TileError(TileKey::new(1, 0))));
        assert_eq!(log.count(Event::LoadComplete), 1);
    }

    #[test]
    fn completions_arrive_out_of_order() {
        let source = TestSource::new().delayed(TileKey::new(1, 1), 3);
        let (mut layer, _) = layer(source);
        layer.update_view(tiles_view((0, 0), (2, 2)), 5);

        let order = block_on(async {
            let mut order = vec![];
            while let Some((ticket, completion)) = layer.next_completion().await {
                assert_eq!(completion, Completion::Applied(TileState::Loaded));
                order.push(ticket.key);
            }
            order
        });

        // The center tile is requested first but finishes last.
        assert_eq!(order.len(), 9);
        assert_eq!(order.last(), Some(&TileKey::new(1, 1)));
        assert_eq!(layer.manager().outstanding(), 0);
    }

    #[test]
    fn eviction_aborts_hanging_load() {
        let source = TestSource::new().hanging([TileKey::new(0, 0)]);
        let (mut layer, log) = layer(source);
        layer.update_view(tiles_view((0, 0), (1, 0)), 5);

        let (ticket, completion) = block_on(layer.next_completion()).unwrap();
        assert_eq!(ticket.key, TileKey::new(1, 0));
        assert_eq!(completion, Completion::Applied(TileState::Loaded));
        assert_eq!(layer.manager().outstanding(), 1);

        layer.update_view(tiles_view((5, 5), (5, 5)), 5);
        assert_eq!(block_on(layer.load_pending()), 1);
        assert_eq!(layer.in_flight(), 0);
        assert_eq!(layer.manager().outstanding(), 0);
        assert_eq!(layer.manager().cache().keys(), vec![TileKey::new(5, 5)]);
        assert!(!log.contains(Event::TileLoaded(TileKey::new(0, 0))));
        assert!(!log.contains(Event::TileError(TileKey::new(0, 0))));
    }

    #[test]
    fn redraw_reloads_last_view() {
        let (mut layer, _) = layer(TestSource::new());
        assert_eq!(layer.redraw(), 0);

        layer.update_view(tiles_view((0, 0), (1, 1)), 2);
        block_on(layer.load_pending());
        assert_eq!(layer.manager().source().loads(), 4);

        assert_eq!(layer.redraw(), 4);
        block_on(layer.load_pending());
        assert_eq!(layer.manager().source().loads(), 8);
    }

    fn src<F: TileFetcher + 'static>(layer: &TileLayer<UrlTileSource<F>>) -> Option<String> {
        layer
            .manager()
            .cache()
            .get(TileKey::new(0, 0))
            .and_then(|record| record.element().src())
    }

    #[test]
    fn set_url_reloads_tiles() {
        let fetcher = |url: String| async move { Ok::<_, TileLoadError>(Bytes::from(url)) };
        let options = TileLayerOptions {
            subdomains: vec!["a".into()],
            ..Default::default()
        };
        let source = UrlTileSource::new("https://{s}.one/{z}/{x}/{y}.png", &options, fetcher);
        let mut layer = TileLayer::new(source, &options).unwrap();

        layer.update_view(tiles_view((0, 0), (0, 0)), 1);
        block_on(layer.load_pending());
        assert_eq!(src(&layer).as_deref(), Some("https://a.one/1/0/0.png"));

        layer.set_url("https://{s}.two/{z}/{x}/{y}.png", true);
        assert_eq!(layer.in_flight(), 0);
        assert_eq!(src(&layer).as_deref(), Some("https://a.one/1/0/0.png"));

        layer.set_url("https://{s}.two/{z}/{x}/{y}.png", false);
        assert_eq!(layer.in_flight(), 1);
        block_on(layer.load_pending());
        assert_eq!(src(&layer).as_deref(), Some("https://a.two/1/0/0.png"));
    }

    #[test]
    fn recycled_element_ignores_aborted_load() {
        let options = TileLayerOptions {
            eviction: crate::cache::EvictionPolicy::Recycle,
            ..Default::default()
        };
        let source = TestSource::new().hanging([TileKey::new(0, 0)]);
        let mut layer = TileLayer::new(source, &options).unwrap();

        layer.update_view(tiles_view((0, 0), (0, 0)), 3);
        layer.update_view(tiles_view((4, 4), (4, 4)), 3);
        layer.update_view(tiles_view((4, 4), (5, 4)), 3);
        block_on(layer.load_pending());

        let record = layer.manager().cache().get(TileKey::new(5, 4)).unwrap();
        assert_eq!(record.state(), TileState::Loaded);
        assert_eq!(record.element().loaded(), Some(TileCoord::new(5, 4, 3)));
        assert_eq!(layer.manager().source().created(), 2);
    }
}

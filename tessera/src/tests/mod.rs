//! Tile sources and listeners shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::TileRecord;
use crate::error::TileLoadError;
use crate::events::TileEventListener;
use crate::options::TileLayerOptions;
use crate::source::{TileRequest, TileSource, WorldGrid};
use crate::tile_coord::{TileCoord, TileKey};

/// Element remembering which tile was loaded into it.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestElement(Arc<Mutex<Option<TileCoord>>>);

impl TestElement {
    pub(crate) fn loaded(&self) -> Option<TileCoord> {
        *self.0.lock()
    }
}

type Predicate = Box<dyn Fn(TileCoord) -> bool + Send + Sync>;

/// In-memory source. Loads succeed unless the tile is marked as failing or hanging.
pub(crate) struct TestSource {
    grid: Option<WorldGrid>,
    reject: Option<Predicate>,
    failing: HashSet<TileKey>,
    hanging: HashSet<TileKey>,
    delays: HashMap<TileKey, usize>,
    zoom_offset: i32,
    created: AtomicUsize,
    resets: AtomicUsize,
    loads: AtomicUsize,
}

impl TestSource {
    pub(crate) fn new() -> Self {
        Self {
            grid: None,
            reject: None,
            failing: HashSet::new(),
            hanging: HashSet::new(),
            delays: HashMap::new(),
            zoom_offset: 0,
            created: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    pub(crate) fn rejecting(mut self, reject: impl Fn(TileCoord) -> bool + Send + Sync + 'static) -> Self {
        self.reject = Some(Box::new(reject));
        self
    }

    pub(crate) fn with_grid(mut self, options: &TileLayerOptions) -> Self {
        self.grid = Some(WorldGrid::from_options(options));
        self
    }

    pub(crate) fn with_zoom_offset(mut self, zoom_offset: i32) -> Self {
        self.zoom_offset = zoom_offset;
        self
    }

    pub(crate) fn failing(mut self, keys: impl IntoIterator<Item = TileKey>) -> Self {
        self.failing.extend(keys);
        self
    }

    /// Loads of these tiles never finish.
    pub(crate) fn hanging(mut self, keys: impl IntoIterator<Item = TileKey>) -> Self {
        self.hanging.extend(keys);
        self
    }

    /// Loads of the tile yield to the runtime `polls` times before finishing.
    pub(crate) fn delayed(mut self, key: TileKey, polls: usize) -> Self {
        self.delays.insert(key, polls);
        self
    }

    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::Relaxed)
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl TileSource for TestSource {
    type Element = TestElement;

    fn should_load(&self, coord: TileCoord, tile_size: f64) -> bool {
        let in_grid = self
            .grid
            .as_ref()
            .map_or(true, |grid| grid.contains(coord, tile_size));
        let rejected = self.reject.as_ref().is_some_and(|reject| reject(coord));

        in_grid && !rejected
    }

    fn zoom_for_url(&self, zoom: u32) -> i32 {
        zoom as i32 + self.zoom_offset
    }

    fn create_element(&self) -> TestElement {
        self.created.fetch_add(1, Ordering::Relaxed);
        TestElement::default()
    }

    fn reset_element(&self, element: &mut TestElement) {
        self.resets.fetch_add(1, Ordering::Relaxed);
        *element.0.lock() = None;
    }

    async fn load_tile(&self, request: TileRequest<TestElement>) -> Result<(), TileLoadError> {
        let key = request.coord.key();
        self.loads.fetch_add(1, Ordering::Relaxed);

        if self.hanging.contains(&key) {
            return futures::future::pending().await;
        }

        for _ in 0..self.delays.get(&key).copied().unwrap_or(0) {
            tokio::task::yield_now().await;
        }

        if self.failing.contains(&key) {
            return Err(TileLoadError::NotFound);
        }

        *request.element.0.lock() = Some(request.coord);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Loading,
    LoadComplete,
    TileLoading(TileKey),
    TileLoaded(TileKey),
    TileError(TileKey),
    TileUnloaded(TileKey),
}

/// Listener recording every notification.
#[derive(Debug, Default)]
pub(crate) struct EventLog(Mutex<Vec<Event>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub(crate) fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock())
    }

    pub(crate) fn contains(&self, event: Event) -> bool {
        self.0.lock().contains(&event)
    }

    pub(crate) fn count(&self, event: Event) -> usize {
        self.0.lock().iter().filter(|e| **e == event).count()
    }

    pub(crate) fn count_tile_loading(&self) -> usize {
        self.count_matching(|event| matches!(event, Event::TileLoading(_)))
    }

    pub(crate) fn count_tile_unloaded(&self) -> usize {
        self.count_matching(|event| matches!(event, Event::TileUnloaded(_)))
    }

    fn count_matching(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().iter().filter(|event| f(event)).count()
    }
}

impl<E> TileEventListener<E> for Arc<EventLog> {
    fn loading(&self) {
        self.push(Event::Loading);
    }

    fn load_complete(&self) {
        self.push(Event::LoadComplete);
    }

    fn tile_loading(&self, coord: TileCoord) {
        self.push(Event::TileLoading(coord.key()));
    }

    fn tile_loaded(&self, record: &TileRecord<E>) {
        self.push(Event::TileLoaded(record.key()));
    }

    fn tile_error(&self, record: &TileRecord<E>, _error: &TileLoadError) {
        self.push(Event::TileError(record.key()));
    }

    fn tile_unloaded(&self, coord: TileCoord, _record: &TileRecord<E>) {
        self.push(Event::TileUnloaded(coord.key()));
    }
}

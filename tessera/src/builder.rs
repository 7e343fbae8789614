use tessera_types::cartesian::Rect;

use crate::cache::EvictionPolicy;
use crate::error::TesseraError;
use crate::events::TileEventListener;
use crate::layer::TileLayer;
use crate::options::TileLayerOptions;
use crate::source::{TileElement, TileFetcher, UrlTileSource};
use crate::tile_coord::TileCoord;

const OSM_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Constructor for a [`TileLayer`] loading tiles by url.
///
/// ```
/// use tessera::{EvictionPolicy, TileLayerBuilder, TileLoadError};
///
/// let layer = TileLayerBuilder::new_url(
///     "https://{s}.tiles.example/{z}/{x}/{y}{r}.png?key={apikey}",
///     |url: String| async move { Ok::<_, TileLoadError>(bytes::Bytes::from(url)) },
/// )
/// .with_value("apikey", "secret")
/// .with_zoom_range(2, 16)
/// .with_eviction_policy(EvictionPolicy::Recycle)
/// .build()?;
/// # Ok::<(), tessera::TesseraError>(())
/// ```
pub struct TileLayerBuilder<F> {
    template: String,
    fetcher: F,
    options: TileLayerOptions,
    high_density: bool,
    values: Vec<(String, String)>,
    listener: Option<Box<dyn TileEventListener<TileElement>>>,
}

impl<F: TileFetcher + 'static> TileLayerBuilder<F> {
    /// Initializes a builder for a layer requesting tiles from the url template.
    ///
    /// The template may contain `{s}`, `{x}`, `{y}`, `{z}`, `{r}` and any values added with
    /// [`TileLayerBuilder::with_value`].
    pub fn new_url(template: impl Into<String>, fetcher: F) -> Self {
        Self {
            template: template.into(),
            fetcher,
            options: TileLayerOptions::default(),
            high_density: false,
            values: vec![],
            listener: None,
        }
    }

    #[allow(rustdoc::bare_urls)]
    /// Initializes a builder for the OpenStreetMap tile servers
    /// ("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", zoom levels up to 19).
    pub fn new_osm(fetcher: F) -> Self {
        Self::new_url(OSM_TEMPLATE, fetcher).with_zoom_range(0, 19)
    }

    /// Replaces all options.
    pub fn with_options(mut self, options: TileLayerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the tile size in pixels.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.options.tile_size = tile_size;
        self
    }

    /// Sets the zoom levels at which tiles are shown.
    pub fn with_zoom_range(mut self, min_zoom: u32, max_zoom: u32) -> Self {
        self.options.min_zoom = min_zoom;
        self.options.max_zoom = max_zoom;
        self
    }

    /// Sets the highest zoom level available at the source. Tiles are scaled up above it.
    pub fn with_max_native_zoom(mut self, max_native_zoom: u32) -> Self {
        self.options.max_native_zoom = Some(max_native_zoom);
        self
    }

    /// Sets the subdomains substituted for `{s}`.
    pub fn with_subdomains(mut self, subdomains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the url shown in place of tiles that failed to load.
    pub fn with_error_tile_url(mut self, url: impl Into<String>) -> Self {
        self.options.error_tile_url = Some(url.into());
        self
    }

    /// Sets what happens to tiles leaving the viewport.
    pub fn with_eviction_policy(mut self, eviction: EvictionPolicy) -> Self {
        self.options.eviction = eviction;
        self
    }

    /// Only loads tiles intersecting the bounds, in normalized world coordinates.
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.options.bounds = Some(bounds);
        self
    }

    /// Disables horizontal wrapping of the world.
    pub fn with_no_wrap(mut self) -> Self {
        self.options.no_wrap = true;
        self
    }

    /// Flips the y axis of tile urls.
    pub fn with_tms(mut self) -> Self {
        self.options.tms = true;
        self
    }

    /// Requests high resolution tiles if `high_density` is true: tiles are loaded at half the
    /// size from one zoom level deeper and `{r}` resolves to `@2x`.
    pub fn with_retina_detection(mut self, high_density: bool) -> Self {
        self.options.detect_retina = true;
        self.high_density = high_density;
        self
    }

    /// Sets a custom template value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((key.into(), value.into()));
        self
    }

    /// Sets the listener for tile notifications.
    pub fn with_listener(mut self, listener: impl TileEventListener<TileElement> + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Consumes the builder and constructs the layer.
    ///
    /// Fails if the options are inconsistent or the template cannot be rendered.
    pub fn build(self) -> Result<TileLayer<UrlTileSource<F>>, TesseraError> {
        let Self {
            template,
            fetcher,
            mut options,
            high_density,
            values,
            listener,
        } = self;

        if template.is_empty() {
            return Err(TesseraError::Configuration("url template is empty".into()));
        }

        options.validate()?;
        let retina = options.adjust_for_display(high_density);

        let mut source = UrlTileSource::new(template, &options, fetcher).with_retina(retina);
        for (key, value) in values {
            source = source.with_value(key, value);
        }

        let probe = TileCoord::new(0, 0, options.min_zoom);
        source.tile_url(probe, options.min_zoom as i32, options.tile_size as f64)?;

        let mut layer = TileLayer::new(source, &options)?;
        if let Some(listener) = listener {
            layer.manager_mut().set_listener(listener);
        }

        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use bytes::Bytes;
    use insta::assert_compact_debug_snapshot;
    use tokio_test::block_on;

    use super::*;
    use crate::error::TileLoadError;
    use crate::tests::{Event, EventLog};
    use crate::tile_coord::TileKey;

    async fn echo(url: String) -> Result<Bytes, TileLoadError> {
        Ok(Bytes::from(url))
    }

    #[test]
    fn inverted_zoom_range_fails_build() {
        let result = TileLayerBuilder::new_url("{z}/{x}/{y}", echo)
            .with_zoom_range(5, 3)
            .build()
            .map(|_| ());
        assert_compact_debug_snapshot!(result, @r#"Err(Configuration("min zoom 5 is greater than max zoom 3"))"#);
    }

    #[test]
    fn empty_subdomains_fail_build() {
        let result = TileLayerBuilder::new_url("{s}/{z}/{x}/{y}", echo)
            .with_subdomains(Vec::<String>::new())
            .build()
            .map(|_| ());
        assert_compact_debug_snapshot!(result, @r#"Err(Configuration("at least one subdomain is required"))"#);
    }

    #[test]
    fn empty_template_fails_build() {
        let result = TileLayerBuilder::new_url("", echo).build().map(|_| ());
        assert_compact_debug_snapshot!(result, @r#"Err(Configuration("url template is empty"))"#);
    }

    #[test]
    fn unknown_placeholder_fails_build() {
        let result = TileLayerBuilder::new_url("{z}/{x}/{y}?key={apikey}", echo).build();
        assert_matches!(result, Err(TesseraError::Template(_)));

        let result = TileLayerBuilder::new_url("{z}/{x}/{y}?key={apikey}", echo)
            .with_value("apikey", "secret")
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn osm_layer() {
        let layer = TileLayerBuilder::new_osm(echo).build().unwrap();
        let source = layer.manager().source();
        assert_eq!(source.template(), OSM_TEMPLATE);
        assert_eq!(
            source.tile_url(TileCoord::new(1, 1, 1), 1, 256.0).unwrap(),
            "https://c.tile.openstreetmap.org/1/1/1.png"
        );
        assert!(layer.manager().tracker().zoom_in_range(19));
        assert!(!layer.manager().tracker().zoom_in_range(20));
    }

    #[test]
    fn retina_display_loads_half_size_tiles() {
        let mut layer = TileLayerBuilder::new_url("{z}/{x}/{y}{r}", echo)
            .with_retina_detection(true)
            .build()
            .unwrap();

        assert_eq!(layer.manager().tracker().tile_size(2), 128.0);
        assert!(!layer.manager().tracker().zoom_in_range(18));

        assert_eq!(layer.update_view(Rect::new(0.0, 0.0, 255.0, 255.0), 2), 4);
        block_on(layer.load_pending());
        let record = layer.manager().cache().get(TileKey::new(1, 0)).unwrap();
        assert_eq!(record.element().src().as_deref(), Some("3/1/0@2x"));
    }

    #[test]
    fn retina_detection_on_regular_display() {
        let mut layer = TileLayerBuilder::new_url("{z}/{x}/{y}{r}", echo)
            .with_retina_detection(false)
            .build()
            .unwrap();

        assert_eq!(layer.manager().tracker().tile_size(2), 256.0);
        layer.update_view(Rect::new(0.0, 0.0, 255.0, 255.0), 2);
        block_on(layer.load_pending());
        let record = layer.manager().cache().get(TileKey::new(0, 0)).unwrap();
        assert_eq!(record.element().src().as_deref(), Some("2/0/0"));
    }

    #[test]
    fn error_tile_replaces_failed_tile() {
        let fetcher = |url: String| async move {
            if url.starts_with("2/1/") {
                Err(TileLoadError::Status(500))
            } else {
                Ok(Bytes::from(url))
            }
        };
        let log = Arc::new(EventLog::default());
        let mut layer = TileLayerBuilder::new_url("{z}/{x}/{y}", fetcher)
            .with_error_tile_url("error.png")
            .with_listener(log.clone())
            .build()
            .unwrap();

        layer.update_view(Rect::new(0.0, 0.0, 511.0, 255.0), 2);
        block_on(layer.load_pending());

        let failed = layer.manager().cache().get(TileKey::new(1, 0)).unwrap();
        assert_eq!(failed.element().src().as_deref(), Some("error.png"));
        assert!(!failed.element().is_loaded());
        assert!(log.contains(Event::TileError(TileKey::new(1, 0))));
        assert!(log.contains(Event::TileLoaded(TileKey::new(0, 0))));
        assert_eq!(log.count(Event::LoadComplete), 1);
    }
}

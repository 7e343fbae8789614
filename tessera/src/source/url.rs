//! Tile source that loads tiles from url templates.

use std::fmt::{Debug, Formatter};

use ahash::HashMap;
use parking_lot::RwLock;

use super::{TileElement, TileFetcher, TileRequest, TileSource, WorldGrid};
use crate::error::{TesseraError, TileLoadError};
use crate::options::TileLayerOptions;
use crate::tile_coord::TileCoord;

/// Template of tile urls, e.g. `https://{s}.tile.openstreetmap.org/{z}/{x}/{y}{r}.png`.
///
/// Recognized placeholders are `{s}` (subdomain), `{x}`, `{y}`, `{z}` and `{r}` (`@2x` on
/// high density displays, empty otherwise). Additional placeholders can be given with
/// [`UrlTemplate::with_value`].
///
/// ```
/// use tessera::source::UrlTemplate;
///
/// let template = UrlTemplate::new("https://{s}.tiles.example/{z}/{x}/{y}.png?key={key}")
///     .with_subdomains(vec!["a".into(), "b".into()])
///     .with_value("key", "secret");
/// assert_eq!(
///     template.render(1, 2, 3)?,
///     "https://b.tiles.example/3/1/2.png?key=secret"
/// );
/// # Ok::<(), tessera::error::TesseraError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UrlTemplate {
    template: String,
    subdomains: Vec<String>,
    retina: bool,
    values: HashMap<String, String>,
}

impl UrlTemplate {
    /// Creates a template without subdomains.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: vec![],
            retina: false,
            values: HashMap::default(),
        }
    }

    /// Sets the subdomains `{s}` cycles through.
    pub fn with_subdomains(mut self, subdomains: Vec<String>) -> Self {
        self.subdomains = subdomains;
        self
    }

    /// Makes `{r}` resolve to `@2x`.
    pub fn with_retina(mut self, retina: bool) -> Self {
        self.retina = retina;
        self
    }

    /// Adds a custom placeholder.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// The template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Replaces the template string, keeping subdomains and custom values.
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
    }

    /// Subdomain for the tile. Neighbouring tiles get different subdomains.
    pub fn subdomain(&self, x: i32, y: i32) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }

        let index = (x as i64 + y as i64).unsigned_abs() % self.subdomains.len() as u64;
        &self.subdomains[index as usize]
    }

    /// Renders the url of a tile.
    pub fn render(&self, x: i32, y: i32, z: i32) -> Result<String, TesseraError> {
        // strfmt only accepts maps with the std hasher
        let mut vars: std::collections::HashMap<String, String> = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        vars.insert("s".into(), self.subdomain(x, y).into());
        vars.insert("x".into(), x.to_string());
        vars.insert("y".into(), y.to_string());
        vars.insert("z".into(), z.to_string());
        vars.insert("r".into(), if self.retina { "@2x" } else { "" }.into());

        Ok(strfmt::strfmt(&self.template, &vars)?)
    }
}

/// Tile source loading tiles from urls built by a [`UrlTemplate`].
///
/// On failure the element's `src` is switched to the configured error tile url, if any, and
/// the error is still reported to the manager.
pub struct UrlTileSource<F> {
    template: RwLock<UrlTemplate>,
    grid: WorldGrid,
    fetcher: F,
    max_zoom: u32,
    zoom_reverse: bool,
    zoom_offset: i32,
    error_tile_url: Option<String>,
}

impl<F> Debug for UrlTileSource<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlTileSource")
            .field("template", &*self.template.read())
            .field("grid", &self.grid)
            .field("max_zoom", &self.max_zoom)
            .field("zoom_reverse", &self.zoom_reverse)
            .field("zoom_offset", &self.zoom_offset)
            .finish()
    }
}

impl<F: TileFetcher> UrlTileSource<F> {
    /// Creates a source for the url template configured by `options`.
    pub fn new(template: impl Into<String>, options: &TileLayerOptions, fetcher: F) -> Self {
        Self {
            template: RwLock::new(
                UrlTemplate::new(template).with_subdomains(options.subdomains.clone()),
            ),
            grid: WorldGrid::from_options(options),
            fetcher,
            max_zoom: options.max_zoom,
            zoom_reverse: options.zoom_reverse,
            zoom_offset: options.zoom_offset,
            error_tile_url: options.error_tile_url.clone(),
        }
    }

    /// Requests high density tiles: `{r}` resolves to `@2x`.
    pub fn with_retina(self, retina: bool) -> Self {
        {
            let mut template = self.template.write();
            *template = template.clone().with_retina(retina);
        }
        self
    }

    /// Adds a custom placeholder to the template.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        {
            let mut template = self.template.write();
            *template = template.clone().with_value(key, value);
        }
        self
    }

    /// Current template string.
    pub fn template(&self) -> String {
        self.template.read().template().to_string()
    }

    /// Replaces the template string. Tiles already loaded keep their urls.
    pub fn set_template(&self, template: impl Into<String>) {
        self.template.write().set_template(template);
    }

    /// Grid used to filter and wrap tiles.
    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    /// Url of the tile displayed at `coord`.
    pub fn tile_url(
        &self,
        coord: TileCoord,
        url_zoom: i32,
        tile_size: f64,
    ) -> Result<String, TesseraError> {
        let wrapped = self.grid.wrap(coord, tile_size);
        self.template.read().render(wrapped.x, wrapped.y, url_zoom)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl<F: TileFetcher> TileSource for UrlTileSource<F> {
    type Element = TileElement;

    fn should_load(&self, coord: TileCoord, tile_size: f64) -> bool {
        self.grid.contains(coord, tile_size)
    }

    fn zoom_for_url(&self, zoom: u32) -> i32 {
        let zoom = if self.zoom_reverse {
            self.max_zoom as i32 - zoom as i32
        } else {
            zoom as i32
        };

        zoom + self.zoom_offset
    }

    fn create_element(&self) -> TileElement {
        TileElement::default()
    }

    fn reset_element(&self, element: &mut TileElement) {
        element.reset();
    }

    async fn load_tile(&self, request: TileRequest<TileElement>) -> Result<(), TileLoadError> {
        let url = self
            .tile_url(request.coord, request.url_zoom, request.tile_size)
            .map_err(|err| TileLoadError::Fetch(err.to_string()))?;

        request.element.set_src(&url);
        match self.fetcher.fetch(&url).await {
            Ok(data) => {
                request.element.set_loaded(data);
                Ok(())
            }
            Err(err) => {
                log::debug!("Failed to load tile {}: {err}", request.coord);
                if let Some(error_url) = &self.error_tile_url {
                    request.element.set_src(error_url);
                }

                Err(err)
            }
        }
    }
}

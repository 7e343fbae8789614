//! Configuration of a tile layer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tessera_types::cartesian::Rect;

use crate::cache::EvictionPolicy;
use crate::error::TesseraError;

/// Options of a tile layer.
///
/// All fields have defaults, so a configuration file only needs to list the values it
/// changes:
///
/// ```
/// use tessera::TileLayerOptions;
///
/// let options: TileLayerOptions =
///     serde_json::from_str(r#"{ "max_zoom": 16, "subdomains": "ab", "eviction": "recycle" }"#)?;
/// assert_eq!(options.subdomains, vec!["a", "b"]);
/// assert_eq!(options.tile_size, 256);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TileLayerOptions {
    /// Width and height of a tile in pixels.
    pub tile_size: u32,
    /// Lowest zoom level at which tiles are shown.
    pub min_zoom: u32,
    /// Highest zoom level at which tiles are shown.
    pub max_zoom: u32,
    /// Highest zoom level the source has tiles for. Tiles are scaled up above it.
    pub max_native_zoom: Option<u32>,
    /// Value added to the zoom level in tile URLs.
    pub zoom_offset: i32,
    /// Use `max_zoom - zoom` as the zoom level in tile URLs.
    pub zoom_reverse: bool,
    /// Flip the y axis in tile URLs (TMS services).
    pub tms: bool,
    /// Do not wrap the world horizontally.
    pub no_wrap: bool,
    /// Neither limit nor wrap tile coordinates to the world extent.
    pub continuous_world: bool,
    /// Only load tiles intersecting these bounds, given in normalized world coordinates
    /// (`[0, 1]` on both axes, `y` growing down).
    pub bounds: Option<Rect>,
    /// Subdomains substituted for `{s}` in the URL template. Deserializes from either a list
    /// or a string of single-letter subdomains.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "subdomains::deserialize"))]
    pub subdomains: Vec<String>,
    /// URL of an image shown in place of tiles that failed to load.
    pub error_tile_url: Option<String>,
    /// Request higher resolution tiles on high density displays.
    pub detect_retina: bool,
    /// What happens to tiles leaving the viewport.
    pub eviction: EvictionPolicy,
    /// Maximum number of unused tiles kept for recycling.
    pub pool_capacity: Option<usize>,
    /// Width of the world in pixels at zoom level 0.
    pub world_size: f64,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            min_zoom: 0,
            max_zoom: 18,
            max_native_zoom: None,
            zoom_offset: 0,
            zoom_reverse: false,
            tms: false,
            no_wrap: false,
            continuous_world: false,
            bounds: None,
            subdomains: vec!["a".into(), "b".into(), "c".into()],
            error_tile_url: None,
            detect_retina: false,
            eviction: EvictionPolicy::Destroy,
            pool_capacity: None,
            world_size: 256.0,
        }
    }
}

impl TileLayerOptions {
    /// Checks that the options can be used to construct a layer.
    pub fn validate(&self) -> Result<(), TesseraError> {
        if self.tile_size == 0 {
            return Err(TesseraError::Configuration(
                "tile size must be positive".into(),
            ));
        }

        if self.min_zoom > self.max_zoom {
            return Err(TesseraError::Configuration(format!(
                "min zoom {} is greater than max zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }

        if self.subdomains.is_empty() {
            return Err(TesseraError::Configuration(
                "at least one subdomain is required".into(),
            ));
        }

        if !self.world_size.is_finite() || self.world_size <= 0.0 {
            return Err(TesseraError::Configuration(
                "world size must be a positive number".into(),
            ));
        }

        if let Some(bounds) = &self.bounds {
            if !bounds.is_valid() {
                return Err(TesseraError::Configuration(
                    "layer bounds are inverted".into(),
                ));
            }
        }

        Ok(())
    }

    /// Adjusts the options for a high density display.
    ///
    /// When `detect_retina` is set and the display is high density, tiles are requested at
    /// half size one zoom level deeper. Returns true if the adjustment was made, in which
    /// case `{r}` in URL templates resolves to `@2x`.
    pub fn adjust_for_display(&mut self, high_density: bool) -> bool {
        if !self.detect_retina || !high_density || self.max_zoom == 0 {
            return false;
        }

        self.tile_size /= 2;
        self.zoom_offset += 1;
        self.max_zoom -= 1;
        self.min_zoom = self.min_zoom.saturating_sub(1);

        true
    }
}

#[cfg(feature = "serde")]
mod subdomains {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subdomains {
        Letters(String),
        List(Vec<String>),
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<String>, D::Error> {
        Ok(match Subdomains::deserialize(deserializer)? {
            Subdomains::Letters(letters) => letters.chars().map(String::from).collect(),
            Subdomains::List(list) => list,
        })
    }
}

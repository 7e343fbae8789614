//! Viewport tracking: converts pixel bounds of the map view into [`TileBounds`].

use tessera_types::cartesian::Rect;

use crate::options::TileLayerOptions;
use crate::tile_bounds::TileBounds;

/// Computes the range of tiles covering the viewport at a given zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportTracker {
    tile_size: f64,
    min_zoom: u32,
    max_zoom: u32,
    max_native_zoom: Option<u32>,
    zoom_offset: i32,
}

impl ViewportTracker {
    /// Creates a tracker with the given tile size and zoom range.
    pub fn new(tile_size: f64, min_zoom: u32, max_zoom: u32) -> Self {
        Self {
            tile_size,
            min_zoom,
            max_zoom,
            max_native_zoom: None,
            zoom_offset: 0,
        }
    }

    /// Creates a tracker configured from layer options.
    pub fn from_options(options: &TileLayerOptions) -> Self {
        Self {
            tile_size: options.tile_size as f64,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            max_native_zoom: options.max_native_zoom,
            zoom_offset: options.zoom_offset,
        }
    }

    /// Highest zoom level the tile source has data for. Above it tiles are scaled up.
    pub fn with_max_native_zoom(mut self, max_native_zoom: Option<u32>) -> Self {
        self.max_native_zoom = max_native_zoom;
        self
    }

    /// Offset added to the map zoom when comparing with the native zoom.
    pub fn with_zoom_offset(mut self, zoom_offset: i32) -> Self {
        self.zoom_offset = zoom_offset;
        self
    }

    /// Returns true if tiles should be displayed at the zoom level.
    pub fn zoom_in_range(&self, zoom: u32) -> bool {
        zoom >= self.min_zoom && zoom <= self.max_zoom
    }

    /// Size of a tile on screen at the given zoom level.
    pub fn tile_size(&self, zoom: u32) -> f64 {
        let source_zoom = zoom as i64 + self.zoom_offset as i64;
        match self.max_native_zoom {
            Some(native) if source_zoom > native as i64 => {
                let scale = 2f64.powi((source_zoom - native as i64) as i32);
                (self.tile_size * scale).round()
            }
            _ => self.tile_size,
        }
    }

    /// Tiles covering the pixel bounds, or `None` if nothing should be shown at the zoom.
    pub fn tile_bounds(&self, pixel_bounds: Rect, zoom: u32) -> Option<TileBounds> {
        if !self.zoom_in_range(zoom) {
            log::debug!("Zoom {zoom} is outside of [{}, {}]", self.min_zoom, self.max_zoom);
            return None;
        }

        TileBounds::from_pixel_bounds(pixel_bounds, self.tile_size(zoom))
    }
}

#[cfg(test)]
mod tests {
    use tessera_types::cartesian::Point2;

    use super::*;

    #[test]
    fn suppresses_zoom_outside_range() {
        let tracker = ViewportTracker::new(256.0, 2, 10);
        let view = Rect::new(0.0, 0.0, 1024.0, 768.0);
        assert!(tracker.tile_bounds(view, 1).is_none());
        assert!(tracker.tile_bounds(view, 11).is_none());
        assert!(tracker.tile_bounds(view, 2).is_some());
        assert!(tracker.tile_bounds(view, 10).is_some());
    }

    #[test]
    fn computes_bounds() {
        let tracker = ViewportTracker::new(256.0, 0, 18);
        let bounds = tracker
            .tile_bounds(Rect::new(512.0, 768.0, 1279.0, 1535.0), 5)
            .unwrap();
        assert_eq!(bounds.min(), Point2::new(2, 3));
        assert_eq!(bounds.max(), Point2::new(4, 5));
    }

    #[test]
    fn overscales_above_native_zoom() {
        let tracker = ViewportTracker::new(256.0, 0, 20).with_max_native_zoom(Some(16));
        assert_eq!(tracker.tile_size(16), 256.0);
        assert_eq!(tracker.tile_size(17), 512.0);
        assert_eq!(tracker.tile_size(18), 1024.0);

        let with_offset = tracker.with_zoom_offset(1);
        assert_eq!(with_offset.tile_size(15), 256.0);
        assert_eq!(with_offset.tile_size(16), 512.0);
    }

    #[test]
    fn uses_options() {
        let options = TileLayerOptions {
            tile_size: 512,
            min_zoom: 3,
            ..Default::default()
        };
        let tracker = ViewportTracker::from_options(&options);
        assert!(!tracker.zoom_in_range(2));
        assert_eq!(tracker.tile_size(3), 512.0);
    }
}

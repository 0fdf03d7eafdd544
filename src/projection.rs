//! Map projection.

use egui::{Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::{TILE_SIZE, lat_to_y, lon_to_x, x_to_lon, y_to_lat};

/// A geographical position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    /// Longitude in degrees.
    pub lon: f64,

    /// Latitude in degrees.
    pub lat: f64,
}

impl From<(f64, f64)> for GeoPos {
    /// Converts a `(longitude, latitude)` tuple.
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

/// A geographical bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    /// The westernmost longitude.
    pub west: f64,
    /// The southernmost latitude.
    pub south: f64,
    /// The easternmost longitude.
    pub east: f64,
    /// The northernmost latitude.
    pub north: f64,
}

impl GeoBounds {
    /// Creates a bounding box that covers a single position.
    pub fn from_pos(pos: GeoPos) -> Self {
        Self {
            west: pos.lon,
            south: pos.lat,
            east: pos.lon,
            north: pos.lat,
        }
    }

    /// Returns the smallest box covering all the positions, or `None` if there are none.
    pub fn covering(positions: impl IntoIterator<Item = GeoPos>) -> Option<Self> {
        let mut positions = positions.into_iter();
        let first = positions.next()?;
        Some(positions.fold(Self::from_pos(first), |mut bounds, pos| {
            bounds.extend(pos);
            bounds
        }))
    }

    /// Grows the box so that it contains `pos`.
    pub fn extend(&mut self, pos: GeoPos) {
        self.west = self.west.min(pos.lon);
        self.east = self.east.max(pos.lon);
        self.south = self.south.min(pos.lat);
        self.north = self.north.max(pos.lat);
    }

    /// Whether the box contains `pos`.
    pub fn contains(&self, pos: GeoPos) -> bool {
        pos.lon >= self.west && pos.lon <= self.east && pos.lat >= self.south && pos.lat <= self.north
    }

    /// The center of the box in Web Mercator space.
    pub fn center(&self) -> GeoPos {
        let x = (lon_to_x(self.west, 0) + lon_to_x(self.east, 0)) / 2.0;
        let y = (lat_to_y(self.north, 0) + lat_to_y(self.south, 0)) / 2.0;
        GeoPos {
            lon: x_to_lon(x, 0),
            lat: y_to_lat(y, 0),
        }
    }
}

/// Returns the largest zoom level, up to `max_zoom`, at which `bounds` fits into a viewport of
/// the given size.
pub fn zoom_to_fit(bounds: &GeoBounds, viewport: Vec2, max_zoom: u8) -> u8 {
    (0..=max_zoom)
        .rev()
        .find(|&zoom| {
            let width = (lon_to_x(bounds.east, zoom) - lon_to_x(bounds.west, zoom)) * TILE_SIZE as f64;
            let height =
                (lat_to_y(bounds.south, zoom) - lat_to_y(bounds.north, zoom)) * TILE_SIZE as f64;
            width <= viewport.x as f64 && height <= viewport.y as f64
        })
        .unwrap_or(0)
}

/// A helper for converting between geographical and screen coordinates.
pub struct MapProjection {
    zoom: u8,
    center: GeoPos,
    widget_rect: Rect,
}

impl MapProjection {
    /// Creates a new `MapProjection`.
    pub(crate) fn new(zoom: u8, center: GeoPos, widget_rect: Rect) -> Self {
        Self {
            zoom,
            center,
            widget_rect,
        }
    }

    /// The zoom level being projected.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// The geographical center of the widget.
    pub fn center(&self) -> GeoPos {
        self.center
    }

    /// The screen rectangle of the widget.
    pub fn widget_rect(&self) -> Rect {
        self.widget_rect
    }

    /// Projects a geographical coordinate to a screen coordinate.
    pub fn project(&self, geo_pos: GeoPos) -> egui::Pos2 {
        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let tile_x = lon_to_x(geo_pos.lon, self.zoom);
        let tile_y = lat_to_y(geo_pos.lat, self.zoom);

        let dx = (tile_x - center_x) * TILE_SIZE as f64;
        let dy = (tile_y - center_y) * TILE_SIZE as f64;

        let widget_center = self.widget_rect.center();
        widget_center + egui::vec2(dx as f32, dy as f32)
    }

    /// Un-projects a screen coordinate to a geographical coordinate.
    pub fn unproject(&self, screen_pos: egui::Pos2) -> GeoPos {
        let rel_pos = screen_pos - self.widget_rect.min;
        let widget_center_x = self.widget_rect.width() as f64 / 2.0;
        let widget_center_y = self.widget_rect.height() as f64 / 2.0;

        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let target_x = center_x + (rel_pos.x as f64 - widget_center_x) / TILE_SIZE as f64;
        let target_y = center_y + (rel_pos.y as f64 - widget_center_y) / TILE_SIZE as f64;

        GeoPos {
            lon: x_to_lon(target_x, self.zoom),
            lat: y_to_lat(target_y, self.zoom),
        }
    }

    /// The geographical bounds currently visible in the widget.
    pub fn visible_bounds(&self) -> GeoBounds {
        let north_west = self.unproject(self.widget_rect.left_top());
        let south_east = self.unproject(self.widget_rect.right_bottom());
        GeoBounds {
            west: north_west.lon,
            south: south_east.lat,
            east: south_east.lon,
            north: north_west.lat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    const EPSILON: f64 = 1e-9;

    #[test]
    fn project_unproject_roundtrip() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let projection = MapProjection::new(4, GeoPos { lon: 5.0, lat: 50.0 }, rect);

        assert_eq!(projection.project(GeoPos { lon: 5.0, lat: 50.0 }), rect.center());

        let geo = projection.unproject(rect.center());
        assert!((geo.lon - 5.0).abs() < EPSILON);
        assert!((geo.lat - 50.0).abs() < EPSILON);
    }

    #[test]
    fn visible_bounds_surround_center() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let projection = MapProjection::new(4, GeoPos { lon: 5.0, lat: 50.0 }, rect);
        let bounds = projection.visible_bounds();

        assert!(bounds.west < 5.0 && bounds.east > 5.0);
        assert!(bounds.south < 50.0 && bounds.north > 50.0);
        assert!(bounds.contains(GeoPos { lon: 5.0, lat: 50.0 }));
    }

    #[test]
    fn covering_spans_every_position() {
        assert!(GeoBounds::covering(Vec::new()).is_none());

        let bounds = GeoBounds::covering(vec![
            GeoPos { lon: 13.4, lat: 52.5 },
            GeoPos { lon: 2.35, lat: 48.85 },
            GeoPos { lon: 21.0, lat: 52.2 },
        ])
        .unwrap();

        assert_eq!(bounds.west, 2.35);
        assert_eq!(bounds.east, 21.0);
        assert_eq!(bounds.south, 48.85);
        assert_eq!(bounds.north, 52.5);
    }

    #[test]
    fn zoom_to_fit_respects_viewport_and_max_zoom() {
        let viewport = vec2(800.0, 600.0);

        // A single point always fits, so the maximum zoom wins.
        let point = GeoBounds::from_pos(GeoPos { lon: 5.0, lat: 50.0 });
        assert_eq!(zoom_to_fit(&point, viewport, 10), 10);

        // The whole world only fits at the lowest levels.
        let world = GeoBounds {
            west: -180.0,
            south: -85.0,
            east: 180.0,
            north: 85.0,
        };
        assert!(zoom_to_fit(&world, viewport, 10) <= 1);

        // Europe-sized box lands somewhere in between.
        let europe = GeoBounds {
            west: -10.0,
            south: 35.0,
            east: 30.0,
            north: 60.0,
        };
        let zoom = zoom_to_fit(&europe, viewport, 10);
        assert!(zoom >= 2 && zoom <= 5, "zoom was {zoom}");
    }

    #[test]
    fn center_of_symmetric_box_is_its_midpoint() {
        let bounds = GeoBounds {
            west: -10.0,
            south: -20.0,
            east: 10.0,
            north: 20.0,
        };
        let center = bounds.center();
        assert!(center.lon.abs() < EPSILON);
        assert!(center.lat.abs() < EPSILON);
    }
}

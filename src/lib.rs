#![warn(missing_docs)]

//! A map client for exploring satellite-derived cloud frequency data.
//!
//! The crate provides a `Map` widget for `egui` that renders a base map with an Earth Engine
//! image overlay on top of it, selectable region outlines, search markers and callouts. A details
//! panel shows statistics and a time series chart for the clicked region or location, fetched
//! from the cloud frequency backend.
//!
//! # Example
//!
//! ```no_run
//! use eframe::egui;
//! use cloud_frequency_map::{Map, config::{OpenStreetMapConfig, OverlayConfig}, layers::tile::TileLayer};
//!
//! struct MyApp {
//!     map: Map,
//! }
//!
//! impl Default for MyApp {
//!     fn default() -> Self {
//!         let mut map = Map::new(OpenStreetMapConfig::default());
//!         map.add_layer("overlay", TileLayer::overlay(OverlayConfig::new("map-id", "token")));
//!         Self { map }
//!     }
//! }
//!
//! impl eframe::App for MyApp {
//!     fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
//!         egui::CentralPanel::default()
//!             .frame(egui::Frame::NONE)
//!             .show(ctx, |ui| {
//!                 ui.add(&mut self.map);
//!             });
//!     }
//! }
//! ```

/// The application context wiring the map, the search box and the details panel together.
pub mod app;

/// Boot parameters supplied when the client starts.
pub mod boot;

/// The time series chart.
pub mod chart;

/// Configuration traits and types for the map widget.
pub mod config;

/// The details panel controller and the backend detail service.
pub mod details;

/// Layers drawn on top of the base map.
pub mod layers;

/// Conversions between geographical and screen coordinates.
pub mod projection;

/// Place search and viewport navigation.
pub mod search;

use eframe::egui;
use egui::{Color32, Painter, Rect, Response, Sense, Ui, Vec2, Widget, pos2};
use eyre::{Context, Result};
use log::{debug, error};
use once_cell::sync::Lazy;
use poll_promise::Promise;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::MapConfig;
use crate::layers::Layer;
use crate::projection::{GeoBounds, GeoPos, MapProjection, zoom_to_fit};

/// The size of a map tile in pixels.
pub const TILE_SIZE: u32 = 256;
/// The minimum zoom level.
pub const MIN_ZOOM: u8 = 0;

// Reuse the reqwest client for all downloads by making it a static variable.
pub(crate) static CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .user_agent(format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .unwrap_or_else(|e| {
            error!("Failed to build the HTTP client, using defaults: {e}");
            reqwest::blocking::Client::new()
        })
});

/// Errors that can occur while downloading map imagery.
#[derive(Error, Debug)]
pub enum MapError {
    /// An error occurred while making a web request.
    #[error("Connection error")]
    ConnectionError(#[from] reqwest::Error),

    /// An image failed to download.
    #[error("An image failed to download. HTTP Status: `{0}`")]
    TileDownloadError(String),

    /// The downloaded bytes could not be converted to an image.
    #[error("Unable to convert downloaded bytes as image")]
    TileBytesConversionError(#[from] image::ImageError),
}

/// A unique identifier for a map tile.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TileId {
    /// The zoom level.
    pub z: u8,

    /// The x-coordinate of the tile.
    pub x: u32,

    /// The y-coordinate of the tile.
    pub y: u32,
}

impl TileId {
    fn to_url(self, config: &dyn MapConfig) -> String {
        config.tile_url(&self)
    }
}

/// An image fetched from the network and uploaded as a texture once it arrives.
pub(crate) enum RemoteTexture {
    /// The image is being downloaded.
    Loading(Promise<Result<egui::ColorImage, Arc<eyre::Report>>>),

    /// The image is in memory.
    Loaded(egui::TextureHandle),

    /// The image failed to download. The error has been logged.
    Failed,
}

impl RemoteTexture {
    /// Starts downloading the image at `url` on a background thread.
    pub(crate) fn fetch(url: String) -> Self {
        let promise =
            Promise::spawn_thread("download_image", move || -> Result<_, Arc<eyre::Report>> {
                let result: Result<_, eyre::Report> = (|| {
                    debug!("Downloading image from {}", &url);
                    let response = CLIENT.get(&url).send().map_err(MapError::from)?;

                    if !response.status().is_success() {
                        return Err(MapError::TileDownloadError(response.status().to_string()));
                    }

                    let bytes = response.bytes().map_err(MapError::from)?.to_vec();
                    let image = image::load_from_memory(&bytes)
                        .map_err(MapError::from)?
                        .to_rgba8();

                    let size = [image.width() as _, image.height() as _];
                    let pixels = image.into_raw();
                    Ok(egui::ColorImage::from_rgba_unmultiplied(size, &pixels))
                })()
                .with_context(|| format!("Failed to download image from {}", &url));

                result.map_err(Arc::new)
            });
        Self::Loading(promise)
    }

    /// Moves a finished download into the loaded or failed state.
    pub(crate) fn poll(&mut self, ctx: &egui::Context, name: impl Into<String>) {
        if let Self::Loading(promise) = self {
            match promise.ready() {
                Some(Ok(color_image)) => {
                    let texture = ctx.load_texture(name, color_image.clone(), Default::default());
                    *self = Self::Loaded(texture);
                }
                Some(Err(e)) => {
                    error!("{:?}", e);
                    *self = Self::Failed;
                }
                None => {
                    // Still downloading, keep repainting until it arrives.
                    ctx.request_repaint();
                }
            }
        }
    }

    /// The texture, if the image has arrived.
    pub(crate) fn texture(&self) -> Option<&egui::TextureHandle> {
        match self {
            Self::Loaded(texture) => Some(texture),
            Self::Loading(_) | Self::Failed => None,
        }
    }
}

/// Something that happened on the map during the last frame.
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
    /// The user clicked the map somewhere no layer claimed the click.
    Click(GeoPos),

    /// The visible part of the map changed.
    BoundsChanged(GeoBounds),
}

/// The map widget.
pub struct Map {
    /// The geographical center of the map.
    pub center: GeoPos,

    /// The zoom level of the map.
    pub zoom: u8,

    /// The color shown wherever no tile has been drawn.
    pub background: Color32,

    tiles: HashMap<TileId, RemoteTexture>,

    layers: Vec<(String, Box<dyn Layer>)>,

    events: Vec<MapEvent>,

    last_bounds: Option<GeoBounds>,

    pending_fit: Option<GeoBounds>,

    /// Configuration for the base map, such as the tile server URL.
    config: Box<dyn MapConfig>,
}

impl Map {
    /// Creates a new `Map` widget.
    ///
    /// # Arguments
    ///
    /// * `config` - A type that implements `MapConfig`, which provides configuration for the base map.
    pub fn new<C: MapConfig + 'static>(config: C) -> Self {
        let center = config.default_center();
        let zoom = config.default_zoom();
        Self {
            tiles: HashMap::new(),
            layers: Vec::new(),
            events: Vec::new(),
            last_bounds: None,
            pending_fit: None,
            background: Color32::BLACK,
            config: Box::new(config),
            center,
            zoom,
        }
    }

    /// The highest zoom level the map allows.
    pub fn max_zoom(&self) -> u8 {
        self.config.max_zoom()
    }

    /// Adds a layer on top of the existing ones. A layer with the same key is replaced in place.
    pub fn add_layer(&mut self, key: impl Into<String>, layer: impl Layer) {
        let key = key.into();
        let layer: Box<dyn Layer> = Box::new(layer);
        if let Some(slot) = self.layers.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = layer;
        } else {
            self.layers.push((key, layer));
        }
    }

    /// Removes a layer, returning whether it existed.
    pub fn remove_layer(&mut self, key: &str) -> bool {
        let before = self.layers.len();
        self.layers.retain(|(k, _)| k != key);
        self.layers.len() != before
    }

    /// The keys of all layers, from the bottom to the top.
    pub fn layer_keys(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(k, _)| k.as_str())
    }

    /// Gets a layer by key, if it exists and has the requested type.
    pub fn layer<T: Layer>(&self, key: &str) -> Option<&T> {
        self.layers
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, layer)| layer.as_any().downcast_ref::<T>())
    }

    /// Gets a mutable layer by key, if it exists and has the requested type.
    pub fn layer_mut<T: Layer>(&mut self, key: &str) -> Option<&mut T> {
        self.layers
            .iter_mut()
            .find(|(k, _)| k == key)
            .and_then(|(_, layer)| layer.as_any_mut().downcast_mut::<T>())
    }

    /// Moves the viewport so that `bounds` is fully visible at the highest possible zoom.
    ///
    /// The fit is applied on the next frame, when the size of the widget is known.
    pub fn fit_bounds(&mut self, bounds: GeoBounds) {
        self.pending_fit = Some(bounds);
    }

    /// Drains the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }

    fn apply_fit(&mut self, rect: &Rect) {
        if let Some(bounds) = self.pending_fit.take() {
            self.zoom = zoom_to_fit(&bounds, rect.size(), self.max_zoom());
            self.center = bounds.center();
        }
    }

    /// Handles user input for panning and zooming.
    fn handle_input(&mut self, ui: &Ui, rect: &Rect, response: &Response) {
        let max_zoom = self.max_zoom();

        // Handle panning
        if response.dragged() {
            let delta = response.drag_delta();
            let center_in_tiles_x = lon_to_x(self.center.lon, self.zoom);
            let center_in_tiles_y = lat_to_y(self.center.lat, self.zoom);

            let mut new_center_x = center_in_tiles_x - (delta.x as f64 / TILE_SIZE as f64);
            let mut new_center_y = center_in_tiles_y - (delta.y as f64 / TILE_SIZE as f64);

            // Clamp the new center to the map boundaries.
            let world_size_in_tiles = 2.0_f64.powi(self.zoom as i32);
            let view_size_in_tiles_x = rect.width() as f64 / TILE_SIZE as f64;
            let view_size_in_tiles_y = rect.height() as f64 / TILE_SIZE as f64;

            let min_center_x = view_size_in_tiles_x / 2.0;
            let max_center_x = world_size_in_tiles - view_size_in_tiles_x / 2.0;
            let min_center_y = view_size_in_tiles_y / 2.0;
            let max_center_y = world_size_in_tiles - view_size_in_tiles_y / 2.0;

            // If the map is smaller than the viewport, center it. Otherwise, clamp the center.
            new_center_x = if min_center_x > max_center_x {
                world_size_in_tiles / 2.0
            } else {
                new_center_x.clamp(min_center_x, max_center_x)
            };
            new_center_y = if min_center_y > max_center_y {
                world_size_in_tiles / 2.0
            } else {
                new_center_y.clamp(min_center_y, max_center_y)
            };

            self.center = GeoPos {
                lon: x_to_lon(new_center_x, self.zoom),
                lat: y_to_lat(new_center_y, self.zoom),
            };
        }

        // Handle double-click to zoom and center
        if response.double_clicked() {
            if let Some(pointer_pos) = response.interact_pointer_pos() {
                let new_zoom = (self.zoom + 1).clamp(MIN_ZOOM, max_zoom);

                if new_zoom != self.zoom {
                    let projection = MapProjection::new(self.zoom, self.center, *rect);
                    let target = projection.unproject(pointer_pos);

                    // Set the new zoom level and center the map on the clicked location
                    self.zoom = new_zoom;
                    self.center = target;
                }
            }
        }

        // Handle zooming with the scroll wheel
        if response.hovered() {
            if let Some(mouse_pos) = response.hover_pos() {
                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    let old_zoom = self.zoom;
                    let mut new_zoom = (self.zoom as i32 + scroll.signum() as i32)
                        .clamp(MIN_ZOOM as i32, max_zoom as i32)
                        as u8;

                    // If we are zooming out, check if the new zoom level is valid.
                    if scroll < 0.0 {
                        let world_pixel_size = 2.0_f64.powi(new_zoom as i32) * TILE_SIZE as f64;
                        // If the world size would become smaller than the widget size, reject the zoom.
                        if world_pixel_size < rect.width() as f64
                            || world_pixel_size < rect.height() as f64
                        {
                            new_zoom = old_zoom;
                        }
                    }

                    if new_zoom != old_zoom {
                        let mouse_rel = mouse_pos - rect.min;
                        let widget_center_x = rect.width() as f64 / 2.0;
                        let widget_center_y = rect.height() as f64 / 2.0;
                        let target =
                            MapProjection::new(old_zoom, self.center, *rect).unproject(mouse_pos);

                        self.zoom = new_zoom;

                        // Adjust the map center so the geo-coordinate under the mouse remains the
                        // same
                        let new_center_x = lon_to_x(target.lon, new_zoom)
                            - (mouse_rel.x as f64 - widget_center_x) / TILE_SIZE as f64;
                        let new_center_y = lat_to_y(target.lat, new_zoom)
                            - (mouse_rel.y as f64 - widget_center_y) / TILE_SIZE as f64;

                        self.center = GeoPos {
                            lon: x_to_lon(new_center_x, new_zoom),
                            lat: y_to_lat(new_center_y, new_zoom),
                        };
                    }
                }
            }
        }
    }

    /// Draws the base map tiles and attribution.
    fn draw_map_and_attribution(&mut self, ui: &mut Ui, projection: &MapProjection) {
        let rect = projection.widget_rect();
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, self.background);

        let visible: Vec<_> = visible_tiles(projection).collect();
        for (tile_id, _) in &visible {
            load_tile(&mut self.tiles, self.config.as_ref(), ui.ctx(), *tile_id);
        }
        for (tile_id, tile_pos) in &visible {
            draw_tile(&self.tiles, &painter, tile_id, *tile_pos, Color32::WHITE);
        }

        for (_, layer) in &self.layers {
            layer.draw(&painter, projection);
        }

        self.draw_attribution(ui, &rect);
    }

    /// Draws the attribution text.
    fn draw_attribution(&self, ui: &mut Ui, rect: &Rect) {
        if let Some(attribution) = self.config.attribution() {
            let frame = egui::Frame::NONE
                .inner_margin(egui::Margin::same(5))
                .fill(Color32::from_black_alpha(150))
                .corner_radius(3.0);

            egui::Area::new(ui.id().with("attribution"))
                .fixed_pos(rect.left_bottom())
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(5.0, -5.0))
                .show(ui.ctx(), |ui| {
                    frame.show(ui, |ui| {
                        ui.style_mut().override_text_style = Some(egui::TextStyle::Small);
                        ui.style_mut().wrap_mode = Some(egui::TextWrapMode::Extend);

                        if let Some(url) = self.config.attribution_url() {
                            ui.hyperlink_to(attribution, url);
                        } else {
                            ui.label(attribution);
                        }
                    });
                });
        }
    }

    fn track_bounds(&mut self, projection: &MapProjection) {
        let bounds = projection.visible_bounds();
        if self.last_bounds != Some(bounds) {
            self.last_bounds = Some(bounds);
            self.events.push(MapEvent::BoundsChanged(bounds));
        }
    }
}

/// Returns the tiles covering the projected widget together with their screen positions.
///
/// Tiles wrap around horizontally; rows outside of the world are skipped.
pub(crate) fn visible_tiles(
    projection: &MapProjection,
) -> impl Iterator<Item = (TileId, egui::Pos2)> + use<> {
    let zoom = projection.zoom();
    let rect = projection.widget_rect();
    let center_x = lon_to_x(projection.center().lon, zoom);
    let center_y = lat_to_y(projection.center().lat, zoom);

    let widget_center_x = rect.width() / 2.0;
    let widget_center_y = rect.height() / 2.0;

    let x_min = (center_x - widget_center_x as f64 / TILE_SIZE as f64).floor() as i64;
    let y_min = (center_y - widget_center_y as f64 / TILE_SIZE as f64).floor() as i64;
    let x_max = (center_x + widget_center_x as f64 / TILE_SIZE as f64).ceil() as i64;
    let y_max = (center_y + widget_center_y as f64 / TILE_SIZE as f64).ceil() as i64;

    let world_tiles = 1_i64 << zoom;
    let rect_min = rect.min;
    (x_min..=x_max).flat_map(move |x| {
        (y_min.max(0)..=y_max.min(world_tiles - 1)).map(move |y| {
            let tile_id = TileId {
                z: zoom,
                x: x.rem_euclid(world_tiles) as u32,
                y: y as u32,
            };
            let screen_x = widget_center_x + (x as f64 - center_x) as f32 * TILE_SIZE as f32;
            let screen_y = widget_center_y + (y as f64 - center_y) as f32 * TILE_SIZE as f32;
            (tile_id, rect_min + Vec2::new(screen_x, screen_y))
        })
    })
}

/// Starts downloading a tile if it is not cached yet and polls its download.
pub(crate) fn load_tile(
    tiles: &mut HashMap<TileId, RemoteTexture>,
    config: &dyn MapConfig,
    ctx: &egui::Context,
    tile_id: TileId,
) {
    let tile = tiles
        .entry(tile_id)
        .or_insert_with(|| RemoteTexture::fetch(tile_id.to_url(config)));
    tile.poll(ctx, format!("tile_{}_{}_{}", tile_id.z, tile_id.x, tile_id.y));
}

/// Draws a single tile. Tiles that are loading or failed leave the background showing.
pub(crate) fn draw_tile(
    tiles: &HashMap<TileId, RemoteTexture>,
    painter: &Painter,
    tile_id: &TileId,
    tile_pos: egui::Pos2,
    tint: Color32,
) {
    if let Some(texture) = tiles.get(tile_id).and_then(RemoteTexture::texture) {
        let tile_rect =
            Rect::from_min_size(tile_pos, Vec2::new(TILE_SIZE as f32, TILE_SIZE as f32));
        painter.image(
            texture.id(),
            tile_rect,
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            tint,
        );
    }
}

/// Converts longitude to the x-coordinate of a tile at a given zoom level.
pub(crate) fn lon_to_x(lon: f64, zoom: u8) -> f64 {
    (lon + 180.0) / 360.0 * (2.0_f64.powi(zoom as i32))
}

/// Converts latitude to the y-coordinate of a tile at a given zoom level.
pub(crate) fn lat_to_y(lat: f64, zoom: u8) -> f64 {
    (1.0 - lat.to_radians().tan().asinh() / std::f64::consts::PI) / 2.0
        * (2.0_f64.powi(zoom as i32))
}

/// Converts the x-coordinate of a tile to longitude at a given zoom level.
pub(crate) fn x_to_lon(x: f64, zoom: u8) -> f64 {
    x / (2.0_f64.powi(zoom as i32)) * 360.0 - 180.0
}

/// Converts the y-coordinate of a tile to latitude at a given zoom level.
pub(crate) fn y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * y / (2.0_f64.powi(zoom as i32));
    n.sinh().atan().to_degrees()
}

impl Widget for &mut Map {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::drag().union(Sense::click()));
        self.apply_fit(&rect);

        // Layers on top get the first chance to claim the input.
        let projection = MapProjection::new(self.zoom, self.center, rect);
        let mut consumed = false;
        for (_, layer) in self.layers.iter_mut().rev() {
            if layer.handle_input(&response, &projection) {
                consumed = true;
                break;
            }
        }

        if !consumed {
            if response.clicked() {
                if let Some(pointer_pos) = response.interact_pointer_pos() {
                    self.events
                        .push(MapEvent::Click(projection.unproject(pointer_pos)));
                }
            }
            self.handle_input(ui, &rect, &response);
        }

        let projection = MapProjection::new(self.zoom, self.center, rect);
        for (_, layer) in &mut self.layers {
            layer.prepare(ui.ctx(), &projection);
        }
        self.draw_map_and_attribution(ui, &projection);
        self.track_bounds(&projection);

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OpenStreetMapConfig, OverlayConfig};
    use crate::layers::callout::CalloutLayer;
    use crate::layers::tile::TileLayer;
    use egui::vec2;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_coord_conversion_roundtrip() {
        let original_lon = 24.93545;
        let original_lat = 60.16952;
        let zoom: u8 = 10;

        let x = lon_to_x(original_lon, zoom);
        let y = lat_to_y(original_lat, zoom);

        assert!((original_lon - x_to_lon(x, zoom)).abs() < EPSILON);
        assert!((original_lat - y_to_lat(y, zoom)).abs() < EPSILON);
    }

    #[test]
    fn test_y_to_lat_conversion() {
        // y, zoom, expected_lat
        let test_cases = vec![
            // Equator
            (0.5, 0, 0.0),
            (128.0, 8, 0.0),
            // Near poles (Mercator projection limits)
            (0.0, 0, 85.0511287798),
            (1.0, 0, -85.0511287798),
            // London
            (85.12653378959828, 8, 51.5074),
        ];

        for (y, zoom, expected_lat) in test_cases {
            assert!((y_to_lat(y, zoom) - expected_lat).abs() < EPSILON);
        }
    }

    #[test]
    fn test_lon_to_x_conversion() {
        // lon, zoom, expected_x
        let test_cases = vec![
            (0.0, 0, 0.5),
            (0.0, 8, 128.0),
            (-180.0, 0, 0.0),
            (180.0, 8, 256.0),
            // London
            (-0.1275, 8, 127.90933333333333),
        ];

        for (lon, zoom, expected_x) in test_cases {
            assert!((lon_to_x(lon, zoom) - expected_x).abs() < EPSILON);
        }
    }

    #[test]
    fn test_tile_id_to_url() {
        let tile_id = TileId { z: 4, x: 8, y: 5 };
        assert_eq!(
            tile_id.to_url(&OpenStreetMapConfig::default()),
            "https://tile.openstreetmap.org/4/8/5.png"
        );
        assert_eq!(
            tile_id.to_url(&OverlayConfig::new("id", "tok")),
            "https://earthengine.googleapis.com/map/id/4/8/5?token=tok"
        );
    }

    #[test]
    fn failed_downloads_stay_failed() {
        let ctx = egui::Context::default();
        let mut image = RemoteTexture::Loading(Promise::from_ready(Err(Arc::new(eyre::eyre!(
            "HTTP Status: `404 Not Found`"
        )))));

        image.poll(&ctx, "missing");
        assert!(matches!(image, RemoteTexture::Failed));
        assert!(image.texture().is_none());

        image.poll(&ctx, "missing");
        assert!(matches!(image, RemoteTexture::Failed));
    }

    #[test]
    fn test_map_new() {
        let map = Map::new(OpenStreetMapConfig::default());

        assert_eq!(map.center, GeoPos { lon: 5.0, lat: 50.0 });
        assert_eq!(map.zoom, 4);
        assert_eq!(map.max_zoom(), 10);
        assert_eq!(map.background, Color32::BLACK);
        assert!(map.tiles.is_empty());
        assert!(map.layers.is_empty());
    }

    #[test]
    fn layers_keep_insertion_order_and_replace_by_key() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        map.add_layer("overlay", TileLayer::overlay(OverlayConfig::new("id", "tok")));
        map.add_layer("callouts", CalloutLayer::default());
        map.add_layer("overlay", TileLayer::overlay(OverlayConfig::new("other", "tok")));

        assert_eq!(map.layer_keys().collect::<Vec<_>>(), vec!["overlay", "callouts"]);
        assert!(map.layer::<TileLayer>("overlay").is_some());
        assert!(map.layer::<CalloutLayer>("overlay").is_none());
        assert!(map.layer_mut::<CalloutLayer>("callouts").is_some());

        assert!(map.remove_layer("overlay"));
        assert!(!map.remove_layer("overlay"));
    }

    #[test]
    fn fit_bounds_is_applied_with_the_widget_size() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        let bounds = GeoBounds {
            west: 14.0,
            south: 49.0,
            east: 24.0,
            north: 55.0,
        };
        map.fit_bounds(bounds);

        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        map.apply_fit(&rect);

        assert_eq!(map.zoom, zoom_to_fit(&bounds, rect.size(), 10));
        assert!((map.center.lon - 19.0).abs() < 1e-6);
        assert!(map.pending_fit.is_none());
    }

    #[test]
    fn visible_tiles_wrap_horizontally_and_skip_outside_rows() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let projection = MapProjection::new(1, GeoPos { lon: 0.0, lat: 0.0 }, rect);

        let tiles: Vec<_> = visible_tiles(&projection).map(|(id, _)| id).collect();
        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|t| t.z == 1 && t.x < 2 && t.y < 2));
    }
}

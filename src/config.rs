//! Configuration for the base map and the cloud frequency overlay.

use egui::Color32;

use crate::TileId;
use crate::projection::GeoPos;

/// The Earth Engine API URL the overlay tiles are served from.
pub const EE_BASE_URL: &str = "https://earthengine.googleapis.com";

/// The default geographical center of the map.
pub const DEFAULT_CENTER: GeoPos = GeoPos { lon: 5.0, lat: 50.0 };

/// The default zoom level of the map.
pub const DEFAULT_ZOOM: u8 = 4;

/// The maximum zoom level the map allows.
pub const DEFAULT_MAX_ZOOM: u8 = 10;

/// Configuration for a map provider.
pub trait MapConfig {
    /// Returns the URL for a given tile.
    fn tile_url(&self, tile: &TileId) -> String;

    /// Returns the attribution text to be displayed on the map. If returns `None`, no attribution is shown.
    fn attribution(&self) -> Option<&String>;

    /// Returns the attribution URL to be linked from the attribution text.
    fn attribution_url(&self) -> Option<&String>;

    /// The default geographical center of the map.
    fn default_center(&self) -> GeoPos {
        DEFAULT_CENTER
    }

    /// The default zoom level of the map.
    fn default_zoom(&self) -> u8 {
        DEFAULT_ZOOM
    }

    /// The maximum zoom level the user can reach.
    fn max_zoom(&self) -> u8 {
        DEFAULT_MAX_ZOOM
    }
}

/// Configuration for the OpenStreetMap tile server, used as the base map.
///
/// # Example
///
/// ```
/// use cloud_frequency_map::config::OpenStreetMapConfig;
/// let config = OpenStreetMapConfig::default();
/// ```
pub struct OpenStreetMapConfig {
    base_url: String,
    attribution: String,
    attribution_url: String,
}

impl Default for OpenStreetMapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tile.openstreetmap.org".to_string(),
            attribution: "© OpenStreetMap contributors, Google Earth Engine".to_string(),
            attribution_url: "https://www.openstreetmap.org".to_string(),
        }
    }
}

impl MapConfig for OpenStreetMapConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        format!("{}/{}/{}/{}.png", self.base_url, tile.z, tile.x, tile.y)
    }

    fn attribution(&self) -> Option<&String> {
        Some(&self.attribution)
    }

    fn attribution_url(&self) -> Option<&String> {
        Some(&self.attribution_url)
    }
}

/// Describes how to fetch the tiles of an Earth Engine image overlay.
///
/// The access token is time limited by the imagery service, once it expires the tile requests
/// fail upstream and the overlay simply stops rendering.
///
/// # Example
///
/// ```
/// use cloud_frequency_map::config::OverlayConfig;
/// let overlay = OverlayConfig::new("map-id", "token");
/// assert_eq!(overlay.opacity(), 0.7);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    base_url: String,
    overlay_id: String,
    token: String,
    opacity: f32,
}

impl OverlayConfig {
    /// Creates the overlay descriptor for the given Earth Engine map id and token.
    pub fn new(overlay_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: EE_BASE_URL.to_string(),
            overlay_id: overlay_id.into(),
            token: token.into(),
            opacity: 0.7,
        }
    }

    /// The overlay identifier.
    pub fn overlay_id(&self) -> &str {
        &self.overlay_id
    }

    /// The edge length of a tile in pixels. Overlay tiles share the grid of the base map, so this
    /// is always [`crate::TILE_SIZE`].
    pub fn tile_size(&self) -> u32 {
        crate::TILE_SIZE
    }

    /// The opacity the overlay is drawn with.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// The tint that renders a tile with the overlay opacity.
    pub fn tint(&self) -> Color32 {
        Color32::from_rgba_unmultiplied(255, 255, 255, (self.opacity * 255.0).round() as u8)
    }
}

impl MapConfig for OverlayConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        format!(
            "{}/map/{}/{}/{}/{}?token={}",
            self.base_url, self.overlay_id, tile.z, tile.x, tile.y, self.token
        )
    }

    fn attribution(&self) -> Option<&String> {
        None
    }

    fn attribution_url(&self) -> Option<&String> {
        None
    }
}

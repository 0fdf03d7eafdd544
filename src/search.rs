//! Place search, and navigation of the map to the found places.
//!
//! # Example
//!
//! ```no_run
//! use cloud_frequency_map::{Map, config::OpenStreetMapConfig, layers::marker::MarkerLayer};
//! use cloud_frequency_map::projection::GeoPos;
//! use cloud_frequency_map::search::{Place, SearchNavigator};
//!
//! let mut map = Map::new(OpenStreetMapConfig::default());
//! map.add_layer("markers", MarkerLayer::new());
//!
//! let navigator = SearchNavigator::new("markers");
//! let places = vec![Place {
//!     name: "Warsaw".to_string(),
//!     icon: None,
//!     location: GeoPos { lon: 21.01, lat: 52.23 },
//! }];
//! navigator.places_changed(places, &mut map);
//! ```

use egui::{Color32, Key, RichText, Ui};
use eyre::Context;
use log::{debug, warn};
use poll_promise::Promise;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::layers::marker::{Marker, MarkerLayer};
use crate::projection::{GeoBounds, GeoPos};
use crate::{CLIENT, Map};

/// The public OpenStreetMap geocoder.
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// The number of places a search returns at most.
const SEARCH_LIMIT: u32 = 10;

/// A place returned by a search.
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    /// The name shown for the place.
    pub name: String,

    /// The URL of an icon for the place.
    pub icon: Option<String>,

    /// Where the place is.
    pub location: GeoPos,
}

/// A places search the user interacts with.
pub trait SearchWidget {
    /// Biases the results towards the given area, usually the visible part of the map.
    fn set_bounds(&mut self, bounds: GeoBounds);

    /// Takes the result of the last finished search, if it has not been taken yet.
    fn take_places(&mut self) -> Option<Vec<Place>>;

    /// Draws the search widget.
    fn ui(&mut self, ui: &mut Ui);
}

/// Shows the results of a search on the map.
pub struct SearchNavigator {
    marker_layer: String,
}

impl SearchNavigator {
    /// Creates a navigator that places its markers on the marker layer with the given key.
    pub fn new(marker_layer: impl Into<String>) -> Self {
        Self {
            marker_layer: marker_layer.into(),
        }
    }

    /// Replaces the markers with one marker per place and fits the map to them.
    ///
    /// Without places nothing changes: the markers and the viewport stay as they are. Returns the
    /// bounds the map is fitted to.
    pub fn places_changed(&self, places: Vec<Place>, map: &mut Map) -> Option<GeoBounds> {
        let bounds = GeoBounds::covering(places.iter().map(|place| place.location))?;

        let markers = places
            .into_iter()
            .map(|place| Marker {
                position: place.location,
                title: place.name,
                icon: place.icon,
            })
            .collect();

        match map.layer_mut::<MarkerLayer>(&self.marker_layer) {
            Some(layer) => layer.set_markers(markers),
            None => {
                let mut layer = MarkerLayer::new();
                layer.set_markers(markers);
                map.add_layer(self.marker_layer.clone(), layer);
            }
        }

        map.fit_bounds(bounds);
        Some(bounds)
    }
}

/// Errors that can occur while searching for places.
#[derive(Error, Debug)]
pub enum SearchError {
    /// An error occurred while making a web request.
    #[error("Connection error")]
    Connection(#[from] reqwest::Error),

    /// The geocoder answered with an unsuccessful status.
    #[error("Search failed. HTTP Status: `{0}`")]
    Status(String),

    /// The search URL could not be built.
    #[error("Invalid search URL: {0}")]
    InvalidUrl(String),

    /// The geocoder response could not be decoded.
    #[error("Unable to decode the search results")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
    icon: Option<String>,
}

/// Decodes a Nominatim `jsonv2` response. Places with unreadable coordinates are skipped.
pub fn parse_places(body: &[u8]) -> Result<Vec<Place>, SearchError> {
    let places: Vec<NominatimPlace> = serde_json::from_slice(body)?;
    Ok(places
        .into_iter()
        .filter_map(|place| {
            let lat = place.lat.parse::<f64>().ok()?;
            let lon = place.lon.parse::<f64>().ok()?;
            Some(Place {
                name: place.display_name,
                icon: place.icon,
                location: GeoPos { lon, lat },
            })
        })
        .collect())
}

type PendingSearch = Promise<Result<Vec<Place>, Arc<eyre::Report>>>;

/// A search box backed by the OpenStreetMap Nominatim geocoder. Pressing enter starts the search.
pub struct NominatimSearchBox {
    base_url: String,
    query: String,
    bounds: Option<GeoBounds>,
    request: Option<PendingSearch>,
    places: Option<Vec<Place>>,
    error: Option<String>,
}

impl Default for NominatimSearchBox {
    fn default() -> Self {
        Self::new(NOMINATIM_URL)
    }
}

impl NominatimSearchBox {
    /// Creates a search box for the geocoder at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            query: String::new(),
            bounds: None,
            request: None,
            places: None,
            error: None,
        }
    }

    /// Whether a search is running.
    pub fn is_searching(&self) -> bool {
        self.request.is_some()
    }

    /// The URL searching for `query` is sent to.
    pub fn search_url(&self, query: &str) -> Result<String, SearchError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("format", "jsonv2".to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
        ];
        if let Some(b) = &self.bounds {
            params.push((
                "viewbox",
                format!("{},{},{},{}", b.west, b.north, b.east, b.south),
            ));
        }

        reqwest::Url::parse_with_params(&format!("{}/search", self.base_url), &params)
            .map(String::from)
            .map_err(|e| SearchError::InvalidUrl(e.to_string()))
    }

    /// Starts searching for `query` in the background, replacing any running search.
    pub fn search(&mut self, query: &str) {
        let url = match self.search_url(query) {
            Ok(url) => url,
            Err(e) => {
                warn!("{}", e);
                self.error = Some(e.to_string());
                return;
            }
        };

        debug!("Searching places at {}", &url);
        self.error = None;
        self.request = Some(Promise::spawn_thread("search_places", move || {
            let result: Result<_, SearchError> = (|| {
                let response = CLIENT.get(&url).send()?;
                if !response.status().is_success() {
                    return Err(SearchError::Status(response.status().to_string()));
                }
                parse_places(&response.bytes()?)
            })();
            result
                .with_context(|| format!("Failed to search places at {}", &url))
                .map_err(Arc::new)
        }));
    }

    fn poll(&mut self) {
        let Some(request) = self.request.take() else {
            return;
        };
        match request.try_take() {
            Ok(Ok(places)) => {
                debug!("Found {} place(s)", places.len());
                self.places = Some(places);
            }
            Ok(Err(e)) => {
                warn!("{:?}", e);
                self.error = Some("Search failed, please try again.".to_string());
            }
            Err(request) => self.request = Some(request),
        }
    }
}

impl SearchWidget for NominatimSearchBox {
    fn set_bounds(&mut self, bounds: GeoBounds) {
        self.bounds = Some(bounds);
    }

    fn take_places(&mut self) -> Option<Vec<Place>> {
        self.places.take()
    }

    fn ui(&mut self, ui: &mut Ui) {
        self.poll();

        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.query)
                    .hint_text("Search places")
                    .desired_width(240.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
                let query = self.query.trim().to_string();
                if !query.is_empty() {
                    self.search(&query);
                }
            }
            if self.is_searching() {
                ui.spinner();
                ui.ctx().request_repaint();
            }
        });

        if let Some(error) = &self.error {
            ui.label(RichText::new(error).color(Color32::RED).small());
        }
    }
}

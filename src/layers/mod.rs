//! Layers for the map view that can handle input, and draw on top of the base map different kinds of data.
//!
use egui::{Painter, Response};
use std::any::Any;

use crate::projection::{GeoPos, MapProjection};

/// Tile overlay layer
pub mod tile;

/// Selectable region outlines
pub mod region;

/// GeoJSON parsing of region geometry.
pub mod geojson;

/// Search result markers
pub mod marker;

/// Callouts anchored to a map position
pub mod callout;

/// A trait for map layers.
pub trait Layer: Any {
    /// Handles user input for the layer. Returns `true` if the input was handled and should not be
    /// processed further by the map.
    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool;

    /// Called once per frame after the map has panned or zoomed, with the projection the frame is
    /// drawn with. Layers load whatever they need for the visible area here.
    fn prepare(&mut self, _ctx: &egui::Context, _projection: &MapProjection) {}

    /// Draws the layer.
    fn draw(&self, painter: &Painter, projection: &MapProjection);

    /// Gets the layer as a `dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Gets the layer as a mutable `dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Checks if a position lies inside a closed ring using the even-odd rule.
///
/// The ring may or may not repeat its first position at the end.
pub(crate) fn ring_contains(ring: &[GeoPos], pos: GeoPos) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.lat > pos.lat) != (b.lat > pos.lat) {
            let lon_at_lat = a.lon + (pos.lat - a.lat) / (b.lat - a.lat) * (b.lon - a.lon);
            if pos.lon < lon_at_lat {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

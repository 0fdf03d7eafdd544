//! A layer for the markers of search results.

use crate::layers::Layer;
use crate::projection::{GeoPos, MapProjection};
use crate::RemoteTexture;
use egui::{Color32, Painter, Pos2, Rect, Response, Stroke, Vec2, pos2};
use std::any::Any;
use std::collections::HashMap;

/// The on-screen size of a marker icon.
pub const MARKER_ICON_SIZE: Vec2 = Vec2::new(25.0, 25.0);

/// A pin on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    /// Where the marker points to.
    pub position: GeoPos,

    /// The label of the marker, shown on hover.
    pub title: String,

    /// The URL of the marker icon. A plain pin is drawn without one.
    pub icon: Option<String>,
}

/// Layer implementation that shows a set of markers.
pub struct MarkerLayer {
    markers: Vec<Marker>,
    icons: HashMap<String, RemoteTexture>,
    hovered: Option<usize>,

    /// The color of markers without an icon.
    pub pin_color: Color32,
}

impl Default for MarkerLayer {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            icons: HashMap::new(),
            hovered: None,
            pin_color: Color32::from_rgb(219, 68, 55),
        }
    }
}

impl MarkerLayer {
    /// Creates an empty marker layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all markers. Icons no longer used by any marker are released.
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.hovered = None;
        self.icons
            .retain(|url, _| markers.iter().any(|m| m.icon.as_deref() == Some(url.as_str())));
        self.markers = markers;
    }

    /// The shown markers.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// The screen rect of a marker icon. The icon sits on top of its position.
    fn marker_rect(&self, marker: &Marker, projection: &MapProjection) -> Rect {
        let anchor = projection.project(marker.position);
        Rect::from_min_size(
            pos2(anchor.x - MARKER_ICON_SIZE.x / 2.0, anchor.y - MARKER_ICON_SIZE.y),
            MARKER_ICON_SIZE,
        )
    }

    fn marker_at(&self, screen_pos: Pos2, projection: &MapProjection) -> Option<usize> {
        self.markers
            .iter()
            .enumerate()
            .rev()
            .find(|(_, marker)| self.marker_rect(marker, projection).contains(screen_pos))
            .map(|(i, _)| i)
    }

    fn draw_pin(&self, painter: &Painter, rect: Rect) {
        let head = pos2(rect.center().x, rect.min.y + rect.width() * 0.35);
        let radius = rect.width() * 0.3;
        painter.line_segment(
            [head, rect.center_bottom()],
            Stroke::new(2.0, self.pin_color),
        );
        painter.circle(head, radius, self.pin_color, Stroke::new(1.0, Color32::WHITE));
    }
}

impl Layer for MarkerLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool {
        self.hovered = response
            .hover_pos()
            .and_then(|pos| self.marker_at(pos, projection));
        if self.hovered.is_some() {
            response.ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
        }
        false
    }

    fn prepare(&mut self, ctx: &egui::Context, _: &MapProjection) {
        for marker in &self.markers {
            if let Some(url) = &marker.icon {
                let icon = self
                    .icons
                    .entry(url.clone())
                    .or_insert_with(|| RemoteTexture::fetch(url.clone()));
                icon.poll(ctx, format!("marker_{url}"));
            }
        }
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        for marker in &self.markers {
            let rect = self.marker_rect(marker, projection);
            let texture = marker
                .icon
                .as_ref()
                .and_then(|url| self.icons.get(url))
                .and_then(RemoteTexture::texture);

            match texture {
                Some(texture) => {
                    painter.image(
                        texture.id(),
                        rect,
                        Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }
                None => self.draw_pin(painter, rect),
            }
        }

        if let Some(marker) = self.hovered.and_then(|i| self.markers.get(i)) {
            let rect = self.marker_rect(marker, projection);
            let galley = painter.layout_no_wrap(
                marker.title.clone(),
                egui::FontId::proportional(13.0),
                Color32::BLACK,
            );
            let text_rect = egui::Align2::CENTER_BOTTOM
                .anchor_size(rect.center_top() - Vec2::new(0.0, 4.0), galley.size());
            painter.rect_filled(text_rect.expand(3.0), 3.0, Color32::from_white_alpha(230));
            painter.galley(text_rect.min, galley, Color32::TRANSPARENT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    fn marker(name: &str, lon: f64, lat: f64) -> Marker {
        Marker {
            position: GeoPos { lon, lat },
            title: name.to_string(),
            icon: None,
        }
    }

    #[test]
    fn set_markers_replaces_all_markers() {
        let mut layer = MarkerLayer::new();
        layer.set_markers(vec![marker("Warsaw", 21.0, 52.2), marker("Krakow", 19.9, 50.0)]);
        assert_eq!(layer.markers().len(), 2);

        layer.set_markers(vec![marker("Chisinau", 28.8, 47.0)]);
        assert_eq!(layer.markers(), &[marker("Chisinau", 28.8, 47.0)]);

        layer.set_markers(Vec::new());
        assert!(layer.markers().is_empty());
    }

    #[test]
    fn replacing_markers_releases_unused_icons() {
        let kept = "https://example.com/kept.png";
        let dropped = "https://example.com/dropped.png";
        let mut layer = MarkerLayer::new();
        layer.icons.insert(kept.to_string(), RemoteTexture::Failed);
        layer.icons.insert(dropped.to_string(), RemoteTexture::Failed);

        layer.set_markers(vec![Marker {
            icon: Some(kept.to_string()),
            ..marker("Warsaw", 21.0, 52.2)
        }]);
        assert!(layer.icons.contains_key(kept));
        assert!(!layer.icons.contains_key(dropped));

        layer.set_markers(vec![marker("Krakow", 19.9, 50.0)]);
        assert!(layer.icons.is_empty());
    }

    #[test]
    fn markers_are_hit_above_their_position() {
        let mut layer = MarkerLayer::new();
        layer.set_markers(vec![marker("Null Island", 0.0, 0.0)]);

        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(512.0, 512.0));
        let projection = MapProjection::new(1, GeoPos { lon: 0.0, lat: 0.0 }, rect);
        let anchor = projection.project(GeoPos { lon: 0.0, lat: 0.0 });

        assert_eq!(layer.marker_at(anchor - vec2(0.0, 10.0), &projection), Some(0));
        assert_eq!(layer.marker_at(anchor + vec2(0.0, 10.0), &projection), None);
        assert_eq!(layer.marker_at(anchor + vec2(40.0, -10.0), &projection), None);
    }
}

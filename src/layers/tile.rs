//! A layer for tile maps on the map.

use egui::{Color32, Painter, Response};
use std::{any::Any, collections::HashMap};

use crate::{
    RemoteTexture, TileId,
    config::{MapConfig, OverlayConfig},
    draw_tile,
    layers::Layer,
    load_tile,
    projection::MapProjection,
    visible_tiles,
};

/// A layer that manages and renders map tiles on top of the base map.
pub struct TileLayer {
    tiles: HashMap<TileId, RemoteTexture>,
    /// Color tint applied to the tile images when rendering
    pub tint: Color32,
    config: Box<dyn MapConfig>,
}

impl TileLayer {
    /// Creates a new tile layer with the given map configuration.
    pub fn new(config: impl MapConfig + 'static) -> Self {
        Self {
            tiles: Default::default(),
            tint: Color32::WHITE,
            config: Box::new(config),
        }
    }

    /// Creates the image overlay layer, drawn with the opacity of the overlay.
    pub fn overlay(config: OverlayConfig) -> Self {
        let tint = config.tint();
        Self {
            tint,
            ..Self::new(config)
        }
    }
}

impl Layer for TileLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_input(&mut self, _: &Response, _: &MapProjection) -> bool {
        false
    }

    fn prepare(&mut self, ctx: &egui::Context, projection: &MapProjection) {
        for (tile_id, _) in visible_tiles(projection) {
            load_tile(&mut self.tiles, self.config.as_ref(), ctx, tile_id);
        }
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        // Positions follow the projection of this frame, so the overlay stays aligned with the
        // base map while panning and zooming.
        for (tile_id, tile_pos) in visible_tiles(projection) {
            draw_tile(&self.tiles, painter, &tile_id, tile_pos, self.tint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Map;
    use crate::config::OpenStreetMapConfig;
    use egui::{Event, Modifiers, MouseWheelUnit, RawInput, Rect, pos2, vec2};

    #[test]
    fn overlay_layer_uses_overlay_opacity() {
        let config = OverlayConfig::new("id", "tok");
        let layer = TileLayer::overlay(config.clone());

        assert_eq!(layer.tint, config.tint());
        assert!(layer.tiles.is_empty());
        assert!(layer.as_any().is::<TileLayer>());
    }

    #[test]
    fn overlay_follows_the_map_when_zooming() {
        let ctx = egui::Context::default();
        let mut map = Map::new(OpenStreetMapConfig::default());
        map.add_layer("overlay", TileLayer::overlay(OverlayConfig::new("id", "tok")));

        let pointer = pos2(400.0, 300.0);
        let mut map_rect = Rect::NOTHING;
        let mut frame = |map: &mut Map, events: Vec<Event>| {
            let input = RawInput {
                screen_rect: Some(Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))),
                events,
                ..Default::default()
            };
            let _ = ctx.run(input, |ctx| {
                egui::CentralPanel::default()
                    .frame(egui::Frame::NONE)
                    .show(ctx, |ui| {
                        map_rect = ui.add(&mut *map).rect;
                    });
            });
        };

        // Two warm-up frames: egui needs a laid-out frame before the map reports hover.
        frame(&mut map, vec![Event::PointerMoved(pointer)]);
        frame(&mut map, vec![Event::PointerMoved(pointer)]);
        frame(
            &mut map,
            vec![
                Event::PointerMoved(pointer),
                Event::MouseWheel {
                    unit: MouseWheelUnit::Line,
                    delta: vec2(0.0, 1.0),
                    modifiers: Modifiers::NONE,
                },
            ],
        );
        assert_eq!(map.zoom, 5);

        let projection = MapProjection::new(map.zoom, map.center, map_rect);
        let layer = map.layer::<TileLayer>("overlay").unwrap();
        for (tile_id, _) in visible_tiles(&projection) {
            assert!(layer.tiles.contains_key(&tile_id), "{tile_id:?} not requested");
        }
    }
}

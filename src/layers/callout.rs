//! A layer for short texts pointing at a map position, like the value at a clicked location.

use crate::details::CalloutHost;
use crate::layers::Layer;
use crate::projection::{GeoPos, MapProjection};
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Response, Shape, Stroke, Vec2, pos2};
use std::any::Any;

const FONT_SIZE: f32 = 14.0;
const PADDING: f32 = 6.0;
const TIP_HEIGHT: f32 = 8.0;

/// A text box anchored to a map position.
#[derive(Clone, Debug, PartialEq)]
pub struct Callout {
    /// The position the callout points to.
    pub pos: GeoPos,

    /// The text of the callout.
    pub text: String,
}

/// Layer implementation that shows callouts. Clicking a callout closes it.
#[derive(Default)]
pub struct CalloutLayer {
    callouts: Vec<Callout>,
}

impl CalloutLayer {
    /// Creates a layer without callouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// The open callouts.
    pub fn callouts(&self) -> &[Callout] {
        &self.callouts
    }

    /// Closes all callouts.
    pub fn clear(&mut self) {
        self.callouts.clear();
    }

    /// The screen rect of the text box. The size is estimated from the length of the text so
    /// hit-testing does not need the fonts.
    fn box_rect(callout: &Callout, projection: &MapProjection) -> Rect {
        let anchor = projection.project(callout.pos);
        let size = Vec2::new(
            callout.text.chars().count() as f32 * FONT_SIZE * 0.6 + 2.0 * PADDING,
            FONT_SIZE + 2.0 * PADDING,
        );
        Align2::CENTER_BOTTOM.anchor_size(anchor - Vec2::new(0.0, TIP_HEIGHT), size)
    }

    fn callout_at(&self, screen_pos: Pos2, projection: &MapProjection) -> Option<usize> {
        self.callouts
            .iter()
            .rposition(|callout| Self::box_rect(callout, projection).contains(screen_pos))
    }
}

impl CalloutHost for CalloutLayer {
    fn open_callout(&mut self, pos: GeoPos, text: String) {
        self.callouts.push(Callout { pos, text });
    }
}

impl Layer for CalloutLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool {
        if response.clicked() {
            if let Some(pointer_pos) = response.interact_pointer_pos() {
                if let Some(index) = self.callout_at(pointer_pos, projection) {
                    self.callouts.remove(index);
                    return true;
                }
            }
        }
        false
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        let background = Color32::WHITE;
        let border = Stroke::new(1.0, Color32::from_gray(120));

        for callout in &self.callouts {
            let anchor = projection.project(callout.pos);
            let rect = Self::box_rect(callout, projection);

            painter.add(Shape::convex_polygon(
                vec![
                    anchor,
                    pos2(anchor.x - TIP_HEIGHT, rect.max.y),
                    pos2(anchor.x + TIP_HEIGHT, rect.max.y),
                ],
                background,
                border,
            ));
            painter.rect(rect, 3.0, background, border, egui::StrokeKind::Inside);
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                &callout.text,
                FontId::proportional(FONT_SIZE),
                Color32::BLACK,
            );
        }
    }
}

//! A right-hand side panel showing the details of the clicked region or location.

use egui::{Color32, RichText};

use super::PanelView;
use crate::chart::{ChartOptions, LineChart, TimePoint};

const PANEL_WIDTH: f32 = 320.0;
const EXPANDED_PANEL_WIDTH: f32 = 640.0;
const CHART_HEIGHT: f32 = 200.0;
const EXPANDED_CHART_HEIGHT: f32 = 400.0;

/// What the user asked the panel to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelAction {
    /// The close button was pressed.
    Close,

    /// The expand or collapse button was pressed.
    ToggleExpanded,
}

/// The details panel, drawn with `egui`.
#[derive(Default)]
pub struct EguiPanel {
    visible: bool,
    expanded: bool,
    title: Option<String>,
    link: Option<String>,
    chart: Option<LineChart>,
    error: Option<String>,

    /// How the chart is drawn.
    pub chart_options: ChartOptions,
}

impl EguiPanel {
    /// Whether the panel is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the panel is shown expanded.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// The title shown on top of the panel.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The external reference link.
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// The chart of the current series.
    pub fn chart(&self) -> Option<&LineChart> {
        self.chart.as_ref()
    }

    /// The error message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Draws the panel if it is visible and returns what the user asked for.
    pub fn show_ui(&self, ctx: &egui::Context) -> Option<PanelAction> {
        if !self.visible {
            return None;
        }

        let (width, chart_height) = if self.expanded {
            (EXPANDED_PANEL_WIDTH, EXPANDED_CHART_HEIGHT)
        } else {
            (PANEL_WIDTH, CHART_HEIGHT)
        };

        let mut action = None;
        egui::SidePanel::right("details_panel")
            .resizable(false)
            .exact_width(width)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("✖").on_hover_text("Close").clicked() {
                        action = Some(PanelAction::Close);
                    }
                    let (icon, hint) = if self.expanded {
                        ("⏵", "Collapse")
                    } else {
                        ("⏴", "Expand")
                    };
                    if ui.button(icon).on_hover_text(hint).clicked() {
                        action = Some(PanelAction::ToggleExpanded);
                    }
                });
                ui.separator();

                if let Some(title) = &self.title {
                    ui.heading(title);
                }

                if let Some(link) = &self.link {
                    ui.hyperlink_to("Read more on Wikipedia", link);
                }

                if let Some(error) = &self.error {
                    ui.label(RichText::new(error).color(Color32::RED));
                }

                if let Some(chart) = &self.chart {
                    ui.add_space(8.0);
                    chart.ui(ui, chart_height);
                }
            });

        action
    }
}

impl PanelView for EguiPanel {
    fn show(&mut self, expanded: bool) {
        self.visible = true;
        self.expanded = expanded;
    }

    fn hide(&mut self) {
        self.visible = false;
        self.expanded = false;
    }

    fn set_title(&mut self, title: Option<&str>) {
        self.title = title.map(str::to_string);
    }

    fn set_link(&mut self, url: Option<&str>) {
        self.link = url.map(str::to_string);
    }

    fn set_chart(&mut self, series: Option<&[TimePoint]>) {
        self.chart = series.map(|s| LineChart::new(s.to_vec(), self.chart_options.clone()));
    }

    fn set_error(&mut self, message: Option<&str>) {
        self.error = message.map(str::to_string);
    }
}

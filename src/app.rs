//! The cloud frequency client: the map, the search box and the details panel wired together.

use eframe::egui;
use log::warn;

use crate::boot::BootConfig;
use crate::config::OpenStreetMapConfig;
use crate::details::panel::{EguiPanel, PanelAction};
use crate::details::{DetailService, DetailsController, HttpDetailService};
use crate::layers::callout::CalloutLayer;
use crate::layers::marker::MarkerLayer;
use crate::layers::region::RegionLayer;
use crate::layers::tile::TileLayer;
use crate::search::{NominatimSearchBox, SearchNavigator, SearchWidget};
use crate::{Map, MapEvent};

/// The key of the image overlay layer.
pub const OVERLAY_LAYER: &str = "overlay";
/// The key of the region layer.
pub const REGION_LAYER: &str = "regions";
/// The key of the search marker layer.
pub const MARKER_LAYER: &str = "markers";
/// The key of the callout layer.
pub const CALLOUT_LAYER: &str = "callouts";

const INFO_TEXT: &str = "The overlay shows how often each place was covered by clouds in \
    satellite imagery: the brighter the area, the more often it was cloudy.";
const INFO_HINT: &str = "Click anywhere on the map to see the cloud frequency of that spot, or \
    click a highlighted region to see its statistics and brightness over time. Use the search \
    box to jump to a place.";

/// The application. Owns every component; nothing is shared through globals.
pub struct CloudFrequencyApp {
    map: Map,
    controller: DetailsController,
    panel: EguiPanel,
    search: Box<dyn SearchWidget>,
    navigator: SearchNavigator,
    info_open: bool,
}

impl CloudFrequencyApp {
    /// Creates the application talking to the backend and geocoder over HTTP.
    pub fn new(boot: &BootConfig) -> Self {
        Self::with_services(
            boot,
            HttpDetailService::new(boot.backend_url.as_str()),
            NominatimSearchBox::default(),
        )
    }

    /// Creates the application with the given detail service and search widget.
    pub fn with_services(
        boot: &BootConfig,
        service: impl DetailService + 'static,
        search: impl SearchWidget + 'static,
    ) -> Self {
        let mut map = Map::new(OpenStreetMapConfig::default());
        map.add_layer(OVERLAY_LAYER, TileLayer::overlay(boot.overlay()));

        let mut regions = RegionLayer::new(boot.geometry_source());
        regions.load_regions(boot.region_ids.as_slice());
        map.add_layer(REGION_LAYER, regions);

        map.add_layer(MARKER_LAYER, MarkerLayer::new());
        map.add_layer(CALLOUT_LAYER, CalloutLayer::new());

        Self {
            map,
            controller: DetailsController::new(service),
            panel: EguiPanel::default(),
            search: Box::new(search),
            navigator: SearchNavigator::new(MARKER_LAYER),
            info_open: false,
        }
    }

    /// The map.
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// The details panel controller.
    pub fn controller(&self) -> &DetailsController {
        &self.controller
    }

    /// The details panel.
    pub fn panel(&self) -> &EguiPanel {
        &self.panel
    }

    /// Whether the info window is shown.
    pub fn is_info_open(&self) -> bool {
        self.info_open
    }

    /// Shows the info window, or hides it when it is shown.
    pub fn toggle_info(&mut self) {
        self.info_open = !self.info_open;
    }

    /// Draws the search box together with the info toggle.
    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("search"))
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal_top(|ui| {
                        ui.vertical(|ui| self.search.ui(ui));
                        if ui
                            .selectable_label(self.info_open, "ℹ")
                            .on_hover_text("About this map")
                            .clicked()
                        {
                            self.toggle_info();
                        }
                    });
                });
            });
    }

    fn show_info(&mut self, ctx: &egui::Context) {
        let mut open = self.info_open;
        let mut close = false;
        egui::Window::new("About")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 60.0))
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.label(INFO_TEXT);
                ui.add_space(4.0);
                ui.label(INFO_HINT);
                ui.add_space(8.0);
                if ui.button("Close").clicked() {
                    close = true;
                }
            });
        self.info_open = open && !close;
    }

    /// Routes the map clicks, region clicks and viewport changes of the last frame.
    fn handle_map_events(&mut self) {
        for event in self.map.take_events() {
            match event {
                MapEvent::Click(pos) => match self.map.layer_mut::<RegionLayer>(REGION_LAYER) {
                    Some(regions) => {
                        self.controller
                            .on_point_click(pos, regions, &mut self.panel);
                    }
                    None => warn!("No region layer, ignoring the click at {:?}", pos),
                },
                MapEvent::BoundsChanged(bounds) => self.search.set_bounds(bounds),
            }
        }

        if let Some(regions) = self.map.layer_mut::<RegionLayer>(REGION_LAYER) {
            if let Some(region_id) = regions.take_clicked() {
                self.controller
                    .on_region_click(&region_id, regions, &mut self.panel);
            }
        }
    }

    fn handle_panel_action(&mut self, action: PanelAction) {
        match action {
            PanelAction::ToggleExpanded => self.controller.toggle_expanded(&mut self.panel),
            PanelAction::Close => match self.map.layer_mut::<RegionLayer>(REGION_LAYER) {
                Some(regions) => self.controller.close(regions, &mut self.panel),
                None => warn!("No region layer, unable to close the details panel"),
            },
        }
    }

    fn handle_search_results(&mut self) {
        if let Some(places) = self.search.take_places() {
            self.navigator.places_changed(places, &mut self.map);
        }
    }

    fn poll_details(&mut self) {
        match self.map.layer_mut::<CalloutLayer>(CALLOUT_LAYER) {
            Some(callouts) => self.controller.poll(&mut self.panel, callouts),
            None => warn!("No callout layer, unable to show details"),
        }
    }
}

impl eframe::App for CloudFrequencyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(action) = self.panel.show_ui(ctx) {
            self.handle_panel_action(action);
            ctx.request_repaint();
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                ui.add(&mut self.map);
            });

        self.show_toolbar(ctx);
        self.show_info(ctx);

        self.handle_map_events();
        self.handle_search_results();
        self.poll_details();

        if self.controller.is_loading() {
            ctx.request_repaint();
        }
    }
}

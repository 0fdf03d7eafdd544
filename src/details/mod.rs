//! The details panel controller.
//!
//! Clicking a region or a location opens the details panel right away and asks the backend for
//! the statistics of what was clicked. Every request is tagged with a sequence number and only
//! the response of the most recent request is applied; responses to superseded requests are
//! dropped when they arrive.

use log::{debug, warn};
use poll_promise::Promise;

use crate::chart::TimePoint;
use crate::projection::GeoPos;

/// The HTTP client of the backend detail service.
pub mod service;

/// The `egui` rendering of the details panel.
pub mod panel;

pub use service::{ClientError, DetailService, HttpDetailService};

/// Shown in the error slot when the backend could not be reached.
pub const NETWORK_ERROR_MESSAGE: &str = "Unable to load details, please try again.";

/// Shown in the error slot when the backend has no value for a location.
pub const NO_DATA_MESSAGE: &str = "No data available at this location.";

/// What the details are requested for.
#[derive(Clone, Debug, PartialEq)]
pub enum DetailQuery {
    /// A raw location.
    Point {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },

    /// A named region.
    Region {
        /// The region identifier.
        region_id: String,
    },
}

/// The outcome of a detail request, as reported by the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum DetailResult {
    /// The backend computed the details.
    Success {
        /// A title replacing the one shown when the panel opened.
        title: Option<String>,
        /// A link to an external reference about the region.
        external_link: Option<String>,
        /// The values over time, in ascending time order.
        time_series: Vec<TimePoint>,
        /// The single aggregate value of a point query.
        mean: Option<f64>,
    },

    /// The backend reported an error.
    Failure {
        /// The message to show to the user.
        message: String,
    },
}

/// The visibility of the details panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanelState {
    /// The panel is not shown.
    #[default]
    Hidden,
    /// The panel is shown.
    Visible,
    /// The panel is shown with extra room for the chart.
    VisibleExpanded,
}

/// The surface the details are rendered on.
pub trait PanelView {
    /// Shows the panel.
    fn show(&mut self, expanded: bool);

    /// Hides the panel.
    fn hide(&mut self);

    /// Shows the title, or hides it when `None`.
    fn set_title(&mut self, title: Option<&str>);

    /// Shows the external reference link, or hides it when `None`.
    fn set_link(&mut self, url: Option<&str>);

    /// Shows a chart of the series, or hides the chart when `None`.
    fn set_chart(&mut self, series: Option<&[TimePoint]>);

    /// Shows the error message, or hides it when `None`.
    fn set_error(&mut self, message: Option<&str>);
}

/// The region selection the controller drives.
pub trait RegionSelection {
    /// Selects the region with the given id, clearing any other selection. Returns the title of
    /// the region, or `None` if there is no such region.
    fn select(&mut self, region_id: &str) -> Option<String>;

    /// Clears the selection.
    fn clear_selection(&mut self);
}

/// Something that can show a short text anchored to a map position.
pub trait CalloutHost {
    /// Opens a callout at `pos`.
    fn open_callout(&mut self, pos: GeoPos, text: String);
}

/// Formats a percentage-like value rounded to the nearest integer, e.g. `42.6` as `43%`.
pub fn format_percentage(value: f64) -> String {
    // Adding zero turns a negative zero into a positive one.
    format!("{:.0}%", value.round() + 0.0)
}

struct InFlight {
    sequence: u64,
    query: DetailQuery,
    promise: Promise<Result<DetailResult, ClientError>>,
}

/// Drives the details panel through its states and applies detail responses to it.
pub struct DetailsController {
    service: Box<dyn DetailService>,
    state: PanelState,
    next_sequence: u64,
    current: Option<u64>,
    in_flight: Vec<InFlight>,
}

impl DetailsController {
    /// Creates a controller that fetches details from `service`.
    pub fn new(service: impl DetailService + 'static) -> Self {
        Self {
            service: Box::new(service),
            state: PanelState::Hidden,
            next_sequence: 0,
            current: None,
            in_flight: Vec::new(),
        }
    }

    /// The visibility of the panel.
    pub fn state(&self) -> PanelState {
        self.state
    }

    /// The sequence number of the request whose response may still update the panel.
    pub fn current_request(&self) -> Option<u64> {
        self.current
    }

    /// Whether any request, current or superseded, has not resolved yet.
    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Handles a click on the map outside of any region.
    ///
    /// The panel opens with the clicked coordinate as its title. The value at the location is
    /// shown in a callout once it arrives.
    pub fn on_point_click(
        &mut self,
        pos: GeoPos,
        regions: &mut dyn RegionSelection,
        view: &mut dyn PanelView,
    ) -> u64 {
        self.clear(regions, view);
        self.open(view);
        view.set_title(Some(&format!("{:.4}, {:.4}", pos.lat, pos.lon)));

        self.issue(DetailQuery::Point {
            lat: pos.lat,
            lon: pos.lon,
        })
    }

    /// Handles a click on a region.
    ///
    /// The region is highlighted and its title shown right away, the rest of the details follow
    /// once the backend responds.
    pub fn on_region_click(
        &mut self,
        region_id: &str,
        regions: &mut dyn RegionSelection,
        view: &mut dyn PanelView,
    ) -> u64 {
        self.clear(regions, view);
        let title = regions.select(region_id);
        self.open(view);
        view.set_title(Some(title.as_deref().unwrap_or(region_id)));

        self.issue(DetailQuery::Region {
            region_id: region_id.to_string(),
        })
    }

    /// Switches between the normal and the expanded panel. Does nothing while hidden.
    pub fn toggle_expanded(&mut self, view: &mut dyn PanelView) {
        self.state = match self.state {
            PanelState::Hidden => return,
            PanelState::Visible => PanelState::VisibleExpanded,
            PanelState::VisibleExpanded => PanelState::Visible,
        };
        view.show(self.state == PanelState::VisibleExpanded);
    }

    /// Closes the panel, clearing its content and the region selection.
    ///
    /// A response to a request issued before closing is ignored.
    pub fn close(&mut self, regions: &mut dyn RegionSelection, view: &mut dyn PanelView) {
        self.clear(regions, view);
        view.hide();
        self.state = PanelState::Hidden;
        self.current = None;
    }

    /// Applies the responses that arrived since the last call.
    pub fn poll(&mut self, view: &mut dyn PanelView, callouts: &mut dyn CalloutHost) {
        let in_flight = std::mem::take(&mut self.in_flight);
        for request in in_flight {
            match request.promise.try_take() {
                Ok(result) => {
                    if self.current == Some(request.sequence) {
                        self.apply(&request.query, result, view, callouts);
                    } else {
                        debug!(
                            "Discarding the response of superseded request {} ({:?})",
                            request.sequence, request.query
                        );
                    }
                }
                Err(promise) => self.in_flight.push(InFlight {
                    promise,
                    ..request
                }),
            }
        }
    }

    fn clear(&mut self, regions: &mut dyn RegionSelection, view: &mut dyn PanelView) {
        view.set_title(None);
        view.set_link(None);
        view.set_chart(None);
        view.set_error(None);
        regions.clear_selection();
    }

    fn open(&mut self, view: &mut dyn PanelView) {
        self.state = PanelState::Visible;
        view.show(false);
    }

    fn issue(&mut self, query: DetailQuery) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.current = Some(sequence);

        let promise = self.service.fetch(&query);
        self.in_flight.push(InFlight {
            sequence,
            query,
            promise,
        });
        sequence
    }

    fn apply(
        &mut self,
        query: &DetailQuery,
        result: Result<DetailResult, ClientError>,
        view: &mut dyn PanelView,
        callouts: &mut dyn CalloutHost,
    ) {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                warn!("Details for {:?} could not be loaded: {}", query, e);
                view.set_link(None);
                view.set_chart(None);
                view.set_error(Some(NETWORK_ERROR_MESSAGE));
                return;
            }
        };

        match (query, result) {
            (_, DetailResult::Failure { message }) => {
                view.set_link(None);
                view.set_chart(None);
                view.set_error(Some(&message));
            }
            (DetailQuery::Point { lat, lon }, DetailResult::Success { mean, .. }) => match mean {
                Some(mean) => {
                    callouts.open_callout(GeoPos { lon: *lon, lat: *lat }, format_percentage(mean))
                }
                None => view.set_error(Some(NO_DATA_MESSAGE)),
            },
            (
                DetailQuery::Region { .. },
                DetailResult::Success {
                    title,
                    external_link,
                    time_series,
                    ..
                },
            ) => {
                if let Some(title) = title {
                    view.set_title(Some(&title));
                }
                view.set_error(None);
                view.set_link(external_link.as_deref());
                view.set_chart(Some(&time_series));
            }
        }
    }
}

//! A layer for the named regions a user can select on the map.
//!
//! # Example
//!
//! ```no_run
//! use cloud_frequency_map::{Map, config::OpenStreetMapConfig, layers::region::{GeometrySource, RegionLayer}};
//!
//! let mut regions = RegionLayer::new(GeometrySource::from_prefix("static/polygons/"));
//! regions.load_regions(&["poland", "moldova"]);
//!
//! let mut map = Map::new(OpenStreetMapConfig::default());
//! map.add_layer("regions", regions);
//! ```

use crate::details::RegionSelection;
use crate::layers::geojson::regions_from_geojson_str;
use crate::layers::{Layer, ring_contains};
use crate::projection::{GeoPos, MapProjection};
use crate::CLIENT;
use egui::{Color32, Mesh, Painter, Pos2, Response, Shape, Stroke};
use eyre::Context;
use log::{debug, warn};
use poll_promise::Promise;
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while loading the geometry of a region.
#[derive(Error, Debug)]
pub enum RegionError {
    /// The geometry file could not be read.
    #[error("Unable to read region geometry")]
    Read(#[from] std::io::Error),

    /// An error occurred while making a web request.
    #[error("Connection error")]
    Connection(#[from] reqwest::Error),

    /// The geometry resource could not be downloaded.
    #[error("Region geometry failed to download. HTTP Status: `{0}`")]
    Status(String),

    /// The resource is not valid GeoJSON.
    #[error("Invalid GeoJSON")]
    InvalidGeoJson(#[from] geojson::Error),

    /// The resource holds no polygon geometry.
    #[error("Region `{0}` has no polygon geometry")]
    NoPolygons(String),
}

/// Where the per-region geometry resources (`<region id>.json`) are loaded from.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometrySource {
    /// An HTTP prefix ending in `/`.
    Http(String),

    /// A directory on the local file system.
    Directory(PathBuf),
}

impl GeometrySource {
    /// Interprets `prefix` as an HTTP prefix if it is a URL, and as a directory otherwise.
    pub fn from_prefix(prefix: &str) -> Self {
        if prefix.starts_with("http://") || prefix.starts_with("https://") {
            let mut prefix = prefix.to_string();
            if !prefix.ends_with('/') {
                prefix.push('/');
            }
            Self::Http(prefix)
        } else {
            Self::Directory(PathBuf::from(prefix))
        }
    }

    /// The location of the geometry resource of a region.
    pub fn resource(&self, region_id: &str) -> String {
        match self {
            Self::Http(prefix) => format!("{prefix}{region_id}.json"),
            Self::Directory(dir) => dir.join(format!("{region_id}.json")).display().to_string(),
        }
    }

    fn fetch(&self, region_id: &str) -> Result<String, RegionError> {
        let resource = self.resource(region_id);
        debug!("Loading region geometry from {}", &resource);
        match self {
            Self::Http(_) => {
                let response = CLIENT.get(&resource).send()?;
                if !response.status().is_success() {
                    return Err(RegionError::Status(response.status().to_string()));
                }
                Ok(response.text()?)
            }
            Self::Directory(_) => Ok(std::fs::read_to_string(&resource)?),
        }
    }
}

/// A named polygonal area on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// The region identifier.
    pub id: String,

    /// The title shown when the region is selected.
    pub title: String,

    /// The polygons of the region. Each polygon is a list of rings, the outline followed by holes.
    pub polygons: Vec<Vec<Vec<GeoPos>>>,

    /// Whether the region is the currently selected one.
    pub selected: bool,
}

impl Region {
    /// Whether the region covers `pos`, honoring holes.
    pub fn contains(&self, pos: GeoPos) -> bool {
        self.polygons.iter().any(|rings| match rings.split_first() {
            Some((outline, holes)) => {
                ring_contains(outline, pos) && !holes.iter().any(|hole| ring_contains(hole, pos))
            }
            None => false,
        })
    }
}

type PendingRegions = Promise<Result<Vec<Region>, Arc<eyre::Report>>>;

/// Layer implementation that shows the loaded regions and highlights the selected one.
pub struct RegionLayer {
    regions: Vec<Region>,

    pending: Vec<(String, PendingRegions)>,

    source: GeometrySource,

    clicked: Option<String>,

    /// The fill color of the regions.
    pub fill: Color32,

    /// The outline of the regions.
    pub stroke: Stroke,

    /// The outline width of the selected region.
    pub selected_stroke_width: f32,
}

impl RegionLayer {
    /// Creates a new `RegionLayer` that loads geometry from `source`.
    pub fn new(source: GeometrySource) -> Self {
        Self {
            regions: Vec::new(),
            pending: Vec::new(),
            source,
            clicked: None,
            fill: Color32::from_rgba_unmultiplied(255, 255, 255, 77),
            stroke: Stroke::new(3.0, Color32::WHITE),
            selected_stroke_width: 8.0,
        }
    }

    /// Starts loading the geometry of the given regions in the background.
    ///
    /// Loading the same id twice is tolerated, the region is then simply added twice.
    pub fn load_regions<S: AsRef<str>>(&mut self, region_ids: &[S]) {
        for region_id in region_ids {
            let region_id = region_id.as_ref().to_string();
            let source = self.source.clone();
            let id = region_id.clone();
            let promise = Promise::spawn_thread("load_region", move || {
                source
                    .fetch(&id)
                    .and_then(|geojson| regions_from_geojson_str(&id, &geojson))
                    .with_context(|| format!("Failed to load region {}", &id))
                    .map_err(Arc::new)
            });
            self.pending.push((region_id, promise));
        }
    }

    /// Adds an already loaded region.
    pub fn add_region(&mut self, region: Region) {
        self.regions.push(region);
    }

    /// The loaded regions.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Whether any region is still loading.
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The selected region, if any.
    pub fn selected(&self) -> Option<&Region> {
        self.regions.iter().find(|r| r.selected)
    }

    /// The topmost region covering `pos`.
    pub fn region_at(&self, pos: GeoPos) -> Option<&Region> {
        self.regions.iter().rev().find(|r| r.contains(pos))
    }

    /// Takes the id of the region the user clicked since the last call.
    pub fn take_clicked(&mut self) -> Option<String> {
        self.clicked.take()
    }

    /// Moves finished loads into the layer. Regions that failed to load are skipped.
    pub fn poll(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (region_id, promise) in pending {
            match promise.try_take() {
                Ok(Ok(regions)) => {
                    debug!("Loaded {} feature(s) for region {}", regions.len(), region_id);
                    self.regions.extend(regions);
                }
                Ok(Err(e)) => warn!("{:?}", e),
                Err(promise) => self.pending.push((region_id, promise)),
            }
        }
    }

    fn draw_region(&self, painter: &Painter, projection: &MapProjection, region: &Region) {
        let stroke = if region.selected {
            Stroke::new(self.selected_stroke_width, self.stroke.color)
        } else {
            self.stroke
        };

        for rings in &region.polygons {
            let screen_rings: Vec<Vec<Pos2>> = rings
                .iter()
                .map(|ring| ring.iter().map(|p| projection.project(*p)).collect())
                .collect();

            self.fill_polygon(painter, &screen_rings);

            for ring in screen_rings {
                painter.add(Shape::closed_line(ring, stroke));
            }
        }
    }

    /// Triangulates the polygon, holes included, and fills it.
    fn fill_polygon(&self, painter: &Painter, rings: &[Vec<Pos2>]) {
        let mut flat_points = Vec::new();
        let mut hole_indices = Vec::new();
        for (i, ring) in rings.iter().enumerate() {
            if i > 0 {
                hole_indices.push(flat_points.len() / 2);
            }
            flat_points.extend(ring.iter().flat_map(|p| [p.x as f64, p.y as f64]));
        }

        let indices = match earcutr::earcut(&flat_points, &hole_indices, 2) {
            Ok(indices) => indices,
            Err(e) => {
                warn!("Unable to triangulate region polygon: {:?}", e);
                return;
            }
        };

        let mut mesh = Mesh::default();
        mesh.vertices = rings
            .iter()
            .flatten()
            .map(|p| egui::epaint::Vertex {
                pos: *p,
                uv: Default::default(),
                color: self.fill,
            })
            .collect();
        mesh.indices = indices.into_iter().map(|i| i as u32).collect();
        painter.add(Shape::Mesh(mesh.into()));
    }
}

impl RegionSelection for RegionLayer {
    fn select(&mut self, region_id: &str) -> Option<String> {
        self.clear_selection();
        let region = self.regions.iter_mut().find(|r| r.id == region_id)?;
        region.selected = true;
        Some(region.title.clone())
    }

    fn clear_selection(&mut self) {
        for region in &mut self.regions {
            region.selected = false;
        }
    }
}

impl Layer for RegionLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool {
        self.poll();
        if self.is_loading() {
            response.ctx.request_repaint();
        }

        if response.clicked() {
            if let Some(pointer_pos) = response.interact_pointer_pos() {
                let pos = projection.unproject(pointer_pos);
                if let Some(region) = self.region_at(pos) {
                    self.clicked = Some(region.id.clone());
                    return true;
                }
            }
        }
        false
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        // The selected region is drawn last so its outline stays on top.
        let (selected, unselected): (Vec<&Region>, Vec<&Region>) =
            self.regions.iter().partition(|r| r.selected);
        for region in unselected.into_iter().chain(selected) {
            self.draw_region(painter, projection, region);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, min: f64, max: f64) -> Region {
        Region {
            id: id.to_string(),
            title: id.to_uppercase(),
            polygons: vec![vec![vec![
                GeoPos { lon: min, lat: min },
                GeoPos { lon: max, lat: min },
                GeoPos { lon: max, lat: max },
                GeoPos { lon: min, lat: max },
            ]]],
            selected: false,
        }
    }

    fn layer() -> RegionLayer {
        let mut layer = RegionLayer::new(GeometrySource::from_prefix("static/polygons/"));
        layer.add_region(region("poland", 0.0, 10.0));
        layer.add_region(region("moldova", 20.0, 30.0));
        layer.add_region(region("romania", 40.0, 50.0));
        layer
    }

    #[test]
    fn region_layer_new() {
        let layer = RegionLayer::new(GeometrySource::from_prefix("static/polygons/"));
        assert!(layer.regions().is_empty());
        assert!(!layer.is_loading());
        assert_eq!(layer.stroke, Stroke::new(3.0, Color32::WHITE));
        assert_eq!(layer.selected_stroke_width, 8.0);
    }

    #[test]
    fn at_most_one_region_is_selected() {
        let mut layer = layer();

        for id in ["poland", "moldova", "moldova", "romania", "poland"] {
            assert_eq!(layer.select(id), Some(id.to_uppercase()));
            let selected: Vec<_> = layer.regions().iter().filter(|r| r.selected).collect();
            assert_eq!(selected.len(), 1);
            assert_eq!(selected[0].id, id);
        }

        layer.clear_selection();
        assert!(layer.selected().is_none());
    }

    #[test]
    fn selecting_an_unknown_region_clears_the_selection() {
        let mut layer = layer();
        layer.select("poland");

        assert_eq!(layer.select("atlantis"), None);
        assert!(layer.selected().is_none());
    }

    #[test]
    fn duplicate_ids_only_select_one_region() {
        let mut layer = layer();
        layer.add_region(region("poland", 60.0, 70.0));

        layer.select("poland");
        assert_eq!(layer.regions().iter().filter(|r| r.selected).count(), 1);
    }

    #[test]
    fn region_at_honors_holes() {
        let mut layer = layer();
        let mut donut = region("donut", 100.0, 110.0);
        donut.polygons[0].push(vec![
            GeoPos { lon: 104.0, lat: 104.0 },
            GeoPos { lon: 106.0, lat: 104.0 },
            GeoPos { lon: 106.0, lat: 106.0 },
            GeoPos { lon: 104.0, lat: 106.0 },
        ]);
        layer.add_region(donut);

        assert_eq!(
            layer.region_at(GeoPos { lon: 5.0, lat: 5.0 }).map(|r| r.id.as_str()),
            Some("poland")
        );
        assert_eq!(
            layer.region_at(GeoPos { lon: 101.0, lat: 101.0 }).map(|r| r.id.as_str()),
            Some("donut")
        );
        assert!(layer.region_at(GeoPos { lon: 105.0, lat: 105.0 }).is_none());
        assert!(layer.region_at(GeoPos { lon: 15.0, lat: 15.0 }).is_none());
    }

    #[test]
    fn geometry_source_resources() {
        assert_eq!(
            GeometrySource::from_prefix("http://localhost:8080/static/polygons").resource("poland"),
            "http://localhost:8080/static/polygons/poland.json"
        );
        assert_eq!(
            GeometrySource::from_prefix("static/polygons"),
            GeometrySource::Directory(PathBuf::from("static/polygons"))
        );
    }

    #[test]
    fn missing_geometry_is_tolerated() {
        let dir = std::env::temp_dir().join("cloud-frequency-missing-regions");
        let mut layer = RegionLayer::new(GeometrySource::Directory(dir));
        layer.load_regions(&["nowhere"]);

        while layer.is_loading() {
            layer.poll();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(layer.regions().is_empty());
    }

    #[test]
    fn loads_regions_from_a_directory() {
        let dir = std::env::temp_dir().join(format!("cloud-frequency-regions-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("moldova.json"),
            r#"{"type": "Feature", "properties": {"title": "Moldova"}, "geometry": {"type": "Polygon", "coordinates": [[[27.0, 46.0], [30.0, 46.0], [30.0, 48.0], [27.0, 46.0]]]}}"#,
        )
        .unwrap();

        let mut layer = RegionLayer::new(GeometrySource::Directory(dir.clone()));
        layer.load_regions(&["moldova", "moldova"]);
        while layer.is_loading() {
            layer.poll();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(layer.regions().len(), 2);
        assert!(layer.regions().iter().all(|r| r.id == "moldova" && r.title == "Moldova"));

        std::fs::remove_dir_all(dir).unwrap();
    }
}

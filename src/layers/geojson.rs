//! GeoJSON deserialization for region geometry.

use super::region::{Region, RegionError};
use crate::projection::GeoPos;
use geojson::{Feature, GeoJson, Value};
use serde_json::Value as JsonValue;

fn vec_to_geo_pos(pos: &[f64]) -> Option<GeoPos> {
    match pos {
        [lon, lat, ..] => Some(GeoPos {
            lon: *lon,
            lat: *lat,
        }),
        _ => None,
    }
}

fn ring_to_geo_pos(ring: &[Vec<f64>]) -> Vec<GeoPos> {
    let mut points: Vec<GeoPos> = ring.iter().filter_map(|pos| vec_to_geo_pos(pos)).collect();

    // Remove the closing point, the region rings are implicitly closed.
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn polygon_to_rings(polygon: &[Vec<Vec<f64>>]) -> Vec<Vec<GeoPos>> {
    polygon
        .iter()
        .map(|ring| ring_to_geo_pos(ring))
        .filter(|ring| ring.len() >= 3)
        .collect()
}

/// Collects the polygons of a geometry. Each polygon is a list of rings, the first one being the
/// outline and the rest holes.
fn polygons(value: &Value) -> Vec<Vec<Vec<GeoPos>>> {
    match value {
        Value::Polygon(polygon) => vec![polygon_to_rings(polygon)],
        Value::MultiPolygon(multi) => multi.iter().map(|p| polygon_to_rings(p)).collect(),
        Value::GeometryCollection(geometries) => {
            geometries.iter().flat_map(|g| polygons(&g.value)).collect()
        }
        _ => Vec::new(),
    }
    .into_iter()
    .filter(|rings: &Vec<Vec<GeoPos>>| !rings.is_empty())
    .collect()
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}

impl Region {
    /// Builds a region from a GeoJSON feature. Returns `None` when the feature has no polygon
    /// geometry.
    ///
    /// The region id is read from the `id` property and the title from the `title` property,
    /// both falling back to `fallback_id`.
    pub fn from_feature(feature: &Feature, fallback_id: &str) -> Option<Self> {
        let polygons = polygons(&feature.geometry.as_ref()?.value);
        if polygons.is_empty() {
            return None;
        }

        let id = string_property(feature, "id").unwrap_or_else(|| fallback_id.to_string());
        let title = string_property(feature, "title").unwrap_or_else(|| id.clone());

        Some(Self {
            id,
            title,
            polygons,
            selected: false,
        })
    }
}

/// Parses the geometry resource of a region. The resource may hold a feature collection, a
/// single feature, or a bare geometry.
pub fn regions_from_geojson_str(region_id: &str, s: &str) -> Result<Vec<Region>, RegionError> {
    let features = match s.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            geometry: Some(geometry),
            ..Default::default()
        }],
    };

    let regions: Vec<Region> = features
        .iter()
        .filter_map(|feature| Region::from_feature(feature, region_id))
        .collect();

    if regions.is_empty() {
        return Err(RegionError::NoPolygons(region_id.to_string()));
    }
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLAND: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"id": "poland", "title": "Poland"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[14.0, 49.0], [24.0, 49.0], [24.0, 55.0], [14.0, 55.0], [14.0, 49.0]]]
            }
        }]
    }"#;

    #[test]
    fn parses_feature_collection() {
        let regions = regions_from_geojson_str("poland", POLAND).unwrap();
        assert_eq!(regions.len(), 1);

        let region = &regions[0];
        assert_eq!(region.id, "poland");
        assert_eq!(region.title, "Poland");
        assert!(!region.selected);
        assert_eq!(region.polygons.len(), 1);
        // The closing point is dropped.
        assert_eq!(region.polygons[0][0].len(), 4);
    }

    #[test]
    fn falls_back_to_requested_id() {
        let geometry = r#"{
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]],
                 [[5.2, 5.1], [5.8, 5.1], [5.8, 5.7], [5.2, 5.1]]]
            ]
        }"#;

        let regions = regions_from_geojson_str("moldova", geometry).unwrap();
        assert_eq!(regions[0].id, "moldova");
        assert_eq!(regions[0].title, "moldova");
        assert_eq!(regions[0].polygons.len(), 2);
        assert_eq!(regions[0].polygons[1].len(), 2, "outline and hole");
    }

    #[test]
    fn rejects_resources_without_polygons() {
        let point = r#"{"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}"#;
        assert!(matches!(
            regions_from_geojson_str("point", point),
            Err(RegionError::NoPolygons(id)) if id == "point"
        ));

        assert!(matches!(
            regions_from_geojson_str("broken", "{ not json"),
            Err(RegionError::InvalidGeoJson(_))
        ));
    }
}

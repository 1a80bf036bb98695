use std::collections::HashMap;

use geo::{BoundingRect, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;
use crate::vatspy::types::{Boundaries, Point};

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

fn string_prop(props: &serde_json::Map<String, Value>, key: &str) -> String {
    match props.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Parses a GeoJSON FeatureCollection, keeping MultiPolygon features only.
/// For each polygon only the outer ring is retained; coordinates that are
/// not `[lng, lat]` pairs are skipped.
pub fn parse_boundaries(raw: &[u8]) -> Result<HashMap<String, Boundaries>, Error> {
    let fc: FeatureCollection = serde_json::from_slice(raw)?;

    let mut all = HashMap::new();
    for feature in fc.features {
        let geometry = match feature.geometry {
            Some(g) if g.kind == "MultiPolygon" => g,
            _ => continue,
        };

        let polygons: Vec<Vec<Vec<f64>>> = serde_json::from_value(geometry.coordinates)
            .map(strip_inner_rings)?;

        let mut bounds = Boundaries::default();
        for outer_ring in polygons {
            let mut ring = Vec::with_capacity(outer_ring.len());
            for coords in outer_ring {
                if coords.len() != 2 {
                    continue;
                }
                ring.push(Point {
                    lng: coords[0],
                    lat: coords[1],
                });
            }
            bounds.points.push(ring);
        }

        let shape = MultiPolygon::new(
            bounds
                .points
                .iter()
                .map(|ring| {
                    Polygon::new(
                        LineString::from(
                            ring.iter().map(|p| (p.lng, p.lat)).collect::<Vec<_>>(),
                        ),
                        vec![],
                    )
                })
                .collect(),
        );
        if let Some(rect) = shape.bounding_rect() {
            bounds.min = Point {
                lat: rect.min().y,
                lng: rect.min().x,
            };
            bounds.max = Point {
                lat: rect.max().y,
                lng: rect.max().x,
            };
            bounds.center = Point {
                lat: rect.center().y,
                lng: rect.center().x,
            };
        }

        bounds.id = string_prop(&feature.properties, "id");
        bounds.region = string_prop(&feature.properties, "region");
        bounds.division = string_prop(&feature.properties, "division");
        bounds.is_oceanic = string_prop(&feature.properties, "oceanic") == "1";
        all.insert(bounds.id.clone(), bounds);
    }

    Ok(all)
}

// MultiPolygon coordinates are polygon -> ring -> position; only the first
// (outer) ring of each polygon survives.
fn strip_inner_rings(polygons: Vec<Vec<Vec<Vec<f64>>>>) -> Vec<Vec<Vec<f64>>> {
    polygons
        .into_iter()
        .filter_map(|mut rings| {
            if rings.is_empty() {
                None
            } else {
                Some(rings.swap_remove(0))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"id": "EDWW", "region": "EMEA", "division": "GER", "oceanic": "0"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [
                            [[7.0, 52.0], [11.0, 52.0], [11.0, 55.0], [7.0, 55.0], [7.0, 52.0]],
                            [[8.0, 53.0], [9.0, 53.0], [9.0, 54.0], [8.0, 53.0]]
                        ]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {"id": "CZQO", "oceanic": "1"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[-50.0, 45.0], [-40.0, 45.0], [-40.0, 50.0], [-50.0, 45.0]]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"id": "POINTY"},
                "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}
            }
        ]
    }"#;

    #[test]
    fn keeps_multipolygons_only() {
        let bounds = parse_boundaries(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bounds.len(), 2);
        assert!(bounds.contains_key("EDWW"));
        assert!(bounds.contains_key("CZQO"));
    }

    #[test]
    fn retains_outer_ring_only() {
        let bounds = parse_boundaries(SAMPLE.as_bytes()).unwrap();
        let edww = &bounds["EDWW"];
        assert_eq!(edww.points.len(), 1);
        assert_eq!(edww.points[0].len(), 5);
    }

    #[test]
    fn computes_bounding_box_and_center() {
        let bounds = parse_boundaries(SAMPLE.as_bytes()).unwrap();
        let edww = &bounds["EDWW"];
        assert_eq!(edww.min, Point { lat: 52.0, lng: 7.0 });
        assert_eq!(edww.max, Point { lat: 55.0, lng: 11.0 });
        assert_eq!(edww.center, Point { lat: 53.5, lng: 9.0 });
    }

    #[test]
    fn reads_string_properties() {
        let bounds = parse_boundaries(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bounds["EDWW"].region, "EMEA");
        assert_eq!(bounds["EDWW"].division, "GER");
        assert!(!bounds["EDWW"].is_oceanic);
        assert!(bounds["CZQO"].is_oceanic);
    }

    #[test]
    fn skips_malformed_coordinates() {
        let raw = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"id": "X"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[1.0, 2.0], [3.0], [4.0, 5.0], [1.0, 2.0]]]]
                }
            }]
        }"#;
        let bounds = parse_boundaries(raw.as_bytes()).unwrap();
        assert_eq!(bounds["X"].points[0].len(), 3);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_boundaries(b"{not json").is_err());
    }
}

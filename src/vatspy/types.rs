use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

/// Polygon set attached to a FIR. Only outer rings are carried; the bounding
/// box and its center are precomputed at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    pub id: String,
    pub is_oceanic: bool,
    pub region: String,
    pub division: String,
    pub min: Point,
    pub max: Point,
    pub center: Point,
    pub points: Vec<Vec<Point>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub prefix: String,
    pub control_custom_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportMeta {
    pub icao: String,
    pub name: String,
    pub position: Point,
    pub iata: String,
    pub fir_id: String,
    pub is_pseudo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fir {
    pub id: String,
    pub name: String,
    pub prefix: String,
    pub parent_id: String,
    pub boundaries: Boundaries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uir {
    pub id: String,
    pub name: String,
    pub fir_ids: Vec<String>,
}

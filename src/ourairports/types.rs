use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Runway {
    pub icao: String,
    pub ident: String,
    pub length_ft: i32,
    pub width_ft: i32,
    pub surface: String,
    pub lighted: bool,
    pub closed: bool,
    pub lat: f64,
    pub lng: f64,
    pub elevation_ft: i32,
    pub heading_deg: f64,
    pub active_to: bool,
    pub active_lnd: bool,
}

impl Runway {
    /// Physical identity, ignoring the activity flags the merger maintains.
    pub fn same_definition(&self, other: &Runway) -> bool {
        self.icao == other.icao
            && self.ident == other.ident
            && self.length_ft == other.length_ft
            && self.width_ft == other.width_ft
            && self.surface == other.surface
            && self.lighted == other.lighted
            && self.closed == other.closed
            && self.lat == other.lat
            && self.lng == other.lng
            && self.elevation_ft == other.elevation_ft
            && self.heading_deg == other.heading_deg
    }
}

/// One CSV row of the runway reference file. Column names follow the
/// OurAirports header; rows with missing numeric fields fail to deserialize
/// and are skipped by the provider.
#[derive(Debug, Deserialize)]
pub struct RunwayRecord {
    pub airport_ident: String,
    pub length_ft: i32,
    pub width_ft: i32,
    pub surface: String,
    pub lighted: u8,
    pub closed: u8,
    pub le_ident: String,
    pub le_latitude_deg: f64,
    pub le_longitude_deg: f64,
    pub le_elevation_ft: i32,
    #[serde(rename = "le_heading_degT")]
    pub le_heading_deg: f64,
    pub he_ident: String,
    pub he_latitude_deg: f64,
    pub he_longitude_deg: f64,
    pub he_elevation_ft: i32,
    #[serde(rename = "he_heading_degT")]
    pub he_heading_deg: f64,
}

impl RunwayRecord {
    /// Splits the row into its low-end and high-end runway entries.
    pub fn into_endpoints(self) -> (Runway, Runway) {
        let low = Runway {
            icao: self.airport_ident.clone(),
            ident: self.le_ident,
            length_ft: self.length_ft,
            width_ft: self.width_ft,
            surface: self.surface.clone(),
            lighted: self.lighted != 0,
            closed: self.closed != 0,
            lat: self.le_latitude_deg,
            lng: self.le_longitude_deg,
            elevation_ft: self.le_elevation_ft,
            heading_deg: self.le_heading_deg,
            active_to: false,
            active_lnd: false,
        };
        let high = Runway {
            icao: self.airport_ident,
            ident: self.he_ident,
            length_ft: low.length_ft,
            width_ft: low.width_ft,
            surface: self.surface,
            lighted: low.lighted,
            closed: low.closed,
            lat: self.he_latitude_deg,
            lng: self.he_longitude_deg,
            elevation_ft: self.he_elevation_ft,
            heading_deg: self.he_heading_deg,
            active_to: false,
            active_lnd: false,
        };
        (low, high)
    }
}

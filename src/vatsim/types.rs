use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const FACILITY_ATIS: i32 = 1;
pub const FACILITY_DELIVERY: i32 = 2;
pub const FACILITY_GROUND: i32 = 3;
pub const FACILITY_TOWER: i32 = 4;
pub const FACILITY_APPROACH: i32 = 5;
pub const FACILITY_RADAR: i32 = 6;

const DATE_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";
const MIN_FREQUENCY: f64 = 110.0;
const MAX_FREQUENCY: f64 = 140.0;

#[derive(Debug, Clone, Serialize)]
pub struct Controller {
    pub cid: u32,
    pub name: String,
    pub callsign: String,
    pub frequency: f64,
    pub facility: i32,
    pub rating: i32,
    pub server: String,
    pub visual_range: i32,
    pub atis_code: String,
    pub text_atis: String,
    pub logon_time: NaiveDateTime,
    pub last_updated: NaiveDateTime,
    pub human_readable: String,
}

// last_updated moves on every snapshot and human_readable is stamped by the
// merger, so neither participates in change detection
impl PartialEq for Controller {
    fn eq(&self, other: &Self) -> bool {
        self.cid == other.cid
            && self.name == other.name
            && self.callsign == other.callsign
            && self.frequency == other.frequency
            && self.facility == other.facility
            && self.rating == other.rating
            && self.server == other.server
            && self.visual_range == other.visual_range
            && self.atis_code == other.atis_code
            && self.text_atis == other.text_atis
            && self.logon_time == other.logon_time
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pilot {
    pub cid: u32,
    pub name: String,
    pub callsign: String,
    pub server: String,
    pub pilot_rating: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: i32,
    pub groundspeed: i32,
    pub transponder: String,
    pub heading: i32,
    pub qnh_i_hg: f64,
    pub qnh_mb: i32,
    pub flight_plan: Option<FlightPlan>,
    pub logon_time: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

impl PartialEq for Pilot {
    fn eq(&self, other: &Self) -> bool {
        self.cid == other.cid
            && self.name == other.name
            && self.callsign == other.callsign
            && self.server == other.server
            && self.pilot_rating == other.pilot_rating
            && self.latitude == other.latitude
            && self.longitude == other.longitude
            && self.altitude == other.altitude
            && self.groundspeed == other.groundspeed
            && self.transponder == other.transponder
            && self.heading == other.heading
            && self.qnh_i_hg == other.qnh_i_hg
            && self.qnh_mb == other.qnh_mb
            && self.flight_plan == other.flight_plan
            && self.logon_time == other.logon_time
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightPlan {
    pub flight_rules: String,
    pub aircraft: String,
    pub aircraft_faa: String,
    pub aircraft_short: String,
    pub departure: String,
    pub arrival: String,
    pub alternate: String,
    pub cruise_tas: String,
    pub altitude: String,
    pub deptime: String,
    pub enroute_time: String,
    pub fuel_time: String,
    pub remarks: String,
    pub route: String,
    pub revision_id: i32,
    pub assigned_transponder: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawData {
    #[serde(default)]
    pub controllers: Vec<RawController>,
    #[serde(default)]
    pub atis: Vec<RawController>,
    #[serde(default)]
    pub pilots: Vec<RawPilot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawController {
    pub cid: u32,
    pub name: String,
    pub callsign: String,
    pub frequency: String,
    pub facility: i32,
    pub rating: i32,
    pub server: String,
    pub visual_range: i32,
    #[serde(default)]
    pub atis_code: Option<String>,
    #[serde(default)]
    pub text_atis: Option<Vec<String>>,
    pub logon_time: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPilot {
    pub cid: u32,
    pub name: String,
    pub callsign: String,
    pub server: String,
    pub pilot_rating: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: i32,
    pub groundspeed: i32,
    pub transponder: String,
    pub heading: i32,
    pub qnh_i_hg: f64,
    pub qnh_mb: i32,
    #[serde(default)]
    pub flight_plan: Option<FlightPlan>,
    pub logon_time: String,
    pub last_updated: String,
}

fn parse_frequency(frequency: &str) -> Result<f64, Error> {
    let freq: f64 = frequency
        .parse()
        .map_err(|_| Error::InvalidEntry(format!("invalid frequency '{}'", frequency)))?;
    if freq < MIN_FREQUENCY || freq > MAX_FREQUENCY {
        return Err(Error::InvalidEntry(format!(
            "frequency out of bounds {}",
            freq
        )));
    }
    Ok(freq)
}

// timestamps arrive with sub-second precision; only the first 19 chars count
fn parse_timestamp(value: &str) -> Result<NaiveDateTime, Error> {
    let head = value
        .get(..19)
        .ok_or_else(|| Error::InvalidEntry(format!("timestamp too short '{}'", value)))?;
    NaiveDateTime::parse_from_str(head, DATE_LAYOUT)
        .map_err(|_| Error::InvalidEntry(format!("invalid timestamp '{}'", value)))
}

pub fn make_controller(raw: &RawController) -> Result<Controller, Error> {
    let frequency = parse_frequency(&raw.frequency)?;
    let logon_time = parse_timestamp(&raw.logon_time)?;
    let last_updated = parse_timestamp(&raw.last_updated)?;

    let postfix = raw.callsign.rsplit('_').next().unwrap_or("");
    if postfix == "SUP" || postfix == "OBS" {
        return Err(Error::InvalidEntry("SUP or OBS callsign".to_string()));
    }

    let text_atis = match &raw.text_atis {
        Some(lines) => lines.join("\n"),
        None => String::new(),
    };
    if text_atis.to_lowercase().contains("supervisor") {
        return Err(Error::InvalidEntry("supervisor in atis text".to_string()));
    }

    Ok(Controller {
        cid: raw.cid,
        name: raw.name.clone(),
        callsign: raw.callsign.clone(),
        frequency,
        facility: raw.facility,
        rating: raw.rating,
        server: raw.server.clone(),
        visual_range: raw.visual_range,
        atis_code: raw.atis_code.clone().unwrap_or_default(),
        text_atis,
        logon_time,
        last_updated,
        human_readable: String::new(),
    })
}

pub fn make_pilot(raw: &RawPilot) -> Result<Pilot, Error> {
    let logon_time = parse_timestamp(&raw.logon_time)?;
    let last_updated = parse_timestamp(&raw.last_updated)?;

    Ok(Pilot {
        cid: raw.cid,
        name: raw.name.clone(),
        callsign: raw.callsign.clone(),
        server: raw.server.clone(),
        pilot_rating: raw.pilot_rating,
        latitude: raw.latitude,
        longitude: raw.longitude,
        altitude: raw.altitude,
        groundspeed: raw.groundspeed,
        transponder: raw.transponder.clone(),
        heading: raw.heading,
        qnh_i_hg: raw.qnh_i_hg,
        qnh_mb: raw.qnh_mb,
        flight_plan: raw.flight_plan.clone(),
        logon_time,
        last_updated,
    })
}

use std::collections::HashMap;

use serde::Serialize;

use crate::merged::atis::{detect_arrival_runways, detect_departure_runways};
use crate::ourairports::types::Runway;
use crate::vatsim::types::Controller;
use crate::vatspy::types::{AirportMeta, Fir};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControllerSet {
    pub atis: Option<Controller>,
    pub delivery: Option<Controller>,
    pub ground: Option<Controller>,
    pub tower: Option<Controller>,
    pub approach: Option<Controller>,
}

impl ControllerSet {
    pub fn is_empty(&self) -> bool {
        self.atis.is_none()
            && self.delivery.is_none()
            && self.ground.is_none()
            && self.tower.is_none()
            && self.approach.is_none()
    }
}

/// An airport enriched with its attached controllers and runway activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    pub meta: AirportMeta,
    pub controllers: ControllerSet,
    pub runways: HashMap<String, Runway>,
}

impl Airport {
    pub fn new(meta: AirportMeta) -> Self {
        Self {
            meta,
            controllers: ControllerSet::default(),
            runways: HashMap::new(),
        }
    }

    pub fn is_controlled(&self) -> bool {
        !self.controllers.is_empty()
    }

    /// Recomputes runway activity from the current ATIS transcript. Without
    /// an ATIS station every flag is false.
    pub fn set_active_runways(&mut self) {
        let atis = match &self.controllers.atis {
            Some(atis) => atis,
            None => {
                for runway in self.runways.values_mut() {
                    runway.active_to = false;
                    runway.active_lnd = false;
                }
                return;
            }
        };

        let arrivals = detect_arrival_runways(&atis.text_atis);
        for (ident, runway) in self.runways.iter_mut() {
            runway.active_lnd = arrivals.contains(ident);
        }

        let departures = detect_departure_runways(&atis.text_atis);
        for (ident, runway) in self.runways.iter_mut() {
            runway.active_to = departures.contains(ident);
        }
    }
}

/// An en-route controller bound to the FIR polygons it covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Radar {
    pub controller: Controller,
    pub firs: HashMap<String, Fir>,
}

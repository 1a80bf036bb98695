pub mod atis;
pub mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::config::MergedConfig;
use crate::error::Error;
use crate::ourairports::types::Runway;
use crate::ourairports::OurairportsProvider;
use crate::pubsub::{Bus, Object, Subscription, Update};
use crate::vatsim::types::{
    Controller, Pilot, FACILITY_APPROACH, FACILITY_ATIS, FACILITY_DELIVERY, FACILITY_GROUND,
    FACILITY_RADAR, FACILITY_TOWER,
};
use crate::vatsim::VatsimProvider;
use crate::vatspy::types::{AirportMeta, Country, Fir, Uir};
use crate::vatspy::VatspyProvider;
use types::{Airport, Radar};

// sized so the initial bulk replay from the upstream providers never
// overflows while the merger is busy
const UPSTREAM_BACKLOG: usize = 32768;

const DEFAULT_CONTROL_NAME: &str = "Centre";

#[derive(Default)]
struct State {
    airports: HashMap<String, Airport>,
    airports_iata: HashMap<String, Airport>,
    radars: HashMap<String, Radar>,
    pilots: HashMap<String, Pilot>,

    countries: HashMap<String, Country>,
    firs: HashMap<String, Fir>,
    firs_prefix: HashMap<String, Fir>,
    uirs: HashMap<String, Uir>,
}

impl State {
    fn find_airport(&self, prefix: &str) -> Option<&Airport> {
        self.airports
            .get(prefix)
            .or_else(|| self.airports_iata.get(prefix))
    }

    fn find_fir(&self, id: &str) -> Option<&Fir> {
        self.firs.get(id).or_else(|| self.firs_prefix.get(id))
    }

    /// Airports live in both indices; every mutation goes through here so
    /// the copies stay in sync.
    fn store_airport(&mut self, airport: Airport) {
        if !airport.meta.iata.is_empty() {
            self.airports_iata
                .insert(airport.meta.iata.clone(), airport.clone());
        }
        self.airports.insert(airport.meta.icao.clone(), airport);
    }

    // only drops the IATA entry if it still points at this airport, so an
    // IATA collision never unlinks the surviving airport
    fn unlink_iata(&mut self, airport: &Airport) {
        let iata = &airport.meta.iata;
        if iata.is_empty() {
            return;
        }
        let still_ours = self
            .airports_iata
            .get(iata)
            .map(|a| a.meta.icao == airport.meta.icao)
            .unwrap_or(false);
        if still_ours {
            self.airports_iata.remove(iata);
        }
    }
}

/// Joins the three upstream feeds into Airport, Radar and Pilot events on a
/// single thread. The static provider runs first; dynamic and runway data
/// are only consumed once the initial reference snapshot is complete.
pub struct MergedProvider {
    cfg: MergedConfig,
    bus: Bus,
    state: Arc<RwLock<State>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    stopped: Arc<AtomicBool>,
}

impl MergedProvider {
    pub fn new(cfg: MergedConfig) -> Self {
        let bus = Bus::new();
        let state = Arc::new(RwLock::new(State::default()));
        let (stop_tx, stop_rx) = bounded(1);

        let replay_state = state.clone();
        bus.set_initial_notifier(move |sub| {
            let state = replay_state.read().unwrap();
            for airport in state.airports.values() {
                sub.send(Update::Set(Object::Airport(airport.clone())));
            }
            for pilot in state.pilots.values() {
                sub.send(Update::Set(Object::MergedPilot(pilot.clone())));
            }
            for radar in state.radars.values() {
                sub.send(Update::Set(Object::Radar(radar.clone())));
            }
        });

        Self {
            cfg,
            bus,
            state,
            stop_tx,
            stop_rx,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self, capacity: usize) -> Subscription {
        self.bus.subscribe(capacity)
    }

    pub fn unsubscribe(&self, sub: &Subscription) {
        self.bus.unsubscribe(sub);
    }

    /// Boots the static provider (fatal on failure) and spawns the merge
    /// loop. The dynamic and runway providers are started from the loop once
    /// the static provider publishes its first fin.
    pub fn start(&self) -> Result<(), Error> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(Error::AlreadyStopped);
        }

        let statics = VatspyProvider::new(self.cfg.data.clone());
        let ssub = statics.subscribe(UPSTREAM_BACKLOG);
        statics.start()?;

        let dynamics = VatsimProvider::new(self.cfg.api.clone());
        let dsub = dynamics.subscribe(UPSTREAM_BACKLOG);

        let runways = OurairportsProvider::new(self.cfg.runways.clone());
        let rsub = runways.subscribe(UPSTREAM_BACKLOG);

        let bus = self.bus.clone();
        let state = self.state.clone();
        let stop_rx = self.stop_rx.clone();
        let stopped = self.stopped.clone();

        thread::spawn(move || {
            let mut dynamics_started = false;

            loop {
                select! {
                    recv(ssub.receiver()) -> msg => match msg {
                        Ok(Update::Fin) => {
                            if !dynamics_started {
                                info!("Initial static data ready, starting dynamic providers");
                                bus.set_data_ready(true);
                                if let Err(e) = dynamics.start() {
                                    error!("Error starting network-state provider: {:?}", e);
                                    break;
                                }
                                if let Err(e) = runways.start() {
                                    error!("Error starting runway provider: {:?}", e);
                                    break;
                                }
                                dynamics_started = true;
                            }
                        }
                        Ok(update) => handle_static_update(&bus, &state, update),
                        Err(_) => break,
                    },
                    recv(dsub.receiver()) -> msg => match msg {
                        // end of a dynamic snapshot pass, forward the barrier
                        Ok(Update::Fin) => bus.fin(),
                        Ok(update) => handle_dynamic_update(&bus, &state, update),
                        Err(_) => break,
                    },
                    recv(rsub.receiver()) -> msg => match msg {
                        Ok(update) => handle_runway_update(&bus, &state, update),
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => break,
                }
            }

            stopped.store(true, Ordering::SeqCst);
            statics.stop();
            if dynamics_started {
                dynamics.stop();
                runways.stop();
            }
            bus.dispose();
        });

        Ok(())
    }

    pub fn stop(&self) {
        self.stop_tx.try_send(()).ok();
    }
}

fn handle_static_update(bus: &Bus, state: &Arc<RwLock<State>>, update: Update) {
    match update {
        Update::Set(Object::Country(country)) => {
            debug!("Setting country {}", country.prefix);
            let mut state = state.write().unwrap();
            state.countries.insert(country.prefix.clone(), country);
        }
        Update::Delete(Object::Country(country)) => {
            let mut state = state.write().unwrap();
            state.countries.remove(&country.prefix);
        }
        Update::Set(Object::Fir(fir)) => {
            debug!("Setting fir {}", fir.id);
            let mut state = state.write().unwrap();
            state.firs_prefix.insert(fir.prefix.clone(), fir.clone());
            state.firs.insert(fir.id.clone(), fir);
        }
        Update::Delete(Object::Fir(fir)) => {
            let mut state = state.write().unwrap();
            if let Some(existing) = state.firs.remove(&fir.id) {
                state.firs_prefix.remove(&existing.prefix);
            }
        }
        Update::Set(Object::Uir(uir)) => {
            debug!("Setting uir {}", uir.id);
            let mut state = state.write().unwrap();
            state.uirs.insert(uir.id.clone(), uir);
        }
        Update::Delete(Object::Uir(uir)) => {
            let mut state = state.write().unwrap();
            state.uirs.remove(&uir.id);
        }
        Update::Set(Object::AirportMeta(meta)) => set_airport(bus, state, meta),
        Update::Delete(Object::AirportMeta(meta)) => delete_airport(bus, state, meta),
        other => warn!("Unexpected update from static provider: {:?}", other),
    }
}

fn handle_dynamic_update(bus: &Bus, state: &Arc<RwLock<State>>, update: Update) {
    match update {
        Update::Set(Object::Controller(ctrl)) => set_controller(bus, state, ctrl),
        Update::Delete(Object::Controller(ctrl)) => delete_controller(bus, state, ctrl),
        Update::Set(Object::Pilot(pilot)) => set_pilot(bus, state, pilot),
        Update::Delete(Object::Pilot(pilot)) => delete_pilot(bus, state, pilot),
        other => warn!("Unexpected update from dynamic provider: {:?}", other),
    }
}

fn handle_runway_update(bus: &Bus, state: &Arc<RwLock<State>>, update: Update) {
    match update {
        Update::Set(Object::Runway(runway)) => set_runway(bus, state, runway),
        other => warn!("Unexpected update from runway provider: {:?}", other),
    }
}

fn set_airport(bus: &Bus, state: &Arc<RwLock<State>>, meta: AirportMeta) {
    debug!("Setting airport {}", meta.icao);
    let mut state = state.write().unwrap();

    let airport = match state.airports.remove(&meta.icao) {
        Some(mut existing) => {
            // keep controllers and runways, swap the reference data
            state.unlink_iata(&existing);
            existing.meta = meta;
            existing
        }
        None => Airport::new(meta),
    };

    state.store_airport(airport.clone());
    drop(state);
    bus.notify(Update::Set(Object::Airport(airport)));
}

fn delete_airport(bus: &Bus, state: &Arc<RwLock<State>>, meta: AirportMeta) {
    debug!("Deleting airport {}", meta.icao);
    let mut state = state.write().unwrap();

    if let Some(existing) = state.airports.remove(&meta.icao) {
        state.unlink_iata(&existing);
        drop(state);
        bus.notify(Update::Delete(Object::Airport(existing)));
    }
}

fn set_runway(bus: &Bus, state: &Arc<RwLock<State>>, mut runway: Runway) {
    let mut state = state.write().unwrap();

    // runway rows can arrive before the owning airport; they reappear on
    // the next reference pass
    let mut airport = match state.airports.get(&runway.icao) {
        Some(airport) => airport.clone(),
        None => return,
    };

    match airport.runways.get(&runway.ident) {
        Some(existing) => {
            if existing.same_definition(&runway) {
                return;
            }
            runway.active_to = existing.active_to;
            runway.active_lnd = existing.active_lnd;
            airport.runways.insert(runway.ident.clone(), runway);
        }
        None => {
            airport.runways.insert(runway.ident.clone(), runway);
            airport.set_active_runways();
        }
    }

    state.store_airport(airport.clone());
    drop(state);
    bus.notify(Update::Set(Object::Airport(airport)));
}

fn slot_name(facility: i32) -> &'static str {
    match facility {
        FACILITY_ATIS => "ATIS",
        FACILITY_DELIVERY => "Delivery",
        FACILITY_GROUND => "Ground",
        FACILITY_TOWER => "Tower",
        FACILITY_APPROACH => "Approach",
        _ => "",
    }
}

fn callsign_prefix(callsign: &str) -> &str {
    callsign.split('_').next().unwrap_or("")
}

fn set_controller(bus: &Bus, state: &Arc<RwLock<State>>, ctrl: Controller) {
    match ctrl.facility {
        0 => debug!("Skipping controller {} with facility=0", ctrl.callsign),
        FACILITY_ATIS..=FACILITY_APPROACH => set_airport_controller(bus, state, ctrl),
        FACILITY_RADAR => set_radar(bus, state, ctrl),
        other => error!("Invalid facility {} for {}", other, ctrl.callsign),
    }
}

fn set_airport_controller(bus: &Bus, state: &Arc<RwLock<State>>, mut ctrl: Controller) {
    let prefix = callsign_prefix(&ctrl.callsign).to_string();
    let mut state = state.write().unwrap();

    let mut airport = match state.find_airport(&prefix) {
        Some(airport) => airport.clone(),
        None => {
            warn!("Can't find airport for controller {}", ctrl.callsign);
            return;
        }
    };

    let facility = ctrl.facility;
    ctrl.human_readable = format!("{} {}", airport.meta.name, slot_name(facility));

    match facility {
        FACILITY_ATIS => airport.controllers.atis = Some(ctrl),
        FACILITY_DELIVERY => airport.controllers.delivery = Some(ctrl),
        FACILITY_GROUND => airport.controllers.ground = Some(ctrl),
        FACILITY_TOWER => airport.controllers.tower = Some(ctrl),
        FACILITY_APPROACH => airport.controllers.approach = Some(ctrl),
        _ => unreachable!(),
    }

    if facility == FACILITY_ATIS {
        airport.set_active_runways();
    }

    state.store_airport(airport.clone());
    drop(state);
    bus.notify(Update::Set(Object::Airport(airport)));
}

fn set_radar(bus: &Bus, state: &Arc<RwLock<State>>, mut ctrl: Controller) {
    let prefix = callsign_prefix(&ctrl.callsign).to_string();
    let mut state = state.write().unwrap();

    let mut firs = HashMap::new();
    let mut model: Option<Fir> = None;

    if let Some(fir) = state.find_fir(&prefix) {
        model = Some(fir.clone());
        firs.insert(fir.id.clone(), fir.clone());
    } else if let Some(uir) = state.uirs.get(&prefix).cloned() {
        for fir_id in &uir.fir_ids {
            match state.find_fir(fir_id) {
                Some(fir) => {
                    if model.is_none() {
                        model = Some(fir.clone());
                    }
                    firs.insert(fir.id.clone(), fir.clone());
                }
                None => warn!("Can't find FIR {} provided by UIR {}", fir_id, uir.id),
            }
        }
    }

    let model = match model {
        Some(model) => model,
        None => {
            warn!("Can't find FIR or UIR for radar {}", ctrl.callsign);
            return;
        }
    };

    let mut control_name = DEFAULT_CONTROL_NAME.to_string();
    if let Some(country_prefix) = model.id.get(..2) {
        if let Some(country) = state.countries.get(country_prefix) {
            if !country.control_custom_name.is_empty() {
                control_name = country.control_custom_name.clone();
            }
        }
    }

    ctrl.human_readable = format!("{} {}", model.name, control_name);

    let radar = Radar {
        controller: ctrl,
        firs,
    };
    state
        .radars
        .insert(radar.controller.callsign.clone(), radar.clone());
    drop(state);
    bus.notify(Update::Set(Object::Radar(radar)));
}

fn delete_controller(bus: &Bus, state: &Arc<RwLock<State>>, ctrl: Controller) {
    match ctrl.facility {
        0 => debug!("Skipping controller {} with facility=0", ctrl.callsign),
        FACILITY_ATIS..=FACILITY_APPROACH => delete_airport_controller(bus, state, ctrl),
        FACILITY_RADAR => delete_radar(bus, state, ctrl),
        other => error!("Invalid facility {} for {}", other, ctrl.callsign),
    }
}

fn delete_airport_controller(bus: &Bus, state: &Arc<RwLock<State>>, ctrl: Controller) {
    let prefix = callsign_prefix(&ctrl.callsign).to_string();
    let mut state = state.write().unwrap();

    let mut airport = match state.find_airport(&prefix) {
        Some(airport) => airport.clone(),
        None => {
            warn!("Can't find airport for controller {}", ctrl.callsign);
            return;
        }
    };

    match ctrl.facility {
        FACILITY_ATIS => airport.controllers.atis = None,
        FACILITY_DELIVERY => airport.controllers.delivery = None,
        FACILITY_GROUND => airport.controllers.ground = None,
        FACILITY_TOWER => airport.controllers.tower = None,
        FACILITY_APPROACH => airport.controllers.approach = None,
        _ => unreachable!(),
    }

    if ctrl.facility == FACILITY_ATIS {
        airport.set_active_runways();
    }

    state.store_airport(airport.clone());
    drop(state);
    // the airport survives its controller, so this goes out as a set
    bus.notify(Update::Set(Object::Airport(airport)));
}

fn delete_radar(bus: &Bus, state: &Arc<RwLock<State>>, ctrl: Controller) {
    let mut state = state.write().unwrap();
    if let Some(radar) = state.radars.remove(&ctrl.callsign) {
        drop(state);
        bus.notify(Update::Delete(Object::Radar(radar)));
    }
}

fn set_pilot(bus: &Bus, state: &Arc<RwLock<State>>, pilot: Pilot) {
    let mut state = state.write().unwrap();
    state.pilots.insert(pilot.callsign.clone(), pilot.clone());
    drop(state);
    bus.notify(Update::Set(Object::MergedPilot(pilot)));
}

fn delete_pilot(bus: &Bus, state: &Arc<RwLock<State>>, pilot: Pilot) {
    let mut state = state.write().unwrap();
    if let Some(existing) = state.pilots.remove(&pilot.callsign) {
        drop(state);
        bus.notify(Update::Delete(Object::MergedPilot(existing)));
    }
}

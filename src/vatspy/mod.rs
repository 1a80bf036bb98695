mod boundaries;
mod parser;
pub mod types;

pub use boundaries::parse_boundaries;
pub use parser::{parse_data, DataSnapshot};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::{error, info};

use crate::config::VatspyConfig;
use crate::diff::apply_snapshot;
use crate::error::Error;
use crate::fetcher::Fetcher;
use crate::pubsub::{make_updates, Bus, Object, Subscription, Update};
use types::{AirportMeta, Boundaries, Country, Fir, Uir};

#[derive(Default)]
struct State {
    boundaries: HashMap<String, Boundaries>,
    countries: HashMap<String, Country>,
    airports: HashMap<String, AirportMeta>,
    firs: HashMap<String, Fir>,
    uirs: HashMap<String, Uir>,
}

/// Slow-moving reference data: countries, airports, FIRs and UIRs from the
/// pipe-delimited data file, with FIR polygons attached from the boundary
/// GeoJSON. Boundaries are fetched and parsed before the first data parse;
/// they are never published themselves and only shape FIR snapshots.
pub struct VatspyProvider {
    cfg: VatspyConfig,
    bus: Bus,
    state: Arc<RwLock<State>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    stopped: Arc<AtomicBool>,
}

impl VatspyProvider {
    pub fn new(cfg: VatspyConfig) -> Self {
        let bus = Bus::new();
        let state = Arc::new(RwLock::new(State::default()));
        let (stop_tx, stop_rx) = bounded(1);

        let replay_state = state.clone();
        bus.set_initial_notifier(move |sub| {
            let state = replay_state.read().unwrap();
            for country in state.countries.values() {
                sub.send(Update::Set(Object::Country(country.clone())));
            }
            for airport in state.airports.values() {
                sub.send(Update::Set(Object::AirportMeta(airport.clone())));
            }
            for fir in state.firs.values() {
                sub.send(Update::Set(Object::Fir(fir.clone())));
            }
            for uir in state.uirs.values() {
                sub.send(Update::Set(Object::Uir(uir.clone())));
            }
            sub.fin();
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

    /// Boots both fetchers and performs the first boundary parse before
    /// returning; a failure here is fatal for the caller. Subsequent parse
    /// errors only discard the snapshot in question.
    pub fn start(&self) -> Result<(), Error> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(Error::AlreadyStopped);
        }

        let boundary_fetcher = Fetcher::new(
            &self.cfg.boundaries_url,
            &self.cfg.poll,
            &self.cfg.boot,
        );
        let data_fetcher = Fetcher::new(&self.cfg.data_url, &self.cfg.poll, &self.cfg.boot);

        let boundary_rx = boundary_fetcher.payloads();
        let data_rx = data_fetcher.payloads();

        boundary_fetcher.start()?;
        let raw = boundary_rx
            .recv()
            .map_err(|_| Error::BootFailed(self.cfg.boundaries_url.clone()))?;
        let bounds = parse_boundaries(&raw)?;
        info!("Parsed {} boundary features", bounds.len());
        self.state.write().unwrap().boundaries = bounds;

        data_fetcher.start()?;

        let bus = self.bus.clone();
        let state = self.state.clone();
        let stop_rx = self.stop_rx.clone();
        let stopped = self.stopped.clone();

        thread::spawn(move || {
            loop {
                select! {
                    recv(data_rx) -> msg => match msg {
                        Ok(raw) => {
                            if let Err(e) = handle_data(&bus, &state, &raw) {
                                error!("Error parsing data file: {:?}", e);
                            }
                        }
                        Err(_) => break,
                    },
                    recv(boundary_rx) -> msg => match msg {
                        Ok(raw) => match parse_boundaries(&raw) {
                            Ok(bounds) => state.write().unwrap().boundaries = bounds,
                            Err(e) => error!("Error parsing boundaries: {:?}", e),
                        },
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => break,
                }
            }
            stopped.store(true, Ordering::SeqCst);
            boundary_fetcher.stop();
            data_fetcher.stop();
            bus.dispose();
        });

        Ok(())
    }

    pub fn stop(&self) {
        self.stop_tx.try_send(()).ok();
    }
}

fn handle_data(bus: &Bus, state: &Arc<RwLock<State>>, raw: &[u8]) -> Result<(), Error> {
    let text = String::from_utf8_lossy(raw);

    let mut state = state.write().unwrap();
    let snapshot = parse_data(&text, &state.boundaries)?;
    info!(
        "Parsed data file: {} countries, {} airports, {} firs, {} uirs",
        snapshot.countries.len(),
        snapshot.airports.len(),
        snapshot.firs.len(),
        snapshot.uirs.len()
    );

    let (country_set, country_del) = apply_snapshot(&mut state.countries, snapshot.countries);
    let (airport_set, airport_del) = apply_snapshot(&mut state.airports, snapshot.airports);
    let (fir_set, fir_del) = apply_snapshot(&mut state.firs, snapshot.firs);
    let (uir_set, uir_del) = apply_snapshot(&mut state.uirs, snapshot.uirs);
    drop(state);

    for update in make_updates(country_set, country_del, Object::Country) {
        bus.notify(update);
    }
    for update in make_updates(airport_set, airport_del, Object::AirportMeta) {
        bus.notify(update);
    }
    for update in make_updates(fir_set, fir_del, Object::Fir) {
        bus.notify(update);
    }
    for update in make_updates(uir_set, uir_del, Object::Uir) {
        bus.notify(update);
    }

    bus.fin();
    bus.set_data_ready(true);
    Ok(())
}

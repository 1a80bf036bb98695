pub mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::{debug, info};

use crate::config::OurairportsConfig;
use crate::error::Error;
use crate::fetcher::Fetcher;
use crate::pubsub::{Bus, Object, Subscription, Update};
use types::{Runway, RunwayRecord};

type RunwayIndex = HashMap<String, HashMap<String, Runway>>;

/// Runway reference data. Each CSV row yields the two runway endpoints;
/// only rows differing from the stored entry are republished. Deletion is
/// left to the merger: runways vanish together with their airport.
pub struct OurairportsProvider {
    cfg: OurairportsConfig,
    bus: Bus,
    state: Arc<RwLock<RunwayIndex>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    stopped: Arc<AtomicBool>,
}

impl OurairportsProvider {
    pub fn new(cfg: OurairportsConfig) -> Self {
        let bus = Bus::new();
        let state: Arc<RwLock<RunwayIndex>> = Arc::new(RwLock::new(HashMap::new()));
        let (stop_tx, stop_rx) = bounded(1);

        let replay_state = state.clone();
        bus.set_initial_notifier(move |sub| {
            let state = replay_state.read().unwrap();
            for by_ident in state.values() {
                for runway in by_ident.values() {
                    sub.send(Update::Set(Object::Runway(runway.clone())));
                }
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

    pub fn start(&self) -> Result<(), Error> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(Error::AlreadyStopped);
        }

        let fetcher = Fetcher::new(&self.cfg.url, &self.cfg.poll, &self.cfg.boot);
        let payload_rx = fetcher.payloads();
        fetcher.start()?;

        let bus = self.bus.clone();
        let state = self.state.clone();
        let stop_rx = self.stop_rx.clone();
        let stopped = self.stopped.clone();

        thread::spawn(move || {
            loop {
                select! {
                    recv(payload_rx) -> msg => match msg {
                        Ok(raw) => handle_payload(&bus, &state, &raw),
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => break,
                }
            }
            stopped.store(true, Ordering::SeqCst);
            fetcher.stop();
            bus.dispose();
        });

        Ok(())
    }

    pub fn stop(&self) {
        self.stop_tx.try_send(()).ok();
    }
}

fn handle_payload(bus: &Bus, state: &Arc<RwLock<RunwayIndex>>, raw: &[u8]) {
    let mut reader = csv::Reader::from_reader(raw);
    let mut total = 0;

    for result in reader.deserialize::<RunwayRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping runway row: {:?}", e);
                continue;
            }
        };

        let (low, high) = record.into_endpoints();
        total += 2;

        let mut state = state.write().unwrap();
        for runway in vec![low, high] {
            let by_ident = state.entry(runway.icao.clone()).or_default();
            let changed = match by_ident.get(&runway.ident) {
                Some(existing) => *existing != runway,
                None => true,
            };
            if changed {
                by_ident.insert(runway.ident.clone(), runway.clone());
                bus.notify(Update::Set(Object::Runway(runway)));
            }
        }
    }

    info!("Parsed {} runway endpoints", total);
    bus.set_data_ready(true);
}

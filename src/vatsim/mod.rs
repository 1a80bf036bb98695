pub mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::{debug, error};

use crate::config::VatsimConfig;
use crate::diff::apply_snapshot;
use crate::error::Error;
use crate::fetcher::Fetcher;
use crate::pubsub::{make_updates, Bus, Object, Subscription, Update};
use types::{make_controller, make_pilot, Controller, Pilot, RawData, FACILITY_ATIS};

#[derive(Default)]
struct State {
    controllers: HashMap<String, Controller>,
    pilots: HashMap<String, Pilot>,
}

/// Fast-moving network state: controllers (including synthesized ATIS
/// facilities) and pilots, polled from the network-state JSON endpoint and
/// published as incremental diffs.
pub struct VatsimProvider {
    cfg: VatsimConfig,
    bus: Bus,
    state: Arc<RwLock<State>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    stopped: Arc<AtomicBool>,
}

impl VatsimProvider {
    pub fn new(cfg: VatsimConfig) -> Self {
        let bus = Bus::new();
        let state = Arc::new(RwLock::new(State::default()));
        let (stop_tx, stop_rx) = bounded(1);

        let replay_state = state.clone();
        bus.set_initial_notifier(move |sub| {
            let state = replay_state.read().unwrap();
            for ctrl in state.controllers.values() {
                sub.send(Update::Set(Object::Controller(ctrl.clone())));
            }
            for pilot in state.pilots.values() {
                sub.send(Update::Set(Object::Pilot(pilot.clone())));
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
                        Ok(raw) => {
                            if let Err(e) = handle_payload(&bus, &state, &raw) {
                                error!("Error parsing network state: {:?}", e);
                            }
                        }
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

fn handle_payload(bus: &Bus, state: &Arc<RwLock<State>>, raw: &[u8]) -> Result<(), Error> {
    let data: RawData = serde_json::from_slice(raw)?;

    let mut controllers = HashMap::new();
    for raw_ctrl in &data.controllers {
        match make_controller(raw_ctrl) {
            Ok(ctrl) => {
                controllers.insert(ctrl.callsign.clone(), ctrl);
            }
            Err(e) => debug!("Skipping controller {}: {:?}", raw_ctrl.callsign, e),
        }
    }

    // ATIS stations arrive in their own array without a usable facility
    for raw_ctrl in &data.atis {
        let mut raw_ctrl = raw_ctrl.clone();
        raw_ctrl.facility = FACILITY_ATIS;
        match make_controller(&raw_ctrl) {
            Ok(ctrl) => {
                controllers.insert(ctrl.callsign.clone(), ctrl);
            }
            Err(e) => debug!("Skipping atis {}: {:?}", raw_ctrl.callsign, e),
        }
    }

    let mut pilots = HashMap::new();
    for raw_pilot in &data.pilots {
        match make_pilot(raw_pilot) {
            Ok(pilot) => {
                pilots.insert(pilot.callsign.clone(), pilot);
            }
            Err(e) => debug!("Skipping pilot {}: {:?}", raw_pilot.callsign, e),
        }
    }

    let mut state = state.write().unwrap();
    let (ctrl_set, ctrl_del) = apply_snapshot(&mut state.controllers, controllers);
    let (pilot_set, pilot_del) = apply_snapshot(&mut state.pilots, pilots);
    drop(state);

    for update in make_updates(ctrl_set, ctrl_del, Object::Controller) {
        bus.notify(update);
    }
    for update in make_updates(pilot_set, pilot_del, Object::Pilot) {
        bus.notify(update);
    }

    bus.fin();
    bus.set_data_ready(true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SNAPSHOT: &str = r#"{
        "controllers": [{
            "cid": 1000000, "name": "Test Controller", "callsign": "EDDH_TWR",
            "frequency": "120.800", "facility": 4, "rating": 3, "server": "GERMANY",
            "visual_range": 50, "text_atis": null,
            "logon_time": "2024-05-01T10:00:00.1234567Z",
            "last_updated": "2024-05-01T10:15:00.1234567Z"
        }],
        "atis": [{
            "cid": 1000002, "name": "Hamburg ATIS", "callsign": "EDDH_ATIS",
            "frequency": "123.125", "facility": 0, "rating": 1, "server": "GERMANY",
            "visual_range": 0, "atis_code": "K",
            "text_atis": ["RUNWAY 23 IN USE"],
            "logon_time": "2024-05-01T09:00:00.1234567Z",
            "last_updated": "2024-05-01T10:15:00.1234567Z"
        }],
        "pilots": [{
            "cid": 1000001, "name": "Test Pilot", "callsign": "DLH123",
            "server": "GERMANY", "pilot_rating": 0, "latitude": 53.6,
            "longitude": 9.9, "altitude": 34000, "groundspeed": 450,
            "transponder": "1000", "heading": 180, "qnh_i_hg": 29.92, "qnh_mb": 1013,
            "flight_plan": null,
            "logon_time": "2024-05-01T08:00:00.0000000Z",
            "last_updated": "2024-05-01T10:15:00.0000000Z"
        }]
    }"#;

    #[test]
    fn snapshot_is_validated_diffed_and_finned() {
        let bus = Bus::new();
        let state = Arc::new(RwLock::new(State::default()));
        let sub = bus.subscribe(64);

        handle_payload(&bus, &state, SNAPSHOT.as_bytes()).unwrap();

        let mut controllers = 0;
        let mut pilots = 0;
        loop {
            let update = sub
                .receiver()
                .recv_timeout(Duration::from_secs(1))
                .unwrap();
            match update {
                Update::Set(Object::Controller(_)) => controllers += 1,
                Update::Set(Object::Pilot(_)) => pilots += 1,
                Update::Fin => break,
                other => panic!("unexpected update {:?}", other),
            }
        }
        assert_eq!(controllers, 2);
        assert_eq!(pilots, 1);
        assert!(bus.data_ready());
    }

    #[test]
    fn atis_entries_get_facility_forced_to_one() {
        let bus = Bus::new();
        let state = Arc::new(RwLock::new(State::default()));
        handle_payload(&bus, &state, SNAPSHOT.as_bytes()).unwrap();

        let state = state.read().unwrap();
        assert_eq!(state.controllers["EDDH_ATIS"].facility, FACILITY_ATIS);
        assert_eq!(state.controllers["EDDH_ATIS"].text_atis, "RUNWAY 23 IN USE");
    }

    #[test]
    fn vanished_entries_produce_deletes() {
        let bus = Bus::new();
        let state = Arc::new(RwLock::new(State::default()));
        handle_payload(&bus, &state, SNAPSHOT.as_bytes()).unwrap();

        let sub = bus.subscribe(64);
        handle_payload(
            &bus,
            &state,
            br#"{"controllers": [], "atis": [], "pilots": []}"#,
        )
        .unwrap();

        let mut deletes = 0;
        loop {
            let update = sub
                .receiver()
                .recv_timeout(Duration::from_secs(1))
                .unwrap();
            match update {
                Update::Delete(_) => deletes += 1,
                Update::Fin => break,
                other => panic!("unexpected update {:?}", other),
            }
        }
        assert_eq!(deletes, 3);
    }

    #[test]
    fn malformed_json_discards_the_snapshot() {
        let bus = Bus::new();
        let state = Arc::new(RwLock::new(State::default()));
        assert!(handle_payload(&bus, &state, b"{broken").is_err());
        assert!(state.read().unwrap().controllers.is_empty());
    }
}

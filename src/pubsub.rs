use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};

use crate::merged::types::{Airport, Radar};
use crate::ourairports::types::Runway;
use crate::vatsim::types::{Controller, Pilot};
use crate::vatspy::types::{AirportMeta, Country, Fir, Uir};

pub type ObjectType = i32;

pub const OBJECT_TYPE_CONTROLLER: ObjectType = 1;
pub const OBJECT_TYPE_PILOT: ObjectType = 2;
pub const OBJECT_TYPE_COUNTRY: ObjectType = 100;
pub const OBJECT_TYPE_FIR: ObjectType = 101;
pub const OBJECT_TYPE_UIR: ObjectType = 102;
pub const OBJECT_TYPE_AIRPORT_META: ObjectType = 103;
pub const OBJECT_TYPE_AIRPORT: ObjectType = 200;
pub const OBJECT_TYPE_RADAR: ObjectType = 201;
pub const OBJECT_TYPE_MERGED_PILOT: ObjectType = 202;
pub const OBJECT_TYPE_RUNWAY: ObjectType = 300;

/// Payload of a bus update. Each variant maps to a fixed integer tag so
/// consumers can discriminate across providers without inspecting the data.
#[derive(Debug, Clone)]
pub enum Object {
    Controller(Controller),
    Pilot(Pilot),
    Country(Country),
    Fir(Fir),
    Uir(Uir),
    AirportMeta(AirportMeta),
    Airport(Airport),
    Radar(Radar),
    MergedPilot(Pilot),
    Runway(Runway),
}

impl Object {
    pub fn otype(&self) -> ObjectType {
        match self {
            Object::Controller(_) => OBJECT_TYPE_CONTROLLER,
            Object::Pilot(_) => OBJECT_TYPE_PILOT,
            Object::Country(_) => OBJECT_TYPE_COUNTRY,
            Object::Fir(_) => OBJECT_TYPE_FIR,
            Object::Uir(_) => OBJECT_TYPE_UIR,
            Object::AirportMeta(_) => OBJECT_TYPE_AIRPORT_META,
            Object::Airport(_) => OBJECT_TYPE_AIRPORT,
            Object::Radar(_) => OBJECT_TYPE_RADAR,
            Object::MergedPilot(_) => OBJECT_TYPE_MERGED_PILOT,
            Object::Runway(_) => OBJECT_TYPE_RUNWAY,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Update {
    Set(Object),
    Delete(Object),
    /// Barrier marking the end of a provider's current snapshot pass.
    Fin,
}

impl Update {
    pub fn object(&self) -> Option<&Object> {
        match self {
            Update::Set(obj) | Update::Delete(obj) => Some(obj),
            Update::Fin => None,
        }
    }

    pub fn is_fin(&self) -> bool {
        matches!(self, Update::Fin)
    }
}

type InitialNotifier = Arc<dyn Fn(SubHandle) + Send + Sync>;

struct BusShared {
    subs: HashMap<u64, Sender<Update>>,
    next_id: u64,
    notifier: Option<InitialNotifier>,
    data_ready: bool,
    disposed: bool,
}

/// Fan-out point between a provider and its subscribers. Cloning the bus
/// clones a handle to the same subscriber set.
#[derive(Clone)]
pub struct Bus {
    shared: Arc<Mutex<BusShared>>,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(BusShared {
                subs: HashMap::new(),
                next_id: 0,
                notifier: None,
                data_ready: false,
                disposed: false,
            })),
        }
    }

    /// Allocates a bounded backlog for a new subscriber. If the provider has
    /// already completed its first snapshot, the registered initial notifier
    /// replays current state on a detached thread so its sends can never
    /// deadlock against the still-empty backlog.
    pub fn subscribe(&self, capacity: usize) -> Subscription {
        let (tx, rx) = bounded(capacity);

        let mut shared = self.shared.lock().unwrap();
        let id = shared.next_id;
        shared.next_id += 1;
        if !shared.disposed {
            shared.subs.insert(id, tx.clone());
        }

        if shared.data_ready {
            if let Some(notifier) = shared.notifier.clone() {
                let handle = SubHandle { tx };
                thread::spawn(move || notifier(handle));
            }
        }

        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, sub: &Subscription) {
        self.shared.lock().unwrap().subs.remove(&sub.id);
    }

    /// Best-effort broadcast. A subscriber with a full backlog loses this
    /// update; everyone else still receives it.
    pub fn notify(&self, update: Update) {
        let mut shared = self.shared.lock().unwrap();
        let mut dead = Vec::new();

        for (id, tx) in shared.subs.iter() {
            match tx.try_send(update.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Subscriber {} backlog is full, dropping update", id);
                }
                Err(TrySendError::Disconnected(_)) => {
                    dead.push(*id);
                }
            }
        }

        for id in dead {
            debug!("Removing disconnected subscriber {}", id);
            shared.subs.remove(&id);
        }
    }

    pub fn fin(&self) {
        self.notify(Update::Fin);
    }

    pub fn set_initial_notifier<F>(&self, notifier: F)
    where
        F: Fn(SubHandle) + Send + Sync + 'static,
    {
        self.shared.lock().unwrap().notifier = Some(Arc::new(notifier));
    }

    /// Gates initial replay: subscriptions made before the first snapshot is
    /// complete get no replay and rely on the live diff of that snapshot.
    pub fn set_data_ready(&self, ready: bool) {
        self.shared.lock().unwrap().data_ready = ready;
    }

    pub fn data_ready(&self) -> bool {
        self.shared.lock().unwrap().data_ready
    }

    /// Closes every subscription. Receivers drain their backlog and then see
    /// the end of the update sequence.
    pub fn dispose(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.subs.clear();
        shared.disposed = true;
    }
}

/// Wraps the two halves of a snapshot diff into bus updates, sets first.
pub fn make_updates<T>(set: Vec<T>, deleted: Vec<T>, wrap: impl Fn(T) -> Object) -> Vec<Update> {
    let mut updates = Vec::with_capacity(set.len() + deleted.len());
    for obj in set {
        updates.push(Update::Set(wrap(obj)));
    }
    for obj in deleted {
        updates.push(Update::Delete(wrap(obj)));
    }
    updates
}

/// Send side of a single subscription, handed to initial notifiers.
#[derive(Clone)]
pub struct SubHandle {
    tx: Sender<Update>,
}

impl SubHandle {
    pub fn send(&self, update: Update) {
        match self.tx.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Subscriber backlog is full, dropping replayed update");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn fin(&self) {
        self.send(Update::Fin);
    }
}

pub struct Subscription {
    id: u64,
    rx: Receiver<Update>,
}

impl Subscription {
    /// Blocking lazy sequence of updates. Ends when the bus is disposed.
    pub fn updates(&self) -> crossbeam_channel::Iter<Update> {
        self.rx.iter()
    }

    pub fn receiver(&self) -> &Receiver<Update> {
        &self.rx
    }
}

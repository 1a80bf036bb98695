use std::fs;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use log::{debug, error, warn};

use crate::config::{BootConfig, PollConfig};
use crate::error::Error;

const PAYLOAD_BACKLOG: usize = 32;

/// Delivers raw byte payloads from an HTTP URL or a local file on a fixed
/// period. HTTP sources are fetched once at start (with boot retries) and
/// then on every tick; a local path produces a single payload and idles.
pub struct Fetcher {
    url: String,
    period: Duration,
    timeout: Duration,
    retries: u32,
    retry_cooldown: Duration,
    payload_tx: Sender<Vec<u8>>,
    payload_rx: Receiver<Vec<u8>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl Fetcher {
    pub fn new(url: &str, poll: &PollConfig, boot: &BootConfig) -> Self {
        let (payload_tx, payload_rx) = bounded(PAYLOAD_BACKLOG);
        let (stop_tx, stop_rx) = bounded(1);
        Self {
            url: url.to_string(),
            period: poll.period(),
            timeout: poll.timeout(),
            retries: boot.retries,
            retry_cooldown: boot.retry_cooldown(),
            payload_tx,
            payload_rx,
            stop_tx,
            stop_rx,
        }
    }

    /// Lazy sequence of payloads. One receiver per consumer loop.
    pub fn payloads(&self) -> Receiver<Vec<u8>> {
        self.payload_rx.clone()
    }

    pub fn start(&self) -> Result<(), Error> {
        if !self.url.starts_with("http") {
            let data = fs::read(&self.url)?;
            self.deliver(data);
            return Ok(());
        }

        let mut attempt = 0;
        let first = loop {
            attempt += 1;
            match fetch_url(&self.url, self.timeout) {
                Ok(data) => break data,
                Err(e) => {
                    error!(
                        "Error fetching {} (initial, {} retries left): {:?}",
                        self.url,
                        self.retries.saturating_sub(attempt),
                        e
                    );
                    if attempt >= self.retries {
                        return Err(Error::BootFailed(self.url.clone()));
                    }
                    thread::sleep(self.retry_cooldown);
                }
            }
        };
        self.deliver(first);

        let url = self.url.clone();
        let timeout = self.timeout;
        let payload_tx = self.payload_tx.clone();
        let stop_rx = self.stop_rx.clone();
        let ticker = tick(self.period);

        thread::spawn(move || loop {
            select! {
                recv(ticker) -> _ => {
                    match fetch_url(&url, timeout) {
                        Ok(data) => match payload_tx.try_send(data) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                warn!("Payload backlog for {} is full, skipping tick", url)
                            }
                            Err(TrySendError::Disconnected(_)) => break,
                        },
                        // transient failure, wait for the next tick
                        Err(e) => warn!("Error fetching {}: {:?}", url, e),
                    }
                }
                recv(stop_rx) -> _ => {
                    debug!("Fetcher for {} stopped", url);
                    break;
                }
            }
        });

        Ok(())
    }

    pub fn stop(&self) {
        self.stop_tx.try_send(()).ok();
    }

    fn deliver(&self, data: Vec<u8>) {
        if self.payload_tx.try_send(data).is_err() {
            warn!("Payload backlog for {} is full, dropping payload", self.url);
        }
    }
}

fn fetch_url(url: &str, timeout: Duration) -> Result<Vec<u8>, Error> {
    let response = attohttpc::get(url)
        .timeout(timeout)
        .send()?
        .error_for_status()?;
    Ok(response.bytes()?)
}

use std::fs::File;

use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use skymerge::config::MergedConfig;
use skymerge::merged::MergedProvider;
use skymerge::pubsub::{Object, Update};

const CONFIG_FILENAME: &str = "config.json";

fn read_config() -> Result<MergedConfig, std::io::Error> {
    let file = File::open(CONFIG_FILENAME)?;
    Ok(serde_json::from_reader(file)?)
}

fn main() {
    // Setup logging
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Stdout,
        ColorChoice::Auto,
    )
    .ok();

    // Fall back to the built-in endpoints when there is no config file
    let config = match read_config() {
        Ok(config) => config,
        Err(_) => MergedConfig::default(),
    };

    let provider = MergedProvider::new(config);
    if let Err(e) = provider.start() {
        eprintln!("Could not start the merged feed! Reason: {:?}", e);
        std::process::exit(1);
    }

    let sub = provider.subscribe(1024);
    for update in sub.updates() {
        match update {
            Update::Set(Object::Airport(airport)) => {
                info!(
                    "airport {} set ({} controllers online, {} runways)",
                    airport.meta.icao,
                    [
                        &airport.controllers.atis,
                        &airport.controllers.delivery,
                        &airport.controllers.ground,
                        &airport.controllers.tower,
                        &airport.controllers.approach,
                    ]
                    .iter()
                    .filter(|slot| slot.is_some())
                    .count(),
                    airport.runways.len()
                );
            }
            Update::Delete(Object::Airport(airport)) => {
                info!("airport {} deleted", airport.meta.icao)
            }
            Update::Set(Object::Radar(radar)) => info!(
                "radar {} set ({})",
                radar.controller.callsign, radar.controller.human_readable
            ),
            Update::Delete(Object::Radar(radar)) => {
                info!("radar {} deleted", radar.controller.callsign)
            }
            Update::Set(Object::MergedPilot(pilot)) => info!("pilot {} set", pilot.callsign),
            Update::Delete(Object::MergedPilot(pilot)) => {
                info!("pilot {} deleted", pilot.callsign)
            }
            Update::Fin => info!("snapshot pass complete"),
            other => info!("unexpected update {:?}", other),
        }
    }
}

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use skymerge::config::{BootConfig, MergedConfig, OurairportsConfig, PollConfig, VatsimConfig, VatspyConfig};
use skymerge::merged::MergedProvider;
use skymerge::pubsub::{Object, Update};

const BOUNDARIES: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {"id": "EDWW", "region": "EMEA", "division": "GER", "oceanic": "0"},
        "geometry": {
            "type": "MultiPolygon",
            "coordinates": [[[[7.0, 52.0], [11.0, 52.0], [11.0, 55.0], [7.0, 55.0], [7.0, 52.0]]]]
        }
    }]
}"#;

const DATA: &str = "\
[Countries]\n\
Germany|ED|\n\
[Airports]\n\
EDDH|Hamburg|53.630389|9.988228|HAM|EDWW|0\n\
EGKK|Gatwick|51.148056|-0.190278|LGW|EGTT|0\n\
[FIRs]\n\
EDWW|Bremen|EDWW|\n";

const NETWORK: &str = r#"{
    "controllers": [{
        "cid": 1000000, "name": "Test Controller", "callsign": "EDDH_TWR",
        "frequency": "120.800", "facility": 4, "rating": 3, "server": "GERMANY",
        "visual_range": 50, "text_atis": null,
        "logon_time": "2024-05-01T10:00:00.1234567Z",
        "last_updated": "2024-05-01T10:15:00.1234567Z"
    }],
    "atis": [],
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

const RUNWAYS: &str = "\
\"id\",\"airport_ref\",\"airport_ident\",\"length_ft\",\"width_ft\",\"surface\",\"lighted\",\"closed\",\"le_ident\",\"le_latitude_deg\",\"le_longitude_deg\",\"le_elevation_ft\",\"le_heading_degT\",\"le_displaced_threshold_ft\",\"he_ident\",\"he_latitude_deg\",\"he_longitude_deg\",\"he_elevation_ft\",\"he_heading_degT\",\"he_displaced_threshold_ft\"\n\
1,1,\"EDDH\",12024,150,\"ASP\",1,0,\"05\",53.615,9.956,46,46.0,,\"23\",53.645,9.999,35,226.0,\n";

fn write_source(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("skymerge_pipeline_{}", name));
    fs::write(&path, contents).unwrap();
    path
}

fn local_config() -> MergedConfig {
    let poll = PollConfig {
        period_secs: 3600,
        timeout_secs: 1,
    };
    let boot = BootConfig {
        retries: 1,
        retry_cooldown_secs: 0,
    };
    MergedConfig {
        data: VatspyConfig {
            data_url: write_source("vatspy.dat", DATA).to_string_lossy().into_owned(),
            boundaries_url: write_source("boundaries.geojson", BOUNDARIES)
                .to_string_lossy()
                .into_owned(),
            poll: poll.clone(),
            boot: boot.clone(),
        },
        api: VatsimConfig {
            url: write_source("network.json", NETWORK)
                .to_string_lossy()
                .into_owned(),
            poll: poll.clone(),
            boot: boot.clone(),
        },
        runways: OurairportsConfig {
            url: write_source("runways.csv", RUNWAYS)
                .to_string_lossy()
                .into_owned(),
            poll,
            boot,
        },
    }
}

#[test]
fn local_sources_flow_end_to_end() {
    let provider = MergedProvider::new(local_config());
    let sub = provider.subscribe(1024);
    provider.start().unwrap();

    let mut tower_human = String::new();
    let mut pilot_seen = false;
    let mut fin_seen = false;
    let mut runway_idents: HashSet<String> = HashSet::new();

    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        let update = match sub.receiver().recv_timeout(Duration::from_millis(200)) {
            Ok(update) => update,
            Err(_) => continue,
        };
        match update {
            Update::Set(Object::Airport(airport)) => {
                if airport.meta.icao == "EDDH" {
                    for ident in airport.runways.keys() {
                        runway_idents.insert(ident.clone());
                    }
                    if let Some(tower) = airport.controllers.tower {
                        tower_human = tower.human_readable;
                    }
                }
            }
            Update::Set(Object::MergedPilot(pilot)) => {
                pilot_seen = pilot.callsign == "DLH123" || pilot_seen;
            }
            Update::Fin => fin_seen = true,
            _ => {}
        }

        let runways_done = runway_idents.contains("05") && runway_idents.contains("23");
        if fin_seen && pilot_seen && !tower_human.is_empty() && runways_done {
            break;
        }
    }

    assert_eq!(tower_human, "Hamburg Tower");
    assert!(pilot_seen, "pilot DLH123 never arrived");
    assert!(fin_seen, "no fin barrier after the dynamic snapshot");
    assert!(runway_idents.contains("05") && runway_idents.contains("23"));

    // a late subscriber gets the current state replayed
    let late = provider.subscribe(1024);
    let mut replayed_airports = HashSet::new();
    let mut replayed_pilot = false;
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        match late.receiver().recv_timeout(Duration::from_millis(200)) {
            Ok(Update::Set(Object::Airport(airport))) => {
                replayed_airports.insert(airport.meta.icao);
            }
            Ok(Update::Set(Object::MergedPilot(pilot))) => {
                replayed_pilot = pilot.callsign == "DLH123" || replayed_pilot;
            }
            _ => {}
        }
        if replayed_airports.contains("EDDH") && replayed_airports.contains("EGKK") && replayed_pilot
        {
            break;
        }
    }
    assert!(replayed_airports.contains("EDDH"));
    assert!(replayed_airports.contains("EGKK"));
    assert!(replayed_pilot);

    provider.stop();
}

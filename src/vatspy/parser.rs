use std::collections::HashMap;

use crate::error::Error;
use crate::vatspy::types::{AirportMeta, Boundaries, Country, Fir, Point, Uir};

#[derive(Debug, Default)]
pub struct DataSnapshot {
    pub countries: HashMap<String, Country>,
    pub airports: HashMap<String, AirportMeta>,
    pub firs: HashMap<String, Fir>,
    pub uirs: HashMap<String, Uir>,
}

#[derive(Clone, Copy)]
enum Section {
    Header,
    Countries,
    Airports,
    Firs,
    Uirs,
}

/// Parses the pipe-delimited reference file. A row with the wrong field
/// count throws the parser back into header-seeking mode and the same line
/// is re-evaluated there; a bad coordinate abandons the whole snapshot.
pub fn parse_data(
    text: &str,
    boundaries: &HashMap<String, Boundaries>,
) -> Result<DataSnapshot, Error> {
    let mut snapshot = DataSnapshot::default();
    let mut section = Section::Header;

    for (index, raw_line) in text.lines().enumerate() {
        let line_num = index + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        let tokens: Vec<&str> = line.split('|').collect();

        // a failed row count re-decides the same line as a potential header
        loop {
            match section {
                Section::Header => {
                    if line.starts_with('[') {
                        let name = line
                            .trim_start_matches('[')
                            .trim_end_matches(']')
                            .to_lowercase();
                        section = match name.as_str() {
                            "countries" => Section::Countries,
                            "airports" => Section::Airports,
                            "firs" => Section::Firs,
                            "uirs" => Section::Uirs,
                            _ => Section::Header,
                        };
                    }
                    break;
                }
                Section::Countries => {
                    if tokens.len() != 3 {
                        section = Section::Header;
                        continue;
                    }
                    let country = Country {
                        name: tokens[0].to_string(),
                        prefix: tokens[1].to_string(),
                        control_custom_name: tokens[2].to_string(),
                    };
                    snapshot.countries.insert(country.prefix.clone(), country);
                    break;
                }
                Section::Airports => {
                    if tokens.len() != 7 {
                        section = Section::Header;
                        continue;
                    }
                    let lat = parse_coord(tokens[2], line_num)?;
                    let lng = parse_coord(tokens[3], line_num)?;
                    let airport = AirportMeta {
                        icao: tokens[0].to_string(),
                        name: tokens[1].to_string(),
                        position: Point { lat, lng },
                        iata: tokens[4].to_string(),
                        fir_id: tokens[5].to_string(),
                        is_pseudo: tokens[6] == "1",
                    };
                    snapshot.airports.insert(airport.icao.clone(), airport);
                    break;
                }
                Section::Firs => {
                    if tokens.len() != 4 {
                        section = Section::Header;
                        continue;
                    }
                    let mut fir = Fir {
                        id: tokens[0].to_string(),
                        name: tokens[1].to_string(),
                        prefix: tokens[2].to_string(),
                        parent_id: tokens[3].to_string(),
                        boundaries: Boundaries::default(),
                    };
                    // lookup order: id, prefix, parent; first hit wins
                    if let Some(bounds) = boundaries
                        .get(&fir.id)
                        .or_else(|| boundaries.get(&fir.prefix))
                        .or_else(|| boundaries.get(&fir.parent_id))
                    {
                        fir.boundaries = bounds.clone();
                    }
                    snapshot.firs.insert(fir.id.clone(), fir);
                    break;
                }
                Section::Uirs => {
                    if tokens.len() != 3 {
                        section = Section::Header;
                        continue;
                    }
                    let uir = Uir {
                        id: tokens[0].to_string(),
                        name: tokens[1].to_string(),
                        fir_ids: tokens[2].split(',').map(|s| s.to_string()).collect(),
                    };
                    snapshot.uirs.insert(uir.id.clone(), uir);
                    break;
                }
            }
        }
    }

    Ok(snapshot)
}

fn parse_coord(token: &str, line_num: usize) -> Result<f64, Error> {
    token.parse().map_err(|_| {
        Error::BadSnapshot(format!(
            "invalid lat/lng value '{}' on line {}",
            token, line_num
        ))
    })
}

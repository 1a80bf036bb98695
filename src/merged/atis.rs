use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

// Up to three runway idents, optionally joined by AND/OR. Spelled-out
// directions ("35 LEFT") are caught here and shortened by normalize_ident.
const RUNWAY_IDENT_EXPR: &str = r"(\d{2}(?:[LRC]|\s(?:LEFT|RIGHT|CENTER))?)(?:\s(?:(?:AND|OR)\s)?(\d{2}(?:[LRC]|\s(?:LEFT|RIGHT|CENTER))?))?(?:\s(?:(?:AND|OR)\s)?(\d{2}(?:[LRC]|\s(?:LEFT|RIGHT|CENTER))?))?";

lazy_static! {
    static ref ARRIVAL_EXPRESSIONS: Vec<Regex> = vec![
        Regex::new(&format!(
            r"(?:(?:APPROACH|ARRIVAL|LANDING|LDG)\s)+(?:RUNWAY|RWY)S?\s{}",
            RUNWAY_IDENT_EXPR
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?:RUNWAY|RWY)S?\s{}\sFOR\s(?:ARRIVAL|LANDING|LDG|APPROACH)",
            RUNWAY_IDENT_EXPR
        ))
        .unwrap(),
        Regex::new(&format!(r"(?:RUNWAY|RWY)S?\s{}\sIN\sUSE", RUNWAY_IDENT_EXPR)).unwrap(),
        Regex::new(&format!(r"(?:RUNWAY|RWY)S?\sIN\sUSE\s{}", RUNWAY_IDENT_EXPR)).unwrap(),
        Regex::new(&format!(
            r"(?:APPROACH|ARRIVAL|LANDING|LDG)\sAND\s(?:TAKEOFF|DEPARTURE|DEPARTING|DEP)\s(?:RUNWAY|RWY)S?\s{}",
            RUNWAY_IDENT_EXPR
        ))
        .unwrap(),
    ];
    static ref DEPARTURE_EXPRESSIONS: Vec<Regex> = vec![
        Regex::new(&format!(
            r"(?:TAKEOFF|DEPARTURE|DEPARTING|DEP)\s(?:RUNWAY|RWY)S?\s{}",
            RUNWAY_IDENT_EXPR
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?:RUNWAY|RWY)S?\s{}\sFOR\s(?:TAKEOFF|DEPARTURE|DEP)",
            RUNWAY_IDENT_EXPR
        ))
        .unwrap(),
        Regex::new(&format!(r"(?:RUNWAY|RWY)S?\s{}\sIN\sUSE", RUNWAY_IDENT_EXPR)).unwrap(),
        Regex::new(&format!(r"(?:RUNWAY|RWY)S?\sIN\sUSE\s{}", RUNWAY_IDENT_EXPR)).unwrap(),
        Regex::new(&format!(
            r"(?:APPROACH|ARRIVAL|LANDING|LDG)\sAND\s(?:TAKEOFF|DEPARTURE|DEPARTING|DEP)\s(?:RUNWAY|RWY)S?\s{}",
            RUNWAY_IDENT_EXPR
        ))
        .unwrap(),
    ];
    static ref EXPR_SPECIAL: Regex = Regex::new(r"[^A-Z0-9\s]").unwrap();
    static ref EXPR_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref EXPR_DIGIT_DIGIT: Regex = Regex::new(r"(\d)\s(\d)").unwrap();
    static ref EXPR_DIGIT_SIDE: Regex = Regex::new(r"(\d)\s([LRC])\b").unwrap();
}

fn normalize_ident(ident: &str) -> String {
    let stripped: String = ident.chars().filter(|c| !c.is_whitespace()).collect();
    stripped.chars().take(3).collect()
}

fn normalize_atis_text(text: &str, collapse_digits: bool) -> String {
    let text = text.to_uppercase();
    let text = EXPR_SPECIAL.replace_all(&text, "");
    let text = EXPR_WHITESPACE.replace_all(&text, " ");
    let mut text = text.trim().to_string();
    if collapse_digits {
        // "2 6 L" -> "26 L" -> "26L"
        text = EXPR_DIGIT_DIGIT.replace_all(&text, "${1}${2}").into_owned();
        text = EXPR_DIGIT_SIDE.replace_all(&text, "${1}${2}").into_owned();
    }
    text
}

fn detect(expressions: &[Regex], atis_text: &str) -> Option<HashSet<String>> {
    if atis_text.is_empty() {
        return None;
    }
    for re in expressions.iter() {
        if let Some(captures) = re.captures(atis_text) {
            let mut results = HashSet::new();
            for index in 1..captures.len() {
                if let Some(group) = captures.get(index) {
                    if !group.as_str().is_empty() {
                        results.insert(normalize_ident(group.as_str()));
                    }
                }
            }
            return Some(results);
        }
    }
    None
}

fn detect_with_fallback(expressions: &[Regex], text: &str) -> HashSet<String> {
    if let Some(results) = detect(expressions, &normalize_atis_text(text, false)) {
        return results;
    }
    // spaced-out digits ("RUNWAY 2 6 LEFT") defeat the patterns, collapse
    // them and retry once
    detect(expressions, &normalize_atis_text(text, true)).unwrap_or_default()
}

/// Idents of runways the ATIS announces for arrivals. Pure function of the
/// transcript text.
pub fn detect_arrival_runways(text: &str) -> HashSet<String> {
    detect_with_fallback(&ARRIVAL_EXPRESSIONS, text)
}

/// Idents of runways the ATIS announces for departures.
pub fn detect_departure_runways(text: &str) -> HashSet<String> {
    detect_with_fallback(&DEPARTURE_EXPRESSIONS, text)
}

// src/extract/quantity.rs
//! Attendance extraction and scale bucketing.
//!
//! Spanish press writes crowd sizes as "35.000 asistentes" (dot as thousands
//! separator), "20 mil personas", or "un millon de espectadores". A number is
//! only taken as attendance when an audience noun sits next to it; bare
//! numbers in unrelated contexts (years, prices, addresses) are ignored.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::EventScale;

const AUDIENCE_NOUNS: &str =
    "asistentes|espectadores|personas|hinchas|visitantes|aficionados|fanaticos|corredores";

// "35.000 asistentes", "1.500 personas", "800 espectadores"
static RE_NUM_NOUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,3}}(?:\.\d{{3}})+|\d+)\s+(?:{AUDIENCE_NOUNS})\b"
    ))
    .unwrap()
});

// "20 mil personas", "mas de 50 mil hinchas"
static RE_MIL_NOUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,4}})\s+mil(?:es)?(?:\s+de)?\s+(?:{AUDIENCE_NOUNS})\b"
    ))
    .unwrap()
});

// "un millon de espectadores", "2 millones de personas"
static RE_MILLION_NOUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(un|\d{{1,3}})\s+millon(?:es)?\s+de\s+(?:{AUDIENCE_NOUNS})\b"
    ))
    .unwrap()
});

// Reversed order: "asistencia de 35.000", "aforo de 10.000"
static RE_NOUN_NUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:asistencia|aforo|capacidad)\s+(?:de|para)\s+(\d{1,3}(?:\.\d{3})+|\d+)\b")
        .unwrap()
});

fn parse_grouped(s: &str) -> Option<u64> {
    s.replace('.', "").parse().ok()
}

/// Extract expected attendance from accent-folded text. The largest
/// audience-adjacent figure wins when several are mentioned.
pub fn resolve_attendance(text: &str) -> Option<u64> {
    let mut best: Option<u64> = None;
    let mut consider = |v: u64| {
        if best.map_or(true, |b| v > b) {
            best = Some(v);
        }
    };

    for c in RE_MILLION_NOUN.captures_iter(text) {
        let n = if &c[1] == "un" { 1 } else { c[1].parse().unwrap_or(0) };
        consider(n * 1_000_000);
    }
    for c in RE_MIL_NOUN.captures_iter(text) {
        if let Ok(n) = c[1].parse::<u64>() {
            consider(n * 1_000);
        }
    }
    for c in RE_NUM_NOUN.captures_iter(text) {
        if let Some(n) = parse_grouped(&c[1]) {
            consider(n);
        }
    }
    for c in RE_NOUN_NUM.captures_iter(text) {
        if let Some(n) = parse_grouped(&c[1]) {
            consider(n);
        }
    }
    best
}

/// Fixed attendance buckets.
pub fn scale_for(attendance: u64) -> EventScale {
    match attendance {
        0..=499 => EventScale::Small,
        500..=4_999 => EventScale::Medium,
        5_000..=49_999 => EventScale::Large,
        _ => EventScale::Massive,
    }
}

static RE_MASSIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bmasiv[oa]s?\b|multitudinari[oa]s?").unwrap());
static RE_LARGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bgran\b|\bnacional\b").unwrap());

/// Scale guessed from adjectives when no crowd figure was written out.
pub fn scale_hint(folded: &str) -> EventScale {
    if RE_MASSIVE.is_match(folded) {
        EventScale::Massive
    } else if RE_LARGE.is_match(folded) {
        EventScale::Large
    } else {
        EventScale::Medium
    }
}

// src/extract/entities.rs
//! Place and entity resolution: gazetteer lookups for cities and
//! neighborhoods, venue spans, country detection, national involvement, and
//! lightweight keyword/entity extraction.
//!
//! City matching runs on the folded text against a folded gazetteer, with a
//! strsim fallback for the typos local outlets actually produce ("Medellin",
//! "Baranquilla"). Venue extraction runs on the normalized (cased) text
//! because the venue name itself is a capitalized span.

use once_cell::sync::Lazy;
use regex::Regex;
use strsim::jaro_winkler;

use crate::types::EntitySet;

/// Fuzzy-match floor for gazetteer tokens.
const CITY_SIMILARITY_MIN: f64 = 0.94;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceFacts {
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub venue: Option<String>,
    pub country: Option<String>,
    pub national_involvement: bool,
}

// (folded form, display form)
const COLOMBIAN_CITIES: &[(&str, &str)] = &[
    ("medellin", "Medellín"),
    ("bogota", "Bogotá"),
    ("cali", "Cali"),
    ("barranquilla", "Barranquilla"),
    ("cartagena", "Cartagena"),
    ("bucaramanga", "Bucaramanga"),
    ("pereira", "Pereira"),
    ("manizales", "Manizales"),
    ("santa marta", "Santa Marta"),
    ("cucuta", "Cúcuta"),
    ("ibague", "Ibagué"),
    ("armenia", "Armenia"),
    ("villavicencio", "Villavicencio"),
    ("pasto", "Pasto"),
    ("monteria", "Montería"),
    ("neiva", "Neiva"),
    ("rionegro", "Rionegro"),
    ("envigado", "Envigado"),
    ("itagui", "Itagüí"),
    ("bello", "Bello"),
    ("sabaneta", "Sabaneta"),
];

// (folded city, country it implies)
const INTERNATIONAL_CITIES: &[(&str, &str)] = &[
    ("madrid", "España"),
    ("barcelona", "España"),
    ("paris", "Francia"),
    ("londres", "Reino Unido"),
    ("nueva york", "Estados Unidos"),
    ("miami", "Estados Unidos"),
    ("buenos aires", "Argentina"),
    ("lima", "Perú"),
    ("quito", "Ecuador"),
    ("ciudad de mexico", "México"),
    ("santiago de chile", "Chile"),
    ("sao paulo", "Brasil"),
    ("rio de janeiro", "Brasil"),
    ("doha", "Catar"),
    ("tokio", "Japón"),
];

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("colombia", "Colombia"),
    ("brasil", "Brasil"),
    ("argentina", "Argentina"),
    ("espana", "España"),
    ("francia", "Francia"),
    ("mexico", "México"),
    ("ecuador", "Ecuador"),
    ("peru", "Perú"),
    ("chile", "Chile"),
    ("estados unidos", "Estados Unidos"),
    ("inglaterra", "Reino Unido"),
    ("alemania", "Alemania"),
    ("japon", "Japón"),
    ("catar", "Catar"),
];

const MEDELLIN_NEIGHBORHOODS: &[(&str, &str)] = &[
    ("el poblado", "El Poblado"),
    ("laureles", "Laureles"),
    ("belen", "Belén"),
    ("la candelaria", "La Candelaria"),
    ("provenza", "Provenza"),
    ("manrique", "Manrique"),
    ("castilla", "Castilla"),
    ("robledo", "Robledo"),
    ("la america", "La América"),
    ("el centro", "El Centro"),
];

/// Resolve city, neighborhood, venue, country, and national involvement.
/// `normalized` keeps casing for venue spans; `folded` feeds the gazetteers.
pub fn resolve_places(normalized: &str, folded: &str) -> PlaceFacts {
    let city = lookup_city(folded);
    let neighborhood = MEDELLIN_NEIGHBORHOODS
        .iter()
        .find(|(f, _)| contains_phrase(folded, f))
        .map(|(_, d)| d.to_string());

    let country = resolve_country(folded, city.is_some());
    let venue = resolve_venue(normalized);
    let national_involvement = detect_national_involvement(folded);

    PlaceFacts {
        city,
        neighborhood,
        venue,
        country,
        national_involvement,
    }
}

fn contains_phrase(folded: &str, phrase: &str) -> bool {
    // Word-bounded containment; phrases are plain ASCII after folding.
    folded
        .match_indices(phrase)
        .any(|(i, _)| boundary_ok(folded, i, phrase.len()))
}

fn boundary_ok(s: &str, start: usize, len: usize) -> bool {
    let before = s[..start].chars().next_back();
    let after = s[start + len..].chars().next();
    !before.is_some_and(|c| c.is_alphanumeric()) && !after.is_some_and(|c| c.is_alphanumeric())
}

fn lookup_city(folded: &str) -> Option<String> {
    // Exact gazetteer hit first.
    if let Some((_, d)) = COLOMBIAN_CITIES
        .iter()
        .find(|(f, _)| contains_phrase(folded, f))
    {
        return Some(d.to_string());
    }
    // Fuzzy pass over individual tokens, for single-word cities only.
    for token in folded.split(|c: char| !c.is_alphanumeric()) {
        if token.len() < 5 {
            continue;
        }
        for (f, d) in COLOMBIAN_CITIES {
            if !f.contains(' ') && jaro_winkler(token, f) >= CITY_SIMILARITY_MIN {
                return Some(d.to_string());
            }
        }
    }
    None
}

fn resolve_country(folded: &str, has_colombian_city: bool) -> Option<String> {
    if has_colombian_city {
        return Some("Colombia".to_string());
    }
    // "en <foreign city>" places the event abroad.
    for (city, country) in INTERNATIONAL_CITIES {
        if contains_phrase(folded, &format!("en {city}")) {
            return Some(country.to_string());
        }
    }
    // Otherwise an explicit host-country phrase.
    static RE_HOST: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:se\s+(?:celebra|realiza|jugara|disputara)|tendra\s+lugar)\s+en\s+(\w[\w\s]{2,30})").unwrap()
    });
    if let Some(c) = RE_HOST.captures(folded) {
        let tail = &c[1];
        for (f, d) in COUNTRY_NAMES {
            if contains_phrase(tail, f) {
                return Some(d.to_string());
            }
        }
    }
    None
}

fn resolve_venue(normalized: &str) -> Option<String> {
    // Any capitalized venue-keyword span counts, prose or comma listing:
    // "en el Estadio Atanasio Girardot" as much as "..., Estadio Atanasio
    // Girardot, Medellín". The longest span wins.
    static RE_SPAN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"\b((?:Estadio|Teatro|Coliseo|Parque|Auditorio|Plaza|Arena|Centro de Eventos)(?:\s+[A-ZÁÉÍÓÚÑ][\wáéíóúñ]*){1,4})",
        )
        .unwrap()
    });
    if let Some(best) = RE_SPAN
        .captures_iter(normalized)
        .map(|c| c[1].trim().to_string())
        .max_by_key(|s| s.len())
    {
        return Some(best);
    }
    // Fallback for lowercase venue words: "en el estadio Metropolitano".
    static RE_EN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"\ben (?:el |la )?(?:estadio|teatro|coliseo|parque|auditorio|plaza|arena)\s+((?:[A-ZÁÉÍÓÚÑ][\wáéíóúñ]*\s?){1,4})",
        )
        .unwrap()
    });
    RE_EN.captures(normalized).map(|c| c[1].trim().to_string())
}

fn detect_national_involvement(folded: &str) -> bool {
    static RE_NATIONAL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"seleccion\s+colombia|seleccion\s+colombiana|\bcolombianos?\b|\bcolombianas?\b|colombia\s+vs|vs\.?\s+colombia|nacional\s+de\s+colombia",
        )
        .unwrap()
    });
    RE_NATIONAL.is_match(folded)
}

/* ----------------------------
Entity sets and keywords
---------------------------- */

/// Pull named entities from the cased text with shallow role-word heuristics.
pub fn resolve_entities(normalized: &str) -> EntitySet {
    static RE_ORG: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"\b((?:Alcaldía|Gobernación|Federación|Liga|Club|Corporación|Fundación|Secretaría)(?:\s+(?:de\s+)?[A-ZÁÉÍÓÚÑ][\wáéíóúñ]*){1,3})",
        )
        .unwrap()
    });
    static RE_PERSON: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"\b(?:el|la)\s+(?:cantante|artista|alcalde(?:sa)?|dj|atleta|jugador|jugadora|chef)\s+([A-ZÁÉÍÓÚÑ][\wáéíóúñ]+(?:\s+[A-ZÁÉÍÓÚÑ][\wáéíóúñ]+)?)",
        )
        .unwrap()
    });
    static RE_LOC: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"\b((?:Estadio|Teatro|Coliseo|Parque|Auditorio|Plaza|Arena)(?:\s+[A-ZÁÉÍÓÚÑ][\wáéíóúñ]*){1,4})",
        )
        .unwrap()
    });

    let mut set = EntitySet::default();
    for c in RE_LOC.captures_iter(normalized) {
        push_unique(&mut set.locations, c[1].trim());
    }
    for c in RE_ORG.captures_iter(normalized) {
        push_unique(&mut set.organizations, c[1].trim());
    }
    for c in RE_PERSON.captures_iter(normalized) {
        push_unique(&mut set.people, c[1].trim());
    }
    set
}

fn push_unique(v: &mut Vec<String>, s: &str) {
    if !v.iter().any(|x| x == s) {
        v.push(s.to_string());
    }
}

const STOPWORDS: &[&str] = &[
    "para", "este", "esta", "estos", "estas", "como", "donde", "cuando", "sera", "sobre", "entre",
    "desde", "hasta", "tambien", "durante", "ciudad", "evento", "eventos", "gran", "todo", "toda",
    "todos", "todas", "ante", "segun", "tras", "porque", "ademas", "tiene", "tendra", "hace",
    "dias", "horas", "miles", "parte", "lugar",
];

/// Most frequent informative tokens, longest-frequency first, capped at `max`.
pub fn extract_keywords(folded: &str, max: usize) -> Vec<String> {
    let mut freq: Vec<(String, usize)> = Vec::new();
    for token in folded.split(|c: char| !c.is_alphanumeric()) {
        if token.len() <= 3 || token.chars().all(|c| c.is_numeric()) {
            continue;
        }
        if STOPWORDS.contains(&token) {
            continue;
        }
        match freq.iter_mut().find(|(t, _)| t == token) {
            Some((_, n)) => *n += 1,
            None => freq.push((token.to_string(), 1)),
        }
    }
    freq.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.len().cmp(&a.0.len())));
    freq.truncate(max);
    freq.into_iter().map(|(t, _)| t).collect()
}

// src/extract/mod.rs
//! Feature extraction facade: runs every resolver over one article and
//! assembles the [`FeatureRecord`]. Individual resolvers are infallible and
//! degrade to `None`; extraction as a whole only fails on upstream problems
//! (config, storage), never on uncooperative text.

pub mod classify;
pub mod dates;
pub mod entities;
pub mod quantity;

use tracing::debug;

use crate::augment::AugmentedFacts;
use crate::broadcast;
use crate::config::ConfigSnapshot;
use crate::normalize::{fold_for_matching, full_text};
use crate::types::{Article, FeatureRecord};

const MAX_KEYWORDS: usize = 8;

/// Extract a full feature record from one article. Always succeeds; an
/// uninformative article just yields a mostly-empty record with low
/// completeness.
pub fn extract(article: &Article, cfg: &ConfigSnapshot) -> FeatureRecord {
    let text = full_text(&article.title, &article.content);
    let folded = fold_for_matching(&text);

    let class = classify::classify(&folded, cfg);
    let temporal = dates::resolve(&folded, article.published_at);
    let attendance = quantity::resolve_attendance(&folded);
    let places = entities::resolve_places(&text, &folded);
    let ents = entities::resolve_entities(&text);
    let keywords = entities::extract_keywords(&folded, MAX_KEYWORDS);

    let bc = broadcast::assess(&folded, class.event_type.as_deref(), attendance, cfg);

    // With no crowd figure, a recognized event still gets a scale from the
    // adjectives in the text.
    let scale = match attendance {
        Some(n) => Some(quantity::scale_for(n)),
        None if class.event_type.is_some() => Some(quantity::scale_hint(&folded)),
        None => None,
    };

    let mut record = FeatureRecord {
        event_type: class.event_type,
        event_subtype: class.event_subtype,
        sport_type: bc.sport_type,
        competition_level: bc.competition_level,
        city: places.city,
        neighborhood: places.neighborhood,
        venue: places.venue,
        event_country: places.country,
        national_involvement: places.national_involvement,
        event_start: temporal.start,
        event_end: temporal.end,
        duration_hours: temporal.duration_hours,
        attendance,
        scale,
        keywords,
        entities: ents,
        hype_score: bc.hype_score,
        broadcastability: bc.score,
        is_broadcastable: bc.is_broadcastable,
        completeness: 0.0,
        config_version: cfg.version,
    };
    record.completeness = completeness(&record);

    debug!(
        target: "extract",
        article_id = article.id,
        event_type = record.event_type.as_deref().unwrap_or("-"),
        completeness = record.completeness,
        config_version = record.config_version,
        "features extracted"
    );
    record
}

/// Fraction of the fixed field checklist that is populated. The checklist is
/// deliberately frozen; adding fields to [`FeatureRecord`] does not silently
/// change historical completeness values.
pub fn completeness(r: &FeatureRecord) -> f32 {
    let checks: [bool; 20] = [
        r.event_type.is_some(),
        r.event_subtype.is_some(),
        r.sport_type.is_some(),
        r.competition_level.is_some(),
        r.city.is_some(),
        r.neighborhood.is_some(),
        r.venue.is_some(),
        r.event_country.is_some(),
        r.event_start.is_some(),
        r.event_end.is_some(),
        r.duration_hours.is_some(),
        r.attendance.is_some(),
        r.scale.is_some(),
        !r.keywords.is_empty(),
        !r.entities.locations.is_empty(),
        !r.entities.organizations.is_empty(),
        !r.entities.people.is_empty(),
        r.hype_score > 0.0,
        r.broadcastability > 0.0,
        r.national_involvement,
    ];
    let populated = checks.iter().filter(|&&c| c).count();
    populated as f32 / checks.len() as f32
}

/// Merge augmented facts into a record, filling gaps only. Locally extracted
/// values always win over the collaborator's. Scale and completeness are
/// recomputed when the merge changed anything.
pub fn merge_augmented(record: &mut FeatureRecord, aug: &AugmentedFacts) {
    fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
        if slot.is_none() {
            *slot = value.clone();
        }
    }

    let had_attendance = record.attendance.is_some();

    fill(&mut record.event_type, &aug.event_type);
    fill(&mut record.event_subtype, &aug.event_subtype);
    fill(&mut record.city, &aug.city);
    fill(&mut record.neighborhood, &aug.neighborhood);
    fill(&mut record.venue, &aug.venue);
    fill(&mut record.event_country, &aug.event_country);
    fill(&mut record.event_start, &aug.event_start);
    fill(&mut record.event_end, &aug.event_end);
    fill(&mut record.duration_hours, &aug.duration_hours);
    fill(&mut record.attendance, &aug.attendance);

    for kw in &aug.keywords {
        if record.keywords.len() >= MAX_KEYWORDS {
            break;
        }
        if !record.keywords.contains(kw) {
            record.keywords.push(kw.clone());
        }
    }

    // A freshly filled crowd figure overrides any adjective-based guess.
    if !had_attendance {
        if let Some(n) = record.attendance {
            record.scale = Some(quantity::scale_for(n));
        }
    }
    record.completeness = completeness(record);
}

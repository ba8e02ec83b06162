// src/relevance.rs
//! Per-business relevance: a hard prefilter on the article, a geographic
//! gate per business, and a weighted blend for pairs that pass both.
//!
//! The one exception to the geo gate is broadcastability: an event worth
//! watching on a screen is relevant to a venue with screens no matter where
//! it happens, scored as broadcastability discounted by a config multiplier
//! rather than through the regular blend.
//!
//! Logging here never includes raw article text; text is identified by a
//! stable hash, same as every other module that touches content.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ConfigSnapshot;
use crate::types::{Business, EventScale, FeatureRecord};

/// Suitability for event types missing from the config table.
const UNKNOWN_SUITABILITY: f32 = 0.4;
/// Each hospitality keyword adds this much, up to [`HOSPITALITY_CAP`].
const HOSPITALITY_STEP: f32 = 0.1;
const HOSPITALITY_CAP: f32 = 0.3;
/// Each negative keyword subtracts this much.
const NEGATIVE_PENALTY: f32 = 0.2;

const W_SUITABILITY: f32 = 0.3;
const W_KEYWORDS: f32 = 0.2;
const W_TYPE_AFFINITY: f32 = 0.15;
const NEIGHBORHOOD_BONUS: f32 = 0.3;

// business_type -> event types it naturally serves
const TYPE_AFFINITY: &[(&str, &[&str])] = &[
    ("pub", &["sports_match", "concert", "nightlife"]),
    ("bar", &["sports_match", "concert", "nightlife"]),
    ("restaurant", &["food_event", "festival", "cultural"]),
    ("coffee_shop", &["cultural", "conference", "exposition"]),
    ("bookstore", &["cultural", "conference"]),
    ("hotel", &["festival", "conference", "sports_match"]),
    ("club", &["nightlife", "concert"]),
];

pub fn anon_hash(text: &str) -> u64 {
    let mut h = DefaultHasher::new();
    text.hash(&mut h);
    h.finish()
}

/* ----------------------------
Article prefilter
---------------------------- */

#[derive(Debug, Clone, PartialEq)]
pub struct PrefilterOutcome {
    pub suitable: bool,
    pub suitability: f32,
    /// Set when a hard gate rejected the article outright.
    pub rejected: Option<&'static str>,
}

/// Hard gates plus base suitability for the article itself. Articles that
/// fail here never reach per-business scoring.
pub fn prefilter(
    record: &FeatureRecord,
    folded: &str,
    published_at: DateTime<Utc>,
    now: DateTime<Utc>,
    cfg: &ConfigSnapshot,
) -> PrefilterOutcome {
    let t = &cfg.thresholds;

    if folded.len() < t.min_content_chars {
        return rejected("content_too_short");
    }
    if (now - published_at).num_days() > t.max_article_age_days {
        return rejected("article_too_old");
    }
    // An event nobody can place is not actionable for any business.
    if record.city.is_none() && record.venue.is_none() {
        return rejected("missing_location");
    }

    // Events abroad score through the "international" row regardless of the
    // classified type, unless the home country is actually involved.
    let type_key = match (&record.event_country, record.national_involvement) {
        (Some(c), false) if c != "Colombia" => "international",
        _ => record.event_type.as_deref().unwrap_or("unknown"),
    };
    let base = cfg
        .suitability
        .get(type_key)
        .copied()
        .unwrap_or(UNKNOWN_SUITABILITY);

    let hospitality = cfg
        .hospitality_keywords
        .iter()
        .filter(|k| folded.contains(k.as_str()))
        .count() as f32
        * HOSPITALITY_STEP;
    let negatives = cfg
        .negative_keywords
        .iter()
        .filter(|k| folded.contains(k.as_str()))
        .count() as f32
        * NEGATIVE_PENALTY;

    let suitability =
        (base + hospitality.min(HOSPITALITY_CAP) - negatives).clamp(0.0, 1.0);
    let suitable = suitability >= t.suitability;

    debug!(
        target: "relevance",
        text_hash = anon_hash(folded),
        type_key = type_key,
        suitability = suitability,
        suitable = suitable,
        "article prefiltered"
    );
    PrefilterOutcome {
        suitable,
        suitability,
        rejected: None,
    }
}

fn rejected(reason: &'static str) -> PrefilterOutcome {
    PrefilterOutcome {
        suitable: false,
        suitability: 0.0,
        rejected: Some(reason),
    }
}

/* ----------------------------
Per-business scoring
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelevanceOutcome {
    pub score: f32,
    /// True when the score came from the broadcastability override instead
    /// of the regular blend.
    pub via_broadcast: bool,
    pub reasons: Vec<String>,
}

/// Score one (article, business) pair. A zero score means the pair failed
/// the geographic gate and no override applied.
pub fn score_business(
    record: &FeatureRecord,
    suitability: f32,
    business: &Business,
    folded: &str,
    cfg: &ConfigSnapshot,
) -> RelevanceOutcome {
    let mut reasons = Vec::new();

    let local = record
        .city
        .as_deref()
        .map(|c| c.eq_ignore_ascii_case(&business.city))
        .unwrap_or(false);
    let national = business.include_national_events
        && record
            .event_country
            .as_deref()
            .map(|c| c == business.country)
            .unwrap_or(false);

    // Home-country involvement abroad carries the same weight as a national
    // event: the crowd watching is local even when the venue is not.
    let involved = record.national_involvement;

    if !local && !national && !involved {
        // Geo gate failed; only the broadcast override can save the pair.
        if record.is_broadcastable && business.screen_broadcast {
            let score = (record.broadcastability * cfg.thresholds.broadcast_discount)
                .clamp(0.0, 1.0);
            reasons.push(format!(
                "broadcastable event ({:.2}) for a venue with screens",
                record.broadcastability
            ));
            return RelevanceOutcome {
                score,
                via_broadcast: true,
                reasons,
            };
        }
        return RelevanceOutcome::default();
    }
    reasons.push(if local {
        "event in the business's city".to_string()
    } else if national {
        "national event, business opted in".to_string()
    } else {
        "home country involved in the event".to_string()
    });

    let mut score = suitability * W_SUITABILITY;
    if suitability > 0.0 {
        reasons.push(format!("event suitability {suitability:.2}"));
    }

    let kw = keyword_score(record, business, folded);
    if kw != 0.0 {
        score += kw * W_KEYWORDS;
        reasons.push(format!("business keyword match {kw:.2}"));
    }

    if let Some(t) = record.event_type.as_deref() {
        let affine = TYPE_AFFINITY
            .iter()
            .any(|(bt, evs)| *bt == business.business_type && evs.contains(&t));
        if affine {
            score += W_TYPE_AFFINITY;
            reasons.push(format!("{} businesses match {t} events", business.business_type));
        }
    }

    if let Some(scale) = record.scale {
        let bonus = match scale {
            EventScale::Massive => 0.2,
            EventScale::Large => 0.15,
            EventScale::Medium => 0.05,
            EventScale::Small => 0.0,
        };
        if bonus > 0.0 {
            score += bonus;
            reasons.push(format!("{} scale event", scale.as_str()));
        }
    }

    if let (Some(en), Some(bn)) = (&record.neighborhood, &business.neighborhood) {
        if en.eq_ignore_ascii_case(bn) {
            score += NEIGHBORHOOD_BONUS;
            reasons.push(format!("event in the business's neighborhood ({en})"));
        }
    }

    RelevanceOutcome {
        score: score.clamp(0.0, 1.0),
        via_broadcast: false,
        reasons,
    }
}

/// Net matched keyword weight in [-1, 1]. Positive keywords add their
/// weight, negative ones subtract it.
fn keyword_score(record: &FeatureRecord, business: &Business, folded: &str) -> f32 {
    let mut total = 0.0f32;
    for k in &business.keywords {
        let needle = k.keyword.to_lowercase();
        let hit = folded.contains(&needle) || record.keywords.iter().any(|w| *w == needle);
        if hit {
            if k.negative {
                total -= k.weight;
            } else {
                total += k.weight;
            }
        }
    }
    total.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Business, BusinessKeyword, FeatureRecord};
    use chrono::{Duration, TimeZone};

    fn cfg() -> ConfigSnapshot {
        let ext = r#"
hospitality_keywords = ["gastronomia", "cerveza"]
negative_keywords = ["tragedia", "accidente"]

[suitability]
sports_match = 0.85
festival = 0.90
politics = 0.15
international = 0.10
"#;
        ConfigSnapshot::from_toml_strs(ext, "", 1).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
    }

    fn long(folded: &str) -> String {
        format!("{folded} {}", "relleno ".repeat(20))
    }

    #[test]
    fn short_content_is_hard_rejected() {
        let p = prefilter(&FeatureRecord::default(), "corto", now(), now(), &cfg());
        assert_eq!(p.rejected, Some("content_too_short"));
        assert!(!p.suitable);
    }

    #[test]
    fn stale_article_is_hard_rejected() {
        let published = now() - Duration::days(45);
        let p = prefilter(
            &FeatureRecord::default(),
            &long("festival de verano"),
            published,
            now(),
            &cfg(),
        );
        assert_eq!(p.rejected, Some("article_too_old"));
    }

    #[test]
    fn unlocatable_event_is_hard_rejected() {
        let r = FeatureRecord {
            event_type: Some("festival".into()),
            ..Default::default()
        };
        let p = prefilter(&r, &long("festival sin lugar anunciado"), now(), now(), &cfg());
        assert_eq!(p.rejected, Some("missing_location"));

        let r = FeatureRecord {
            event_type: Some("festival".into()),
            venue: Some("Parque Norte".into()),
            ..Default::default()
        };
        let p = prefilter(&r, &long("festival en el parque"), now(), now(), &cfg());
        assert_eq!(p.rejected, None);
    }

    #[test]
    fn suitability_from_type_with_negative_penalty() {
        let r = FeatureRecord {
            event_type: Some("festival".into()),
            city: Some("Medellín".into()),
            ..Default::default()
        };
        let p = prefilter(&r, &long("festival en la ciudad"), now(), now(), &cfg());
        assert!((p.suitability - 0.90).abs() < 1e-6);

        let p = prefilter(
            &r,
            &long("festival marcado por una tragedia"),
            now(),
            now(),
            &cfg(),
        );
        assert!((p.suitability - 0.70).abs() < 1e-6);
    }

    #[test]
    fn foreign_event_scores_as_international() {
        let r = FeatureRecord {
            event_type: Some("sports_match".into()),
            event_country: Some("Brasil".into()),
            venue: Some("Estadio Maracaná".into()),
            ..Default::default()
        };
        let p = prefilter(&r, &long("partido en brasil"), now(), now(), &cfg());
        assert!((p.suitability - 0.10).abs() < 1e-6);
        assert!(!p.suitable);
    }

    #[test]
    fn national_involvement_keeps_real_type() {
        let r = FeatureRecord {
            event_type: Some("sports_match".into()),
            event_country: Some("Brasil".into()),
            venue: Some("Estadio Maracaná".into()),
            national_involvement: true,
            ..Default::default()
        };
        let p = prefilter(&r, &long("colombia juega en brasil"), now(), now(), &cfg());
        assert!((p.suitability - 0.85).abs() < 1e-6);
    }

    #[test]
    fn geo_gate_blocks_other_city() {
        let r = FeatureRecord {
            event_type: Some("festival".into()),
            city: Some("Bogotá".into()),
            ..Default::default()
        };
        let b = Business::new(1, "Cafe Andino", "coffee_shop", "Medellín");
        let out = score_business(&r, 0.9, &b, "festival en bogota", &cfg());
        assert_eq!(out.score, 0.0);
        assert!(out.reasons.is_empty());
    }

    #[test]
    fn broadcast_override_beats_geo_gate() {
        let r = FeatureRecord {
            event_type: Some("sports_match".into()),
            event_country: Some("Catar".into()),
            broadcastability: 0.9,
            is_broadcastable: true,
            ..Default::default()
        };
        let mut b = Business::new(1, "La Tribuna", "pub", "Medellín");
        b.screen_broadcast = true;
        let out = score_business(&r, 0.85, &b, "final del mundial en doha", &cfg());
        assert!(out.via_broadcast);
        assert!((out.score - 0.9 * 0.75).abs() < 1e-6);

        b.screen_broadcast = false;
        let out = score_business(&r, 0.85, &b, "final del mundial en doha", &cfg());
        assert_eq!(out.score, 0.0);
    }

    #[test]
    fn involvement_scores_without_screens() {
        // Colombia playing abroad matters to a screenless cafe too.
        let r = FeatureRecord {
            event_type: Some("sports_match".into()),
            event_country: Some("Catar".into()),
            venue: Some("Estadio Lusail".into()),
            national_involvement: true,
            scale: Some(EventScale::Massive),
            ..Default::default()
        };
        let b = Business::new(1, "Cafe Andino", "coffee_shop", "Medellín");
        assert!(!b.screen_broadcast);
        let out = score_business(&r, 0.85, &b, "colombia jugara la final en doha", &cfg());
        assert!(!out.via_broadcast);
        // 0.85*0.3 + 0.2 massive bonus
        assert!((out.score - 0.455).abs() < 1e-3);
        assert!(out
            .reasons
            .iter()
            .any(|r| r.contains("home country involved")));
    }

    #[test]
    fn local_blend_accumulates_components() {
        let r = FeatureRecord {
            event_type: Some("sports_match".into()),
            city: Some("Medellín".into()),
            neighborhood: Some("Laureles".into()),
            scale: Some(EventScale::Large),
            ..Default::default()
        };
        let mut b = Business::new(1, "La Tribuna", "pub", "Medellín");
        b.neighborhood = Some("Laureles".into());
        b.keywords = vec![BusinessKeyword {
            keyword: "futbol".into(),
            weight: 0.8,
            negative: false,
        }];
        let out = score_business(&r, 0.85, &b, "partido de futbol en laureles", &cfg());
        // 0.85*0.3 + 0.8*0.2 + 0.15 + 0.15 + 0.3 = 1.015 -> clamped
        assert_eq!(out.score, 1.0);
        assert!(!out.via_broadcast);
        assert!(out.reasons.len() >= 4);
    }

    #[test]
    fn negative_business_keyword_subtracts() {
        let r = FeatureRecord {
            event_type: Some("politics".into()),
            city: Some("Medellín".into()),
            ..Default::default()
        };
        let mut b = Business::new(1, "Cafe Andino", "coffee_shop", "Medellín");
        b.keywords = vec![BusinessKeyword {
            keyword: "protesta".into(),
            weight: 0.5,
            negative: true,
        }];
        let with = score_business(&r, 0.15, &b, "protesta frente a la alcaldia", &cfg());
        let without = score_business(&r, 0.15, &b, "acto en la alcaldia", &cfg());
        assert!(with.score < without.score);
    }
}

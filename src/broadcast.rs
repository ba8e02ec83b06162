// src/broadcast.rs
//! Broadcastability scoring for spectator events.
//!
//! A weighted blend of four components: sport audience appeal, competition
//! level, hype indicators in the text, and expected attendance. The weights
//! and the sport/competition taxonomies come from the config snapshot; hype
//! boosts accumulate and are clamped to 1.0. Events at or above `min_score`
//! are flagged broadcastable, which later lets venues with screens match
//! events happening far away.

use tracing::debug;

use crate::config::ConfigSnapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastAssessment {
    pub sport_type: Option<String>,
    pub competition_level: Option<String>,
    pub hype_score: f32,
    pub score: f32,
    pub is_broadcastable: bool,
}

/// Appeal used when the event is clearly sports but no configured sport
/// keyword hit.
const DEFAULT_SPORT_APPEAL: f32 = 0.5;
/// Competition multipliers are normalized against this ceiling.
const COMPETITION_CEILING: f32 = 3.0;
/// Normalized competition component when no competition level was detected.
const DEFAULT_COMPETITION: f32 = 0.33;

pub fn assess(
    folded: &str,
    event_type: Option<&str>,
    attendance: Option<u64>,
    cfg: &ConfigSnapshot,
) -> BroadcastAssessment {
    let w = &cfg.broadcast;

    let sport = cfg
        .sports
        .iter()
        .find(|s| s.keywords.iter().any(|k| folded.contains(k.as_str())));

    let is_sporting = matches!(event_type, Some("sports_match" | "marathon"));
    if sport.is_none() && !is_sporting {
        // Not a spectator event. The default competition component would
        // otherwise hand every article a nonzero floor.
        return BroadcastAssessment::default();
    }
    let appeal = match sport {
        Some(s) => s.appeal,
        None => DEFAULT_SPORT_APPEAL,
    };

    // Sport-scoped competitions only fire for their own sport.
    let competition = cfg.competitions.iter().find(|c| {
        let sport_ok = match (&c.sport, sport) {
            (Some(want), Some(s)) => want == &s.code,
            (Some(_), None) => false,
            (None, _) => true,
        };
        sport_ok && c.keywords.iter().any(|k| folded.contains(k.as_str()))
    });
    let competition_component = competition
        .map(|c| (c.multiplier / COMPETITION_CEILING).clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_COMPETITION);

    let hype = cfg
        .hype
        .iter()
        .filter(|h| h.re.is_match(folded))
        .map(|h| h.cfg.boost)
        .sum::<f32>()
        .clamp(0.0, 1.0);

    let attendance_component = match attendance {
        None => 0.0,
        Some(n) if n < w.attendance_small => 0.2,
        Some(n) if n < w.attendance_medium => 0.5,
        Some(n) if n < w.attendance_large => 0.8,
        Some(_) => 1.0,
    };

    let score = (w.sport_appeal * appeal
        + w.competition_level * competition_component
        + w.hype_indicators * hype
        + w.attendance * attendance_component)
        .clamp(0.0, 1.0);
    let is_broadcastable = score >= w.min_score;

    debug!(
        target: "broadcast",
        sport = sport.map(|s| s.code.as_str()).unwrap_or("-"),
        competition = competition.map(|c| c.code.as_str()).unwrap_or("-"),
        hype = hype,
        score = score,
        broadcastable = is_broadcastable,
        "broadcastability assessed"
    );

    BroadcastAssessment {
        sport_type: sport.map(|s| s.code.clone()),
        competition_level: competition.map(|c| c.code.clone()),
        hype_score: hype,
        score,
        is_broadcastable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSnapshot;

    const BC_TOML: &str = r#"
[weights]
min_score = 0.55

[[sports]]
code = "soccer"
appeal = 0.95
keywords = ["futbol", "partido"]

[[sports]]
code = "chess"
appeal = 0.15
keywords = ["ajedrez"]

[[competitions]]
code = "world_cup"
sport = "soccer"
multiplier = 3.0
keywords = ["mundial", "copa del mundo"]

[[competitions]]
code = "friendly"
multiplier = 0.8
keywords = ["amistoso"]

[[hype]]
pattern = "historico|imperdible"
boost = 0.3
category = "superlatives"

[[hype]]
pattern = "agotad[ao]s?|boleteria agotada"
boost = 0.3
category = "sellout"
"#;

    fn cfg() -> ConfigSnapshot {
        ConfigSnapshot::from_toml_strs("", BC_TOML, 1).unwrap()
    }

    #[test]
    fn world_cup_match_is_broadcastable() {
        let a = assess(
            "partido historico del mundial de futbol con boleteria agotada",
            Some("sports_match"),
            Some(60_000),
            &cfg(),
        );
        assert_eq!(a.sport_type.as_deref(), Some("soccer"));
        assert_eq!(a.competition_level.as_deref(), Some("world_cup"));
        assert!(a.is_broadcastable, "score was {}", a.score);
        // 0.35*0.95 + 0.30*1.0 + 0.20*0.6 + 0.15*1.0 = 0.9025
        assert!((a.score - 0.9025).abs() < 1e-3);
    }

    #[test]
    fn low_appeal_sport_is_not_broadcastable() {
        let a = assess(
            "torneo de ajedrez municipal",
            Some("sports_match"),
            Some(200),
            &cfg(),
        );
        assert_eq!(a.sport_type.as_deref(), Some("chess"));
        assert!(!a.is_broadcastable);
    }

    #[test]
    fn sport_scoped_competition_needs_its_sport() {
        // "mundial" alone without a soccer keyword must not bind world_cup.
        let a = assess("mundial de ajedrez", Some("sports_match"), None, &cfg());
        assert_eq!(a.sport_type.as_deref(), Some("chess"));
        assert_ne!(a.competition_level.as_deref(), Some("world_cup"));
    }

    #[test]
    fn non_spectator_event_scores_zero() {
        let a = assess("concierto imperdible", Some("concert"), Some(10_000), &cfg());
        assert_eq!(a, BroadcastAssessment::default());
        assert_eq!(a.score, 0.0);
        assert!(!a.is_broadcastable);
    }

    #[test]
    fn sport_keyword_alone_makes_event_spectator() {
        // A festival article that is really about a match still qualifies.
        let a = assess(
            "festival del futbol con partido de exhibicion",
            Some("festival"),
            Some(8_000),
            &cfg(),
        );
        assert_eq!(a.sport_type.as_deref(), Some("soccer"));
        assert!(a.score > 0.0);
    }

    #[test]
    fn unknown_sport_in_sports_match_gets_default_appeal() {
        let a = assess("gran partido de criquet", Some("sports_match"), None, &cfg());
        // "partido" hits soccer keywords; use a text without it.
        let b = assess("encuentro de criquet internacional", Some("sports_match"), None, &cfg());
        assert!(a.score >= b.score);
        assert_eq!(b.sport_type, None);
        assert!(b.score > 0.0);
    }
}

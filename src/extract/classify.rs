// src/extract/classify.rs
//! Event classification: admin-configured patterns layered over a built-in
//! fallback table, so a fresh deployment classifies sensibly before any
//! configuration is written.
//!
//! Candidates from both sources compete in one pool. The most specific match
//! wins, measured by the length of the matched text; equal specificity falls
//! back to pattern priority. Coarse civic categories (politics) only win when
//! no concrete event category matched at all, so "partido de futbol contra la
//! violencia, anuncio el alcalde" still classifies as a sports match.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ConfigSnapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub event_type: Option<String>,
    pub event_subtype: Option<String>,
}

struct BuiltinPattern {
    event_type: &'static str,
    subtype: Option<&'static str>,
    re: Regex,
    priority: i32,
}

/// Category that never outranks a concrete event category.
fn is_coarse(event_type: &str) -> bool {
    event_type == "politics"
}

static BUILTIN: Lazy<Vec<BuiltinPattern>> = Lazy::new(|| {
    let table: &[(&str, Option<&str>, &str, i32)] = &[
        // type-level
        ("sports_match", None, r"\bpartido\b|\bclasico\b|\bvs\.?\b|\bversus\b|copa\s+\w+|torneo\s+de", 10),
        ("concert", None, r"\bconcierto\b|\ben\s+vivo\b|gira\s+de|presentacion\s+musical", 10),
        ("festival", None, r"\bfestival\b|\bcarnaval\b|feria\s+de\s+\w+", 8),
        ("food_event", None, r"festival\s+gastronomico|feria\s+gastronomica|\bdegustacion\b|muestra\s+culinaria", 12),
        ("cultural", None, r"obra\s+de\s+teatro|exposicion\s+de\s+arte|\bmuseo\b|funcion\s+de\s+danza", 8),
        ("marathon", None, r"\bmaraton\b|media\s+maraton|carrera\s+atletica|carrera\s+(?:5|10|21)k", 10),
        ("conference", None, r"\bcongreso\b|\bconferencia\b|\bcumbre\b|\bseminario\b|\bforo\b", 6),
        ("exposition", None, r"\bexposicion\b|feria\s+comercial|\bmuestra\b", 5),
        ("nightlife", None, r"\bfiesta\b|\bdiscoteca\b|\brumba\b|presentacion\s+de\s+dj", 6),
        ("politics", None, r"\balcalde\b|\bgobernador\b|\belecciones\b|\bconcejo\b|\bdecreto\b", 4),
        // subtypes
        ("sports_match", Some("soccer"), r"\bfutbol\b|\bbalompie\b", 0),
        ("sports_match", Some("cycling"), r"\bciclismo\b|vuelta\s+a\s+\w+", 0),
        ("sports_match", Some("basketball"), r"\bbaloncesto\b|\bbasquet", 0),
        ("concert", Some("rock"), r"\brock\b|\bmetal\b", 0),
        ("concert", Some("popular"), r"\breggaeton\b|\bvallenato\b|\bsalsa\b", 0),
        ("festival", Some("music"), r"festival\s+(?:de\s+musica|estereo)", 0),
    ];
    table
        .iter()
        .map(|(t, s, p, pr)| BuiltinPattern {
            event_type: t,
            subtype: *s,
            re: Regex::new(p).unwrap(),
            priority: *pr,
        })
        .collect()
});

/// Classify accent-folded text into (event_type, event_subtype).
pub fn classify(text: &str, cfg: &ConfigSnapshot) -> Classification {
    // (type, match_len, priority)
    let mut candidates: Vec<(&str, usize, i32)> = Vec::new();

    for p in &cfg.patterns {
        if p.cfg.subtype.is_some() {
            continue;
        }
        if let Some(m) = p.re.find(text) {
            candidates.push((&p.cfg.event_type, m.len(), p.cfg.priority));
        }
    }
    for b in BUILTIN.iter().filter(|b| b.subtype.is_none()) {
        if let Some(m) = b.re.find(text) {
            candidates.push((b.event_type, m.len(), b.priority));
        }
    }

    // Two pools so coarse categories cannot shadow concrete ones.
    let pick = |pool: &[&(&str, usize, i32)]| -> Option<String> {
        pool.iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)))
            .map(|(t, _, _)| t.to_string())
    };
    let concrete: Vec<_> = candidates.iter().filter(|(t, _, _)| !is_coarse(t)).collect();
    let coarse: Vec<_> = candidates.iter().filter(|(t, _, _)| is_coarse(t)).collect();
    let event_type = pick(&concrete).or_else(|| pick(&coarse));

    let event_subtype = event_type.as_deref().and_then(|t| {
        for p in &cfg.patterns {
            if p.cfg.event_type == t {
                if let Some(sub) = &p.cfg.subtype {
                    if p.re.is_match(text) {
                        return Some(sub.clone());
                    }
                }
            }
        }
        BUILTIN
            .iter()
            .filter(|b| b.event_type == t)
            .find_map(|b| match b.subtype {
                Some(s) if b.re.is_match(text) => Some(s.to_string()),
                _ => None,
            })
    });

    Classification {
        event_type,
        event_subtype,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSnapshot;

    fn builtin_cfg() -> ConfigSnapshot {
        ConfigSnapshot::builtin()
    }

    #[test]
    fn soccer_match_with_subtype() {
        let c = classify("partido de futbol colombia vs brasil", &builtin_cfg());
        assert_eq!(c.event_type.as_deref(), Some("sports_match"));
        assert_eq!(c.event_subtype.as_deref(), Some("soccer"));
    }

    #[test]
    fn concrete_category_beats_politics() {
        let c = classify(
            "el alcalde anuncio un concierto en vivo en el parque",
            &builtin_cfg(),
        );
        assert_eq!(c.event_type.as_deref(), Some("concert"));
    }

    #[test]
    fn politics_when_nothing_else_matches() {
        let c = classify("el alcalde firmo un decreto sobre movilidad", &builtin_cfg());
        assert_eq!(c.event_type.as_deref(), Some("politics"));
    }

    #[test]
    fn food_event_outranks_plain_festival() {
        let c = classify("gran festival gastronomico en el barrio", &builtin_cfg());
        assert_eq!(c.event_type.as_deref(), Some("food_event"));
    }

    #[test]
    fn config_patterns_join_the_pool() {
        let ext = r#"
[[patterns]]
event_type = "esports"
pattern = "torneo\\s+de\\s+videojuegos"
priority = 20
"#;
        let cfg = ConfigSnapshot::from_toml_strs(ext, "", 1).unwrap();
        let c = classify("torneo de videojuegos este sabado", &cfg);
        assert_eq!(c.event_type.as_deref(), Some("esports"));
    }

    #[test]
    fn unclassifiable_text_stays_empty() {
        let c = classify("informe del clima para la semana", &builtin_cfg());
        assert_eq!(c, Classification::default());
    }
}

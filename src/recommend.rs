// src/recommend.rs
//! Recommendation generation: turn a scored (business, article) pair into at
//! most two concrete actions from per-event-type templates.
//!
//! Effort is estimated hours normalized against a 20-hour ceiling; impact is
//! the relevance score with a small lift, capped at 1.0. Pairs that matched
//! through the broadcast override always lead with the screening action.

use crate::relevance::RelevanceOutcome;
use crate::types::{Business, FeatureRecord, Priority, Recommendation};
use chrono::{DateTime, Duration, Utc};

pub const MAX_PER_PAIR: usize = 2;
const EFFORT_CEILING_HOURS: f32 = 20.0;
const IMPACT_LIFT: f32 = 0.1;

struct Template {
    category: &'static str,
    action_type: &'static str,
    title: &'static str,
    description: &'static str,
    hours: f32,
}

const SCREENING: Template = Template {
    category: "marketing",
    action_type: "promote_screening",
    title: "Transmite el evento en tus pantallas",
    description: "Programa la transmisión, anúnciala en redes y prepara promociones para la jornada.",
    hours: 6.0,
};

fn templates_for(event_type: &str) -> &'static [Template] {
    match event_type {
        "sports_match" => &[
            SCREENING,
            Template {
                category: "inventory",
                action_type: "stock_up",
                title: "Refuerza inventario para día de partido",
                description: "Aumenta pedidos de bebidas y picadas; los días de partido el consumo sube de forma notable.",
                hours: 4.0,
            },
        ],
        "concert" | "festival" => &[
            Template {
                category: "marketing",
                action_type: "event_promotion",
                title: "Crea una promoción alusiva al evento",
                description: "Ofrece un combo o descuento para asistentes antes y después del evento.",
                hours: 5.0,
            },
            Template {
                category: "staffing",
                action_type: "add_staff",
                title: "Refuerza el personal para el fin del evento",
                description: "Programa turnos adicionales para las horas pico alrededor del evento.",
                hours: 8.0,
            },
        ],
        "food_event" => &[
            Template {
                category: "partnerships",
                action_type: "join_event",
                title: "Participa con un stand o menú especial",
                description: "Contacta a los organizadores para sumarte con una oferta gastronómica propia.",
                hours: 12.0,
            },
            Template {
                category: "marketing",
                action_type: "event_promotion",
                title: "Promociona tu carta durante el evento",
                description: "Destaca platos relacionados con la temática del evento en redes y en el local.",
                hours: 4.0,
            },
        ],
        "marathon" => &[
            Template {
                category: "operations",
                action_type: "adjust_hours",
                title: "Abre temprano el día de la carrera",
                description: "Ajusta el horario de apertura y ofrece desayunos para corredores y acompañantes.",
                hours: 3.0,
            },
            Template {
                category: "marketing",
                action_type: "event_promotion",
                title: "Ofrece promociones para corredores",
                description: "Un descuento al mostrar el número de competencia atrae al público del evento.",
                hours: 4.0,
            },
        ],
        "cultural" | "exposition" | "conference" => &[Template {
            category: "marketing",
            action_type: "event_promotion",
            title: "Conecta tu negocio con el evento",
            description: "Publica contenido alusivo y ofrece un beneficio a los asistentes que te visiten.",
            hours: 4.0,
        }],
        "nightlife" => &[
            Template {
                category: "staffing",
                action_type: "add_staff",
                title: "Prepara el equipo para una noche movida",
                description: "Refuerza barra y seguridad para la noche del evento.",
                hours: 8.0,
            },
            Template {
                category: "marketing",
                action_type: "event_promotion",
                title: "Súmate a la agenda de la noche",
                description: "Anuncia tu programación como plan previo o posterior al evento.",
                hours: 4.0,
            },
        ],
        _ => &[],
    }
}

/// Generate up to [`MAX_PER_PAIR`] recommendations for a pair that cleared
/// the relevance threshold. Returns an empty vec for unclassified events
/// with no override.
pub fn generate(
    business: &Business,
    article_id: u64,
    record: &FeatureRecord,
    outcome: &RelevanceOutcome,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut picked: Vec<&Template> = Vec::new();
    if outcome.via_broadcast {
        picked.push(&SCREENING);
    }
    if let Some(t) = record.event_type.as_deref() {
        for tpl in templates_for(t) {
            if picked.len() >= MAX_PER_PAIR {
                break;
            }
            if !picked.iter().any(|p| p.action_type == tpl.action_type) {
                picked.push(tpl);
            }
        }
    }
    picked.truncate(MAX_PER_PAIR);

    let priority = priority_for(outcome.score, record.event_start, now);
    picked
        .into_iter()
        .map(|tpl| Recommendation {
            business_id: business.id,
            article_id,
            category: tpl.category.to_string(),
            action_type: tpl.action_type.to_string(),
            priority,
            title: tpl.title.to_string(),
            description: tpl.description.to_string(),
            confidence_score: outcome.score,
            impact_score: (outcome.score + IMPACT_LIFT).min(1.0),
            effort_score: (tpl.hours / EFFORT_CEILING_HOURS).min(1.0),
        })
        .collect()
}

/// Urgency comes from both strength of the match and how soon the event is.
fn priority_for(score: f32, start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Priority {
    let imminent = start.is_some_and(|s| s > now && s - now <= Duration::days(3));
    if imminent && score >= 0.7 {
        Priority::Urgent
    } else if score >= 0.75 {
        Priority::High
    } else if score >= 0.55 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

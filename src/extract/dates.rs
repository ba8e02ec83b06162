// src/extract/dates.rs
//! Date, time, and duration resolution from Spanish event text.
//!
//! Resolution runs an ordered strategy chain; the first strategy to produce
//! a confident value wins:
//! 1. date-entity recognition (weekday-anchored mentions such as
//!    "domingo 27 de octubre"),
//! 2. a ranked battery of templates, most specific first — cross-month range,
//!    same-month range, single absolute date, numeric formats, relative
//!    expressions,
//! 3. a lenient fuzzy pass as last resort.
//!
//! Cross-month ranges must be tried before same-month ranges: a same-month
//! template can partially match "del 1 de agosto al 3 de septiembre" and
//! produce the wrong month. Ranges always resolve to their start date; the
//! resolver reconstructs a normalized "day de month[ de year]" substring and
//! re-parses it instead of parsing the whole range expression.
//!
//! Time extraction is a separate pass layered on the resolved date so the
//! two concerns stay independent.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

/// Resolved temporal facts for one article. All fields optional; a text with
/// no recognizable dates yields the default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalFacts {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_hours: Option<f32>,
}

const MONTHS: &str =
    "enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre";

fn month_number(name: &str) -> Option<u32> {
    Some(match name {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    })
}

fn weekday_number(name: &str) -> Option<Weekday> {
    Some(match name {
        "lunes" => Weekday::Mon,
        "martes" => Weekday::Tue,
        "miercoles" => Weekday::Wed,
        "jueves" => Weekday::Thu,
        "viernes" => Weekday::Fri,
        "sabado" => Weekday::Sat,
        "domingo" => Weekday::Sun,
        _ => return None,
    })
}

// -- compiled templates, declared in evaluation order --

static RE_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:lunes|martes|miercoles|jueves|viernes|sabado|domingo)\s+(\d{{1,2}})\s+de\s+({MONTHS})(?:\s+de\s+(\d{{4}}))?"
    ))
    .unwrap()
});

static RE_CROSS_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\bdel?\s+(\d{{1,2}})\s+de\s+({MONTHS})\s+(?:al|hasta\s+el)\s+(\d{{1,2}})\s+de\s+({MONTHS})(?:\s+de\s+(\d{{4}}))?"
    ))
    .unwrap()
});

static RE_SAME_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\bdel?\s+(\d{{1,2}})\s+al\s+(\d{{1,2}})\s+de\s+({MONTHS})(?:\s+de\s+(\d{{4}}))?"
    ))
    .unwrap()
});

static RE_ABSOLUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:el\s+)?(?:proximo\s+)?(\d{{1,2}})\s+de\s+({MONTHS})(?:\s+de\s+(\d{{4}}))?"
    ))
    .unwrap()
});

static RE_NUMERIC_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());

static RE_NUMERIC_ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

static RE_REL_WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:este|el\s+proximo)\s+(lunes|martes|miercoles|jueves|viernes|sabado|domingo)\b")
        .unwrap()
});

static RE_FUZZY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(\d{{1,2}})\s*(?:de\s*)?({MONTHS})")).unwrap()
});

/// Resolve date + time + duration from accent-folded lowercase text.
/// `base` anchors relative expressions and year inference (dates without an
/// explicit year prefer the future).
pub fn resolve(text: &str, base: DateTime<Utc>) -> TemporalFacts {
    let (start_date, end_date) = resolve_dates(text, base);

    let time = resolve_time(text);
    let start = start_date.map(|d| at_time(d, time));
    let mut end = end_date.map(|d| at_time(d, time));

    let mut duration = resolve_duration_phrase(text);
    match (start, end, duration) {
        // Explicit phrase but no end date: project the end.
        (Some(s), None, Some(h)) => {
            end = Some(s + Duration::minutes((h * 60.0) as i64));
        }
        // Both bounds known, no phrase: derive duration as their difference.
        (Some(s), Some(e), None) if e > s => {
            duration = Some(((e - s).num_minutes() as f32) / 60.0);
        }
        _ => {}
    }

    TemporalFacts {
        start,
        end,
        duration_hours: duration,
    }
}

/// Strategy chain for the date itself. Returns (start, end-of-range).
fn resolve_dates(text: &str, base: DateTime<Utc>) -> (Option<NaiveDate>, Option<NaiveDate>) {
    // 1) Dedicated date-entity pass: weekday-anchored mentions.
    if let Some(c) = RE_ENTITY.captures(text) {
        let day: u32 = c[1].parse().unwrap_or(0);
        let month = month_number(&c[2]);
        let year = c.get(3).and_then(|m| m.as_str().parse::<i32>().ok());
        if let (1..=31, Some(m)) = (day, month) {
            if let Some(d) = build_date(day, m, year, base) {
                return (Some(d), None);
            }
        }
    }

    // 2) Ranked templates, most specific first.
    if let Some(c) = RE_CROSS_MONTH.captures(text) {
        let year = c.get(5).map(|m| m.as_str());
        let start = reparse_day_month(&c[1], &c[2], year, base);
        let end = reparse_day_month(&c[3], &c[4], year, base);
        if start.is_some() {
            return (start, end);
        }
    }

    if let Some(c) = RE_SAME_MONTH.captures(text) {
        let year = c.get(4).map(|m| m.as_str());
        let start = reparse_day_month(&c[1], &c[3], year, base);
        let end = reparse_day_month(&c[2], &c[3], year, base);
        if start.is_some() {
            return (start, end);
        }
    }

    if let Some(c) = RE_ABSOLUTE.captures(text) {
        let year = c.get(3).map(|m| m.as_str());
        if let Some(d) = reparse_day_month(&c[1], &c[2], year, base) {
            return (Some(d), None);
        }
    }

    if let Some(c) = RE_NUMERIC_DMY.captures(text) {
        let (d, m, y) = (
            c[1].parse().unwrap_or(0),
            c[2].parse().unwrap_or(0),
            c[3].parse().unwrap_or(0),
        );
        if let Some(d) = NaiveDate::from_ymd_opt(y, m, d) {
            return (Some(d), None);
        }
    }

    if let Some(c) = RE_NUMERIC_ISO.captures(text) {
        let (y, m, d) = (
            c[1].parse().unwrap_or(0),
            c[2].parse().unwrap_or(0),
            c[3].parse().unwrap_or(0),
        );
        if let Some(d) = NaiveDate::from_ymd_opt(y, m, d) {
            return (Some(d), None);
        }
    }

    if let Some(d) = resolve_relative(text, base) {
        return (Some(d), None);
    }

    // 3) Fuzzy last resort: any "N [de] month" fragment anywhere.
    if let Some(c) = RE_FUZZY.captures(text) {
        if let Some(d) = reparse_day_month(&c[1], &c[2], None, base) {
            return (Some(d), None);
        }
    }

    (None, None)
}

/// Range policy helper: rebuild a normalized "day + month [+ year]" and
/// parse that, rather than parsing the full range expression directly.
fn reparse_day_month(
    day: &str,
    month: &str,
    year: Option<&str>,
    base: DateTime<Utc>,
) -> Option<NaiveDate> {
    let day: u32 = day.parse().ok()?;
    let month = month_number(month)?;
    let year = year.and_then(|y| y.parse::<i32>().ok());
    build_date(day, month, year, base)
}

/// Build a date, inferring the year with future preference when absent:
/// a day/month already past relative to `base` rolls to the next year.
fn build_date(day: u32, month: u32, year: Option<i32>, base: DateTime<Utc>) -> Option<NaiveDate> {
    match year {
        Some(y) => NaiveDate::from_ymd_opt(y, month, day),
        None => {
            let today = base.date_naive();
            let candidate = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            if candidate < today {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)
            } else {
                Some(candidate)
            }
        }
    }
}

fn resolve_relative(text: &str, base: DateTime<Utc>) -> Option<NaiveDate> {
    let today = base.date_naive();

    // "pasado manana" must be checked before the bare "manana".
    static RE_AFTER_TOMORROW: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\bpasado\s+manana\b").unwrap());
    static RE_TOMORROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bmanana\b").unwrap());
    static RE_TODAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhoy\b").unwrap());
    static RE_WEEKEND: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\beste\s+fin\s+de\s+semana\b").unwrap());

    if RE_AFTER_TOMORROW.is_match(text) {
        return Some(today + Duration::days(2));
    }
    if let Some(c) = RE_REL_WEEKDAY.captures(text) {
        let target = weekday_number(&c[1])?;
        let ahead = (target.num_days_from_monday() + 7
            - today.weekday().num_days_from_monday())
            % 7;
        return Some(today + Duration::days(ahead as i64));
    }
    if RE_WEEKEND.is_match(text) {
        let ahead = (Weekday::Sat.num_days_from_monday() + 7
            - today.weekday().num_days_from_monday())
            % 7;
        return Some(today + Duration::days(ahead as i64));
    }
    if RE_TOMORROW.is_match(text) {
        return Some(today + Duration::days(1));
    }
    if RE_TODAY.is_match(text) {
        return Some(today);
    }
    None
}

/// Time-of-day pass, independent of date resolution.
pub fn resolve_time(text: &str) -> Option<NaiveTime> {
    // "a las 8:00 pm", "a las 10 am", "las 20:00 horas"
    static RE_A_LAS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\ba\s+las?\s+(\d{1,2})(?::(\d{2}))?\s*(a\.?m\.?|p\.?m\.?)?").unwrap()
    });
    // "4pm", "4 pm", "8:30pm"
    static RE_AMPM: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(a\.?m\.?|p\.?m\.?)").unwrap());
    // "20:00", "20:00 horas"
    static RE_24H: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})(?:\s*(?:horas|hrs|h)\b)?").unwrap());

    for re in [&*RE_A_LAS, &*RE_AMPM, &*RE_24H] {
        if let Some(c) = re.captures(text) {
            let mut hour: u32 = c[1].parse().ok()?;
            let minute: u32 = c.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
            let meridiem = c.get(3).map(|m| m.as_str());
            match meridiem {
                Some(m) if m.starts_with('p') && hour < 12 => hour += 12,
                Some(m) if m.starts_with('a') && hour == 12 => hour = 0,
                _ => {}
            }
            if let Some(t) = NaiveTime::from_hms_opt(hour, minute, 0) {
                return Some(t);
            }
        }
    }
    None
}

/// Explicit duration phrases mapped to hours via a fixed lookup table.
pub fn resolve_duration_phrase(text: &str) -> Option<f32> {
    static RE_ALL_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btodo\s+el\s+dia\b").unwrap());
    static RE_WEEKEND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfin\s+de\s+semana\b").unwrap());
    static RE_HOURS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b(?:durante|duracion\s+de)\s+(\d{1,3})\s+horas?\b").unwrap());
    static RE_DAYS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b(?:durante|duracion\s+de)\s+(\d{1,3})\s+dias?\b").unwrap());

    if let Some(c) = RE_HOURS.captures(text) {
        return c[1].parse::<f32>().ok();
    }
    if let Some(c) = RE_DAYS.captures(text) {
        return c[1].parse::<f32>().ok().map(|d| d * 24.0);
    }
    if RE_ALL_DAY.is_match(text) {
        return Some(12.0);
    }
    if RE_WEEKEND.is_match(text) {
        return Some(48.0);
    }
    None
}

fn at_time(date: NaiveDate, time: Option<NaiveTime>) -> DateTime<Utc> {
    let t = time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    Utc.from_utc_datetime(&date.and_time(t))
}

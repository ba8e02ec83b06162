// src/normalize.rs
//! Text normalization: HTML cleanup, whitespace collapse, and a lowercase
//! accent-folded view used by every pattern matcher downstream.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize raw article text: decode HTML entities, strip tags, normalize
/// typographic quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Lowercase + strip Spanish diacritics, so patterns can be written in
/// plain ASCII and still hit "Medellín", "fútbol", etc.
pub fn fold_for_matching(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        for lc in ch.to_lowercase() {
            out.push(match lc {
                'á' | 'à' | 'ä' | 'â' => 'a',
                'é' | 'è' | 'ë' | 'ê' => 'e',
                'í' | 'ì' | 'ï' | 'î' => 'i',
                'ó' | 'ò' | 'ö' | 'ô' => 'o',
                'ú' | 'ù' | 'ü' | 'û' => 'u',
                'ñ' => 'n',
                c => c,
            });
        }
    }
    out
}

/// Title and body joined the way every extractor consumes them.
pub fn full_text(title: &str, content: &str) -> String {
    let title = normalize_text(title);
    let content = normalize_text(content);
    if title.is_empty() {
        content
    } else {
        format!("{title} {content}")
    }
}

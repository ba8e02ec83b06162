// src/config.rs
//! Configuration snapshots: extraction patterns, broadcastability taxonomy,
//! scoring thresholds. Loaded from TOML, compiled once, and passed by value
//! into every extractor/scorer call so a scoring pass never observes a
//! half-updated config. Refresh happens on a coarse cadence outside the hot
//! path via [`ConfigHandle`].

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::info;

pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const ENV_CONFIG_DIR: &str = "SCOUT_CONFIG_DIR";
pub const ENV_RELEVANCE_THRESHOLD: &str = "SCOUT_RELEVANCE_THRESHOLD";

/* ----------------------------
TOML schema
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRoot {
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Base suitability per event type (PreFilter table).
    #[serde(default)]
    pub suitability: HashMap<String, f32>,
    #[serde(default)]
    pub patterns: Vec<PatternCfg>,
    #[serde(default)]
    pub hospitality_keywords: Vec<String>,
    #[serde(default)]
    pub negative_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Articles below this suitability never reach per-business scoring.
    pub suitability: f32,
    /// Completeness below which the augmentation collaborator is consulted.
    pub augment_completeness: f32,
    /// Relevance above which a (business, article) pair yields recommendations.
    pub relevance: f32,
    /// Hard prefilter: minimum normalized content length in chars.
    pub min_content_chars: usize,
    /// Hard prefilter: maximum article age in days at processing time.
    pub max_article_age_days: i64,
    /// Multiplier applied to broadcastability when the geo gate is bypassed.
    pub broadcast_discount: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            suitability: 0.3,
            augment_completeness: 0.7,
            relevance: 0.4,
            min_content_chars: 50,
            max_article_age_days: 30,
            broadcast_discount: 0.75,
        }
    }
}

/// One classification pattern. `subtype` present → subtype pattern for the
/// named event type; absent → type-level pattern.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternCfg {
    pub event_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    pub pattern: String,
    /// Tie-break between equally specific matches (higher wins).
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastRoot {
    #[serde(default)]
    pub weights: BroadcastWeights,
    #[serde(default)]
    pub sports: Vec<SportCfg>,
    #[serde(default)]
    pub competitions: Vec<CompetitionCfg>,
    #[serde(default)]
    pub hype: Vec<HypeCfg>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BroadcastWeights {
    pub sport_appeal: f32,
    pub competition_level: f32,
    pub hype_indicators: f32,
    pub attendance: f32,
    /// Events at or above this score are considered broadcastable.
    pub min_score: f32,
    pub attendance_small: u64,
    pub attendance_medium: u64,
    pub attendance_large: u64,
}

impl Default for BroadcastWeights {
    fn default() -> Self {
        Self {
            sport_appeal: 0.35,
            competition_level: 0.30,
            hype_indicators: 0.20,
            attendance: 0.15,
            min_score: 0.55,
            attendance_small: 5_000,
            attendance_medium: 20_000,
            attendance_large: 50_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SportCfg {
    pub code: String,
    /// Regional audience appeal in [0,1].
    pub appeal: f32,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompetitionCfg {
    pub code: String,
    #[serde(default)]
    pub sport: Option<String>,
    /// Broadcast multiplier; normalized against 3.0 when scored.
    pub multiplier: f32,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HypeCfg {
    pub pattern: String,
    pub boost: f32,
    pub category: String,
}

/* ----------------------------
Compiled snapshot
---------------------------- */

#[derive(Debug)]
pub struct CompiledPattern {
    pub cfg: PatternCfg,
    pub re: Regex,
}

#[derive(Debug)]
pub struct CompiledHype {
    pub cfg: HypeCfg,
    pub re: Regex,
}

/// Immutable, versioned view of all admin-owned configuration. Cheap to
/// clone via `Arc`; extractors and scorers take `&ConfigSnapshot` and never
/// mutate it.
#[derive(Debug)]
pub struct ConfigSnapshot {
    pub version: u64,
    pub thresholds: Thresholds,
    pub suitability: HashMap<String, f32>,
    pub patterns: Vec<CompiledPattern>,
    pub hospitality_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub broadcast: BroadcastWeights,
    pub sports: Vec<SportCfg>,
    pub competitions: Vec<CompetitionCfg>,
    pub hype: Vec<CompiledHype>,
}

impl ConfigSnapshot {
    /// Build from TOML strings. `version` tags the snapshot so feature
    /// records can state which configuration they were extracted with.
    pub fn from_toml_strs(
        extraction: &str,
        broadcast: &str,
        version: u64,
    ) -> anyhow::Result<Self> {
        let ext: ExtractionRoot = toml::from_str(extraction)?;
        let bc: BroadcastRoot = toml::from_str(broadcast)?;

        let patterns = ext
            .patterns
            .iter()
            .cloned()
            .map(|p| {
                let re = Regex::new(&p.pattern).map_err(|e| {
                    anyhow::anyhow!("pattern for `{}` regex error: {}", p.event_type, e)
                })?;
                Ok(CompiledPattern { cfg: p, re })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let hype = bc
            .hype
            .iter()
            .cloned()
            .map(|h| {
                let re = Regex::new(&h.pattern).map_err(|e| {
                    anyhow::anyhow!("hype `{}` regex error: {}", h.category, e)
                })?;
                Ok(CompiledHype { cfg: h, re })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut thresholds = ext.thresholds;
        if let Some(t) = parse_threshold_env(std::env::var(ENV_RELEVANCE_THRESHOLD).ok()) {
            thresholds.relevance = t;
        }

        Ok(Self {
            version,
            thresholds,
            suitability: ext.suitability,
            patterns,
            hospitality_keywords: ext.hospitality_keywords,
            negative_keywords: ext.negative_keywords,
            broadcast: bc.weights,
            sports: bc.sports,
            competitions: bc.competitions,
            hype,
        })
    }

    /// Load `extraction.toml` + `broadcastability.toml` from a directory.
    /// Uses SCOUT_CONFIG_DIR or defaults to "config".
    pub fn load(version: u64) -> anyhow::Result<Self> {
        let dir = std::env::var(ENV_CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));
        Self::load_dir(&dir, version)
    }

    pub fn load_dir(dir: &Path, version: u64) -> anyhow::Result<Self> {
        let ext_path = dir.join("extraction.toml");
        let bc_path = dir.join("broadcastability.toml");
        let ext = fs::read_to_string(&ext_path).map_err(|e| {
            anyhow::anyhow!("failed to read {}: {}", ext_path.display(), e)
        })?;
        let bc = fs::read_to_string(&bc_path).map_err(|e| {
            anyhow::anyhow!("failed to read {}: {}", bc_path.display(), e)
        })?;
        Self::from_toml_strs(&ext, &bc, version)
    }

    /// Minimal snapshot with built-in defaults only. Classification still
    /// works through the built-in fallback table; broadcastability falls
    /// back to default weights with empty taxonomies.
    pub fn builtin() -> Self {
        Self {
            version: 0,
            thresholds: Thresholds::default(),
            suitability: HashMap::new(),
            patterns: Vec::new(),
            hospitality_keywords: Vec::new(),
            negative_keywords: Vec::new(),
            broadcast: BroadcastWeights::default(),
            sports: Vec::new(),
            competitions: Vec::new(),
            hype: Vec::new(),
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}

/* ----------------------------
Thread-safe handle + coarse reload
---------------------------- */

/// Shared handle over the current snapshot. The pipeline grabs an `Arc`
/// clone at the start of each job and keeps it for the whole run.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<ConfigSnapshot>>>,
}

impl ConfigHandle {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.inner
            .read()
            .map(|g| g.clone())
            .unwrap_or_else(|_| Arc::new(ConfigSnapshot::builtin()))
    }

    pub fn replace(&self, snapshot: ConfigSnapshot) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Arc::new(snapshot);
        }
    }
}

/// Start a polling watcher on the config dir, swapping in a fresh snapshot
/// (with a bumped version) when either file's mtime changes. Poll cadence is
/// coarse on purpose; config changes are rare administrative writes.
pub fn start_reload_thread(handle: ConfigHandle, dir: PathBuf, poll: Duration) {
    thread::spawn(move || {
        let mut last_mtime: Option<SystemTime> = None;
        loop {
            let mtime = newest_mtime(&dir);
            if let Some(mtime) = mtime {
                let changed = match last_mtime {
                    None => {
                        last_mtime = Some(mtime);
                        false
                    }
                    Some(prev) => mtime > prev,
                };
                if changed {
                    let next_version = handle.current().version + 1;
                    match ConfigSnapshot::load_dir(&dir, next_version) {
                        Ok(snap) => {
                            info!(target: "config", version = snap.version, "config snapshot reloaded");
                            handle.replace(snap);
                        }
                        Err(e) => {
                            tracing::warn!(target: "config", error = %e, "config reload failed, keeping previous snapshot");
                        }
                    }
                    last_mtime = Some(mtime);
                }
            }
            thread::sleep(poll);
        }
    });
}

fn newest_mtime(dir: &Path) -> Option<SystemTime> {
    let mut newest = None;
    for name in ["extraction.toml", "broadcastability.toml"] {
        if let Ok(m) = fs::metadata(dir.join(name)).and_then(|m| m.modified()) {
            newest = Some(match newest {
                Some(prev) if prev >= m => prev,
                _ => m,
            });
        }
    }
    newest
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXT_TOML: &str = r#"
[thresholds]
relevance = 0.4

[suitability]
sports_match = 0.85
festival = 0.90

[[patterns]]
event_type = "sports_match"
pattern = "partido\\s+de\\s+futbol"
priority = 10

[[patterns]]
event_type = "sports_match"
subtype = "soccer"
pattern = "\\bfutbol\\b"
"#;

    const BC_TOML: &str = r#"
[weights]
min_score = 0.55

[[sports]]
code = "soccer"
appeal = 0.95
keywords = ["futbol", "partido"]

[[hype]]
pattern = "final|semifinal"
boost = 0.30
category = "finals"
"#;

    #[test]
    fn snapshot_compiles_patterns() {
        let snap = ConfigSnapshot::from_toml_strs(EXT_TOML, BC_TOML, 7).expect("load");
        assert_eq!(snap.version, 7);
        assert_eq!(snap.patterns.len(), 2);
        assert!(snap.patterns[0].re.is_match("partido de futbol"));
        assert_eq!(snap.hype.len(), 1);
        assert!((snap.suitability["festival"] - 0.90).abs() < 1e-6);
    }

    #[test]
    fn bad_regex_is_rejected() {
        let bad = r#"
[[patterns]]
event_type = "x"
pattern = "(unclosed"
"#;
        assert!(ConfigSnapshot::from_toml_strs(bad, BC_TOML, 1).is_err());
    }

    #[test]
    fn handle_swaps_snapshots() {
        let h = ConfigHandle::new(ConfigSnapshot::builtin());
        assert_eq!(h.current().version, 0);
        let snap = ConfigSnapshot::from_toml_strs(EXT_TOML, BC_TOML, 3).unwrap();
        h.replace(snap);
        assert_eq!(h.current().version, 3);
    }
}

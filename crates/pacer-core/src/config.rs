//! Config resolution: expanding raw zone tables into concrete values.
//!
//! A plan's `[config]` tables may contain indirect entries: paces defined
//! as `"<distance> in <duration>"`, heart rates defined as a percentage of
//! another entry (`"76-85% max_hr"`). [`resolve`] expands these once, up
//! front, so the zone resolver and step compiler only ever see concrete
//! values. Percent references resolve exactly one level deep: an entry
//! that points at another percent entry is an error, not a chain.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::plan_format::{HeartRateDef, Margins, PlanConfig};
use crate::units::{self, UnitError};

/// Errors from config resolution. Any of these is fatal to the compilation
/// of every workout that depends on the config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entry {entry:?} references unknown name {reference:?}")]
    UnknownReference { entry: String, reference: String },

    #[error(
        "entry {entry:?} references {reference:?}, which is itself a percent \
         expression (only one level of indirection is supported)"
    )]
    ChainedPercent { entry: String, reference: String },

    #[error("entry {entry:?} references {reference:?}, which is not a single concrete value")]
    ReferenceNotConcrete { entry: String, reference: String },

    #[error("invalid value for entry {entry:?}: {value:?}")]
    BadValue { entry: String, value: String },

    #[error("invalid margin {field:?}: {source}")]
    BadMargin {
        field: &'static str,
        source: UnitError,
    },

    #[error("invalid entry {entry:?}: {source}")]
    BadEntry { entry: String, source: UnitError },
}

/// A heart-rate table entry after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartRate {
    /// A single bpm value.
    Bpm(u32),
    /// An inclusive `low..=high` bpm band.
    Range(u32, u32),
}

/// Zone tables with every indirect entry expanded.
///
/// Invariant: paces are normalized `"mm:ss"` strings or `"slow-fast"`
/// ranges; heart rates are concrete bpm values or bands; speeds are km/h
/// decimals or `"low-high"` ranges. No percent expressions remain.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub name_prefix: String,
    pub paces: BTreeMap<String, String>,
    pub heart_rates: BTreeMap<String, HeartRate>,
    pub speeds: BTreeMap<String, String>,
    pub margins: Margins,
}

static PERCENT_EXPR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:-(\d+))?%\s*(.+)$").expect("valid regex"));
static HR_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})-(\d{1,3})$").expect("valid regex"));
static PACE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}:\d{1,2})-(\d{1,2}:\d{1,2})$").expect("valid regex")
});
static SPEED_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(?:-(\d+(?:\.\d+)?))?$").expect("valid regex")
});

/// A parsed percent-of-reference expression, e.g. `"76-85% max_hr"`.
pub(crate) struct PercentRef {
    pub scale_min: f64,
    pub scale_max: f64,
    pub reference: String,
}

/// Parse a percent expression; a single percentage yields
/// `scale_min == scale_max`.
pub(crate) fn parse_percent(text: &str) -> Option<PercentRef> {
    let caps = PERCENT_EXPR.captures(text.trim())?;
    let first: f64 = caps[1].parse().ok()?;
    let second: Option<f64> = caps.get(2).and_then(|m| m.as_str().parse().ok());
    let (lo, hi) = match second {
        Some(s) if s < first => (s, first),
        Some(s) => (first, s),
        None => (first, first),
    };
    Some(PercentRef {
        scale_min: lo / 100.0,
        scale_max: hi / 100.0,
        reference: caps[3].trim().to_owned(),
    })
}

/// Resolve a raw [`PlanConfig`] into concrete zone tables.
pub fn resolve(config: &PlanConfig) -> Result<ResolvedConfig, ConfigError> {
    validate_margins(&config.margins)?;

    Ok(ResolvedConfig {
        name_prefix: config.name_prefix.clone(),
        paces: resolve_paces(&config.paces)?,
        heart_rates: resolve_heart_rates(&config.heart_rates)?,
        speeds: resolve_speeds(&config.speeds)?,
        margins: config.margins.clone(),
    })
}

fn validate_margins(margins: &Margins) -> Result<(), ConfigError> {
    units::duration_to_seconds(&margins.faster)
        .map_err(|source| ConfigError::BadMargin { field: "faster", source })?;
    units::duration_to_seconds(&margins.slower)
        .map_err(|source| ConfigError::BadMargin { field: "slower", source })?;
    Ok(())
}

fn resolve_paces(raw: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>, ConfigError> {
    // First pass: expand "<distance> in <duration>" entries and normalize
    // plain paces, leaving percent expressions for the second pass.
    let mut paces = BTreeMap::new();
    for (name, value) in raw {
        let value = value.trim();
        let resolved = if value.contains(" in ") {
            let speed = units::dist_time_to_ms(value).map_err(|source| ConfigError::BadEntry {
                entry: name.clone(),
                source,
            })?;
            Resolved::Pace(units::ms_to_pace(speed).map_err(|source| ConfigError::BadEntry {
                entry: name.clone(),
                source,
            })?)
        } else if let Some(caps) = PACE_RANGE.captures(value) {
            Resolved::Pace(format!(
                "{}-{}",
                normalize(name, &caps[1])?,
                normalize(name, &caps[2])?
            ))
        } else if PERCENT_EXPR.is_match(value) {
            Resolved::Deferred(value.to_owned())
        } else {
            Resolved::Pace(normalize(name, value)?)
        };
        paces.insert(name.clone(), resolved);
    }

    // Second pass: percent-of-reference, one level only.
    let mut out = BTreeMap::new();
    for (name, resolved) in &paces {
        let value = match resolved {
            Resolved::Pace(p) => p.clone(),
            Resolved::Deferred(expr) => {
                let pct = parse_percent(expr).ok_or_else(|| ConfigError::BadValue {
                    entry: name.clone(),
                    value: expr.clone(),
                })?;
                let referent = paces.get(&pct.reference).ok_or_else(|| {
                    ConfigError::UnknownReference {
                        entry: name.clone(),
                        reference: pct.reference.clone(),
                    }
                })?;
                let base = match referent {
                    Resolved::Pace(p) if !p.contains('-') => p,
                    Resolved::Pace(_) => {
                        return Err(ConfigError::ReferenceNotConcrete {
                            entry: name.clone(),
                            reference: pct.reference.clone(),
                        });
                    }
                    Resolved::Deferred(_) => {
                        return Err(ConfigError::ChainedPercent {
                            entry: name.clone(),
                            reference: pct.reference.clone(),
                        });
                    }
                };
                scale_pace(name, base, pct.scale_min, pct.scale_max)?
            }
        };
        out.insert(name.clone(), value);
    }
    Ok(out)
}

enum Resolved {
    Pace(String),
    Deferred(String),
}

fn normalize(entry: &str, pace: &str) -> Result<String, ConfigError> {
    units::normalize_pace(pace).map_err(|source| ConfigError::BadEntry {
        entry: entry.to_owned(),
        source,
    })
}

/// Scale a single pace by a percentage band of its speed. Scaling applies
/// to the speed, so 90% of a 5:00 pace is slower than 5:00.
fn scale_pace(
    entry: &str,
    base: &str,
    scale_min: f64,
    scale_max: f64,
) -> Result<String, ConfigError> {
    let wrap = |source| ConfigError::BadEntry {
        entry: entry.to_owned(),
        source,
    };
    let speed = units::pace_to_ms(base).map_err(wrap)?;
    let slow = units::ms_to_pace(speed * scale_min).map_err(wrap)?;
    let fast = units::ms_to_pace(speed * scale_max).map_err(wrap)?;
    if slow == fast {
        Ok(slow)
    } else {
        Ok(format!("{slow}-{fast}"))
    }
}

fn resolve_heart_rates(
    raw: &BTreeMap<String, HeartRateDef>,
) -> Result<BTreeMap<String, HeartRate>, ConfigError> {
    // First pass: everything that is concrete without a lookup.
    let mut concrete: BTreeMap<String, Option<HeartRate>> = BTreeMap::new();
    for (name, def) in raw {
        let value = match def {
            HeartRateDef::Bpm(bpm) => Some(HeartRate::Bpm(*bpm)),
            HeartRateDef::Text(text) => {
                let text = text.trim();
                if let Ok(bpm) = text.parse::<u32>() {
                    Some(HeartRate::Bpm(bpm))
                } else if let Some(caps) = HR_RANGE.captures(text) {
                    let (lo, hi) = ordered(parse_bpm(name, &caps[1])?, parse_bpm(name, &caps[2])?);
                    Some(HeartRate::Range(lo, hi))
                } else if PERCENT_EXPR.is_match(text) {
                    None // resolved in the second pass
                } else {
                    return Err(ConfigError::BadValue {
                        entry: name.clone(),
                        value: text.to_owned(),
                    });
                }
            }
        };
        concrete.insert(name.clone(), value);
    }

    // Second pass: percent references against the first-pass table.
    let mut out = BTreeMap::new();
    for (name, def) in raw {
        let value = match &concrete[name] {
            Some(v) => *v,
            None => {
                let HeartRateDef::Text(text) = def else {
                    unreachable!("only text entries are deferred");
                };
                let pct = parse_percent(text).ok_or_else(|| ConfigError::BadValue {
                    entry: name.clone(),
                    value: text.clone(),
                })?;
                let referent =
                    concrete
                        .get(&pct.reference)
                        .ok_or_else(|| ConfigError::UnknownReference {
                            entry: name.clone(),
                            reference: pct.reference.clone(),
                        })?;
                let base = match referent {
                    Some(HeartRate::Bpm(bpm)) => f64::from(*bpm),
                    Some(HeartRate::Range(..)) => {
                        return Err(ConfigError::ReferenceNotConcrete {
                            entry: name.clone(),
                            reference: pct.reference.clone(),
                        });
                    }
                    None => {
                        return Err(ConfigError::ChainedPercent {
                            entry: name.clone(),
                            reference: pct.reference.clone(),
                        });
                    }
                };
                let lo = (base * pct.scale_min) as u32;
                let hi = (base * pct.scale_max) as u32;
                if lo == hi {
                    HeartRate::Bpm(lo)
                } else {
                    HeartRate::Range(lo, hi)
                }
            }
        };
        out.insert(name.clone(), value);
    }
    Ok(out)
}

fn parse_bpm(entry: &str, text: &str) -> Result<u32, ConfigError> {
    text.parse().map_err(|_| ConfigError::BadValue {
        entry: entry.to_owned(),
        value: text.to_owned(),
    })
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}

fn resolve_speeds(
    raw: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    for (name, value) in raw {
        if !SPEED_SHAPE.is_match(value.trim()) {
            return Err(ConfigError::BadValue {
                entry: name.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(raw
        .iter()
        .map(|(k, v)| (k.clone(), v.trim().to_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_hr(entries: &[(&str, HeartRateDef)]) -> PlanConfig {
        PlanConfig {
            heart_rates: entries
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
            ..PlanConfig::default()
        }
    }

    #[test]
    fn expands_distance_in_time_paces() {
        let config = PlanConfig {
            paces: [("threshold".to_owned(), "3000m in 13:48".to_owned())].into(),
            ..PlanConfig::default()
        };
        let resolved = resolve(&config).expect("should resolve");
        // 3000 m in 828 s is 3.62 m/s, which rounds to 4:36 per km.
        assert_eq!(resolved.paces["threshold"], "04:36");
    }

    #[test]
    fn normalizes_plain_and_range_paces() {
        let config = PlanConfig {
            paces: [
                ("Z2".to_owned(), "6:0".to_owned()),
                ("Z4".to_owned(), "5:20-5:00".to_owned()),
            ]
            .into(),
            ..PlanConfig::default()
        };
        let resolved = resolve(&config).expect("should resolve");
        assert_eq!(resolved.paces["Z2"], "06:00");
        assert_eq!(resolved.paces["Z4"], "05:20-05:00");
    }

    #[test]
    fn resolves_single_percent_heart_rate() {
        let config = config_with_hr(&[
            ("max_hr", HeartRateDef::Bpm(200)),
            ("easy", HeartRateDef::Text("80% max_hr".to_owned())),
        ]);
        let resolved = resolve(&config).expect("should resolve");
        assert_eq!(resolved.heart_rates["easy"], HeartRate::Bpm(160));
    }

    #[test]
    fn resolves_percent_range_heart_rate() {
        let config = config_with_hr(&[
            ("max_hr", HeartRateDef::Bpm(198)),
            ("Z2_HR", HeartRateDef::Text("76-85% max_hr".to_owned())),
        ]);
        let resolved = resolve(&config).expect("should resolve");
        assert_eq!(resolved.heart_rates["Z2_HR"], HeartRate::Range(150, 168));
    }

    #[test]
    fn digit_strings_become_numbers() {
        let config = config_with_hr(&[("lthr", HeartRateDef::Text("172".to_owned()))]);
        let resolved = resolve(&config).expect("should resolve");
        assert_eq!(resolved.heart_rates["lthr"], HeartRate::Bpm(172));
    }

    #[test]
    fn rejects_chained_percent_reference() {
        let config = config_with_hr(&[
            ("max_hr", HeartRateDef::Bpm(200)),
            ("easy", HeartRateDef::Text("80% max_hr".to_owned())),
            ("easier", HeartRateDef::Text("90% easy".to_owned())),
        ]);
        let err = resolve(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::ChainedPercent { ref entry, .. } if entry == "easier"),
            "expected ChainedPercent, got: {err}"
        );
    }

    #[test]
    fn rejects_unknown_reference() {
        let config = config_with_hr(&[("easy", HeartRateDef::Text("80% nothing".to_owned()))]);
        let err = resolve(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::UnknownReference { .. }),
            "expected UnknownReference, got: {err}"
        );
    }

    #[test]
    fn rejects_bad_margin() {
        let config = PlanConfig {
            margins: Margins {
                faster: "banana".to_owned(),
                ..Margins::default()
            },
            ..PlanConfig::default()
        };
        let err = resolve(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::BadMargin { field: "faster", .. }),
            "expected BadMargin, got: {err}"
        );
    }

    #[test]
    fn rejects_garbage_heart_rate_text() {
        let config = config_with_hr(&[("bad", HeartRateDef::Text("very hard".to_owned()))]);
        assert!(matches!(
            resolve(&config).unwrap_err(),
            ConfigError::BadValue { .. }
        ));
    }

    #[test]
    fn speeds_are_validated() {
        let config = PlanConfig {
            speeds: [
                ("tempo".to_owned(), "32.5".to_owned()),
                ("sweet_spot".to_owned(), "28-32".to_owned()),
            ]
            .into(),
            ..PlanConfig::default()
        };
        let resolved = resolve(&config).expect("should resolve");
        assert_eq!(resolved.speeds["sweet_spot"], "28-32");

        let bad = PlanConfig {
            speeds: [("tempo".to_owned(), "fastish".to_owned())].into(),
            ..PlanConfig::default()
        };
        assert!(matches!(
            resolve(&bad).unwrap_err(),
            ConfigError::BadValue { .. }
        ));
    }
}

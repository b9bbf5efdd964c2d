//! Zone resolution: turning the text after `@` in a step into a [`Target`].
//!
//! A zone reference may be an inline literal (`"5:20"`, `"140-150"`,
//! `"32.5"`), a single-level percent expression (`"105% threshold"`), or a
//! name looked up in the resolved config tables. Heart-rate references that
//! resolve nowhere else fall back to device zones (`"z2"`).
//!
//! Pace and speed targets that resolve to a single value are widened into a
//! band using the plan margins; heart-rate targets are not.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::config::{self, HeartRate, ResolvedConfig};
use crate::units::{self, UnitError};
use crate::workout::Target;

/// Errors from zone resolution. Each one is scoped to a single step; the
/// compiler reports it and moves on.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("zone {zone:?} is not a literal, a percent expression, or a known name")]
    Unresolved { zone: String },

    #[error("zone {zone:?} references unknown name {reference:?}")]
    UnknownReference { zone: String, reference: String },

    #[error("zone {zone:?} references {reference:?}, which is not a single concrete value")]
    ReferenceNotConcrete { zone: String, reference: String },

    #[error("zone {zone:?}: {source}")]
    Unit { zone: String, source: UnitError },
}

/// Which target family an `@` marker selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// ` @ ` — pace per km.
    Pace,
    /// ` @spd ` — speed in km/h.
    Speed,
    /// ` @hr ` — heart rate in bpm or a device zone.
    HeartRate,
}

static PACE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}:\d{1,2})(?:-(\d{1,2}:\d{1,2}))?$").expect("valid regex"));
static SPEED_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(?:-(\d+(?:\.\d+)?))?$").expect("valid regex")
});
static HR_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})(?:-(\d{1,3}))?$").expect("valid regex"));
static DEVICE_ZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[zZ]([1-5])$").expect("valid regex"));

/// Resolve a zone reference into a target band.
pub fn resolve_target(
    kind: ZoneKind,
    zone: &str,
    config: &ResolvedConfig,
) -> Result<Target, ZoneError> {
    let zone = zone.trim();
    match kind {
        ZoneKind::Pace => resolve_pace(zone, config),
        ZoneKind::Speed => resolve_speed(zone, config),
        ZoneKind::HeartRate => resolve_heart_rate(zone, config),
    }
}

fn unit_err(zone: &str) -> impl Fn(UnitError) -> ZoneError + '_ {
    move |source| ZoneError::Unit {
        zone: zone.to_owned(),
        source,
    }
}

// ---- pace ----

fn resolve_pace(zone: &str, config: &ResolvedConfig) -> Result<Target, ZoneError> {
    if PACE_LITERAL.is_match(zone) {
        return pace_value_to_target(zone, zone, &config.margins);
    }
    // Inline distance-over-time, e.g. "3000m in 13:48".
    if zone.contains(" in ") {
        let speed = units::dist_time_to_ms(zone).map_err(unit_err(zone))?;
        let single = units::ms_to_pace(speed).map_err(unit_err(zone))?;
        return pace_value_to_target(zone, &single, &config.margins);
    }
    if let Some(pct) = config::parse_percent(zone) {
        let base = config
            .paces
            .get(&pct.reference)
            .ok_or_else(|| ZoneError::UnknownReference {
                zone: zone.to_owned(),
                reference: pct.reference.clone(),
            })?;
        if base.contains('-') {
            return Err(ZoneError::ReferenceNotConcrete {
                zone: zone.to_owned(),
                reference: pct.reference.clone(),
            });
        }
        // Percent bands scale the speed, not the pace seconds.
        let speed = units::pace_to_ms(base).map_err(unit_err(zone))?;
        let from_ms = speed * pct.scale_min;
        let to_ms = speed * pct.scale_max;
        if pct.scale_min == pct.scale_max {
            let single = units::ms_to_pace(from_ms).map_err(unit_err(zone))?;
            return pace_value_to_target(zone, &single, &config.margins);
        }
        return Ok(Target::Pace { from_ms, to_ms });
    }
    if let Some(value) = config.paces.get(zone) {
        return pace_value_to_target(zone, value, &config.margins);
    }
    Err(ZoneError::Unresolved {
        zone: zone.to_owned(),
    })
}

/// Convert a resolved pace table value (single or `"slow-fast"` range) to a
/// target, widening single values by the plan margins.
fn pace_value_to_target(
    zone: &str,
    value: &str,
    margins: &crate::plan_format::Margins,
) -> Result<Target, ZoneError> {
    let wrap = unit_err(zone);
    if let Some((a, b)) = value.split_once('-') {
        let first = units::pace_to_ms(a).map_err(&wrap)?;
        let second = units::pace_to_ms(b).map_err(&wrap)?;
        return Ok(Target::Pace {
            from_ms: first.min(second),
            to_ms: first.max(second),
        });
    }
    let base = units::duration_to_seconds(value).map_err(&wrap)?;
    let slower = units::duration_to_seconds(&margins.slower).map_err(&wrap)?;
    let faster = units::duration_to_seconds(&margins.faster).map_err(&wrap)?;
    let slow_secs = base + slower;
    let fast_secs = base.saturating_sub(faster);
    if fast_secs == 0 {
        return Err(ZoneError::Unit {
            zone: zone.to_owned(),
            source: UnitError::Domain {
                what: "pace",
                detail: format!("margin {:?} consumes the whole pace {value:?}", margins.faster),
            },
        });
    }
    Ok(Target::Pace {
        from_ms: 1000.0 / f64::from(slow_secs),
        to_ms: 1000.0 / f64::from(fast_secs),
    })
}

// ---- speed ----

fn resolve_speed(zone: &str, config: &ResolvedConfig) -> Result<Target, ZoneError> {
    if SPEED_LITERAL.is_match(zone) {
        return speed_value_to_target(zone, zone, config);
    }
    if let Some(pct) = config::parse_percent(zone) {
        let base = config
            .speeds
            .get(&pct.reference)
            .ok_or_else(|| ZoneError::UnknownReference {
                zone: zone.to_owned(),
                reference: pct.reference.clone(),
            })?;
        if base.contains('-') {
            return Err(ZoneError::ReferenceNotConcrete {
                zone: zone.to_owned(),
                reference: pct.reference.clone(),
            });
        }
        let kmh = parse_kmh(zone, base)?;
        if pct.scale_min == pct.scale_max {
            return Ok(widen_speed(kmh * pct.scale_min, config));
        }
        return Ok(Target::Speed {
            from_kmh: kmh * pct.scale_min,
            to_kmh: kmh * pct.scale_max,
        });
    }
    if let Some(value) = config.speeds.get(zone) {
        return speed_value_to_target(zone, value, config);
    }
    Err(ZoneError::Unresolved {
        zone: zone.to_owned(),
    })
}

fn speed_value_to_target(
    zone: &str,
    value: &str,
    config: &ResolvedConfig,
) -> Result<Target, ZoneError> {
    if let Some((a, b)) = value.split_once('-') {
        let first = parse_kmh(zone, a)?;
        let second = parse_kmh(zone, b)?;
        return Ok(Target::Speed {
            from_kmh: first.min(second),
            to_kmh: first.max(second),
        });
    }
    Ok(widen_speed(parse_kmh(zone, value)?, config))
}

fn widen_speed(kmh: f64, config: &ResolvedConfig) -> Target {
    Target::Speed {
        from_kmh: kmh - config.margins.slower_spd,
        to_kmh: kmh + config.margins.faster_spd,
    }
}

fn parse_kmh(zone: &str, text: &str) -> Result<f64, ZoneError> {
    text.trim().parse().map_err(|_| ZoneError::Unit {
        zone: zone.to_owned(),
        source: UnitError::Format {
            what: "speed",
            input: text.to_owned(),
        },
    })
}

// ---- heart rate ----

fn resolve_heart_rate(zone: &str, config: &ResolvedConfig) -> Result<Target, ZoneError> {
    if let Some(caps) = HR_LITERAL.captures(zone) {
        let first = parse_bpm(zone, &caps[1])?;
        return Ok(match caps.get(2) {
            Some(second) => {
                let second = parse_bpm(zone, second.as_str())?;
                hr_band(first.min(second), first.max(second))
            }
            None => hr_band(first, first),
        });
    }
    if let Some(pct) = config::parse_percent(zone) {
        let referent = config.heart_rates.get(&pct.reference).ok_or_else(|| {
            ZoneError::UnknownReference {
                zone: zone.to_owned(),
                reference: pct.reference.clone(),
            }
        })?;
        let base = match referent {
            HeartRate::Bpm(bpm) => f64::from(*bpm),
            HeartRate::Range(..) => {
                return Err(ZoneError::ReferenceNotConcrete {
                    zone: zone.to_owned(),
                    reference: pct.reference.clone(),
                });
            }
        };
        let lo = (base * pct.scale_min) as u32;
        let hi = (base * pct.scale_max) as u32;
        return Ok(hr_band(lo, hi));
    }
    if let Some(value) = config.heart_rates.get(zone) {
        return Ok(match *value {
            HeartRate::Bpm(bpm) => hr_band(bpm, bpm),
            HeartRate::Range(lo, hi) => hr_band(lo, hi),
        });
    }
    if let Some(caps) = DEVICE_ZONE.captures(zone) {
        let number = parse_bpm(zone, &caps[1])?;
        return Ok(Target::HeartRate {
            from_bpm: 0,
            to_bpm: 0,
            zone: Some(number),
        });
    }
    Err(ZoneError::Unresolved {
        zone: zone.to_owned(),
    })
}

fn hr_band(from_bpm: u32, to_bpm: u32) -> Target {
    Target::HeartRate {
        from_bpm,
        to_bpm,
        zone: None,
    }
}

fn parse_bpm(zone: &str, text: &str) -> Result<u32, ZoneError> {
    text.parse().map_err(|_| ZoneError::Unit {
        zone: zone.to_owned(),
        source: UnitError::Format {
            what: "heart rate",
            input: text.to_owned(),
        },
    })
}

//! Unit conversions between pace, speed, distance, and duration.
//!
//! All functions are pure and stateless. Malformed input is a
//! [`UnitError::Format`]; syntactically valid but physically impossible
//! input (zero speed, minutes >= 60 in a pace) is a [`UnitError::Domain`].

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Errors from unit conversion.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("invalid {what}: {input:?}")]
    Format { what: &'static str, input: String },

    #[error("{what} out of range: {detail}")]
    Domain { what: &'static str, detail: String },
}

impl UnitError {
    fn format(what: &'static str, input: &str) -> Self {
        Self::Format {
            what,
            input: input.to_owned(),
        }
    }
}

static UNIT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(h|min|m|s)?$").expect("valid regex"));
static DISTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(km|m)$").expect("valid regex"));
static DIST_IN_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+) in (.+)$").expect("valid regex"));
static PACE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{1,2}(:\d{1,2})?$").expect("valid regex"));

/// Convert a duration string to seconds.
///
/// Accepts `"mm:ss"`, `"hh:mm:ss"`, `"2h"`, `"3m"`, `"2min"`, `"30s"`,
/// and bare integer seconds.
pub fn duration_to_seconds(input: &str) -> Result<u32, UnitError> {
    let s = input.trim();

    if let Some(caps) = UNIT_SUFFIX.captures(s) {
        let amount: u32 = caps[1]
            .parse()
            .map_err(|_| UnitError::format("duration", input))?;
        let seconds = match caps.get(2).map(|m| m.as_str()) {
            Some("h") => amount.checked_mul(3600),
            Some("m") | Some("min") => amount.checked_mul(60),
            Some("s") | None => Some(amount),
            Some(_) => unreachable!("regex only matches h/min/m/s"),
        };
        return seconds.ok_or_else(|| UnitError::Domain {
            what: "duration",
            detail: format!("{input:?} overflows"),
        });
    }

    let parts: Vec<&str> = s.split(':').collect();
    let numeric: Result<Vec<u32>, _> = parts.iter().map(|p| p.parse::<u32>()).collect();
    match (parts.len(), numeric) {
        (2, Ok(n)) => Ok(n[0] * 60 + n[1]),
        (3, Ok(n)) => Ok(n[0] * 3600 + n[1] * 60 + n[2]),
        _ => Err(UnitError::format("duration", input)),
    }
}

/// Format seconds as zero-padded `"MM:SS"`. Minutes may exceed 59; there
/// is no rollover into hours (`3600` formats as `"60:00"`).
pub fn seconds_to_mmss(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Convert a pace string (time per km) to km/h.
pub fn pace_to_kmh(pace: &str) -> Result<f64, UnitError> {
    let seconds = duration_to_seconds(pace)?;
    if seconds == 0 {
        return Err(UnitError::Domain {
            what: "pace",
            detail: "zero pace".to_owned(),
        });
    }
    Ok(60.0 / (f64::from(seconds) / 60.0))
}

/// Convert a pace string (time per km) to meters per second.
pub fn pace_to_ms(pace: &str) -> Result<f64, UnitError> {
    Ok(pace_to_kmh(pace)? * (1000.0 / 3600.0))
}

/// Convert a speed in m/s to a pace string (`"mm:ss"` per km), rounding
/// to the nearest second per km.
pub fn ms_to_pace(ms: f64) -> Result<String, UnitError> {
    if !ms.is_finite() || ms <= 0.0 {
        return Err(UnitError::Domain {
            what: "speed",
            detail: format!("{ms} m/s is not a positive speed"),
        });
    }
    let seconds_per_km = (1000.0 / ms).round() as u32;
    Ok(seconds_to_mmss(seconds_per_km))
}

/// Convert a distance string (`"10km"`, `"2.5km"`, `"400m"`) to meters.
/// Decimal values are allowed for kilometers; meters truncate.
pub fn dist_to_meters(input: &str) -> Result<u32, UnitError> {
    let s = input.trim();
    let caps = DISTANCE
        .captures(s)
        .ok_or_else(|| UnitError::format("distance", input))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| UnitError::format("distance", input))?;
    let meters = match &caps[2] {
        "km" => value * 1000.0,
        _ => value,
    };
    Ok(meters as u32)
}

/// Parse a `"<distance> in <duration>"` specification and return the
/// implied speed in meters per second.
pub fn dist_time_to_ms(input: &str) -> Result<f64, UnitError> {
    let caps = DIST_IN_TIME
        .captures(input.trim())
        .ok_or_else(|| UnitError::format("distance-over-time", input))?;
    let meters = dist_to_meters(caps[1].trim())?;
    let seconds = duration_to_seconds(caps[2].trim())?;
    if seconds == 0 {
        return Err(UnitError::Domain {
            what: "distance-over-time",
            detail: "zero duration".to_owned(),
        });
    }
    Ok(f64::from(meters) / f64::from(seconds))
}

/// Normalize a pace string to zero-padded `"mm:ss"` or `"hh:mm:ss"`.
///
/// Rejects paces whose trailing minutes or seconds component is >= 60.
pub fn normalize_pace(input: &str) -> Result<String, UnitError> {
    let s = input.trim();
    if !PACE_SHAPE.is_match(s) {
        return Err(UnitError::format("pace", input));
    }
    let parts: Vec<u32> = s
        .split(':')
        .map(|p| p.parse().map_err(|_| UnitError::format("pace", input)))
        .collect::<Result<_, _>>()?;
    // Minutes and seconds must stay below 60; a leading hours component may not.
    if parts[parts.len() - 1] >= 60 || parts[parts.len() - 2] >= 60 {
        return Err(UnitError::Domain {
            what: "pace",
            detail: format!("{input:?} has a component >= 60"),
        });
    }
    Ok(parts
        .iter()
        .map(|p| format!("{p:02}"))
        .collect::<Vec<_>>()
        .join(":"))
}

//! TOML format types for training plan files.
//!
//! These types map directly to the `plan.toml` on-disk format and are
//! deserialized via `serde` + the `toml` crate. The `[config]` tables hold
//! raw, possibly unresolved zone definitions; see [`crate::config`] for the
//! resolution step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level structure of a plan file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanFile {
    /// Zone tables and margins shared by every workout in the plan.
    #[serde(default)]
    pub config: PlanConfig,
    /// Workout definitions, in plan order.
    #[serde(default)]
    pub workouts: Vec<WorkoutDef>,
}

/// The `[config]` section: zone reference tables and range margins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanConfig {
    /// Prefix prepended to every workout name on import (e.g. `"MYRUN "`).
    #[serde(default)]
    pub name_prefix: String,
    /// Named paces: `"mm:ss"` per km, a `"slow-fast"` range, or a
    /// `"<distance> in <duration>"` expression.
    #[serde(default)]
    pub paces: BTreeMap<String, String>,
    /// Named heart rates: a bpm integer, a `"low-high"` range, or a
    /// percent-of-reference expression such as `"76-85% max_hr"`.
    #[serde(default)]
    pub heart_rates: BTreeMap<String, HeartRateDef>,
    /// Named speeds for cycling: km/h as a decimal or a `"low-high"` range.
    #[serde(default)]
    pub speeds: BTreeMap<String, String>,
    /// Margins used to widen single values into ranges.
    #[serde(default)]
    pub margins: Margins,
}

/// A raw heart-rate table entry. Integers and strings are both accepted in
/// the TOML; strings may still be percent expressions at this stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HeartRateDef {
    Bpm(u32),
    Text(String),
}

/// Range margins applied when a zone resolves to a single value.
///
/// `hr_up`/`hr_down` are parsed and carried but intentionally not applied
/// to stored heart-rate target bounds; only pace and speed targets are
/// widened. This mirrors the established plan-file behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Margins {
    /// Subtracted from a single pace to get the fast bound (`"mm:ss"`).
    #[serde(default = "default_pace_margin")]
    pub faster: String,
    /// Added to a single pace to get the slow bound (`"mm:ss"`).
    #[serde(default = "default_pace_margin")]
    pub slower: String,
    /// Added to a single speed (km/h) to get the upper bound.
    #[serde(default)]
    pub faster_spd: f64,
    /// Subtracted from a single speed (km/h) to get the lower bound.
    #[serde(default)]
    pub slower_spd: f64,
    /// Beats above a target heart rate (descriptive use only).
    #[serde(default = "default_hr_margin")]
    pub hr_up: u32,
    /// Beats below a target heart rate (descriptive use only).
    #[serde(default = "default_hr_margin")]
    pub hr_down: u32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            faster: default_pace_margin(),
            slower: default_pace_margin(),
            faster_spd: 0.0,
            slower_spd: 0.0,
            hr_up: default_hr_margin(),
            hr_down: default_hr_margin(),
        }
    }
}

fn default_pace_margin() -> String {
    "0:03".to_owned()
}

fn default_hr_margin() -> u32 {
    5
}

/// A single `[[workouts]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutDef {
    /// Workout name. A `W<ww>S<ss>` tag anywhere in the name makes the
    /// workout schedulable (see [`crate::schedule`]).
    pub name: String,
    /// Sport: `"running"`, `"cycling"`, or `"swimming"`.
    #[serde(default = "default_sport")]
    pub sport: String,
    /// Step text in the workout step language, one step per line or
    /// `;`-separated.
    pub steps: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_sport() -> String {
    "running".to_owned()
}

/// Parse a plan file from TOML text.
pub fn parse_plan_file(content: &str) -> Result<PlanFile, toml::de::Error> {
    toml::from_str(content)
}

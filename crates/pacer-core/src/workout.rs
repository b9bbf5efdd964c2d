//! In-memory workout model and its Garmin Connect JSON shape.
//!
//! The integer ID tables (sport, step, end condition, target type) come
//! from Garmin Connect's own registry and must match it exactly; they are
//! a fixed external contract, not an internal convention.

use std::fmt;
use std::str::FromStr;

use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Sport of a workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportType {
    Running,
    Cycling,
    Swimming,
}

impl SportType {
    /// Garmin Connect sport type ID.
    pub fn id(self) -> u32 {
        match self {
            Self::Running => 1,
            Self::Cycling => 2,
            Self::Swimming => 5,
        }
    }

    /// Garmin Connect sport type key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
            Self::Swimming => "swimming",
        }
    }
}

impl fmt::Display for SportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SportType {
    type Err = SportTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "cycling" => Ok(Self::Cycling),
            "swimming" => Ok(Self::Swimming),
            other => Err(SportTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SportType`] string.
#[derive(Debug, Clone)]
pub struct SportTypeParseError(pub String);

impl fmt::Display for SportTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid sport type: {:?}", self.0)
    }
}

impl std::error::Error for SportTypeParseError {}

// ---------------------------------------------------------------------------

/// Kind of a workout step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Warmup,
    Cooldown,
    Interval,
    Recovery,
    Rest,
    Repeat,
    Other,
}

impl StepKind {
    /// Garmin Connect step type ID.
    pub fn id(self) -> u32 {
        match self {
            Self::Warmup => 1,
            Self::Cooldown => 2,
            Self::Interval => 3,
            Self::Recovery => 4,
            Self::Rest => 5,
            Self::Repeat => 6,
            Self::Other => 7,
        }
    }

    /// Garmin Connect step type key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Cooldown => "cooldown",
            Self::Interval => "interval",
            Self::Recovery => "recovery",
            Self::Rest => "rest",
            Self::Repeat => "repeat",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StepKind {
    type Err = StepKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warmup" => Ok(Self::Warmup),
            "cooldown" => Ok(Self::Cooldown),
            "interval" => Ok(Self::Interval),
            "recovery" => Ok(Self::Recovery),
            "rest" => Ok(Self::Rest),
            "repeat" => Ok(Self::Repeat),
            "other" => Ok(Self::Other),
            other => Err(StepKindParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`StepKind`] string.
#[derive(Debug, Clone)]
pub struct StepKindParseError(pub String);

impl fmt::Display for StepKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid step kind: {:?}", self.0)
    }
}

impl std::error::Error for StepKindParseError {}

// ---------------------------------------------------------------------------

/// The criterion that terminates a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCondition {
    LapButton,
    Time,
    Distance,
    Iterations,
}

impl EndCondition {
    /// Garmin Connect condition type ID.
    pub fn id(self) -> u32 {
        match self {
            Self::LapButton => 1,
            Self::Time => 2,
            Self::Distance => 3,
            Self::Iterations => 7,
        }
    }

    /// Garmin Connect condition type key.
    pub fn key(self) -> &'static str {
        match self {
            Self::LapButton => "lap.button",
            Self::Time => "time",
            Self::Distance => "distance",
            Self::Iterations => "iterations",
        }
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// The physiological goal band attached to a step.
///
/// Range bounds are stored with the underlying physical quantity ascending:
/// `from <= to` in m/s, km/h, or bpm. For pace targets this means `from`
/// corresponds to the *slower* pace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    None,
    /// Pace band, as speeds in meters per second.
    Pace { from_ms: f64, to_ms: f64 },
    /// Speed band in km/h (serialized to the wire in m/s).
    Speed { from_kmh: f64, to_kmh: f64 },
    /// Heart-rate band in bpm, or a bare device zone number.
    HeartRate {
        from_bpm: u32,
        to_bpm: u32,
        zone: Option<u32>,
    },
}

impl Target {
    /// Garmin Connect workout target type ID.
    pub fn id(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::HeartRate { .. } => 4,
            Self::Speed { .. } => 5,
            Self::Pace { .. } => 6,
        }
    }

    /// Garmin Connect workout target type key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::None => "no.target",
            Self::HeartRate { .. } => "heart.rate.zone",
            Self::Speed { .. } => "speed.zone",
            Self::Pace { .. } => "pace.zone",
        }
    }

    /// `(targetValueOne, targetValueTwo, zoneNumber)` in wire units.
    fn wire_values(&self) -> (Value, Value, Value) {
        match *self {
            Self::None => (Value::Null, Value::Null, Value::Null),
            Self::Pace { from_ms, to_ms } => (json!(from_ms), json!(to_ms), Value::Null),
            // Garmin expects every speed-family target in m/s.
            Self::Speed { from_kmh, to_kmh } => {
                (json!(from_kmh / 3.6), json!(to_kmh / 3.6), Value::Null)
            }
            Self::HeartRate {
                from_bpm,
                to_bpm,
                zone,
            } => match zone {
                Some(z) => (Value::Null, Value::Null, json!(z)),
                None => (json!(from_bpm), json!(to_bpm), Value::Null),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Steps and workouts
// ---------------------------------------------------------------------------

/// One segment of a workout. Only `kind == Repeat` carries children, and
/// its `end_condition_value` holds the iteration count.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutStep {
    pub kind: StepKind,
    pub description: Option<String>,
    pub end_condition: EndCondition,
    pub end_condition_value: u32,
    /// True when the source wrote the distance in kilometers; controls the
    /// preferred display unit on the device.
    pub prefer_km: bool,
    pub target: Target,
    pub children: Vec<WorkoutStep>,
}

impl WorkoutStep {
    /// A leaf step with no children.
    pub fn leaf(
        kind: StepKind,
        description: Option<String>,
        end_condition: EndCondition,
        end_condition_value: u32,
        target: Target,
    ) -> Self {
        Self {
            kind,
            description,
            end_condition,
            end_condition_value,
            prefer_km: false,
            target,
            children: Vec::new(),
        }
    }

    /// A repeat group executing `children` for `iterations` rounds.
    pub fn repeat(iterations: u32, children: Vec<WorkoutStep>) -> Self {
        Self {
            kind: StepKind::Repeat,
            description: None,
            end_condition: EndCondition::Iterations,
            end_condition_value: iterations,
            prefer_km: false,
            target: Target::None,
            children,
        }
    }

    /// Rewrite a distance end condition into a time end condition using the
    /// average pace of the step's target. Recurses into repeat children.
    /// Running this on an already time-based step is a no-op.
    pub fn dist_to_time(&mut self) {
        if self.end_condition == EndCondition::Distance {
            if let Target::Pace { from_ms, to_ms } = self.target {
                let avg_ms = (from_ms + to_ms) / 2.0;
                if avg_ms > 0.0 {
                    let seconds = f64::from(self.end_condition_value) / avg_ms;
                    // Round to the nearest 10 seconds for readability.
                    let seconds = ((seconds / 10.0).round() * 10.0) as u32;
                    self.end_condition = EndCondition::Time;
                    self.end_condition_value = seconds;
                    self.prefer_km = false;
                }
            }
        }
        for child in &mut self.children {
            child.dist_to_time();
        }
    }

    /// Serialize this step (and any children) into the Garmin Connect DTO,
    /// using `order` as the 1-based position within the enclosing list and
    /// `child_step_id` to mark repeat-group membership.
    fn to_garmin_json(&self, order: u32, child_step_id: Option<u32>) -> Value {
        let is_repeat = self.kind == StepKind::Repeat;
        // Repeat groups and their children share childStepId 1.
        let child_id = if is_repeat {
            Some(1)
        } else {
            child_step_id
        };

        let mut obj = serde_json::Map::new();
        obj.insert(
            "type".to_owned(),
            json!(if is_repeat {
                "RepeatGroupDTO"
            } else {
                "ExecutableStepDTO"
            }),
        );
        obj.insert("stepId".to_owned(), Value::Null);
        obj.insert("stepOrder".to_owned(), json!(order));
        obj.insert("childStepId".to_owned(), json!(child_id));
        obj.insert(
            "stepType".to_owned(),
            json!({
                "stepTypeId": self.kind.id(),
                "stepTypeKey": self.kind.key(),
            }),
        );
        obj.insert(
            "endCondition".to_owned(),
            json!({
                "conditionTypeId": self.end_condition.id(),
                "conditionTypeKey": self.end_condition.key(),
            }),
        );
        obj.insert("endConditionValue".to_owned(), json!(self.end_condition_value));

        if !self.children.is_empty() {
            let children: Vec<Value> = self
                .children
                .iter()
                .enumerate()
                .map(|(i, c)| c.to_garmin_json(i as u32 + 1, child_id))
                .collect();
            obj.insert("workoutSteps".to_owned(), Value::Array(children));
        }

        if is_repeat {
            obj.insert("smartRepeat".to_owned(), json!(true));
            obj.insert(
                "numberOfIterations".to_owned(),
                json!(self.end_condition_value),
            );
        } else {
            let unit = if self.end_condition == EndCondition::Distance && self.prefer_km {
                json!({ "unitKey": "kilometer" })
            } else {
                Value::Null
            };
            let (value_one, value_two, zone) = self.target.wire_values();
            obj.insert("description".to_owned(), json!(self.description));
            obj.insert("preferredEndConditionUnit".to_owned(), unit);
            obj.insert("endConditionCompare".to_owned(), Value::Null);
            obj.insert("endConditionZone".to_owned(), Value::Null);
            obj.insert(
                "targetType".to_owned(),
                json!({
                    "workoutTargetTypeId": self.target.id(),
                    "workoutTargetTypeKey": self.target.key(),
                }),
            );
            obj.insert("targetValueOne".to_owned(), value_one);
            obj.insert("targetValueTwo".to_owned(), value_two);
            obj.insert("zoneNumber".to_owned(), zone);
        }

        Value::Object(obj)
    }
}

/// A workout: an ordered tree of steps under a single sport.
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub sport: SportType,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<WorkoutStep>,
}

impl Workout {
    /// Apply the treadmill distance-to-time rewrite to every step.
    pub fn dist_to_time(&mut self) {
        for step in &mut self.steps {
            step.dist_to_time();
        }
    }

    /// Serialize into the JSON body expected by Garmin Connect's workout
    /// create/update endpoints.
    pub fn to_garmin_json(&self) -> Value {
        let sport = json!({
            "sportTypeId": self.sport.id(),
            "sportTypeKey": self.sport.key(),
        });
        let steps: Vec<Value> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| s.to_garmin_json(i as u32 + 1, None))
            .collect();
        json!({
            "sportType": sport,
            "workoutName": self.name,
            "description": self.description,
            "workoutSegments": [
                {
                    "segmentOrder": 1,
                    "sportType": sport,
                    "workoutSteps": steps,
                }
            ],
        })
    }
}

//! Structured diagnostics for lenient parsing and scheduling decisions.
//!
//! Every place the compiler or scheduler accepts questionable input (an
//! unknown step keyword, a cooldown inside a repeat, a calendar collision)
//! records a [`Diagnostic`] instead of logging free text, so callers and
//! tests can assert on the exact decisions taken.

use std::fmt;

use serde::Serialize;

/// A single leniency decision, attributable to one workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Name of the workout the decision applies to.
    pub workout: String,
    /// What happened.
    pub detail: DiagnosticKind,
}

/// The kinds of decisions the compiler and scheduler report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A `steady` step was rewritten to `interval`.
    LegacySteadyStep { line: String },
    /// An unrecognized step keyword was coerced to `other`.
    UnknownStepKind { keyword: String, line: String },
    /// A line could not be split into `keyword: details`.
    MalformedStepLine { line: String },
    /// A step was dropped because its target or measure did not parse.
    StepSkipped { line: String, reason: String },
    /// A cooldown inside a repeat block was hoisted out as a sibling step.
    CooldownHoisted,
    /// A `repeat` block ended with no child steps.
    EmptyRepeat { iterations: u32 },
    /// The scheduler moved a workout off an occupied date.
    DateShifted { from: String, to: String },
    /// The scheduler could not place a workout at all.
    Unschedulable { reason: String },
}

impl Diagnostic {
    pub fn new(workout: impl Into<String>, detail: DiagnosticKind) -> Self {
        Self {
            workout: workout.into(),
            detail,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.workout, self.detail)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LegacySteadyStep { line } => {
                write!(f, "'steady' is not a supported step kind, using 'interval': {line:?}")
            }
            Self::UnknownStepKind { keyword, line } => {
                write!(f, "unrecognized step kind {keyword:?}, using 'other': {line:?}")
            }
            Self::MalformedStepLine { line } => {
                write!(f, "step line is not 'keyword: details', skipped: {line:?}")
            }
            Self::StepSkipped { line, reason } => {
                write!(f, "step skipped ({reason}): {line:?}")
            }
            Self::CooldownHoisted => {
                write!(f, "cooldown found inside a repeat block, moved after the repeat")
            }
            Self::EmptyRepeat { iterations } => {
                write!(f, "repeat {iterations} block has no child steps")
            }
            Self::DateShifted { from, to } => {
                write!(f, "date {from} already taken, shifted to {to}")
            }
            Self::Unschedulable { reason } => write!(f, "left unscheduled: {reason}"),
        }
    }
}

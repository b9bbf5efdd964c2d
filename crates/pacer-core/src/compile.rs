//! Step-language compiler: workout definitions to normalized step trees.
//!
//! The step text is line-oriented (`;` also separates steps). Each line is
//! `keyword: measure [@ zone] [-- description]`; a `repeat N:` line opens a
//! block whose indented lines become children. Compilation is lenient per
//! step: a line that cannot be compiled is reported as a [`Diagnostic`] and
//! skipped, so one bad step never loses the rest of the workout.

use thiserror::Error;

use crate::config::{self, ConfigError, ResolvedConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::plan_format::{PlanFile, WorkoutDef};
use crate::units;
use crate::workout::{
    EndCondition, SportType, SportTypeParseError, StepKind, Target, Workout, WorkoutStep,
};
use crate::zones::{self, ZoneKind};

/// Errors that abort compilation of a workout (or of a whole plan when the
/// shared config is at fault). Per-step problems are diagnostics instead.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("workout {workout:?}: {source}")]
    Sport {
        workout: String,
        source: SportTypeParseError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The result of compiling one workout definition.
#[derive(Debug, Clone)]
pub struct CompiledWorkout {
    pub workout: Workout,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile every workout in a plan against its resolved config.
pub fn compile_plan(plan: &PlanFile) -> Result<Vec<CompiledWorkout>, CompileError> {
    let resolved = config::resolve(&plan.config)?;
    plan.workouts
        .iter()
        .map(|def| compile_workout(def, &resolved))
        .collect()
}

/// Compile a single workout definition.
pub fn compile_workout(
    def: &WorkoutDef,
    config: &ResolvedConfig,
) -> Result<CompiledWorkout, CompileError> {
    let sport: SportType = def.sport.parse().map_err(|source| CompileError::Sport {
        workout: def.name.clone(),
        source,
    })?;

    let text = def.steps.replace(';', "\n");
    // Cycling plans write bare `@` for speed targets.
    let text = if sport == SportType::Cycling {
        text.replace(" @ ", " @spd ")
    } else {
        text
    };

    let mut compiler = StepCompiler {
        workout_name: &def.name,
        config,
        steps: Vec::new(),
        open_repeat: None,
        diagnostics: Vec::new(),
    };

    for raw in text.lines() {
        compiler.feed(raw);
    }
    compiler.close_repeat();

    Ok(CompiledWorkout {
        workout: Workout {
            sport,
            name: format!("{}{}", config.name_prefix, def.name),
            description: def.description.clone(),
            steps: compiler.steps,
        },
        diagnostics: compiler.diagnostics,
    })
}

const STEP_KEYWORDS: [&str; 8] = [
    "warmup", "cooldown", "interval", "recovery", "rest", "other", "steady", "repeat",
];

struct OpenRepeat {
    iterations: u32,
    children: Vec<WorkoutStep>,
    /// Cooldowns found inside the block, emitted after it closes.
    hoisted: Vec<WorkoutStep>,
}

struct StepCompiler<'a> {
    workout_name: &'a str,
    config: &'a ResolvedConfig,
    steps: Vec<WorkoutStep>,
    open_repeat: Option<OpenRepeat>,
    diagnostics: Vec<Diagnostic>,
}

impl StepCompiler<'_> {
    fn feed(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        let indented = raw.starts_with(' ') || raw.starts_with('\t');

        // Repeats never nest; a new repeat line always closes the open one.
        if let Some((iterations, ok)) = parse_repeat_line(trimmed) {
            self.close_repeat();
            if ok {
                self.open_repeat = Some(OpenRepeat {
                    iterations,
                    children: Vec::new(),
                    hoisted: Vec::new(),
                });
            } else {
                self.diagnose(DiagnosticKind::StepSkipped {
                    line: trimmed.to_owned(),
                    reason: "invalid repeat count".to_owned(),
                });
            }
            return;
        }

        if self.open_repeat.is_some() {
            // An unindented line with a recognized keyword ends the block;
            // anything else still belongs to it.
            if indented || !starts_with_keyword(trimmed) {
                let Some(step) = self.parse_step_line(trimmed) else {
                    return;
                };
                let hoist = step.kind == StepKind::Cooldown;
                if let Some(repeat) = self.open_repeat.as_mut() {
                    if hoist {
                        repeat.hoisted.push(step);
                    } else {
                        repeat.children.push(step);
                    }
                }
                if hoist {
                    self.diagnose(DiagnosticKind::CooldownHoisted);
                }
                return;
            }
            self.close_repeat();
        }

        if let Some(step) = self.parse_step_line(trimmed) {
            self.steps.push(step);
        }
    }

    fn close_repeat(&mut self) {
        let Some(repeat) = self.open_repeat.take() else {
            return;
        };
        if repeat.children.is_empty() {
            self.diagnose(DiagnosticKind::EmptyRepeat {
                iterations: repeat.iterations,
            });
        } else {
            self.steps
                .push(WorkoutStep::repeat(repeat.iterations, repeat.children));
        }
        self.steps.extend(repeat.hoisted);
    }

    /// Parse one `keyword: measure [@ zone] [-- description]` line. Returns
    /// `None` (with a diagnostic) when the line must be skipped.
    fn parse_step_line(&mut self, line: &str) -> Option<WorkoutStep> {
        let Some((keyword, rest)) = line.split_once(':') else {
            self.diagnose(DiagnosticKind::MalformedStepLine {
                line: line.to_owned(),
            });
            return None;
        };
        let keyword = keyword.trim();

        let kind = if keyword == "steady" {
            self.diagnose(DiagnosticKind::LegacySteadyStep {
                line: line.to_owned(),
            });
            StepKind::Interval
        } else {
            match keyword.parse::<StepKind>() {
                Ok(StepKind::Repeat) => {
                    // `repeat` with a non-numeric count lands here.
                    self.diagnose(DiagnosticKind::StepSkipped {
                        line: line.to_owned(),
                        reason: "invalid repeat count".to_owned(),
                    });
                    return None;
                }
                Ok(kind) => kind,
                Err(_) => {
                    self.diagnose(DiagnosticKind::UnknownStepKind {
                        keyword: keyword.to_owned(),
                        line: line.to_owned(),
                    });
                    StepKind::Other
                }
            }
        };

        let (rest, description) = match rest.split_once(" -- ") {
            Some((r, d)) => (r, Some(d.trim().to_owned())),
            None => (rest, None),
        };

        let (measure, target_spec) = split_target(rest);

        let target = match target_spec {
            Some((zone_kind, zone)) => {
                match zones::resolve_target(zone_kind, zone, self.config) {
                    Ok(target) => target,
                    Err(err) => {
                        self.diagnose(DiagnosticKind::StepSkipped {
                            line: line.to_owned(),
                            reason: err.to_string(),
                        });
                        return None;
                    }
                }
            }
            None => Target::None,
        };

        let (end_condition, value, prefer_km) = match parse_measure(measure.trim()) {
            Ok(parsed) => parsed,
            Err(reason) => {
                self.diagnose(DiagnosticKind::StepSkipped {
                    line: line.to_owned(),
                    reason,
                });
                return None;
            }
        };

        let mut step = WorkoutStep::leaf(kind, description, end_condition, value, target);
        step.prefer_km = prefer_km;
        Some(step)
    }

    fn diagnose(&mut self, detail: DiagnosticKind) {
        self.diagnostics
            .push(Diagnostic::new(self.workout_name, detail));
    }
}

/// `Some((iterations, true))` for a valid `repeat N[:]` line, `Some((0,
/// false))` for a repeat line with a bad count, `None` for anything else.
fn parse_repeat_line(line: &str) -> Option<(u32, bool)> {
    let rest = line.strip_prefix("repeat")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let count = rest.trim().trim_end_matches(':').trim();
    match count.parse::<u32>() {
        Ok(n) if n > 0 => Some((n, true)),
        _ => Some((0, false)),
    }
}

fn starts_with_keyword(line: &str) -> bool {
    let head = line
        .split_once(':')
        .map_or(line, |(k, _)| k)
        .split_whitespace()
        .next()
        .unwrap_or("");
    STEP_KEYWORDS.contains(&head)
}

/// Split step details into the measure text and an optional target marker.
fn split_target(rest: &str) -> (&str, Option<(ZoneKind, &str)>) {
    for (marker, kind) in [
        (" @hr ", ZoneKind::HeartRate),
        (" @spd ", ZoneKind::Speed),
        (" @ ", ZoneKind::Pace),
    ] {
        if let Some((measure, zone)) = rest.split_once(marker) {
            return (measure, Some((kind, zone.trim())));
        }
    }
    (rest, None)
}

/// Infer the end condition from a measure. Distance is checked before
/// duration because `"400m"` would otherwise read as 400 minutes.
fn parse_measure(measure: &str) -> Result<(EndCondition, u32, bool), String> {
    if measure.is_empty() || measure == "lap-button" {
        return Ok((EndCondition::LapButton, 0, false));
    }
    if let Ok(meters) = units::dist_to_meters(measure) {
        return Ok((EndCondition::Distance, meters, measure.ends_with("km")));
    }
    match units::duration_to_seconds(measure) {
        Ok(seconds) => Ok((EndCondition::Time, seconds, false)),
        Err(_) => Err(format!("unrecognized measure {measure:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_format::{Margins, PlanConfig};

    fn running_config() -> ResolvedConfig {
        let raw = PlanConfig {
            paces: [
                ("Z1".to_owned(), "6:30".to_owned()),
                ("Z2".to_owned(), "6:00".to_owned()),
                ("Z5".to_owned(), "4:00-3:50".to_owned()),
            ]
            .into(),
            margins: Margins {
                faster: "0:05".to_owned(),
                slower: "0:05".to_owned(),
                ..Margins::default()
            },
            ..PlanConfig::default()
        };
        config::resolve(&raw).expect("config should resolve")
    }

    fn def(name: &str, sport: &str, steps: &str) -> WorkoutDef {
        WorkoutDef {
            name: name.to_owned(),
            sport: sport.to_owned(),
            steps: steps.to_owned(),
            description: None,
        }
    }

    fn compile(steps: &str) -> CompiledWorkout {
        compile_workout(&def("W01S01 Test", "running", steps), &running_config())
            .expect("should compile")
    }

    #[test]
    fn compiles_intervals_with_repeat_block() {
        let compiled = compile(
            "warmup: 15min @ Z1\n\
             repeat 5:\n  \
               interval: 400m @ Z5\n  \
               recovery: 2min @ Z1\n\
             cooldown: 10min @ Z1",
        );
        assert!(compiled.diagnostics.is_empty(), "{:?}", compiled.diagnostics);

        let steps = &compiled.workout.steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].kind, StepKind::Warmup);
        assert_eq!(steps[0].end_condition, EndCondition::Time);
        assert_eq!(steps[0].end_condition_value, 900);

        let repeat = &steps[1];
        assert_eq!(repeat.kind, StepKind::Repeat);
        assert_eq!(repeat.end_condition_value, 5);
        assert_eq!(repeat.children.len(), 2);
        assert_eq!(repeat.children[0].end_condition, EndCondition::Distance);
        assert_eq!(repeat.children[0].end_condition_value, 400);
        assert!(matches!(repeat.children[0].target, Target::Pace { .. }));

        assert_eq!(steps[2].kind, StepKind::Cooldown);
    }

    #[test]
    fn semicolons_separate_steps() {
        let compiled = compile("warmup: 10min @ Z1; interval: 5km @ Z2; cooldown: 5min");
        assert_eq!(compiled.workout.steps.len(), 3);
        assert_eq!(compiled.workout.steps[1].end_condition_value, 5000);
        assert!(compiled.workout.steps[1].prefer_km);
        assert_eq!(compiled.workout.steps[2].target, Target::None);
    }

    #[test]
    fn single_pace_targets_are_widened() {
        let compiled = compile("interval: 30min @ Z2");
        let Target::Pace { from_ms, to_ms } = compiled.workout.steps[0].target else {
            panic!("expected a pace target");
        };
        assert_eq!(units::ms_to_pace(from_ms).unwrap(), "06:05");
        assert_eq!(units::ms_to_pace(to_ms).unwrap(), "05:55");
    }

    #[test]
    fn steady_becomes_interval_with_a_diagnostic() {
        let compiled = compile("steady: 40min @ Z2");
        assert_eq!(compiled.workout.steps[0].kind, StepKind::Interval);
        assert!(matches!(
            compiled.diagnostics[0].detail,
            DiagnosticKind::LegacySteadyStep { .. }
        ));
    }

    #[test]
    fn unknown_keyword_becomes_other() {
        let compiled = compile("tempo: 20min @ Z2");
        assert_eq!(compiled.workout.steps[0].kind, StepKind::Other);
        assert!(matches!(
            compiled.diagnostics[0].detail,
            DiagnosticKind::UnknownStepKind { ref keyword, .. } if keyword == "tempo"
        ));
    }

    #[test]
    fn malformed_and_unresolvable_lines_are_skipped() {
        let compiled = compile(
            "just some words\n\
             interval: 10min @ Z9\n\
             interval: 10min @ Z2",
        );
        assert_eq!(compiled.workout.steps.len(), 1);
        assert!(matches!(
            compiled.diagnostics[0].detail,
            DiagnosticKind::MalformedStepLine { .. }
        ));
        assert!(matches!(
            compiled.diagnostics[1].detail,
            DiagnosticKind::StepSkipped { ref reason, .. } if reason.contains("Z9")
        ));
    }

    #[test]
    fn cooldown_inside_repeat_is_hoisted() {
        let compiled = compile(
            "repeat 3:\n  \
               interval: 1km @ Z2\n  \
               cooldown: 5min @ Z1",
        );
        let steps = &compiled.workout.steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].kind, StepKind::Repeat);
        assert_eq!(steps[0].children.len(), 1);
        assert_eq!(steps[1].kind, StepKind::Cooldown);
        assert!(compiled
            .diagnostics
            .iter()
            .any(|d| d.detail == DiagnosticKind::CooldownHoisted));
    }

    #[test]
    fn empty_repeat_is_dropped_with_a_diagnostic() {
        let compiled = compile("repeat 4:\nwarmup: 10min");
        assert_eq!(compiled.workout.steps.len(), 1);
        assert_eq!(compiled.workout.steps[0].kind, StepKind::Warmup);
        assert!(matches!(
            compiled.diagnostics[0].detail,
            DiagnosticKind::EmptyRepeat { iterations: 4 }
        ));
    }

    #[test]
    fn unindented_keyword_closes_a_repeat_block() {
        let compiled = compile(
            "repeat 2:\n  \
               interval: 1min\n\
             cooldown: 5min",
        );
        let steps = &compiled.workout.steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].kind, StepKind::Repeat);
        assert_eq!(steps[1].kind, StepKind::Cooldown);
    }

    #[test]
    fn consecutive_repeats_do_not_nest() {
        let compiled = compile(
            "repeat 2:\n  \
               interval: 1min\n\
             repeat 3:\n  \
               interval: 2min",
        );
        let steps = &compiled.workout.steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].end_condition_value, 2);
        assert_eq!(steps[1].end_condition_value, 3);
        assert!(steps[1].children[0].children.is_empty());
    }

    #[test]
    fn step_descriptions_are_kept() {
        let compiled = compile("interval: 20min @ Z2 -- focus on cadence");
        assert_eq!(
            compiled.workout.steps[0].description.as_deref(),
            Some("focus on cadence")
        );
    }

    #[test]
    fn cycling_bare_at_means_speed() {
        let raw = PlanConfig {
            speeds: [("tempo".to_owned(), "30-34".to_owned())].into(),
            ..PlanConfig::default()
        };
        let config = config::resolve(&raw).expect("config should resolve");
        let compiled = compile_workout(
            &def("W01S02 Ride", "cycling", "interval: 40min @ tempo"),
            &config,
        )
        .expect("should compile");
        assert_eq!(
            compiled.workout.steps[0].target,
            Target::Speed {
                from_kmh: 30.0,
                to_kmh: 34.0
            }
        );
    }

    #[test]
    fn name_prefix_is_applied() {
        let raw = PlanConfig {
            name_prefix: "MYRUN ".to_owned(),
            ..PlanConfig::default()
        };
        let config = config::resolve(&raw).expect("config should resolve");
        let compiled = compile_workout(&def("W01S01 Easy", "running", "interval: 30min"), &config)
            .expect("should compile");
        assert_eq!(compiled.workout.name, "MYRUN W01S01 Easy");
    }

    #[test]
    fn invalid_sport_is_a_compile_error() {
        let err = compile_workout(&def("W01S01 X", "rowing", "interval: 10min"), &running_config())
            .unwrap_err();
        assert!(
            matches!(err, CompileError::Sport { .. }),
            "expected Sport error, got: {err}"
        );
    }

    #[test]
    fn compile_plan_resolves_config_once() {
        let plan: PlanFile = toml::from_str(
            r#"
[config.paces]
Z2 = "6:00"

[[workouts]]
name = "W01S01 Easy"
steps = "interval: 30min @ Z2"

[[workouts]]
name = "W01S02 Easier"
steps = "interval: 20min @ Z2"
"#,
        )
        .expect("plan should parse");
        let compiled = compile_plan(&plan).expect("should compile");
        assert_eq!(compiled.len(), 2);
        assert_eq!(compiled[0].workout.name, "W01S01 Easy");
    }
}

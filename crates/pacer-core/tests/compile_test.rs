//! End-to-end compilation tests: TOML plan text in, Garmin DTO JSON out.

use pacer_core::diagnostics::DiagnosticKind;
use pacer_core::workout::EndCondition;
use pacer_core::{compile_plan, parse_plan_file};
use serde_json::Value;

const INTERVALS_PLAN: &str = r#"
[config]
name_prefix = "MYRUN "

[config.paces]
Z1 = "6:30"
Z2 = "6:00"
Z5 = "4:00-3:50"

[config.margins]
faster = "0:05"
slower = "0:05"

[[workouts]]
name = "W01S01 Short intervals"
steps = """
warmup: 15min @ Z1
repeat 5:
  interval: 400m @ Z5
  recovery: 2min @ Z1
cooldown: 10min @ Z1
"""
"#;

fn compile_intervals() -> pacer_core::CompiledWorkout {
    let plan = parse_plan_file(INTERVALS_PLAN).expect("plan should parse");
    let mut compiled = compile_plan(&plan).expect("plan should compile");
    assert_eq!(compiled.len(), 1);
    compiled.remove(0)
}

#[test]
fn interval_plan_compiles_to_the_garmin_dto() {
    let compiled = compile_intervals();
    assert!(compiled.diagnostics.is_empty(), "{:?}", compiled.diagnostics);

    let json = compiled.workout.to_garmin_json();
    assert_eq!(json["workoutName"], "MYRUN W01S01 Short intervals");
    assert_eq!(json["sportType"]["sportTypeId"], 1);

    let steps = json["workoutSegments"][0]["workoutSteps"]
        .as_array()
        .expect("steps array");
    assert_eq!(steps.len(), 3);

    assert_eq!(steps[0]["type"], "ExecutableStepDTO");
    assert_eq!(steps[0]["stepType"]["stepTypeKey"], "warmup");
    assert_eq!(steps[0]["endCondition"]["conditionTypeId"], 2);
    assert_eq!(steps[0]["endConditionValue"], 900);

    assert_eq!(steps[1]["type"], "RepeatGroupDTO");
    assert_eq!(steps[1]["numberOfIterations"], 5);
    assert_eq!(steps[1]["smartRepeat"], true);
    let children = steps[1]["workoutSteps"].as_array().expect("children");
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["endCondition"]["conditionTypeKey"], "distance");
    assert_eq!(children[0]["endConditionValue"], 400);
    assert_eq!(children[0]["targetType"]["workoutTargetTypeKey"], "pace.zone");
    assert_eq!(children[0]["childStepId"], 1);

    assert_eq!(steps[2]["stepType"]["stepTypeKey"], "cooldown");
}

#[test]
fn pace_targets_are_emitted_as_meters_per_second() {
    let compiled = compile_intervals();
    let json = compiled.workout.to_garmin_json();
    let interval = &json["workoutSegments"][0]["workoutSteps"][1]["workoutSteps"][0];

    // Z5 is 4:00-3:50 per km: 240 s and 230 s per km, slower bound first.
    let one = interval["targetValueOne"].as_f64().expect("targetValueOne");
    let two = interval["targetValueTwo"].as_f64().expect("targetValueTwo");
    assert!((one - 1000.0 / 240.0).abs() < 1e-9);
    assert!((two - 1000.0 / 230.0).abs() < 1e-9);
    assert!(one < two);
}

#[test]
fn treadmill_rewrite_replaces_distance_with_time_and_is_idempotent() {
    let mut compiled = compile_intervals();
    compiled.workout.dist_to_time();

    let interval = &compiled.workout.steps[1].children[0];
    assert_eq!(interval.end_condition, EndCondition::Time);
    // 400 m at the Z5 band average of (240 + 230) / 2 s per km is 94 s,
    // which rounds to the nearest 10 s.
    assert_eq!(interval.end_condition_value, 90);

    let once = compiled.workout.clone();
    compiled.workout.dist_to_time();
    assert_eq!(compiled.workout, once);
}

#[test]
fn lenient_compilation_reports_and_keeps_going() {
    let plan = parse_plan_file(
        r#"
[config.paces]
Z2 = "6:00"

[[workouts]]
name = "W01S01 Messy"
steps = """
steady: 10min @ Z2
what is this line
tempo: 5min @ Z2
interval: 10min @ Z9
interval: 20min @ Z2
"""
"#,
    )
    .expect("plan should parse");
    let compiled = compile_plan(&plan).expect("plan should compile");
    let workout = &compiled[0];

    // steady coerced, unknown keyword coerced, two lines dropped.
    assert_eq!(workout.workout.steps.len(), 3);
    let kinds: Vec<&str> = workout
        .diagnostics
        .iter()
        .map(|d| match d.detail {
            DiagnosticKind::LegacySteadyStep { .. } => "steady",
            DiagnosticKind::MalformedStepLine { .. } => "malformed",
            DiagnosticKind::UnknownStepKind { .. } => "unknown",
            DiagnosticKind::StepSkipped { .. } => "skipped",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["steady", "malformed", "unknown", "skipped"]);
    assert!(workout.diagnostics.iter().all(|d| d.workout == "W01S01 Messy"));
}

#[test]
fn compiled_json_round_trips_through_serde() {
    let compiled = compile_intervals();
    let json = compiled.workout.to_garmin_json();
    let text = serde_json::to_string_pretty(&json).expect("should serialize");
    let back: Value = serde_json::from_str(&text).expect("should parse back");
    assert_eq!(json, back);
}

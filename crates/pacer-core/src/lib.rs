//! Core library for the pacer training-plan toolchain.
//!
//! The pipeline is: parse a TOML plan file ([`plan_format`]), resolve its
//! zone tables ([`config`]), compile each workout's step text into a
//! normalized step tree ([`compile`]), and either serialize the result for
//! Garmin Connect ([`workout`]) or assign calendar dates ([`schedule`]).
//! Network access goes through the [`platform::TrainingPlatform`] trait.

pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod plan_format;
pub mod platform;
pub mod schedule;
pub mod sync;
pub mod units;
pub mod workout;
pub mod zones;

pub use compile::{CompileError, CompiledWorkout, compile_plan, compile_workout};
pub use config::{ConfigError, HeartRate, ResolvedConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use plan_format::{PlanConfig, PlanFile, WorkoutDef, parse_plan_file};
pub use platform::{
    CalendarItem, GarminConnect, PlatformError, TrainingPlatform, WorkoutSummary,
};
pub use schedule::{
    ScheduleError, ScheduleOutcome, ScheduleParams, ScheduledWorkout, parse_plan_tag,
    plan_schedule,
};
pub use sync::{AppliedSchedule, ImportOutcome, apply_schedule, clear_schedule, import_workouts, list_schedule};
pub use workout::{EndCondition, SportType, StepKind, Target, Workout, WorkoutStep};
pub use zones::{ZoneError, ZoneKind, resolve_target};

//! Calendar scheduling for tagged workouts.
//!
//! Workouts carrying a `W<week>S<session>` tag in their name are assigned
//! concrete dates: week `w` lands in the `w`-th week from the starting
//! Monday, and sessions spread over a weekday pattern chosen by how many
//! sessions that week has. Occupied dates (including the race day) are
//! probed forward up to six days; a workout that fits nowhere is reported,
//! not silently dropped. Output order is deterministic for a given input.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use regex::Regex;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Errors in the scheduling parameters themselves.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("start date {0} is not a Monday")]
    NotAMonday(NaiveDate),

    #[error("weekday offset {0} is out of range (0 = Monday .. 6 = Sunday)")]
    BadWeekday(u32),

    #[error("race day {race_day} is before today ({today})")]
    RaceDayInPast { race_day: NaiveDate, today: NaiveDate },
}

/// Scheduling inputs besides the workout names.
#[derive(Debug, Clone)]
pub struct ScheduleParams {
    /// Lower bound: no workout is placed before this date.
    pub today: NaiveDate,
    /// Upper bound, inclusive. The race day itself counts as occupied, so
    /// the last placeable date is the day before it.
    pub race_day: Option<NaiveDate>,
    /// First Monday of week 1. Defaults to the first Monday at least one
    /// week from today.
    pub start_monday: Option<NaiveDate>,
    /// Weekday offsets (0 = Monday) overriding the per-week default
    /// pattern.
    pub days: Option<Vec<u32>>,
}

/// One placed workout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledWorkout {
    pub date: NaiveDate,
    pub name: String,
}

/// The full result of a scheduling run.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// Placed workouts, ordered by date then name.
    pub scheduled: Vec<ScheduledWorkout>,
    pub diagnostics: Vec<Diagnostic>,
}

static PLAN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"W(\d+)S(\d+)").expect("valid regex"));

/// Extract the `(week, session)` plan tag from a workout name, if any.
pub fn parse_plan_tag(name: &str) -> Option<(u32, u32)> {
    let caps = PLAN_TAG.captures(name)?;
    let week = caps[1].parse().ok()?;
    let session = caps[2].parse().ok()?;
    Some((week, session))
}

/// The first Monday at least one week after `today`.
pub fn default_start_monday(today: NaiveDate) -> NaiveDate {
    let mut date = today + Days::new(7);
    while date.weekday() != Weekday::Mon {
        date = date + Days::new(1);
    }
    date
}

/// Default weekday pattern for a week with `sessions` sessions.
fn default_offsets(sessions: usize) -> Vec<u32> {
    match sessions {
        0 => vec![],
        1 => vec![2],
        2 => vec![1, 4],
        3 => vec![1, 3, 5],
        4 => vec![1, 3, 5, 6],
        5 => vec![1, 2, 3, 5, 6],
        6 => vec![1, 2, 3, 4, 5, 6],
        _ => vec![0, 1, 2, 3, 4, 5, 6],
    }
}

/// Assign dates to every tagged workout in `names`. Untagged names are
/// ignored.
pub fn plan_schedule(
    names: &[String],
    params: &ScheduleParams,
) -> Result<ScheduleOutcome, ScheduleError> {
    if let Some(start) = params.start_monday {
        if start.weekday() != Weekday::Mon {
            return Err(ScheduleError::NotAMonday(start));
        }
    }
    if let Some(days) = &params.days {
        if let Some(&bad) = days.iter().find(|&&d| d > 6) {
            return Err(ScheduleError::BadWeekday(bad));
        }
    }
    if let Some(race_day) = params.race_day {
        if race_day < params.today {
            return Err(ScheduleError::RaceDayInPast {
                race_day,
                today: params.today,
            });
        }
    }
    let start_monday = params
        .start_monday
        .unwrap_or_else(|| default_start_monday(params.today));

    // Group tagged names by week, then session, keeping duplicates.
    let mut weeks: BTreeMap<u32, BTreeMap<u32, Vec<&str>>> = BTreeMap::new();
    for name in names {
        if let Some((week, session)) = parse_plan_tag(name) {
            weeks
                .entry(week)
                .or_default()
                .entry(session)
                .or_default()
                .push(name.as_str());
        }
    }

    // Occupied dates, each tagged with the workout holding it. The race
    // day holds no workout.
    let mut taken: BTreeMap<NaiveDate, Option<&str>> = BTreeMap::new();
    if let Some(race_day) = params.race_day {
        taken.insert(race_day, None);
    }

    let mut scheduled = Vec::new();
    let mut diagnostics = Vec::new();

    // Weeks anchor by position in sorted tag order, not by the raw week
    // number, so a plan whose tags start at W00 or W03 still begins on
    // the start Monday.
    for (week_index, sessions) in weeks.values().enumerate() {
        let monday = start_monday + Days::new(week_index as u64 * 7);
        let offsets = match &params.days {
            Some(days) => days.clone(),
            None => default_offsets(sessions.len()),
        };

        for (i, names) in sessions.values().enumerate() {
            // An explicit day list shorter than the session count wraps.
            let offset = if offsets.is_empty() {
                0
            } else {
                offsets[i % offsets.len()]
            };
            for &name in names {
                let candidate = monday + Days::new(u64::from(offset));
                // A duplicate entry whose candidate it already holds is
                // dropped, not double-booked.
                if taken.get(&candidate) == Some(&Some(name)) {
                    continue;
                }
                match place(candidate, params, &taken) {
                    Some(date) => {
                        if date != candidate {
                            diagnostics.push(Diagnostic::new(
                                name,
                                DiagnosticKind::DateShifted {
                                    from: candidate.to_string(),
                                    to: date.to_string(),
                                },
                            ));
                        }
                        taken.insert(date, Some(name));
                        scheduled.push(ScheduledWorkout {
                            date,
                            name: name.to_owned(),
                        });
                    }
                    None => {
                        diagnostics.push(Diagnostic::new(
                            name,
                            DiagnosticKind::Unschedulable {
                                reason: format!(
                                    "no free date within six days of {candidate}"
                                ),
                            },
                        ));
                    }
                }
            }
        }
    }

    scheduled.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
    Ok(ScheduleOutcome {
        scheduled,
        diagnostics,
    })
}

/// First free, in-bounds date in `candidate..=candidate + 6`, if any.
/// The race day is within bounds but is pre-seeded as occupied.
fn place(
    candidate: NaiveDate,
    params: &ScheduleParams,
    taken: &BTreeMap<NaiveDate, Option<&str>>,
) -> Option<NaiveDate> {
    (0..=6u64)
        .map(|probe| candidate + Days::new(probe))
        .find(|date| {
            *date >= params.today
                && params.race_day.is_none_or(|race| *date <= race)
                && !taken.contains_key(date)
        })
}

//! Applying compiled plans and schedules to a training platform.
//!
//! These operations are deliberately name-keyed: the plan file is the
//! source of truth, and remote workouts are matched by their exact name.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::platform::{self, CalendarItem, PlatformError, TrainingPlatform};
use crate::schedule::ScheduleOutcome;
use crate::workout::Workout;

/// What an import run did, per workout name.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// Workouts already on the platform, left untouched (no `replace`).
    pub skipped: Vec<String>,
}

/// Push compiled workouts to the platform. Existing workouts with the same
/// name are updated when `replace` is set and skipped otherwise.
pub async fn import_workouts(
    platform: &dyn TrainingPlatform,
    workouts: &[Workout],
    replace: bool,
) -> Result<ImportOutcome, PlatformError> {
    let existing = remote_ids_by_name(platform).await?;
    let mut outcome = ImportOutcome::default();

    for workout in workouts {
        let payload = workout.to_garmin_json();
        match existing.get(workout.name.as_str()) {
            Some(&id) if replace => {
                platform.update_workout(id, &payload).await?;
                info!(name = %workout.name, id, "updated workout");
                outcome.updated.push(workout.name.clone());
            }
            Some(&id) => {
                warn!(name = %workout.name, id, "workout already exists, skipping");
                outcome.skipped.push(workout.name.clone());
            }
            None => {
                let created = platform.create_workout(&payload).await?;
                info!(name = %workout.name, id = created.id, "created workout");
                outcome.created.push(workout.name.clone());
            }
        }
    }
    Ok(outcome)
}

/// What a schedule push did.
#[derive(Debug, Clone, Default)]
pub struct AppliedSchedule {
    /// `(name, date)` pairs actually placed on the calendar.
    pub placed: Vec<(String, NaiveDate)>,
    /// Scheduled names with no matching workout on the platform.
    pub missing: Vec<String>,
}

/// Put a computed schedule on the platform calendar. Names with no remote
/// counterpart are reported, not fatal.
pub async fn apply_schedule(
    platform: &dyn TrainingPlatform,
    outcome: &ScheduleOutcome,
) -> Result<AppliedSchedule, PlatformError> {
    let existing = remote_ids_by_name(platform).await?;
    let mut applied = AppliedSchedule::default();

    for entry in &outcome.scheduled {
        match existing.get(entry.name.as_str()) {
            Some(&id) => {
                platform.schedule_workout(id, entry.date).await?;
                info!(name = %entry.name, date = %entry.date, "scheduled workout");
                applied.placed.push((entry.name.clone(), entry.date));
            }
            None => {
                warn!(name = %entry.name, "no workout with this name on the platform");
                applied.missing.push(entry.name.clone());
            }
        }
    }
    Ok(applied)
}

/// Remove calendar entries whose title starts with `prefix` within
/// `[from, to]`. Returns the removed entries.
pub async fn clear_schedule(
    platform: &dyn TrainingPlatform,
    prefix: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<CalendarItem>, PlatformError> {
    let mut removed = Vec::new();
    for (year, month) in platform::months_between(from, to) {
        for item in platform.calendar(year, month).await? {
            if item.date < from || item.date > to || !item.title.starts_with(prefix) {
                continue;
            }
            platform.unschedule_workout(item.id).await?;
            info!(title = %item.title, date = %item.date, "removed calendar entry");
            removed.push(item);
        }
    }
    Ok(removed)
}

/// List calendar entries whose title starts with `prefix` within
/// `[from, to]`, ordered by date then title.
pub async fn list_schedule(
    platform: &dyn TrainingPlatform,
    prefix: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<CalendarItem>, PlatformError> {
    let mut items = Vec::new();
    for (year, month) in platform::months_between(from, to) {
        for item in platform.calendar(year, month).await? {
            if item.date >= from && item.date <= to && item.title.starts_with(prefix) {
                items.push(item);
            }
        }
    }
    items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.title.cmp(&b.title)));
    Ok(items)
}

/// Map remote workout names to IDs. The first occurrence of a duplicated
/// name wins.
async fn remote_ids_by_name(
    platform: &dyn TrainingPlatform,
) -> Result<HashMap<String, u64>, PlatformError> {
    let mut ids = HashMap::new();
    for summary in platform.list_workouts().await? {
        ids.entry(summary.name).or_insert(summary.id);
    }
    Ok(ids)
}

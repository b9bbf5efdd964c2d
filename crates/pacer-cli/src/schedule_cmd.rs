//! Calendar commands: `schedule`, `unschedule`, `scheduled`.

use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use regex::Regex;

use pacer_core::platform::TrainingPlatform;
use pacer_core::schedule::{ScheduleParams, plan_schedule};
use pacer_core::sync;

/// How far ahead `unschedule` and `scheduled` look by default.
const DEFAULT_HORIZON_DAYS: u64 = 400;

/// Options for `pacer schedule`.
pub struct ScheduleOptions {
    pub race_day: Option<String>,
    pub start_monday: Option<String>,
    pub days: Option<String>,
    pub dry_run: bool,
}

fn parse_date(text: &str, what: &str) -> Result<NaiveDate> {
    text.parse()
        .with_context(|| format!("invalid {what} {text:?} (expected YYYY-MM-DD)"))
}

fn parse_days(text: &str) -> Result<Vec<u32>> {
    text.split(',')
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid weekday {raw:?} in --days"))
        })
        .collect()
}

/// Execute `pacer schedule`: compute dates for tagged workouts whose name
/// starts with `prefix` and push them to the calendar.
pub async fn run_schedule(
    platform: &dyn TrainingPlatform,
    prefix: &str,
    options: &ScheduleOptions,
) -> Result<()> {
    let params = ScheduleParams {
        today: Local::now().date_naive(),
        race_day: options
            .race_day
            .as_deref()
            .map(|text| parse_date(text, "--race-day"))
            .transpose()?,
        start_monday: options
            .start_monday
            .as_deref()
            .map(|text| parse_date(text, "--start-monday"))
            .transpose()?,
        days: options.days.as_deref().map(parse_days).transpose()?,
    };

    let names: Vec<String> = platform
        .list_workouts()
        .await?
        .into_iter()
        .map(|summary| summary.name)
        .filter(|name| name.starts_with(prefix))
        .collect();
    if names.is_empty() {
        println!("no workouts on the platform match prefix {prefix:?}");
        return Ok(());
    }

    let outcome = plan_schedule(&names, &params)?;
    for diag in &outcome.diagnostics {
        println!("warning: {diag}");
    }

    if options.dry_run {
        for entry in &outcome.scheduled {
            println!("{}  {}", entry.date, entry.name);
        }
        println!("{} workout(s) would be scheduled.", outcome.scheduled.len());
        return Ok(());
    }

    let applied = sync::apply_schedule(platform, &outcome).await?;
    for (name, date) in &applied.placed {
        println!("{date}  {name}");
    }
    for name in &applied.missing {
        println!("missing on platform, not scheduled: {name}");
    }
    println!("{} workout(s) scheduled.", applied.placed.len());
    Ok(())
}

/// Execute `pacer unschedule`: remove matching future calendar entries.
pub async fn run_unschedule(
    platform: &dyn TrainingPlatform,
    prefix: &str,
    dry_run: bool,
) -> Result<()> {
    let today = Local::now().date_naive();
    let horizon = today + Days::new(DEFAULT_HORIZON_DAYS);

    if dry_run {
        let items = sync::list_schedule(platform, prefix, today, horizon).await?;
        for item in &items {
            println!("would remove: {}  {}", item.date, item.title);
        }
        println!("{} calendar entr(ies) would be removed.", items.len());
        return Ok(());
    }

    let removed = sync::clear_schedule(platform, prefix, today, horizon).await?;
    for item in &removed {
        println!("removed: {}  {}", item.date, item.title);
    }
    println!("{} calendar entr(ies) removed.", removed.len());
    Ok(())
}

/// Execute `pacer scheduled`: list calendar entries.
pub async fn run_scheduled(
    platform: &dyn TrainingPlatform,
    start: Option<&str>,
    end: Option<&str>,
    name_filter: Option<&str>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let start = start
        .map(|text| parse_date(text, "--start"))
        .transpose()?
        .unwrap_or(today);
    let end = end
        .map(|text| parse_date(text, "--end"))
        .transpose()?
        .unwrap_or(today + Days::new(DEFAULT_HORIZON_DAYS));
    let re = name_filter
        .map(Regex::new)
        .transpose()
        .context("invalid --name-filter regex")?;

    let items = sync::list_schedule(platform, "", start, end).await?;
    let mut shown = 0usize;
    for item in items {
        if re.as_ref().is_some_and(|re| !re.is_match(&item.title)) {
            continue;
        }
        println!("{}  {}", item.date, item.title);
        shown += 1;
    }
    println!("{shown} calendar entr(ies).");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_days_accepts_comma_lists() {
        assert_eq!(parse_days("1,3,5").unwrap(), vec![1, 3, 5]);
        assert_eq!(parse_days(" 0, 6 ").unwrap(), vec![0, 6]);
        assert!(parse_days("1,x").is_err());
    }

    #[test]
    fn parse_date_requires_iso_format() {
        assert_eq!(
            parse_date("2024-03-18", "--start-monday").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 18).unwrap()
        );
        assert!(parse_date("18/03/2024", "--start-monday").is_err());
    }
}

//! Plan commands: `check`, `import`, `export`, `delete`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde_json::Value;

use pacer_core::platform::TrainingPlatform;
use pacer_core::workout::Workout;
use pacer_core::{CompiledWorkout, compile_plan, parse_plan_file, sync};

/// Options for `pacer import`.
pub struct ImportOptions {
    pub dry_run: bool,
    pub replace: bool,
    pub treadmill: bool,
    pub name_filter: Option<String>,
}

/// Read, parse, compile, and filter a plan file. The treadmill rewrite also
/// applies to individual workouts whose name ends in `(T)`.
fn load_and_compile(
    file: &Path,
    name_filter: Option<&str>,
    treadmill: bool,
) -> Result<Vec<CompiledWorkout>> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read plan file {}", file.display()))?;
    let plan = parse_plan_file(&contents)
        .with_context(|| format!("failed to parse plan file {}", file.display()))?;
    let mut compiled = compile_plan(&plan).context("failed to compile plan")?;

    if let Some(filter) = name_filter {
        let re = Regex::new(filter).context("invalid --name-filter regex")?;
        compiled.retain(|item| re.is_match(&item.workout.name));
    }
    for item in &mut compiled {
        if treadmill || item.workout.name.trim_end().ends_with("(T)") {
            item.workout.dist_to_time();
        }
    }
    Ok(compiled)
}

fn print_diagnostics(compiled: &[CompiledWorkout]) {
    for item in compiled {
        for diag in &item.diagnostics {
            println!("warning: {diag}");
        }
    }
}

/// Execute `pacer check`: compile locally and print the Garmin JSON.
pub fn run_check(file: &Path) -> Result<()> {
    let compiled = load_and_compile(file, None, false)?;
    print_diagnostics(&compiled);

    for item in &compiled {
        println!("== {} ==", item.workout.name);
        println!(
            "{}",
            serde_json::to_string_pretty(&item.workout.to_garmin_json())
                .context("failed to serialize workout")?
        );
    }
    let warnings: usize = compiled.iter().map(|item| item.diagnostics.len()).sum();
    println!("{} workout(s) compiled, {warnings} warning(s).", compiled.len());
    Ok(())
}

/// Execute `pacer import`: compile and push workouts to the platform.
pub async fn run_import(
    platform: &dyn TrainingPlatform,
    file: &Path,
    options: &ImportOptions,
) -> Result<()> {
    let compiled = load_and_compile(file, options.name_filter.as_deref(), options.treadmill)?;
    print_diagnostics(&compiled);
    let workouts: Vec<Workout> = compiled.into_iter().map(|item| item.workout).collect();

    if options.dry_run {
        let existing: Vec<String> = platform
            .list_workouts()
            .await?
            .into_iter()
            .map(|summary| summary.name)
            .collect();
        for workout in &workouts {
            let action = if !existing.contains(&workout.name) {
                "create"
            } else if options.replace {
                "update"
            } else {
                "skip"
            };
            println!("would {action}: {}", workout.name);
        }
        return Ok(());
    }

    let outcome = sync::import_workouts(platform, &workouts, options.replace).await?;
    for name in &outcome.created {
        println!("created: {name}");
    }
    for name in &outcome.updated {
        println!("updated: {name}");
    }
    for name in &outcome.skipped {
        println!("skipped (already exists, use --replace): {name}");
    }
    Ok(())
}

/// Top-level and per-step fields Garmin attaches server-side. `--clean`
/// strips them so exports can be re-imported or diffed.
const SERVER_FIELDS: [&str; 10] = [
    "workoutId",
    "stepId",
    "ownerId",
    "author",
    "createdDate",
    "updatedDate",
    "shared",
    "estimatedDurationInSecs",
    "estimatedDistanceInMeters",
    "uploadTimestamp",
];

fn strip_server_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for field in SERVER_FIELDS {
                map.remove(field);
            }
            for child in map.values_mut() {
                strip_server_fields(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_server_fields(item);
            }
        }
        _ => {}
    }
}

/// Execute `pacer export`: fetch workout payloads as JSON.
pub async fn run_export(
    platform: &dyn TrainingPlatform,
    output: Option<&Path>,
    name_filter: Option<&str>,
    clean: bool,
) -> Result<()> {
    let re = name_filter
        .map(Regex::new)
        .transpose()
        .context("invalid --name-filter regex")?;

    let mut payloads = Vec::new();
    for summary in platform.list_workouts().await? {
        if re.as_ref().is_some_and(|re| !re.is_match(&summary.name)) {
            continue;
        }
        let mut payload = platform.get_workout(summary.id).await?;
        if clean {
            strip_server_fields(&mut payload);
        }
        payloads.push(payload);
    }

    let text =
        serde_json::to_string_pretty(&payloads).context("failed to serialize workouts")?;
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} workout(s) written to {}", payloads.len(), path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Execute `pacer delete`: remove workouts by ID or name pattern.
pub async fn run_delete(
    platform: &dyn TrainingPlatform,
    ids: Option<&str>,
    name_filter: Option<&str>,
) -> Result<()> {
    match (ids, name_filter) {
        (Some(ids), _) => {
            for raw in ids.split(',') {
                let id: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid workout ID {raw:?}"))?;
                platform.delete_workout(id).await?;
                println!("deleted workout {id}");
            }
        }
        (None, Some(filter)) => {
            let re = Regex::new(filter).context("invalid --name-filter regex")?;
            let mut deleted = 0usize;
            for summary in platform.list_workouts().await? {
                if re.is_match(&summary.name) {
                    platform.delete_workout(summary.id).await?;
                    println!("deleted: {} ({})", summary.name, summary.id);
                    deleted += 1;
                }
            }
            println!("{deleted} workout(s) deleted.");
        }
        (None, None) => bail!("pass --ids or --name-filter to select workouts to delete"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_server_fields_recurses_into_steps() {
        let mut payload = json!({
            "workoutId": 42,
            "ownerId": 7,
            "workoutName": "W01S01 Easy run",
            "workoutSegments": [
                {
                    "workoutSteps": [
                        { "stepId": 901, "stepOrder": 1 },
                        {
                            "stepId": 902,
                            "workoutSteps": [ { "stepId": 903, "stepOrder": 1 } ]
                        }
                    ]
                }
            ]
        });
        strip_server_fields(&mut payload);

        assert_eq!(payload["workoutName"], "W01S01 Easy run");
        assert!(payload.get("workoutId").is_none());
        let step = &payload["workoutSegments"][0]["workoutSteps"][0];
        assert!(step.get("stepId").is_none());
        assert_eq!(step["stepOrder"], 1);
        let nested = &payload["workoutSegments"][0]["workoutSteps"][1]["workoutSteps"][0];
        assert!(nested.get("stepId").is_none());
    }

    #[test]
    fn load_and_compile_applies_treadmill_by_name_suffix() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plan.toml");
        std::fs::write(
            &path,
            r#"
[config.paces]
Z2 = "5:00"

[[workouts]]
name = "W01S01 Easy (T)"
steps = "interval: 2km @ Z2"

[[workouts]]
name = "W01S02 Outside"
steps = "interval: 2km @ Z2"
"#,
        )
        .unwrap();

        let compiled = load_and_compile(&path, None, false).unwrap();
        assert_eq!(
            compiled[0].workout.steps[0].end_condition,
            pacer_core::EndCondition::Time
        );
        assert_eq!(
            compiled[1].workout.steps[0].end_condition,
            pacer_core::EndCondition::Distance
        );
    }

    #[test]
    fn load_and_compile_filters_by_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plan.toml");
        std::fs::write(
            &path,
            r#"
[[workouts]]
name = "W01S01 Easy"
steps = "interval: 30min"

[[workouts]]
name = "W02S01 Long"
steps = "interval: 60min"
"#,
        )
        .unwrap();

        let compiled = load_and_compile(&path, Some("^W02"), false).unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].workout.name, "W02S01 Long");
    }
}

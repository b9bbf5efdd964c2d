mod config;
mod plan_cmds;
mod schedule_cmd;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pacer_core::platform::{GarminConnect, TrainingPlatform};

use config::PacerConfig;

#[derive(Parser)]
#[command(name = "pacer", about = "Training plan compiler and scheduler for Garmin Connect")]
struct Cli {
    /// Garmin API token (overrides PACER_GARMIN_TOKEN env var)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a pacer config file storing the --token value (no network required)
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Compile a plan file locally and print the Garmin JSON
    Check {
        /// Path to the plan TOML file
        file: PathBuf,
    },
    /// Compile a plan file and push its workouts to Garmin
    Import {
        /// Path to the plan TOML file
        file: PathBuf,
        /// Show what would happen without pushing anything
        #[arg(long)]
        dry_run: bool,
        /// Update existing workouts with the same name
        #[arg(long)]
        replace: bool,
        /// Rewrite distance steps with pace targets into timed steps
        #[arg(long)]
        treadmill: bool,
        /// Only import workouts whose name matches this regex
        #[arg(long)]
        name_filter: Option<String>,
    },
    /// Fetch workouts from Garmin as JSON
    Export {
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Only export workouts whose name matches this regex
        #[arg(long)]
        name_filter: Option<String>,
        /// Strip server-side metadata fields
        #[arg(long)]
        clean: bool,
    },
    /// Delete workouts from Garmin
    Delete {
        /// Comma-separated workout IDs
        #[arg(long)]
        ids: Option<String>,
        /// Delete workouts whose name matches this regex
        #[arg(long)]
        name_filter: Option<String>,
    },
    /// Assign calendar dates to tagged workouts and push them
    Schedule {
        /// Workout name prefix selecting the plan (e.g. "MYRUN W")
        prefix: String,
        /// Race day (YYYY-MM-DD); the plan must finish before it
        #[arg(long)]
        race_day: Option<String>,
        /// First Monday of week 1 (YYYY-MM-DD)
        #[arg(long)]
        start_monday: Option<String>,
        /// Comma-separated weekday offsets, 0 = Monday (e.g. "1,3,5")
        #[arg(long)]
        days: Option<String>,
        /// Print the computed dates without touching the calendar
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove matching future calendar entries
    Unschedule {
        /// Calendar title prefix to remove
        prefix: String,
        /// Show what would be removed without doing it
        #[arg(long)]
        dry_run: bool,
    },
    /// List upcoming calendar entries
    Scheduled {
        /// Start date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Only list entries whose title matches this regex
        #[arg(long)]
        name_filter: Option<String>,
    },
}

/// Execute `pacer init`: write the config file.
fn cmd_init(token: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        garmin: config::GarminSection {
            token: token.to_string(),
            base_url: None,
        },
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("Next: run `pacer check <plan.toml>` to compile a plan.");
    Ok(())
}

/// Build the Garmin client from resolved configuration.
fn connect(cli_token: Option<&str>) -> anyhow::Result<Box<dyn TrainingPlatform>> {
    let resolved = PacerConfig::resolve(cli_token)?;
    let client = match resolved.base_url {
        Some(base_url) => GarminConnect::with_base_url(resolved.token, base_url),
        None => GarminConnect::new(resolved.token),
    };
    Ok(Box::new(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            let token = cli
                .token
                .as_deref()
                .context("pass --token with the Garmin API token to store")?;
            cmd_init(token, force)?;
        }
        Commands::Check { file } => {
            plan_cmds::run_check(&file)?;
        }
        Commands::Import {
            file,
            dry_run,
            replace,
            treadmill,
            name_filter,
        } => {
            let platform = connect(cli.token.as_deref())?;
            let options = plan_cmds::ImportOptions {
                dry_run,
                replace,
                treadmill,
                name_filter,
            };
            plan_cmds::run_import(platform.as_ref(), &file, &options).await?;
        }
        Commands::Export {
            output,
            name_filter,
            clean,
        } => {
            let platform = connect(cli.token.as_deref())?;
            plan_cmds::run_export(
                platform.as_ref(),
                output.as_deref(),
                name_filter.as_deref(),
                clean,
            )
            .await?;
        }
        Commands::Delete { ids, name_filter } => {
            let platform = connect(cli.token.as_deref())?;
            plan_cmds::run_delete(platform.as_ref(), ids.as_deref(), name_filter.as_deref())
                .await?;
        }
        Commands::Schedule {
            prefix,
            race_day,
            start_monday,
            days,
            dry_run,
        } => {
            let platform = connect(cli.token.as_deref())?;
            let options = schedule_cmd::ScheduleOptions {
                race_day,
                start_monday,
                days,
                dry_run,
            };
            schedule_cmd::run_schedule(platform.as_ref(), &prefix, &options).await?;
        }
        Commands::Unschedule { prefix, dry_run } => {
            let platform = connect(cli.token.as_deref())?;
            schedule_cmd::run_unschedule(platform.as_ref(), &prefix, dry_run).await?;
        }
        Commands::Scheduled {
            start,
            end,
            name_filter,
        } => {
            let platform = connect(cli.token.as_deref())?;
            schedule_cmd::run_scheduled(
                platform.as_ref(),
                start.as_deref(),
                end.as_deref(),
                name_filter.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}

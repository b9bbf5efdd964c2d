//! Configuration file management for pacer.
//!
//! Provides a TOML-based config file at `~/.config/pacer/config.toml` and a
//! resolution chain: CLI flag > env var > config file.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub garmin: GarminSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GarminSection {
    /// OAuth bearer token for the Garmin Connect API.
    pub token: String,
    /// Override the API host (test servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the pacer config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/pacer` or `~/.config/pacer`.
/// We intentionally ignore the platform-specific `dirs::config_dir()`
/// (which returns `~/Library/Application Support` on macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("pacer");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("pacer")
}

/// Return the path to the pacer config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix: the file holds a live token.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PacerConfig {
    pub token: String,
    pub base_url: Option<String>,
}

impl PacerConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file.
    ///
    /// - Token: `cli_token` > `PACER_GARMIN_TOKEN` env > `garmin.token` > error
    /// - Base URL: `PACER_GARMIN_URL` env > `garmin.base_url` > built-in default
    pub fn resolve(cli_token: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let token = if let Some(token) = cli_token {
            token.to_string()
        } else if let Ok(token) = std::env::var("PACER_GARMIN_TOKEN") {
            token
        } else if let Some(ref cfg) = file_config {
            cfg.garmin.token.clone()
        } else {
            bail!(
                "Garmin token not found; set PACER_GARMIN_TOKEN or run `pacer init` to create a config file"
            );
        };

        let base_url = std::env::var("PACER_GARMIN_URL")
            .ok()
            .or_else(|| file_config.and_then(|cfg| cfg.garmin.base_url));

        Ok(Self { token, base_url })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

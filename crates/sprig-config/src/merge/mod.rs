//! Configuration discovery, layering and environment overrides
//!
//! Precedence, lowest first: sprig.toml, `SPRIG_*` environment variables,
//! command-line overrides.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use sprig_core::error::SprigError;
use sprig_core::types::Version;

use crate::toml::{ResolverSettings, SprigToml};
use crate::ConfigResult;

/// Project manifest file name
pub const CONFIG_FILE_NAME: &str = "sprig.toml";

/// Lock file name, written next to the manifest
pub const LOCK_FILE_NAME: &str = "sprig.lock";

/// Prefix of environment variables that override settings
pub const ENV_PREFIX: &str = "SPRIG_";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Environment and command-line overrides applied over a loaded manifest
#[derive(Debug, Clone, Default)]
pub struct ConfigLayering {
    /// `SPRIG_*` environment variables
    env_overrides: HashMap<String, String>,
    /// Command-line overrides keyed by setting name (`runtime-version`, ...)
    cli_overrides: HashMap<String, String>,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Project sprig.toml file
    ProjectToml(Utf8PathBuf),
    /// No manifest found; defaults were used
    Defaults,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: impl Into<Utf8PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Find a file in the working directory or the nearest ancestor that has it
    pub fn find_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.exists())
    }

    /// Load the project manifest, walking up from the working directory
    pub async fn load_project_config(&self) -> ConfigResult<(SprigToml, ConfigSource)> {
        match self.find_config_path(CONFIG_FILE_NAME) {
            Some(path) => {
                debug!(path = %path, "Loading project configuration");
                let config = crate::toml::load_from_file(&path).await?;
                Ok((config, ConfigSource::ProjectToml(path)))
            },
            None => Err(SprigError::config(
                "config",
                format!("No {} found in {} or parent directories", CONFIG_FILE_NAME, self.cwd),
            )),
        }
    }

    /// Load the project manifest, falling back to defaults when there is none
    pub async fn load_or_default(&self) -> ConfigResult<(SprigToml, ConfigSource)> {
        if self.find_config_path(CONFIG_FILE_NAME).is_none() {
            debug!(cwd = %self.cwd, "No project configuration found, using defaults");
            return Ok((SprigToml::default(), ConfigSource::Defaults));
        }
        self.load_project_config().await
    }

    /// Lock file location for a configuration source
    pub fn lock_file_path(&self, source: &ConfigSource) -> Utf8PathBuf {
        let dir: &Utf8Path = match source {
            ConfigSource::ProjectToml(path) => path.parent().unwrap_or(&self.cwd),
            ConfigSource::Defaults => &self.cwd,
        };
        dir.join(LOCK_FILE_NAME)
    }
}

impl ConfigLayering {
    /// Create a layering with no overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Layering seeded with the current process environment
    pub fn from_environment() -> Self {
        Self::new().with_env_overrides(Self::collect_env_overrides())
    }

    pub fn with_env_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.env_overrides = overrides;
        self
    }

    pub fn with_cli_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.cli_overrides = overrides;
        self
    }

    /// Apply this layering to a loaded manifest
    pub fn apply(&self, config: SprigToml) -> ConfigResult<SprigToml> {
        Self::merge_configs(config, &self.env_overrides, &self.cli_overrides)
    }

    /// Merge override layers over a project configuration
    pub fn merge_configs(
        project_config: SprigToml,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<SprigToml> {
        let mut merged = project_config;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut merged.resolver, env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut merged.resolver, cli_overrides)?;

        // Overrides must leave a usable context behind
        merged.resolver.to_context()?;

        Ok(merged)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(settings: &mut ResolverSettings, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            let setting = match key.as_str() {
                "SPRIG_RUNTIME_VERSION" => "runtime-version",
                "SPRIG_PLATFORM_VERSION" => "platform-version",
                "SPRIG_ALLOW_PRERELEASE" => "allow-prerelease",
                "SPRIG_PREFER_INSTALLED" => "prefer-installed",
                // Unknown environment variable, ignore
                _ => continue,
            };
            apply_setting(settings, setting, value, key)?;
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(settings: &mut ResolverSettings, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "runtime-version" | "platform-version" | "allow-prerelease" | "prefer-installed" => {
                    apply_setting(settings, key, value, &format!("--{}", key))?;
                },
                _ => {
                    debug!(key = %key, "Ignoring unknown override");
                },
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

/// Set one resolver setting from override text. An empty value clears an
/// optional setting.
fn apply_setting(settings: &mut ResolverSettings, setting: &str, value: &str, origin: &str) -> ConfigResult<()> {
    let value = value.trim();
    debug!(setting, origin, "Applying configuration override");

    match setting {
        "runtime-version" if value.is_empty() => settings.runtime_version = None,
        "runtime-version" => {
            Version::parse(value).map_err(|e| {
                SprigError::config(origin, format!("Invalid runtime version '{}': {}", value, e))
            })?;
            settings.runtime_version = Some(value.to_string());
        },
        "platform-version" if value.is_empty() => settings.platform_version = None,
        "platform-version" => settings.platform_version = Some(value.to_string()),
        "allow-prerelease" => settings.allow_prerelease = parse_bool(value, origin)?,
        "prefer-installed" => settings.prefer_installed = parse_bool(value, origin)?,
        other => return Err(SprigError::config(origin, format!("Unknown setting '{}'", other))),
    }

    Ok(())
}

fn parse_bool(value: &str, origin: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(SprigError::config(origin, format!("Expected a boolean, got '{}'", value))),
    }
}

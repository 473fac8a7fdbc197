//! sprig.toml configuration parsing and serialization

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sprig_core::error::SprigError;
use sprig_core::types::{Requirement, ResolverContext, Version};
use sprig_core::utils::is_valid_name;

use crate::ConfigResult;

/// Complete sprig.toml configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SprigToml {
    /// Project metadata section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSection>,

    /// Target environment and selection policies
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Root requirements
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencySpec>,
}

/// Project metadata section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Project name (required)
    pub name: String,

    /// Project version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    /// Project description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `[resolver]` section
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverSettings {
    /// Host runtime version, e.g. "3.11"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,

    /// Host platform identifier, e.g. "2024"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,

    /// Allow prerelease versions
    #[serde(default)]
    pub allow_prerelease: bool,

    /// Keep installed versions that still satisfy their constraint
    #[serde(default)]
    pub prefer_installed: bool,
}

/// Dependency specification (simple string or detailed table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Simple version requirement string
    Simple(String),

    /// Detailed dependency specification
    Detailed {
        /// Version requirement, any version when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,

        /// Extra groups to activate
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        extras: Vec<String>,
    },
}

impl DependencySpec {
    /// Version requirement text, `*` when none was given
    pub fn version(&self) -> &str {
        match self {
            DependencySpec::Simple(version) => version,
            DependencySpec::Detailed {
                version: Some(version), ..
            } => version,
            DependencySpec::Detailed { version: None, .. } => "*",
        }
    }

    /// Requested extras
    pub fn extras(&self) -> &[String] {
        match self {
            DependencySpec::Simple(_) => &[],
            DependencySpec::Detailed { extras, .. } => extras,
        }
    }

    /// Build the root requirement for `name`
    pub fn to_requirement(&self, name: &str) -> ConfigResult<Requirement> {
        let field = format!("dependencies.{}", name);
        let requirement = Requirement::parse(name, self.version())
            .map_err(|e| SprigError::config(field.as_str(), e.to_string()))?;

        self.extras().iter().try_fold(requirement, |requirement, extra| {
            if is_valid_name(extra) {
                Ok(requirement.with_extra(extra))
            } else {
                Err(SprigError::config(field.as_str(), format!("Invalid extra name '{}'", extra)))
            }
        })
    }
}

impl ResolverSettings {
    /// Build the resolution context these settings describe
    pub fn to_context(&self) -> ConfigResult<ResolverContext> {
        let mut context = ResolverContext::new()
            .allow_prerelease(self.allow_prerelease)
            .prefer_installed(self.prefer_installed);

        if let Some(runtime) = &self.runtime_version {
            let version = Version::parse(runtime).map_err(|e| {
                SprigError::config("resolver.runtime-version", format!("Invalid runtime version '{}': {}", runtime, e))
            })?;
            context = context.with_runtime_version(version);
        }

        if let Some(platform) = &self.platform_version {
            if platform.trim().is_empty() {
                return Err(SprigError::config("resolver.platform-version", "Platform version must not be empty"));
            }
            context = context.with_platform_version(platform.as_str());
        }

        Ok(context)
    }
}

impl SprigToml {
    /// Root requirements in name order
    pub fn requirements(&self) -> ConfigResult<Vec<Requirement>> {
        self.dependencies
            .iter()
            .map(|(name, spec)| spec.to_requirement(name))
            .collect()
    }
}

/// Parse TOML string to SprigToml configuration
pub fn parse_sprig_toml(content: &str) -> ConfigResult<SprigToml> {
    // First try with toml_edit for better error reporting
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| toml_error(content, e.message(), e.span()))?;

    // Then parse with serde for type safety
    let config: SprigToml = toml::from_str(content).map_err(|e| toml_error(content, e.message(), e.span()))?;

    validate_config(&config)?;

    debug!(dependencies = config.dependencies.len(), "Parsed sprig.toml");
    Ok(config)
}

/// Serialize SprigToml to TOML string
pub fn serialize_sprig_toml(config: &SprigToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| SprigError::TomlParse {
        message: format!("TOML serialization error: {}", e),
        line: 0,
        column: 0,
    })
}

/// Validate configuration completeness
pub fn validate_config(config: &SprigToml) -> ConfigResult<()> {
    if let Some(project) = &config.project {
        if !is_valid_name(&project.name) {
            return Err(SprigError::config(
                "project.name",
                format!("Invalid project name '{}'", project.name),
            ));
        }
    }

    config.resolver.to_context()?;
    config.requirements()?;

    Ok(())
}

/// Load and parse sprig.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<SprigToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SprigError::io(format!("Failed to read {}", path), e))?;

    parse_sprig_toml(&content).map_err(|e| match e {
        SprigError::TomlParse { message, line, column } => SprigError::TomlParse {
            message: format!("in file {}: {}", path, message),
            line,
            column,
        },
        other => other,
    })
}

fn toml_error(content: &str, message: &str, span: Option<std::ops::Range<usize>>) -> SprigError {
    let (line, column) = span.map_or((0, 0), |span| line_column(content, span.start));
    SprigError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

//! Configuration file support for calltrace
//!
//! Loads instrumentation settings from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.calltracerc.json` in the working directory
//! 3. `calltrace.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::error::ConfigError;
use crate::format::FormatterKind;
use crate::policy::{Policy, DEFAULT_PREFIX, DEFAULT_RENDER_LIMIT, DEFAULT_SINK, SINKS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names probed by [`discover_config`], in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &[".calltracerc.json", "calltrace.config.json"];

/// Settings as written in a config file or collected from CLI flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalltraceConfig {
    /// Only annotate functions matching this regular expression (default ".")
    #[serde(default)]
    pub filter: Option<String>,

    /// Skip functions matching this regular expression; beats `filter`
    #[serde(default)]
    pub exclude: Option<String>,

    /// Only annotate exported (`pub`) functions
    #[serde(default)]
    pub exported: Option<bool>,

    /// Prefix logged names with the unit name
    #[serde(default)]
    pub package: Option<bool>,

    /// Log function returns
    #[serde(default)]
    pub returns: Option<bool>,

    /// Log elapsed time on return (implies `returns`)
    #[serde(default)]
    pub timing: Option<bool>,

    /// Log the source position of closures
    #[serde(default)]
    pub position: Option<bool>,

    /// Prefix for every trace line (default "\t")
    #[serde(default)]
    pub prefix: Option<String>,

    /// Maximum rendered length of one argument (default 1024)
    #[serde(default)]
    pub limit: Option<usize>,

    /// "stderr" (default) or "stdout"
    #[serde(default)]
    pub sink: Option<String>,

    /// Canonical formatter (default prettyplease)
    #[serde(default)]
    pub formatter: Option<FormatterKind>,

    /// Name used for the unit prefix instead of the one derived from the path
    #[serde(default)]
    pub unit_name: Option<String>,
}

/// Resolved configuration with compiled patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    pub policy: Policy,
    pub formatter: FormatterKind,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        field,
        pattern: pattern.to_string(),
        source,
    })
}

impl CalltraceConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(filter) = &self.filter {
            compile("filter", filter)?;
        }
        if let Some(exclude) = &self.exclude {
            compile("exclude", exclude)?;
        }

        if let Some(limit) = self.limit {
            if limit == 0 {
                return Err(ConfigError::NotPositive {
                    field: "limit",
                    value: limit,
                });
            }
        }

        if let Some(sink) = &self.sink {
            if !SINKS.contains(&sink.as_str()) {
                return Err(ConfigError::UnknownValue {
                    field: "sink",
                    value: sink.clone(),
                    expected: "stderr, stdout",
                });
            }
        }

        Ok(())
    }

    /// Layer `overrides` on top of `self`; every field set in `overrides` wins
    pub fn merge(self, overrides: CalltraceConfig) -> CalltraceConfig {
        CalltraceConfig {
            filter: overrides.filter.or(self.filter),
            exclude: overrides.exclude.or(self.exclude),
            exported: overrides.exported.or(self.exported),
            package: overrides.package.or(self.package),
            returns: overrides.returns.or(self.returns),
            timing: overrides.timing.or(self.timing),
            position: overrides.position.or(self.position),
            prefix: overrides.prefix.or(self.prefix),
            limit: overrides.limit.or(self.limit),
            sink: overrides.sink.or(self.sink),
            formatter: overrides.formatter.or(self.formatter),
            unit_name: overrides.unit_name.or(self.unit_name),
        }
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.validate()?;

        let filter = compile("filter", self.filter.as_deref().unwrap_or("."))?;
        let exclude = match self.exclude.as_deref() {
            // An empty exclude pattern would match every name
            Some("") | None => None,
            Some(pattern) => Some(compile("exclude", pattern)?),
        };

        let policy = Policy {
            filter,
            exclude,
            exported_only: self.exported.unwrap_or(false),
            show_package: self.package.unwrap_or(false),
            show_timing: self.timing.unwrap_or(false),
            show_position: self.position.unwrap_or(false),
            prefix: self
                .prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            render_limit: self.limit.unwrap_or(DEFAULT_RENDER_LIMIT),
            sink: self.sink.clone().unwrap_or_else(|| DEFAULT_SINK.to_string()),
            show_return: self.returns.unwrap_or(false),
            unit_name: self.unit_name.clone(),
        };

        Ok(ResolvedConfig {
            policy,
            formatter: self.formatter.unwrap_or_default(),
            config_path: None,
        })
    }
}

/// Discover and load a config file from `dir`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(dir: &Path) -> Result<Option<(CalltraceConfig, PathBuf)>, ConfigError> {
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<CalltraceConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: CalltraceConfig =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    config.validate()?;
    Ok(config)
}

/// Load, merge and resolve configuration
///
/// If `config_path` is provided, loads from that file; otherwise discovers a
/// config file in `dir`. `overrides` (usually CLI flags) win over the file.
pub fn load_and_resolve(
    dir: &Path,
    config_path: Option<&Path>,
    overrides: CalltraceConfig,
) -> Result<ResolvedConfig, ConfigError> {
    let (config, source_path) = if let Some(path) = config_path {
        (load_config_file(path)?, Some(path.to_path_buf()))
    } else {
        match discover_config(dir)? {
            Some((config, path)) => (config, Some(path)),
            None => (CalltraceConfig::default(), None),
        }
    };

    let mut resolved = config.merge(overrides).resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

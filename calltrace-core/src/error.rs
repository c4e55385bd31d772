//! Error types for the annotation engine
//!
//! Per-unit failures ([`InstrumentError`]) never stop sibling units from being
//! processed. [`ConfigError`] is raised before any unit is touched.

use std::path::PathBuf;

/// Which canonicalization pass failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStage {
    /// Formatting the unit as read from disk
    Input,
    /// Formatting the spliced, instrumented text
    Output,
}

impl std::fmt::Display for FormatStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatStage::Input => f.write_str("input"),
            FormatStage::Output => f.write_str("output"),
        }
    }
}

/// Failure while instrumenting one unit
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    /// Source is not valid syntax (or not UTF-8)
    #[error("syntax error in {unit}: {message}")]
    Parse { unit: String, message: String },

    /// The unit already imports the tracing runtime; it is skipped untouched
    #[error("{unit} already imports `{marker}`, skipping")]
    AlreadyInstrumented { unit: String, marker: String },

    /// Canonical formatting failed. `source_text` holds the bytes that were
    /// handed to the formatter so they can be inspected.
    #[error("failed to format {stage} of {unit}: {message}")]
    Format {
        unit: String,
        stage: FormatStage,
        message: String,
        source_text: String,
    },

    /// Edits were not in ascending offset order
    #[error("edit at offset {offset} precedes previous edit at {previous}")]
    EditOrder { offset: usize, previous: usize },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InstrumentError {
    pub fn parse(unit: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            unit: unit.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Skips are reported but do not count as failures
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::AlreadyInstrumented { .. })
    }

    /// Bytes worth showing to the user alongside the error, if any
    pub fn diagnostic_text(&self) -> Option<&str> {
        match self {
            Self::Format { source_text, .. } => Some(source_text),
            _ => None,
        }
    }
}

/// Invalid policy or configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {field} pattern {pattern:?}: {source}")]
    Pattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: usize },

    #[error("unknown {field} {value:?} (expected one of: {expected})")]
    UnknownValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

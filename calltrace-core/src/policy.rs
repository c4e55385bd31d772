//! Instrumentation policy: which functions get traced and how

use regex::Regex;

/// Default log prefix written before every trace line
pub const DEFAULT_PREFIX: &str = "\t";

/// Default per-argument render limit, in characters
pub const DEFAULT_RENDER_LIMIT: usize = 1024;

/// Default trace sink
pub const DEFAULT_SINK: &str = "stderr";

/// Sink selectors the runtime understands
pub const SINKS: &[&str] = &["stderr", "stdout"];

/// Immutable, validated instrumentation settings for one run
#[derive(Debug, Clone)]
pub struct Policy {
    /// Final (possibly unit-prefixed) names must match to be instrumented
    pub filter: Regex,
    /// Names matching this are skipped even when `filter` matches
    pub exclude: Option<Regex>,
    pub exported_only: bool,
    pub show_package: bool,
    /// Use [`Policy::show_return`] to read the effective value
    pub show_return: bool,
    pub show_timing: bool,
    /// Closures carry `file:line:col` in their trace lines
    pub show_position: bool,
    pub prefix: String,
    pub render_limit: usize,
    pub sink: String,
    /// Overrides the unit name derived from the file path
    pub unit_name: Option<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            filter: Regex::new(".").expect("static pattern"),
            exclude: None,
            exported_only: false,
            show_package: false,
            show_return: false,
            show_timing: false,
            show_position: false,
            prefix: DEFAULT_PREFIX.to_string(),
            render_limit: DEFAULT_RENDER_LIMIT,
            sink: DEFAULT_SINK.to_string(),
            unit_name: None,
        }
    }
}

impl Policy {
    /// Exit lines are emitted when requested directly or implied by timing
    pub fn show_return(&self) -> bool {
        self.show_return || self.show_timing
    }

    pub fn with_returns(mut self, on: bool) -> Self {
        self.show_return = on;
        self
    }

    pub fn with_timing(mut self, on: bool) -> Self {
        self.show_timing = on;
        self
    }

    /// Filter first, then exclude; exclude always wins
    pub fn selects(&self, name: &str) -> bool {
        if !self.filter.is_match(name) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(name),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selects_everything() {
        let policy = Policy::default();
        assert!(policy.selects("main"));
        assert!(policy.selects("Type::method"));
        assert!(!policy.show_return());
    }

    #[test]
    fn test_exclude_dominates_filter() {
        let policy = Policy {
            filter: Regex::new("^net::").unwrap(),
            exclude: Some(Regex::new("::poll$").unwrap()),
            ..Policy::default()
        };
        assert!(policy.selects("net::Conn::read"));
        assert!(!policy.selects("net::Conn::poll"));
        assert!(!policy.selects("io::read"));
    }

    #[test]
    fn test_timing_implies_return() {
        let policy = Policy::default().with_timing(true);
        assert!(policy.show_return());

        let policy = Policy::default().with_returns(true);
        assert!(policy.show_return());
        assert!(!policy.show_timing);
    }
}

//! Canonical formatting of Rust source
//!
//! Formatting runs twice per unit: once before parsing, so that span offsets
//! refer to canonical text, and once after splicing, so the output is clean.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};

/// Source-to-canonical-source formatter
pub trait Formatter: Send + Sync {
    /// Format a whole unit. The error is a human-readable message.
    fn format(&self, source: &str) -> Result<String, String>;
}

/// In-process formatter: parse with syn, print with prettyplease.
///
/// Non-doc comments do not survive this round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyPlease;

impl Formatter for PrettyPlease {
    fn format(&self, source: &str) -> Result<String, String> {
        let file = syn::parse_file(source).map_err(|e| describe_syn_error(&e))?;
        Ok(prettyplease::unparse(&file))
    }
}

/// External `rustfmt`, reading stdin and writing stdout. Keeps comments.
#[derive(Debug, Clone)]
pub struct Rustfmt {
    pub program: String,
    pub edition: String,
}

impl Default for Rustfmt {
    fn default() -> Self {
        Rustfmt {
            program: "rustfmt".to_string(),
            edition: "2021".to_string(),
        }
    }
}

impl Formatter for Rustfmt {
    fn format(&self, source: &str) -> Result<String, String> {
        let mut child = Command::new(&self.program)
            .args(["--edition", &self.edition, "--emit", "stdout", "--quiet"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to run {}: {}", self.program, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(source.as_bytes())
                .map_err(|e| format!("failed to write to {}: {}", self.program, e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("failed to wait for {}: {}", self.program, e))?;

        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }
        String::from_utf8(output.stdout).map_err(|e| e.to_string())
    }
}

/// Formatter selection as it appears in config files and on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    #[default]
    Prettyplease,
    Rustfmt,
}

impl FormatterKind {
    pub fn build(self) -> Box<dyn Formatter> {
        match self {
            FormatterKind::Prettyplease => Box::new(PrettyPlease),
            FormatterKind::Rustfmt => Box::new(Rustfmt::default()),
        }
    }
}

/// `line:col: message` for a syn error
pub fn describe_syn_error(err: &syn::Error) -> String {
    let start = err.span().start();
    format!("{}:{}: {}", start.line, start.column + 1, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prettyplease_canonicalizes() {
        let out = PrettyPlease.format("fn   add(a:i32,b :i32)->i32{a+b}").unwrap();
        assert_eq!(out, "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n");
    }

    #[test]
    fn test_prettyplease_is_idempotent() {
        let once = PrettyPlease
            .format("mod m { pub fn f(x: u8) { let _ = x; } }")
            .unwrap();
        let twice = PrettyPlease.format(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_prettyplease_rejects_invalid_source() {
        assert!(PrettyPlease.format("fn broken( {").is_err());
        assert!(PrettyPlease.format("fn f() { let = ; }").is_err());
    }

    fn rustfmt_available() -> bool {
        Command::new("rustfmt")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_rustfmt_formats_and_keeps_comments() {
        if !rustfmt_available() {
            eprintln!("rustfmt not on PATH, skipping");
            return;
        }
        let rustfmt = Rustfmt::default();
        assert_eq!(rustfmt.format("fn  a( ){}").unwrap(), "fn a() {}\n");

        let out = rustfmt.format("// keep me\nfn  b( x:u8 ){ let _=x; }").unwrap();
        assert!(out.starts_with("// keep me\n"));
        assert!(out.contains("fn b(x: u8) {"));
    }

    #[test]
    fn test_rustfmt_rejects_invalid_source() {
        if !rustfmt_available() {
            return;
        }
        assert!(Rustfmt::default().format("fn broken( {").is_err());
    }

    #[test]
    fn test_rustfmt_missing_program_is_an_error() {
        let rustfmt = Rustfmt {
            program: "calltrace-no-such-formatter".to_string(),
            ..Rustfmt::default()
        };
        let err = rustfmt.format("fn a() {}").unwrap_err();
        assert!(err.contains("failed to run calltrace-no-such-formatter"));
    }

    #[test]
    fn test_formatter_kind_from_json() {
        let kind: FormatterKind = serde_json::from_str("\"rustfmt\"").unwrap();
        assert_eq!(kind, FormatterKind::Rustfmt);
        assert_eq!(FormatterKind::default(), FormatterKind::Prettyplease);
    }
}

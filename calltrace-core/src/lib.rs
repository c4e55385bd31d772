//! Calltrace core library - source-to-source call tracing for Rust

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Each unit is processed independently; no global mutable state
// - Edits only insert, in ascending offset order
// - Generated code is spliced into canonical text only, and the result is
//   canonicalized again
// - Already-instrumented units are never touched
// - Input file order is deterministic

pub mod annotate;
pub mod config;
pub mod error;
pub mod format;
pub mod patch;
pub mod policy;
pub mod scan;
pub mod snippet;
pub mod source;

pub use annotate::{instrument_file, instrument_source, unit_for, unit_name_for, write_in_place};
pub use config::{load_and_resolve, CalltraceConfig, ResolvedConfig};
pub use error::{ConfigError, FormatStage, InstrumentError};
pub use format::{Formatter, FormatterKind, PrettyPlease, Rustfmt};
pub use policy::Policy;
pub use scan::{FunctionSite, SiteKind, Unit};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Expand input paths into the `.rs` files to instrument.
///
/// Files are taken as given (if they end in `.rs`); directories are walked
/// recursively. The result is sorted and free of duplicates.
pub fn collect_source_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_rust_source(path) {
                files.push(path.clone());
            }
        } else if path.is_dir() {
            collect_source_files_recursive(path, &mut files)?;
        } else {
            anyhow::bail!("Path does not exist: {}", path.display());
        }
    }

    // Sort files for deterministic order
    files.sort();
    files.dedup();

    Ok(files)
}

fn is_rust_source(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("rs")
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || name == "target"
}

/// Process one directory entry, pushing source files or recursing into dirs
fn process_dir_entry(path: PathBuf, metadata: std::fs::Metadata, files: &mut Vec<PathBuf>) -> Result<()> {
    if metadata.is_symlink() {
        return Ok(());
    }

    if metadata.is_dir() {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if is_skipped_dir(name) {
                return Ok(());
            }
        }
        collect_source_files_recursive(&path, files)?;
    } else if metadata.is_file() && is_rust_source(&path) {
        files.push(path);
    }

    Ok(())
}

/// Recursively collect `.rs` files from a directory
fn collect_source_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry_result in
        std::fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry_result?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
        process_dir_entry(path, metadata, files)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_walks_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/net")).unwrap();
        std::fs::create_dir_all(root.join("target/debug")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "").unwrap();
        std::fs::write(root.join("src/net/mod.rs"), "").unwrap();
        std::fs::write(root.join("src/notes.txt"), "").unwrap();
        std::fs::write(root.join("target/debug/build.rs"), "").unwrap();
        std::fs::write(root.join(".git/hook.rs"), "").unwrap();

        let files = collect_source_files(&[root.to_path_buf()]).unwrap();
        assert_eq!(
            files,
            vec![root.join("src/lib.rs"), root.join("src/net/mod.rs")]
        );
    }

    #[test]
    fn test_collect_explicit_files_and_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.rs");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();

        let files = collect_source_files(&[a.clone(), b, a.clone()]).unwrap();
        assert_eq!(files, vec![a]);
    }

    #[test]
    fn test_collect_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_source_files(&[dir.path().join("nope")]).is_err());
    }
}

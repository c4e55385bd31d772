//! Per-unit pipeline: canonicalize, parse, scan, plan, apply
//!
//! Each call handles exactly one unit and touches no shared state, so units
//! can be processed on as many threads as the caller likes.

use crate::error::{FormatStage, InstrumentError};
use crate::format::{self, Formatter};
use crate::patch;
use crate::policy::Policy;
use crate::scan::{self, Unit};
use crate::snippet;
use crate::source::LineIndex;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Name used for the unit prefix when none is configured.
///
/// `foo.rs` is `foo`, `foo/mod.rs` is `foo`, and crate roots
/// (`lib.rs`, `main.rs`) are `crate`.
pub fn unit_name_for(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("crate");
    match stem {
        "lib" | "main" => "crate".to_string(),
        "mod" => path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("crate")
            .to_string(),
        other => other.to_string(),
    }
}

/// Unit identity for `path` under `policy`
pub fn unit_for(path: &Path, policy: &Policy) -> Unit {
    let name = policy
        .unit_name
        .clone()
        .unwrap_or_else(|| unit_name_for(path));
    Unit::new(name, path.display().to_string().replace('\\', "/"))
}

/// Instrument one unit's source text
pub fn instrument_source(
    source: &str,
    unit: &Unit,
    policy: &Policy,
    formatter: &dyn Formatter,
) -> Result<String, InstrumentError> {
    syn::parse_file(source)
        .map_err(|e| InstrumentError::parse(&unit.path, format::describe_syn_error(&e)))?;

    let canonical = formatter
        .format(source)
        .map_err(|message| InstrumentError::Format {
            unit: unit.path.clone(),
            stage: FormatStage::Input,
            message,
            source_text: source.to_string(),
        })?;

    // Spans must refer to the canonical text, so parse it again
    let file = syn::parse_file(&canonical)
        .map_err(|e| InstrumentError::parse(&unit.path, format::describe_syn_error(&e)))?;
    let index = LineIndex::new(&canonical);

    let sites = scan::scan(&file, &index, policy, unit);
    debug!(unit = %unit.path, sites = sites.len(), "scanned unit");

    let edits = patch::plan(&file, &index, &sites, policy, unit)?;
    let output = patch::apply(
        &canonical,
        &edits,
        &snippet::setup_block(policy),
        formatter,
        unit,
    )?;

    debug!(
        unit = %unit.path,
        input_bytes = source.len(),
        output_bytes = output.len(),
        "instrumented unit"
    );
    Ok(output)
}

/// Read and instrument one file; nothing is written
pub fn instrument_file(
    path: &Path,
    policy: &Policy,
    formatter: &dyn Formatter,
) -> Result<String, InstrumentError> {
    let bytes = std::fs::read(path).map_err(|e| InstrumentError::io(path, e))?;
    let unit = unit_for(path, policy);
    let source = String::from_utf8(bytes)
        .map_err(|e| InstrumentError::parse(&unit.path, format!("not valid UTF-8: {}", e)))?;
    instrument_source(&source, &unit, policy, formatter)
}

/// Replace `path` with `contents`, all or nothing.
///
/// The bytes go to a temporary file next to `path` first, which is then
/// renamed over it; the original permissions are kept.
pub fn write_in_place(path: &Path, contents: &str) -> Result<(), InstrumentError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| InstrumentError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| InstrumentError::io(tmp.path(), e))?;

    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| InstrumentError::io(tmp.path(), e))?;
    }

    tmp.persist(path)
        .map_err(|e| InstrumentError::io(path, e.error))?;
    debug!(path = %path.display(), "rewrote unit in place");
    Ok(())
}

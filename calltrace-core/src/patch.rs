//! Ordered insertion edits: planning them and splicing them into source
//!
//! Global invariants enforced:
//! - Edits only insert; no byte of the canonical text is ever dropped
//! - Offsets never decrease along an edit list; the import edit comes first
//! - A unit that already imports the runtime gets no edits at all

use crate::error::{FormatStage, InstrumentError};
use crate::format::Formatter;
use crate::policy::Policy;
use crate::scan::{FunctionSite, Unit};
use crate::snippet::{self, IMPORT_ALIAS, RUNTIME_CRATE};
use crate::source::LineIndex;
use syn::{AttrStyle, Item, ItemExternCrate, UseTree};

/// Insert `bytes` immediately before `offset`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub bytes: String,
}

pub type EditList = Vec<Edit>;

/// Marker of an existing runtime import among the unit's top-level `use` and
/// `extern crate` items: the alias it is renamed to, or the runtime crate's
/// path.
pub fn already_instrumented(file: &syn::File) -> Option<String> {
    file.items.iter().find_map(|item| match item {
        Item::Use(item_use) => use_marker(&item_use.tree, true),
        Item::ExternCrate(extern_crate) => extern_crate_marker(extern_crate),
        _ => None,
    })
}

fn extern_crate_marker(item: &ItemExternCrate) -> Option<String> {
    match &item.rename {
        Some((_, alias)) if alias == IMPORT_ALIAS => Some(IMPORT_ALIAS.to_string()),
        _ if item.ident == RUNTIME_CRATE => Some(RUNTIME_CRATE.to_string()),
        _ => None,
    }
}

fn use_marker(tree: &UseTree, at_root: bool) -> Option<String> {
    match tree {
        UseTree::Path(path) => {
            if at_root && path.ident == RUNTIME_CRATE {
                Some(RUNTIME_CRATE.to_string())
            } else {
                use_marker(&path.tree, false)
            }
        }
        UseTree::Name(name) if at_root && name.ident == RUNTIME_CRATE => {
            Some(RUNTIME_CRATE.to_string())
        }
        UseTree::Rename(rename) => {
            if rename.rename == IMPORT_ALIAS {
                Some(IMPORT_ALIAS.to_string())
            } else if at_root && rename.ident == RUNTIME_CRATE {
                Some(RUNTIME_CRATE.to_string())
            } else {
                None
            }
        }
        UseTree::Group(group) => group.items.iter().find_map(|t| use_marker(t, at_root)),
        _ => None,
    }
}

/// Where the import goes: after the unit's inner attributes (including `//!`
/// docs), else after a shebang line, else at the very start.
pub fn import_offset(file: &syn::File, index: &LineIndex<'_>) -> usize {
    let after_attrs = file
        .attrs
        .iter()
        .filter(|attr| matches!(attr.style, AttrStyle::Inner(_)))
        .map(|attr| index.end_of(attr.bracket_token.span.close()))
        .max();

    after_attrs.unwrap_or_else(|| match file.shebang {
        Some(_) => {
            let source = index.source();
            source.find('\n').map(|i| i + 1).unwrap_or(source.len())
        }
        None => 0,
    })
}

/// Build the edit list for one unit: the import first, then one snippet per
/// site in scan order.
pub fn plan(
    file: &syn::File,
    index: &LineIndex<'_>,
    sites: &[FunctionSite],
    policy: &Policy,
    unit: &Unit,
) -> Result<EditList, InstrumentError> {
    if let Some(marker) = already_instrumented(file) {
        return Err(InstrumentError::AlreadyInstrumented {
            unit: unit.path.clone(),
            marker,
        });
    }

    let mut edits = Vec::with_capacity(sites.len() + 1);
    edits.push(Edit {
        offset: import_offset(file, index),
        bytes: snippet::import_statement(),
    });
    edits.extend(sites.iter().map(|site| Edit {
        offset: site.body_start_offset,
        bytes: snippet::generate(site, policy),
    }));
    Ok(edits)
}

/// Splice `edits` into `canonical` in one forward pass
pub fn splice(canonical: &str, edits: &[Edit]) -> Result<String, InstrumentError> {
    let extra: usize = edits.iter().map(|e| e.bytes.len()).sum();
    let mut out = String::with_capacity(canonical.len() + extra);
    let mut cursor = 0;

    for edit in edits {
        if edit.offset < cursor {
            return Err(InstrumentError::EditOrder {
                offset: edit.offset,
                previous: cursor,
            });
        }
        let offset = edit.offset.min(canonical.len());
        out.push_str(&canonical[cursor..offset]);
        out.push_str(&edit.bytes);
        cursor = offset;
    }
    out.push_str(&canonical[cursor..]);
    Ok(out)
}

/// Splice, append the trailing setup block, and re-canonicalize.
///
/// If the final formatting fails the spliced text is returned inside the
/// error.
pub fn apply(
    canonical: &str,
    edits: &[Edit],
    setup: &str,
    formatter: &dyn Formatter,
    unit: &Unit,
) -> Result<String, InstrumentError> {
    let mut spliced = splice(canonical, edits)?;
    spliced.push_str(setup);

    formatter
        .format(&spliced)
        .map_err(|message| InstrumentError::Format {
            unit: unit.path.clone(),
            stage: FormatStage::Output,
            message,
            source_text: spliced,
        })
}

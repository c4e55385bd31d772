//! Site discovery: find every function body that should be instrumented
//!
//! Global invariants enforced:
//! - Sites are produced in pre-order, which is lexical order, so their
//!   `body_start_offset` values ascend
//! - Scanning is purely functional over the parsed tree
//! - Policy filters run in a fixed order: exported-only, unit prefix,
//!   filter pattern, exclude pattern

use crate::policy::Policy;
use crate::source::{self, LineIndex};
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{
    AttrStyle, Attribute, Block, Expr, FnArg, Pat, PathArguments, Signature, Type, TypePath,
    Visibility,
};

/// Name given to every closure site
pub const CLOSURE_NAME: &str = "{closure}";

/// Identity of the unit being scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Used for the unit prefix (`--package`)
    pub name: String,
    /// Used in closure positions (`file:line:col`)
    pub path: String,
}

impl Unit {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Unit {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    /// Free `fn` item
    Function,
    /// Method in an inherent or trait `impl` block
    Method,
    /// Trait method with a default body
    TraitDefault,
    Closure,
}

/// One instrumentable function body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSite {
    /// Final logged name, including the unit prefix when enabled
    pub qualified_name: String,
    /// Bindings introduced by the parameters, in declaration order; `_` is
    /// never included
    pub param_names: Vec<String>,
    /// Byte offset just past the body's `{` (and past any inner attributes)
    pub body_start_offset: usize,
    /// Closures only
    pub position: Option<String>,
    pub is_exported: bool,
    pub kind: SiteKind,
    /// Number of inline `mod` blocks around the site
    pub module_depth: usize,
}

/// Scan a parsed unit for sites selected by `policy`.
///
/// `index` must describe the exact text `file` was parsed from.
pub fn scan(file: &syn::File, index: &LineIndex<'_>, policy: &Policy, unit: &Unit) -> Vec<FunctionSite> {
    let mut scanner = Scanner {
        index,
        policy,
        unit,
        sites: Vec::new(),
        impl_stack: Vec::new(),
        trait_stack: Vec::new(),
        module_depth: 0,
    };
    scanner.visit_file(file);
    scanner.sites
}

struct ImplContext {
    self_name: Option<String>,
    is_trait_impl: bool,
}

struct Scanner<'a, 'i> {
    index: &'a LineIndex<'i>,
    policy: &'a Policy,
    unit: &'a Unit,
    sites: Vec<FunctionSite>,
    impl_stack: Vec<ImplContext>,
    trait_stack: Vec<String>,
    module_depth: usize,
}

/// Name of an `impl` self type, when it is a plain one.
///
/// Only a bare `Name` (or `&Name` / `&mut Name`) qualifies. Generic, qualified
/// and other receivers yield `None` and their methods keep the plain name.
pub fn receiver_type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => plain_type_name(type_path),
        Type::Reference(reference) => match &*reference.elem {
            Type::Path(type_path) => plain_type_name(type_path),
            _ => None,
        },
        _ => None,
    }
}

fn plain_type_name(type_path: &TypePath) -> Option<String> {
    let path = &type_path.path;
    if type_path.qself.is_some() || path.leading_colon.is_some() || path.segments.len() != 1 {
        return None;
    }
    let segment = path.segments.first()?;
    match segment.arguments {
        PathArguments::None => Some(segment.ident.to_string()),
        _ => None,
    }
}

/// Collect the identifiers bound by a parameter pattern, in order
pub fn pattern_bindings(pat: &Pat, names: &mut Vec<String>) {
    match pat {
        Pat::Ident(pat_ident) => {
            names.push(pat_ident.ident.to_string());
            if let Some((_, sub)) = &pat_ident.subpat {
                pattern_bindings(sub, names);
            }
        }
        Pat::Tuple(tuple) => tuple.elems.iter().for_each(|p| pattern_bindings(p, names)),
        Pat::TupleStruct(tuple) => tuple.elems.iter().for_each(|p| pattern_bindings(p, names)),
        Pat::Slice(slice) => slice.elems.iter().for_each(|p| pattern_bindings(p, names)),
        Pat::Struct(strukt) => strukt
            .fields
            .iter()
            .for_each(|field| pattern_bindings(&field.pat, names)),
        Pat::Reference(reference) => pattern_bindings(&reference.pat, names),
        Pat::Type(typed) => pattern_bindings(&typed.pat, names),
        Pat::Paren(paren) => pattern_bindings(&paren.pat, names),
        // `_`, `..`, literals, ranges, paths, or-patterns and macros bind
        // nothing we can name
        _ => {}
    }
}

fn signature_params(sig: &Signature) -> Vec<String> {
    let mut names = Vec::new();
    for input in &sig.inputs {
        if let FnArg::Typed(typed) = input {
            pattern_bindings(&typed.pat, &mut names);
        }
    }
    names
}

fn closure_params(closure: &syn::ExprClosure) -> Vec<String> {
    let mut names = Vec::new();
    for input in &closure.inputs {
        // Untyped closure parameters may still be inference variables at the
        // top of the body, where the entry line borrows them.
        if let Pat::Type(typed) = input {
            pattern_bindings(&typed.pat, &mut names);
        }
    }
    names
}

fn is_public(vis: &Visibility) -> bool {
    matches!(vis, Visibility::Public(_))
}

impl Scanner<'_, '_> {
    /// Offset where entry code goes: after `{`, or after the body's last inner
    /// attribute when it has any (those must stay first in the block)
    fn insertion_offset(&self, block: &Block, attrs: &[Attribute]) -> usize {
        attrs
            .iter()
            .filter(|attr| matches!(attr.style, AttrStyle::Inner(_)))
            .map(|attr| self.index.end_of(attr.bracket_token.span.close()))
            .max()
            .unwrap_or_else(|| self.index.start_of(block.brace_token.span.open()) + 1)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        base_name: String,
        is_exported: bool,
        kind: SiteKind,
        param_names: Vec<String>,
        block: &Block,
        attrs: &[Attribute],
        position: Option<String>,
    ) {
        if self.policy.exported_only && !is_exported {
            return;
        }

        let qualified_name = if self.policy.show_package {
            format!("{}::{}", self.unit.name, base_name)
        } else {
            base_name
        };

        if !self.policy.selects(&qualified_name) {
            return;
        }

        let body_start_offset = self.insertion_offset(block, attrs);
        self.sites.push(FunctionSite {
            qualified_name,
            param_names,
            body_start_offset,
            position,
            is_exported,
            kind,
            module_depth: self.module_depth,
        });
    }
}

impl<'ast> Visit<'ast> for Scanner<'_, '_> {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        if node.content.is_some() {
            self.module_depth += 1;
            visit::visit_item_mod(self, node);
            self.module_depth -= 1;
        }
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        // const fn bodies run at compile time; closures inside them are
        // still visited
        if node.sig.constness.is_none() {
            self.record(
                node.sig.ident.to_string(),
                is_public(&node.vis),
                SiteKind::Function,
                signature_params(&node.sig),
                &node.block,
                &node.attrs,
                None,
            );
        }
        visit::visit_item_fn(self, node);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        self.impl_stack.push(ImplContext {
            self_name: receiver_type_name(&node.self_ty),
            is_trait_impl: node.trait_.is_some(),
        });
        visit::visit_item_impl(self, node);
        self.impl_stack.pop();
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        if node.sig.constness.is_none() {
            let method = node.sig.ident.to_string();
            let (name, in_trait_impl) = match self.impl_stack.last() {
                Some(ctx) => (
                    match &ctx.self_name {
                        Some(ty) => format!("{}::{}", ty, method),
                        None => method,
                    },
                    ctx.is_trait_impl,
                ),
                None => (method, false),
            };
            self.record(
                name,
                in_trait_impl || is_public(&node.vis),
                SiteKind::Method,
                signature_params(&node.sig),
                &node.block,
                &node.attrs,
                None,
            );
        }
        visit::visit_impl_item_fn(self, node);
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        self.trait_stack.push(node.ident.to_string());
        visit::visit_item_trait(self, node);
        self.trait_stack.pop();
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        let is_const = node.sig.constness.is_some();
        if let (Some(block), false) = (&node.default, is_const) {
            let method = node.sig.ident.to_string();
            let name = match self.trait_stack.last() {
                Some(trait_name) => format!("{}::{}", trait_name, method),
                None => method,
            };
            self.record(
                name,
                true,
                SiteKind::TraitDefault,
                signature_params(&node.sig),
                block,
                &node.attrs,
                None,
            );
        }
        visit::visit_trait_item_fn(self, node);
    }

    fn visit_expr_closure(&mut self, node: &'ast syn::ExprClosure) {
        if let Expr::Block(body) = &*node.body {
            let position = source::position(&self.unit.path, node.span());
            self.record(
                CLOSURE_NAME.to_string(),
                false,
                SiteKind::Closure,
                closure_params(node),
                &body.block,
                &body.attrs,
                Some(position),
            );
        }
        visit::visit_expr_closure(self, node);
    }
}

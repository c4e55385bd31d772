//! Source text generated for each site, plus the unit-level import and setup
//!
//! Everything here is infallible: any site/policy combination that reaches
//! this point has already been validated.

use crate::policy::Policy;
use crate::scan::FunctionSite;
use proc_macro2::Literal;

/// Crate the instrumented program links against
pub const RUNTIME_CRATE: &str = "calltrace_runtime";

/// Local alias the runtime is imported under
pub const IMPORT_ALIAS: &str = "__trace";

/// Per-unit static holding the runtime setup
pub const SETUP_STATIC: &str = "__TRACE";

/// Statement placed at the top of every instrumented unit
pub fn import_statement() -> String {
    format!(
        "\n#[allow(unused_imports)]\nuse ::{} as {};\n",
        RUNTIME_CRATE, IMPORT_ALIAS
    )
}

/// Trailing block that configures the unit's tracer
pub fn setup_block(policy: &Policy) -> String {
    format!(
        "\n#[allow(dead_code)]\nstatic {static_name}: {alias}::Tracer = {alias}::Tracer::setup({sink}, {prefix}, {limit});\n",
        static_name = SETUP_STATIC,
        alias = IMPORT_ALIAS,
        sink = Literal::string(&policy.sink),
        prefix = Literal::string(&policy.prefix),
        limit = policy.render_limit,
    )
}

/// Entry (and optionally exit) statements for one site.
///
/// The result is spliced right after the body's `{`, so it must be a
/// sequence of complete statements.
pub fn generate(site: &FunctionSite, policy: &Policy) -> String {
    let ancestors = "super::".repeat(site.module_depth);
    let rt = format!("{}{}", ancestors, IMPORT_ALIAS);
    let tracer = format!("{}{}", ancestors, SETUP_STATIC);

    let name = Literal::string(&site.qualified_name).to_string();
    let position = site
        .position
        .as_deref()
        .filter(|_| policy.show_position)
        .map(|pos| Literal::string(pos).to_string());

    let mut out = String::new();
    out.push_str(&format!("\nlet __trace_id = {}::next();\n", rt));
    if policy.show_timing {
        out.push_str(&format!("let __trace_start = {}::now();\n", rt));
    }

    // Entry line
    let mut fmt = String::from("[{}] {}(");
    let mut args = vec!["__trace_id".to_string(), name.clone()];
    if !site.param_names.is_empty() {
        fmt.push_str("{}");
        args.push(format!(
            "{}::render_args!({}.limit(); {})",
            rt,
            tracer,
            site.param_names.join(", ")
        ));
    }
    fmt.push(')');
    if let Some(pos) = &position {
        fmt.push_str(" {}");
        args.push(pos.clone());
    }
    out.push_str(&log_call(&tracer, &fmt, &args));
    out.push('\n');

    if policy.show_return() {
        let mut fmt = String::from("[{}] {}");
        let mut args = vec!["__trace_id".to_string(), name];
        if let Some(pos) = position {
            fmt.push_str(" {}");
            args.push(pos);
        }
        fmt.push_str(" returned");
        if policy.show_timing {
            fmt.push_str(" in {:?}");
            args.push(format!("{}::since(__trace_start)", rt));
        }
        out.push_str(&format!(
            "let __trace_exit = {}::defer(move || {{\n{}\n}});\n",
            rt,
            log_call(&tracer, &fmt, &args)
        ));
    }

    out
}

fn log_call(tracer: &str, fmt: &str, args: &[String]) -> String {
    format!(
        "{}.log(format_args!({}, {}));",
        tracer,
        Literal::string(fmt),
        args.join(", ")
    )
}

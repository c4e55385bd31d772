//! Calltrace CLI - insert entry/exit call tracing into Rust source files

#![deny(warnings)]

// Global invariants enforced:
// - Configuration errors stop the run before any file is touched
// - A failing file never stops its siblings
// - Output order follows the sorted input order, whatever the thread count

use anyhow::Context;
use calltrace_core::{
    collect_source_files, config, instrument_file, write_in_place, CalltraceConfig, FormatterKind,
    InstrumentError,
};
use clap::Parser;
use rayon::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Environment variable holding the log filter
const LOG_ENV: &str = "CALLTRACE_LOG";

#[derive(Parser)]
#[command(name = "calltrace")]
#[command(about = "Annotate Rust functions with entry/exit call tracing")]
#[command(version = env!("CALLTRACE_VERSION"))]
struct Cli {
    /// Source files or directories (searched recursively for .rs files)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Only annotate functions whose name matches this regular expression
    #[arg(long)]
    filter: Option<String>,

    /// Skip functions whose name matches this regular expression (beats --filter)
    #[arg(long)]
    exclude: Option<String>,

    /// Only annotate exported (pub) functions
    #[arg(long)]
    exported: bool,

    /// Prefix logged names with the unit name
    #[arg(long)]
    package: bool,

    /// Log function returns
    #[arg(long)]
    returns: bool,

    /// Log elapsed time on return (implies --returns)
    #[arg(long)]
    timing: bool,

    /// Include file:line:col of closures in their trace lines
    #[arg(long)]
    position: bool,

    /// Prefix for every trace line
    #[arg(long)]
    prefix: Option<String>,

    /// Maximum rendered length of one argument
    #[arg(long)]
    limit: Option<usize>,

    /// Where trace lines go at run time (stderr or stdout)
    #[arg(long)]
    sink: Option<String>,

    /// Formatter used to canonicalize source
    #[arg(long)]
    formatter: Option<FormatterArg>,

    /// Path to config file (default: auto-discover in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rewrite files in place instead of printing to stdout
    #[arg(short, long)]
    write: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum FormatterArg {
    Prettyplease,
    Rustfmt,
}

impl From<FormatterArg> for FormatterKind {
    fn from(arg: FormatterArg) -> Self {
        match arg {
            FormatterArg::Prettyplease => FormatterKind::Prettyplease,
            FormatterArg::Rustfmt => FormatterKind::Rustfmt,
        }
    }
}

impl Cli {
    /// Settings given on the command line; unset flags leave config file
    /// values alone
    fn overrides(&self) -> CalltraceConfig {
        CalltraceConfig {
            filter: self.filter.clone(),
            exclude: self.exclude.clone(),
            exported: self.exported.then_some(true),
            package: self.package.then_some(true),
            returns: self.returns.then_some(true),
            timing: self.timing.then_some(true),
            position: self.position.then_some(true),
            prefix: self.prefix.clone(),
            limit: self.limit,
            sink: self.sink.clone(),
            formatter: self.formatter.map(FormatterKind::from),
            unit_name: None,
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Default)]
struct Summary {
    instrumented: usize,
    skipped: usize,
    failed: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let resolved = config::load_and_resolve(&cwd, cli.config.as_deref(), cli.overrides())
        .context("failed to load configuration")?;
    if let Some(path) = &resolved.config_path {
        info!("Using config: {}", path.display());
    }

    let files = collect_source_files(&cli.paths)?;
    if files.is_empty() {
        warn!("no .rs files found");
        return Ok(());
    }
    debug!(files = files.len(), write = cli.write, "starting");

    let policy = &resolved.policy;
    let formatter = resolved.formatter.build();

    // rayon keeps the input order in `collect`
    let results: Vec<Result<String, InstrumentError>> = files
        .par_iter()
        .map(|path| -> Result<String, InstrumentError> {
            let output = instrument_file(path, policy, formatter.as_ref())?;
            if cli.write {
                write_in_place(path, &output)?;
            }
            Ok(output)
        })
        .collect();

    let mut summary = Summary::default();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(output) => {
                summary.instrumented += 1;
                if cli.write {
                    info!("instrumented {}", path.display());
                } else {
                    if files.len() > 1 {
                        writeln!(out, "// ==> {} <==", path.display())?;
                    }
                    out.write_all(output.as_bytes())?;
                }
            }
            Err(err) if err.is_skip() => {
                summary.skipped += 1;
                warn!("{}", err);
            }
            Err(err) => {
                summary.failed += 1;
                error!("{}", err);
                if let Some(text) = err.diagnostic_text() {
                    eprintln!("--- text handed to the formatter ---\n{}", text);
                }
            }
        }
    }
    out.flush()?;

    info!(
        instrumented = summary.instrumented,
        skipped = summary.skipped,
        failed = summary.failed,
        "done"
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

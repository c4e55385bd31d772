//! Timestamped line writer shared by every instrumented unit

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::OnceLock;

// One lock for both streams: lines never interleave even when a program
// sends some units to stdout and others to stderr.
static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Destination stream for trace lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Stderr,
    Stdout,
}

impl Sink {
    /// Resolve a sink selector; anything other than `"stdout"` means stderr
    pub fn from_name(name: &str) -> Self {
        match name {
            "stdout" => Sink::Stdout,
            _ => Sink::Stderr,
        }
    }
}

/// Prefixed, timestamped line writer
#[derive(Debug, Clone)]
pub struct Logger {
    sink: Sink,
    prefix: String,
}

impl Logger {
    pub fn new(sink: Sink, prefix: impl Into<String>) -> Self {
        Logger {
            sink,
            prefix: prefix.into(),
        }
    }

    pub fn sink(&self) -> Sink {
        self.sink
    }

    /// Format one complete line: prefix, wall-clock time with microseconds,
    /// then the message
    pub fn format_line(&self, args: fmt::Arguments<'_>) -> String {
        let now = chrono::Local::now();
        format!("{}{} {}\n", self.prefix, now.format("%H:%M:%S%.6f"), args)
    }

    /// Write one line to the sink. Write errors are dropped; tracing must not
    /// change the behaviour of the traced program.
    pub fn print(&self, args: fmt::Arguments<'_>) {
        let line = self.format_line(args);
        let _guard = WRITE_LOCK.lock();
        let _ = match self.sink {
            Sink::Stderr => io::stderr().lock().write_all(line.as_bytes()),
            Sink::Stdout => io::stdout().lock().write_all(line.as_bytes()),
        };
    }
}

/// Per-unit trace configuration.
///
/// Every instrumented file ends with
///
/// ```ignore
/// static __TRACE: __trace::Tracer = __trace::Tracer::setup("stderr", "\t", 1024);
/// ```
///
/// `setup` is `const`, so it is evaluated when the program is built and is
/// never re-run. The logger itself is created on first use.
#[derive(Debug)]
pub struct Tracer {
    sink: &'static str,
    prefix: &'static str,
    limit: usize,
    logger: OnceLock<Logger>,
}

impl Tracer {
    pub const fn setup(sink: &'static str, prefix: &'static str, limit: usize) -> Self {
        Tracer {
            sink,
            prefix,
            limit,
            logger: OnceLock::new(),
        }
    }

    /// Render limit for each argument of this unit's entry lines
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn logger(&self) -> &Logger {
        self.logger
            .get_or_init(|| Logger::new(Sink::from_name(self.sink), self.prefix))
    }

    pub fn log(&self, args: fmt::Arguments<'_>) {
        self.logger().print(args);
    }
}

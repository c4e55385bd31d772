//! Runtime support for programs instrumented by `calltrace`
//!
//! The annotation engine rewrites every selected function so that it starts
//! with something like:
//!
//! ```ignore
//! let __trace_id = __trace::next();
//! __TRACE.log(format_args!("[{}] {}({})", __trace_id, "add", __trace::render_args!(__TRACE.limit(); a, b)));
//! let __trace_exit = __trace::defer(move || {
//!     __TRACE.log(format_args!("[{}] {} returned", __trace_id, "add"));
//! });
//! ```
//!
//! where `__trace` is this crate and `__TRACE` is the unit's [`Tracer`].
//! Everything here is safe to call from many threads at once.

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Call ids are unique process-wide and start at 1
// - A rendered argument keeps at most `limit` characters of its text
// - Each trace line is written whole, under one lock
// - An exit guard fires exactly once, on return or unwind

pub mod logger;
pub mod render;

pub use logger::{Logger, Sink, Tracer};
pub use render::{render, truncate, Render};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Allocate a correlation id.
///
/// Ids start at 1 and strictly increase for the life of the process; 0 is
/// never handed out.
pub fn next() -> u64 {
    COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

pub fn now() -> Instant {
    Instant::now()
}

pub fn since(start: Instant) -> Duration {
    start.elapsed()
}

/// Runs its action exactly once, when dropped
#[must_use = "the action runs when the guard is dropped; bind it to a named variable"]
pub struct ExitGuard<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> Drop for ExitGuard<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

/// Schedule `action` for the end of the enclosing scope. It fires on normal
/// return, early return, `?` propagation and panic unwinding alike.
pub fn defer<F: FnOnce()>(action: F) -> ExitGuard<F> {
    ExitGuard {
        action: Some(action),
    }
}

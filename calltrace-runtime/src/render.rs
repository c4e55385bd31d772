//! Length-bounded, type-aware rendering of argument values
//!
//! Instrumented code never names these items directly; it goes through
//! [`render_args!`](crate::render_args), which picks one strategy per argument
//! at compile time:
//!
//! 1. types implementing [`Render`] (text, byte buffers, readers and writers)
//! 2. anything implementing `Debug`
//! 3. everything else, shown as `<type name>`
//!
//! Every strategy finishes with [`truncate`], so a single huge argument cannot
//! flood the trace output.

use std::borrow::Cow;
use std::fmt::Debug;
use std::io::{BufReader, BufWriter, Cursor, LineWriter, Write};

/// Marker inserted between the kept prefix and the final character of a
/// truncated rendering
pub const ELLIPSIS: &str = "...";

/// Rendering of a byte sequence that holds nothing but zero bytes
pub const EMPTY_BYTES: &str = "[0u8..]";

/// Types with a dedicated, log-friendly rendering
///
/// Buffered handles hide their internal buffers, text is quoted and escaped,
/// and byte buffers are shown as byte-string literals.
pub trait Render {
    /// Render without applying any length limit
    fn render_full(&self) -> String;
}

/// Render `value` and bound the result to `limit` characters
pub fn render<T: Render + ?Sized>(value: &T, limit: usize) -> String {
    truncate(value.render_full(), limit)
}

/// Bound `rendered` to `limit` characters.
///
/// A longer string keeps its first `limit` characters, then [`ELLIPSIS`], then
/// its original final character, so suffix differences stay visible.
pub fn truncate(rendered: String, limit: usize) -> String {
    if rendered.chars().count() <= limit {
        return rendered;
    }
    let Some(last) = rendered.chars().next_back() else {
        return rendered;
    };

    let mut out: String = rendered.chars().take(limit).collect();
    out.push_str(ELLIPSIS);
    out.push(last);
    out
}

fn render_bytes(bytes: &[u8]) -> String {
    // Zeroed buffers are common and noisy.
    if bytes.iter().all(|&b| b == 0) {
        return EMPTY_BYTES.to_string();
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => format!("b{:?}", text),
        Err(_) => format!("b\"{}\"", bytes.escape_ascii()),
    }
}

impl Render for str {
    fn render_full(&self) -> String {
        format!("{:?}", self)
    }
}

impl Render for String {
    fn render_full(&self) -> String {
        self.as_str().render_full()
    }
}

impl Render for char {
    fn render_full(&self) -> String {
        format!("{:?}", self)
    }
}

impl Render for [u8] {
    fn render_full(&self) -> String {
        render_bytes(self)
    }
}

impl Render for Vec<u8> {
    fn render_full(&self) -> String {
        render_bytes(self)
    }
}

impl<const N: usize> Render for [u8; N] {
    fn render_full(&self) -> String {
        render_bytes(self)
    }
}

impl<R> Render for BufReader<R> {
    fn render_full(&self) -> String {
        "BufReader {..}".to_string()
    }
}

impl<W: Write> Render for BufWriter<W> {
    fn render_full(&self) -> String {
        "BufWriter {..}".to_string()
    }
}

impl<W: Write> Render for LineWriter<W> {
    fn render_full(&self) -> String {
        "LineWriter {..}".to_string()
    }
}

impl Render for Cursor<String> {
    fn render_full(&self) -> String {
        format!("Cursor({:?})", self.get_ref())
    }
}

impl Render for Cursor<&str> {
    fn render_full(&self) -> String {
        format!("Cursor({:?})", self.get_ref())
    }
}

impl Render for Cursor<Vec<u8>> {
    fn render_full(&self) -> String {
        format!("Cursor({})", render_bytes(self.get_ref()))
    }
}

impl Render for Cursor<&[u8]> {
    fn render_full(&self) -> String {
        format!("Cursor({})", render_bytes(self.get_ref()))
    }
}

impl<T: Render + ?Sized> Render for &T {
    fn render_full(&self) -> String {
        (**self).render_full()
    }
}

impl<T: Render + ?Sized> Render for &mut T {
    fn render_full(&self) -> String {
        (**self).render_full()
    }
}

impl<T: Render + ?Sized> Render for Box<T> {
    fn render_full(&self) -> String {
        (**self).render_full()
    }
}

impl<T: Render + ToOwned + ?Sized> Render for Cow<'_, T> {
    fn render_full(&self) -> String {
        (**self).render_full()
    }
}

// Autoref-based dispatch used by `render_args!`. The call site is written as
// `(&&&Probe(&value)).render_probe(limit)`; method lookup tries the receiver
// with three references first, so `ViaRender` wins over `ViaDebug`, which wins
// over `ViaOpaque`.

#[doc(hidden)]
pub struct Probe<'a, T: ?Sized>(pub &'a T);

#[doc(hidden)]
pub trait ViaRender {
    fn render_probe(&self, limit: usize) -> String;
}

#[doc(hidden)]
pub trait ViaDebug {
    fn render_probe(&self, limit: usize) -> String;
}

#[doc(hidden)]
pub trait ViaOpaque {
    fn render_probe(&self, limit: usize) -> String;
}

impl<T: Render + ?Sized> ViaRender for &&Probe<'_, T> {
    fn render_probe(&self, limit: usize) -> String {
        render(self.0, limit)
    }
}

impl<T: Debug + ?Sized> ViaDebug for &Probe<'_, T> {
    fn render_probe(&self, limit: usize) -> String {
        truncate(format!("{:?}", self.0), limit)
    }
}

impl<T: ?Sized> ViaOpaque for Probe<'_, T> {
    fn render_probe(&self, limit: usize) -> String {
        truncate(format!("<{}>", std::any::type_name::<T>()), limit)
    }
}

/// Render each argument with the best available strategy and join the
/// results with `", "`.
///
/// ```ignore
/// let line = calltrace_runtime::render_args!(64; name, bytes, handle);
/// ```
#[macro_export]
macro_rules! render_args {
    ($limit:expr; $($arg:expr),* $(,)?) => {{
        #[allow(unused_imports)]
        use $crate::render::{ViaDebug as _, ViaOpaque as _, ViaRender as _};
        let _limit: usize = $limit;
        let parts: ::std::vec::Vec<::std::string::String> = ::std::vec![
            $((&&&$crate::render::Probe(&$arg)).render_probe(_limit)),*
        ];
        parts.join(", ")
    }};
}

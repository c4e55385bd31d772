//! Workspace fixtures as rewritten by calltrace, one module per fixture.
//!
//! Nothing here is hand-written: the build script runs the annotation engine
//! and this crate only has to compile and run what it produced.

include!(concat!(env!("OUT_DIR"), "/generated.rs"));

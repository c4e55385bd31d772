// Build script: instrument the workspace fixtures with every logging option
// switched on and emit the results as modules, so the generated code has to
// compile against the real runtime.

use calltrace_core::{instrument_file, Policy, PrettyPlease};
use std::error::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

const FIXTURES: &[&str] = &["calc", "shapes", "nested", "consts", "unformatted"];

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let fixtures = manifest_dir.join("..").join("tests").join("fixtures");
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    let policy = Policy {
        show_package: true,
        show_position: true,
        show_timing: true,
        ..Policy::default()
    };

    let mut generated = String::new();
    for stem in FIXTURES {
        let path = fixtures.join(format!("{}.rs", stem));
        println!("cargo:rerun-if-changed={}", path.display());

        let output = instrument_file(&path, &policy, &PrettyPlease)?;
        writeln!(generated, "#[allow(dead_code)]\npub mod {} {{\n{}\n}}\n", stem, output)?;
    }

    std::fs::write(out_dir.join("generated.rs"), generated)?;
    Ok(())
}

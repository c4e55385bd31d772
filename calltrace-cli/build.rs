// Build script: expose a version string built from `git describe`, falling
// back to the package version when git is unavailable.

use std::process::Command;

fn main() {
    let version = git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=CALLTRACE_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    if described.is_empty() {
        return None;
    }

    // "v0.2.0" and "v0.2.0-3-gabc123" both become "0.2.0"
    if let Some(tag) = described.strip_prefix('v') {
        return Some(tag.split('-').next().unwrap_or(tag).to_string());
    }

    // Untagged: package version plus commit
    Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), described))
}

//! End-to-end tests for the calltrace binary

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CALC: &str = "pub fn add(a: i32, b: i32) -> i32 { a + b }\nfn helper(_: u8) {}\n";

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp directory");
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    dir
}

fn calltrace(cwd: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("calltrace");
    cmd.current_dir(cwd).env_remove("CALLTRACE_LOG");
    cmd
}

#[test]
fn test_prints_instrumented_source() {
    let dir = workspace(&[("calc.rs", CALC)]);

    calltrace(dir.path())
        .arg("calc.rs")
        .assert()
        .success()
        .stdout(predicate::str::contains("use ::calltrace_runtime as __trace;"))
        .stdout(predicate::str::contains("\"add\""))
        .stdout(predicate::str::contains("\"helper\""))
        .stdout(predicate::str::contains("static __TRACE"));

    // stdout mode never touches the file
    assert_eq!(fs::read_to_string(dir.path().join("calc.rs")).unwrap(), CALC);
}

#[test]
fn test_write_in_place_then_rerun_is_skipped() {
    let dir = workspace(&[("src/calc.rs", CALC)]);
    let path = dir.path().join("src/calc.rs");

    calltrace(dir.path())
        .args(["-w", "src"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let once = fs::read_to_string(&path).unwrap();
    assert!(once.contains("__trace::next()"));

    calltrace(dir.path())
        .args(["-w", "src"])
        .assert()
        .success()
        .stderr(predicate::str::contains("already imports"));

    assert_eq!(fs::read_to_string(&path).unwrap(), once);
}

#[test]
fn test_failure_does_not_stop_siblings() {
    let dir = workspace(&[("a_broken.rs", "fn broken( {\n"), ("b_calc.rs", CALC)]);

    calltrace(dir.path())
        .args(["-w", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("syntax error"));

    let calc = fs::read_to_string(dir.path().join("b_calc.rs")).unwrap();
    assert!(calc.contains("__trace::next()"));
    assert_eq!(
        fs::read_to_string(dir.path().join("a_broken.rs")).unwrap(),
        "fn broken( {\n"
    );
}

#[test]
fn test_invalid_pattern_is_fatal_before_any_write() {
    let dir = workspace(&[("calc.rs", CALC)]);

    calltrace(dir.path())
        .args(["-w", "--filter", "(unclosed", "calc.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid filter pattern"));

    assert_eq!(fs::read_to_string(dir.path().join("calc.rs")).unwrap(), CALC);
}

#[test]
fn test_zero_limit_is_rejected() {
    let dir = workspace(&[("calc.rs", CALC)]);

    calltrace(dir.path())
        .args(["--limit", "0", "calc.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("limit must be positive"));
}

#[test]
fn test_config_file_is_discovered() {
    let dir = workspace(&[
        ("calc.rs", CALC),
        (".calltracerc.json", r#"{ "returns": true, "prefix": ">> " }"#),
    ]);

    calltrace(dir.path())
        .arg("calc.rs")
        .assert()
        .success()
        .stdout(predicate::str::contains("returned"))
        .stdout(predicate::str::contains(r#"setup("stderr", ">> ", 1024)"#));
}

#[test]
fn test_flags_override_config_file() {
    let dir = workspace(&[
        ("calc.rs", CALC),
        ("calltrace.config.json", r#"{ "filter": "^nothing$", "sink": "stdout" }"#),
    ]);

    calltrace(dir.path())
        .args(["--filter", "^add$", "calc.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"add\""))
        .stdout(predicate::str::contains("\"helper\"").not())
        .stdout(predicate::str::contains(r#"setup("stdout""#));
}

#[test]
fn test_explicit_config_path() {
    let dir = workspace(&[
        ("calc.rs", CALC),
        ("conf/trace.json", r#"{ "timing": true }"#),
    ]);

    calltrace(dir.path())
        .args(["--config", "conf/trace.json", "calc.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("__trace::since(__trace_start)"));
}

#[test]
fn test_unknown_config_field_is_rejected() {
    let dir = workspace(&[("calc.rs", CALC), (".calltracerc.json", r#"{ "colour": true }"#)]);

    calltrace(dir.path())
        .arg("calc.rs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
fn test_multiple_files_get_headers_in_sorted_order() {
    let dir = workspace(&[("b.rs", "fn b() {}\n"), ("a.rs", "fn a() {}\n")]);

    let output = calltrace(dir.path()).args(["b.rs", "a.rs"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let a = stdout.find("// ==> a.rs <==").expect("header for a.rs");
    let b = stdout.find("// ==> b.rs <==").expect("header for b.rs");
    assert!(a < b);
}

#[test]
fn test_missing_path_fails() {
    let dir = workspace(&[]);

    calltrace(dir.path())
        .arg("nope.rs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path does not exist"));
}

//! Integration tests for the Krait CLI.
//!
//! These tests invoke the `krait` binary as a subprocess and check exit
//! codes, stdout, and stderr.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn krait() -> Command {
    Command::cargo_bin("krait").unwrap()
}

/// Return the workspace root (parent of krait-cli/).
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

/// Return the absolute path to a sample program file.
fn test_program(name: &str) -> PathBuf {
    workspace_root().join("tests/programs").join(name)
}

/// Helper: assemble source text, returning the path to the .krab output.
fn assemble_to_temp(dir: &TempDir, source: &str) -> PathBuf {
    let input = dir.path().join("test.kra");
    let output = dir.path().join("test.krab");
    fs::write(&input, source).unwrap();
    krait()
        .args([
            "assemble",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();
    output
}

// ---- No-args / help ----

#[test]
fn no_args_prints_usage_and_exits_1() {
    krait()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Usage: krait"));
}

#[test]
fn help_flag_exits_0() {
    krait()
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Commands:"));
}

#[test]
fn unknown_command_exits_1() {
    krait()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown command"));
}

// ---- Assemble ----

#[test]
fn assemble_writes_a_versioned_binary() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("test.kra");
    let output = dir.path().join("test.krab");
    fs::write(&input, "SETVAR \"x\" NULL 5\nPRINTV x\n").unwrap();

    krait()
        .args([
            "assemble",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("assembled 2 instructions"));

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[2..11], b"krait-0.1");
}

#[test]
fn assemble_default_output_name() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("prog.kra");
    fs::write(&input, "TERMIN\n").unwrap();

    krait()
        .args(["assemble", input.to_str().unwrap()])
        .assert()
        .success();

    assert!(dir.path().join("prog.krab").exists());
}

#[test]
fn assemble_reports_warnings_but_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("warned.kra");
    fs::write(&input, "PRINTV 1\nFROBNI 2\n").unwrap();

    krait()
        .args(["assemble", input.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "warning: line 2: unknown opcode 'FROBNI'",
        ))
        .stderr(predicate::str::contains("assembled 1 instructions"));
}

#[test]
fn assemble_bad_input_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.kra");
    fs::write(&input, "PRINTV \"unterminated\n").unwrap();

    krait()
        .args(["assemble", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: line 1"));
}

#[test]
fn assemble_missing_file_exits_1() {
    krait()
        .args(["assemble", "nonexistent.kra"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

// ---- Run ----

#[test]
fn run_prints_the_top_level_result() {
    let dir = TempDir::new().unwrap();
    let krab = assemble_to_temp(&dir, "RETURN (ADDNUM 40 2)\n");

    krait()
        .args(["run", krab.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::eq("= 42\n"));
}

#[test]
fn run_passes_program_output_through() {
    let dir = TempDir::new().unwrap();
    let krab = assemble_to_temp(&dir, "PRINTV \"out\" 1\nPRINTV \"out\" 2\n");

    krait()
        .args(["run", krab.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::eq("out 1\nout 2\n"));
}

#[test]
fn run_rejects_garbage_binaries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.krab");
    fs::write(&path, [0xFF, 0xFF, 0xFF, 0xFF]).unwrap();

    krait()
        .args(["run", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid binary"));
}

#[test]
fn run_rejects_a_foreign_version() {
    let dir = TempDir::new().unwrap();
    let krab = assemble_to_temp(&dir, "RETURN 1\n");
    let mut bytes = fs::read(&krab).unwrap();
    bytes[2] ^= 0x20;
    fs::write(&krab, &bytes).unwrap();

    krait()
        .args(["run", krab.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid binary"));
}

#[test]
fn runtime_errors_exit_2() {
    let dir = TempDir::new().unwrap();
    let krab = assemble_to_temp(&dir, "RETURN (DIVNUM 1 0)\n");

    krait()
        .args(["run", krab.to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("runtime error: division by zero"));
}

// ---- Exec ----

#[test]
fn exec_runs_source_directly() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("direct.kra");
    fs::write(&input, "PRINTV (CONCAT \"2+2=\" (ADDNUM 2 2))\n").unwrap();

    krait()
        .args(["exec", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::eq("2+2=4\n"));
}

#[test]
fn exec_warns_then_keeps_going() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("warned.kra");
    fs::write(&input, "FROBNI\nPRINTV \"still here\"\n").unwrap();

    krait()
        .args(["exec", input.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "warning: line 1: unknown opcode 'FROBNI'",
        ))
        .stdout(predicate::eq("still here\n"));
}

// ---- Sample program pipeline ----

/// Assemble a sample to a temp binary, run it, and check stdout; then
/// exec the source directly and expect the same output.
fn pipeline_test(kra_file: &str, expected: &str) {
    let kra_path = test_program(kra_file);
    let dir = TempDir::new().unwrap();
    let krab = dir.path().join("out.krab");

    krait()
        .args([
            "assemble",
            kra_path.to_str().unwrap(),
            "-o",
            krab.to_str().unwrap(),
        ])
        .assert()
        .success();

    krait()
        .args(["run", krab.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::eq(expected));

    krait()
        .args(["exec", kra_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::eq(expected));
}

#[test]
fn pipeline_hello() {
    pipeline_test("hello.kra", "hello, world\n");
}

#[test]
fn pipeline_factorial() {
    pipeline_test("factorial.kra", "= 120\n");
}

#[test]
fn pipeline_natives() {
    pipeline_test("natives.kra", "9\n= 2\n");
}

#[test]
fn pipeline_labels() {
    pipeline_test("labels.kra", "n = 3\nn = 2\nn = 1\n");
}

#[test]
fn pipeline_scopes() {
    pipeline_test("scopes.kra", "[krait]\n");
}

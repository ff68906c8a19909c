// Regression tests for the `dhall-syntax` and `compile-grammar` binaries.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

#[test]
fn cli_reports_miette_diagnostics_on_syntax_error() {
    let bad_file = "tests/bad_input.dhall";
    fs::write(bad_file, "let x = 1 in (x").unwrap();

    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("parse").arg(bad_file);
    cmd.assert()
        .failure()
        .stderr(contains("dhall::syntax").and(contains("expected")));

    let _ = fs::remove_file(bad_file);
}

#[test]
fn cli_prints_the_syntax_tree() {
    let file = "tests/good_input.dhall";
    fs::write(file, "{ a = 1 + 2 }").unwrap();

    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("parse").arg(file);
    cmd.assert()
        .success()
        .stdout(contains("RecordLiteral").and(contains("Plus")));

    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("--json").arg("parse").arg(file);
    cmd.assert().success().stdout(contains("\"RecordLiteral\""));

    let _ = fs::remove_file(file);
}

#[test]
fn cli_tree_shows_rule_names() {
    let file = "tests/tree_input.dhall";
    fs::write(file, "f x").unwrap();

    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("tree").arg(file);
    cmd.assert()
        .success()
        .stdout(contains("application-expression").and(contains("nonreserved-label")));

    let _ = fs::remove_file(file);
}

#[test]
fn cli_check_walks_directories() {
    let dir = "tests/check_dir";
    let _ = fs::remove_dir_all(dir);
    fs::create_dir_all(format!("{}/nested", dir)).unwrap();
    fs::write(format!("{}/ok.dhall", dir), "λ(x : Bool) → x").unwrap();
    fs::write(format!("{}/nested/bad.dhall", dir), "[1,").unwrap();
    fs::write(format!("{}/ignored.txt", dir), "not dhall at all (").unwrap();

    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("check").arg(dir);
    cmd.assert()
        .failure()
        .stdout(contains("1 passed, 1 failed").and(contains("bad.dhall")))
        .stdout(contains("ignored.txt").not());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn cli_strict_scoping_flag() {
    let file = "tests/free_input.dhall";
    fs::write(file, "λ(x : Bool) → y").unwrap();

    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("check").arg(file);
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("--reject-free-variables").arg("check").arg(file);
    cmd.assert()
        .failure()
        .stderr(contains("dhall::ast::unbound_variable"));

    let _ = fs::remove_file(file);
}

#[test]
fn cli_reads_options_from_yaml() {
    let file = "tests/deep_input.dhall";
    let config = "tests/shallow.yaml";
    fs::write(file, "[[[[1]]]]").unwrap();
    fs::write(config, "max_depth: 2\n").unwrap();

    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("--config").arg(config).arg("check").arg(file);
    cmd.assert().failure().stderr(contains("dhall::ast::too_deep"));

    let _ = fs::remove_file(file);
    let _ = fs::remove_file(config);
}

#[test]
fn compile_grammar_writes_a_loadable_artifact() {
    let artifact = "tests/standard_grammar.json";

    let mut cmd = Command::cargo_bin("compile-grammar").unwrap();
    cmd.arg("-o").arg(artifact);
    cmd.assert().success().stdout(contains("Wrote"));

    let mut cmd = Command::cargo_bin("compile-grammar").unwrap();
    cmd.arg("--check").arg(artifact);
    cmd.assert().success();

    let file = "tests/artifact_input.dhall";
    fs::write(file, "Some [True, False]").unwrap();
    let mut cmd = Command::cargo_bin("dhall-syntax").unwrap();
    cmd.arg("--grammar").arg(artifact).arg("check").arg(file);
    cmd.assert().success().stdout(contains("1 passed"));

    let _ = fs::remove_file(file);
    let _ = fs::remove_file(artifact);
}

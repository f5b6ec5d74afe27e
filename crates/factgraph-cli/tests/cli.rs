//! End-to-end CLI tests: dictionary file in, store file round-trips,
//! evaluation out.

use assert_cmd::Command;
use predicates::prelude::*;

const DICTIONARY: &str = r#"{
  "facts": [
    { "path": "/income", "writable": { "type": "Dollar" } },
    { "path": "/bonus", "writable": { "type": "Dollar" } },
    { "path": "/age",
      "writable": {
        "type": "Int",
        "limits": [
          { "kind": "Min", "bound": { "const": { "$type": "Int", "item": 0 } } },
          { "kind": "Max", "bound": { "const": { "$type": "Int", "item": 150 } } }
        ] } },
    { "path": "/total",
      "derived": { "op": "Add",
                   "args": [ { "dep": "/income" }, { "dep": "/bonus" } ] } }
  ]
}"#;

fn write_dictionary(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("dictionary.json");
    std::fs::write(&path, DICTIONARY).unwrap();
    path
}

fn factgraph() -> Command {
    Command::cargo_bin("factgraph").unwrap()
}

#[test]
fn inspect_lists_declared_facts() {
    let dir = tempfile::tempdir().unwrap();
    let dict = write_dictionary(&dir);
    factgraph()
        .args(["--dictionary", dict.to_str().unwrap(), "inspect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/income  writable Dollar"))
        .stdout(predicate::str::contains("/total  derived"));
}

#[test]
fn dictionary_comes_from_the_environment_when_not_passed() {
    let dir = tempfile::tempdir().unwrap();
    let dict = write_dictionary(&dir);
    factgraph()
        .env("FACTGRAPH_DICTIONARY", dict.to_str().unwrap())
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("/bonus"));
}

#[test]
fn missing_dictionary_fails_with_nonzero_exit() {
    factgraph()
        .env_remove("FACTGRAPH_DICTIONARY")
        .arg("inspect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("FACTGRAPH_DICTIONARY"));
}

#[test]
fn set_then_get_round_trips_through_the_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let dict = write_dictionary(&dir);
    let store = dir.path().join("store.json");

    factgraph()
        .args([
            "--dictionary",
            dict.to_str().unwrap(),
            "set",
            "/income",
            "50000",
            "--store",
            store.to_str().unwrap(),
        ])
        .assert()
        .success();
    factgraph()
        .args([
            "--dictionary",
            dict.to_str().unwrap(),
            "set",
            "/bonus",
            "5000",
            "--store",
            store.to_str().unwrap(),
        ])
        .assert()
        .success();

    factgraph()
        .args([
            "--dictionary",
            dict.to_str().unwrap(),
            "--output",
            "json",
            "get",
            "/total",
            "--store",
            store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\":55000"))
        .stdout(predicate::str::contains("\"complete\":true"));
}

#[test]
fn save_reports_limit_violations_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let dict = write_dictionary(&dir);
    let store = dir.path().join("store.json");

    // The write lands despite the violation; set itself succeeds.
    factgraph()
        .args([
            "--dictionary",
            dict.to_str().unwrap(),
            "set",
            "/age",
            "200",
            "--store",
            store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Max"));

    factgraph()
        .args([
            "--dictionary",
            dict.to_str().unwrap(),
            "save",
            "--store",
            store.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Max"));
}

#[test]
fn explain_prints_a_derivation_trace() {
    let dir = tempfile::tempdir().unwrap();
    let dict = write_dictionary(&dir);
    let store = dir.path().join("store.json");

    factgraph()
        .args([
            "--dictionary",
            dict.to_str().unwrap(),
            "set",
            "/income",
            "50000",
            "--store",
            store.to_str().unwrap(),
        ])
        .assert()
        .success();

    factgraph()
        .args([
            "--dictionary",
            dict.to_str().unwrap(),
            "explain",
            "/total",
            "--store",
            store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("/total = Incomplete"))
        .stdout(predicate::str::contains("Add"))
        .stdout(predicate::str::contains("[writable Dollar, set]"));
}

#[test]
fn get_unknown_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let dict = write_dictionary(&dir);
    factgraph()
        .args(["--dictionary", dict.to_str().unwrap(), "get", "/nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown path"));
}

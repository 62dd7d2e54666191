#![allow(missing_docs)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use rusqlite::Connection;
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn seed(dir: &TempDir) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let path = dir.path().join("crm.db");
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE Account (Id TEXT PRIMARY KEY, Name TEXT);
         CREATE TABLE Contact (
             Id TEXT PRIMARY KEY,
             LastName TEXT,
             AccountId TEXT REFERENCES Account(Id)
         );
         INSERT INTO Account VALUES ('a1', 'Acme'), ('a2', 'Globex');
         INSERT INTO Contact VALUES ('c1', 'Smith', 'a1'), ('c2', 'Jones', 'a2');",
    )?;
    Ok(path)
}

fn nestql(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("nestql");
    cmd.env("NESTQL_CONFIG", dir.join("absent.toml"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn query_prints_json_response() -> TestResult {
    let dir = tempfile::tempdir()?;
    let db = seed(&dir)?;
    let output = nestql(dir.path())
        .args(["--format", "json", "query", "--db"])
        .arg(&db)
        .args(["--var", "who=Globex"])
        .arg("{ Account(Name:$who) { Name Contact { LastName } } }")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let response: JsonValue = serde_json::from_slice(&output)?;
    assert_eq!(
        response["data"],
        json!({"Account": [{"Name": "Globex", "Contact": [{"LastName": "Jones"}]}]})
    );
    assert_eq!(response["errors"], json!([]));
    assert_eq!(response["queries"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn query_reads_stdin_and_reports_errors_in_text() -> TestResult {
    let dir = tempfile::tempdir()?;
    let db = seed(&dir)?;
    let output = nestql(dir.path())
        .args(["query", "--db"])
        .arg(&db)
        .arg("-")
        .write_stdin("{ Bogus { Id } }")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output)?;
    assert!(text.starts_with("null\n"));
    assert!(text.contains("error: Bogus is not a valid entity"));
    Ok(())
}

#[test]
fn schema_lists_introspected_entities() -> TestResult {
    let dir = tempfile::tempdir()?;
    let db = seed(&dir)?;
    let output = nestql(dir.path())
        .args(["schema", "--format", "json", "--db"])
        .arg(&db)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let entities: JsonValue = serde_json::from_slice(&output)?;
    assert_eq!(entities[0]["name"], "Account");
    assert_eq!(entities[0]["children"][0]["join_field"], "AccountId");
    assert_eq!(entities[1]["name"], "Contact");
    Ok(())
}

#[test]
fn missing_database_fails() -> TestResult {
    let dir = tempfile::tempdir()?;
    let output = nestql(dir.path())
        .args(["query", "{ Account { Name } }"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8(output)?.contains("no database given"));
    Ok(())
}

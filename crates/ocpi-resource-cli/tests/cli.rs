//! Runs the `ocpi-resource` binary against files on disk.

use ocpi_resource_core::{
    IdentityHints, Parseable, PartyId, Resource, SerializeOptions, Serializable, Timestamp,
};
use ocpi_resource_model::{Location, Session};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn location_json() -> Value {
    json!({
        "country_code": "DE",
        "party_id": "GEF",
        "id": "LOC1",
        "version": 1,
        "publish": true,
        "name": "Old Name",
        "address": "Leutragraben 1",
        "city": "Jena",
        "country": "DEU",
        "coordinates": {"latitude": "50.9270540", "longitude": "11.5892372"},
        "time_zone": "Europe/Berlin",
        "last_updated": "2024-01-01T00:00:00Z"
    })
}

fn write(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, value.to_string()).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ocpi-resource"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("OCPI_RESOURCE_LOG")
        .env_remove("OCPI_RESOURCE_PARTY")
        .env_remove("OCPI_RESOURCE_ALLOW_DOWNGRADE")
        .env_remove("OCPI_RESOURCE_PRETTY")
        .output()
        .unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap().trim_end().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}

#[test]
fn hash_matches_the_library() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "loc.json", &location_json());
    let expected = Location::from_json(&location_json(), &IdentityHints::none()).unwrap();

    let output = run(&["hash", "location", arg(&file)]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), expected.etag().as_str());
}

#[test]
fn validate_prints_kind_identity_and_etag() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "loc.json", &location_json());
    let expected = Location::from_json(&location_json(), &IdentityHints::none()).unwrap();

    let output = run(&["validate", "location", arg(&file)]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        format!("Location DE*GEF:LOC1@1 {}", expected.etag())
    );
}

#[test]
fn canonical_output_reparses_to_the_same_resource() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "loc.json", &location_json());

    let output = run(&["canonical", "location", arg(&file)]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    let expected = Location::from_json(&location_json(), &IdentityHints::none()).unwrap();
    assert_eq!(text, expected.to_json_text(SerializeOptions::ALL));

    let pretty = run(&["canonical", "location", arg(&file), "--pretty"]);
    assert!(pretty.status.success());
    let reparsed = Location::parse_text(&stdout(&pretty), &IdentityHints::none()).unwrap();
    assert_eq!(reparsed, expected);
}

#[test]
fn patch_applies_and_prints_the_result() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "loc.json", &location_json());
    let patch = write(
        &dir,
        "patch.json",
        &json!({"name": "New Name", "last_updated": "2024-02-01T00:00:00Z"}),
    );

    let output = run(&["patch", "location", arg(&file), arg(&patch)]);
    assert!(output.status.success(), "{}", stderr(&output));
    let patched = Location::parse_text(&stdout(&output), &IdentityHints::none()).unwrap();
    assert_eq!(patched.name(), Some("New Name"));
    let expected: Timestamp = "2024-02-01T00:00:00Z".parse().unwrap();
    assert_eq!(patched.meta().last_updated(), expected);
}

#[test]
fn protected_and_stale_patches_fail() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "loc.json", &location_json());

    let protected = write(&dir, "id.json", &json!({"id": "LOC2"}));
    let output = run(&["patch", "location", arg(&file), arg(&protected)]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("protected field 'id'"));

    let stale = write(
        &dir,
        "stale.json",
        &json!({"last_updated": "2020-01-01T00:00:00Z"}),
    );
    let output = run(&["patch", "location", arg(&file), arg(&stale)]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("older than the current value"));

    let output = run(&[
        "patch",
        "location",
        arg(&file),
        arg(&stale),
        "--allow-downgrade",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
}

#[test]
fn party_hint_fills_missing_owner() {
    let dir = TempDir::new().unwrap();
    let body = json!({
        "id": "S1",
        "version": 1,
        "start_date_time": "2024-03-01T10:00:00Z",
        "kwh": 2.5,
        "auth_method": "COMMAND",
        "currency": "EUR",
        "location_id": "LOC1",
        "evse_uid": "E1",
        "connector_id": "1",
        "status": "PENDING",
        "last_updated": "2024-03-01T10:00:00Z"
    });
    let file = write(&dir, "session.json", &body);

    let output = run(&["hash", "session", arg(&file)]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("party_id"));

    let output = run(&["hash", "session", arg(&file), "--party", "NL*ABC"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let expected =
        Session::from_json(&body, &IdentityHints::party(PartyId::new("NL", "ABC").unwrap()))
            .unwrap();
    assert_eq!(stdout(&output), expected.etag().as_str());
}

#[test]
fn usage_errors_exit_non_zero() {
    let output = run(&["hash", "location"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Usage: ocpi-resource hash"));

    let output = run(&["hash", "tariff", "x.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown resource kind"));

    let output = run(&["frobnicate"]);
    assert!(!output.status.success());
}

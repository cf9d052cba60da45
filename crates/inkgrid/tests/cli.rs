use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const REGISTRY: &str = r#"{
  "patterns": [
    {
      "id": 1,
      "uuid": "tag-0001",
      "pattern": [0, 1, 0, 1, 0, 1, 0, 1, 1],
      "size": 3,
      "input_text": "batch 1",
      "algorithm": "standard",
      "issued_at": "2024-03-01T12:00:00Z"
    }
  ]
}"#;

fn inkgrid() -> Command {
    Command::cargo_bin("inkgrid").expect("binary")
}

#[test]
fn rendered_tag_is_detected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("tag.png");

    inkgrid()
        .args(["render", "--pattern", "2,0,1,1,2,0,0,1,2,2,0,1,1,2,0,0"])
        .args(["--palette", "0,229,255;0,150,136;33,150,243"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(out.exists());

    inkgrid()
        .arg("detect")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"))
        .stdout(predicate::str::contains("\"size\": 4"));
}

#[test]
fn verify_reads_the_registry_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = dir.path().join("registry.json");
    fs::write(&registry, REGISTRY).expect("write registry");

    inkgrid()
        .arg("verify")
        .arg("--registry")
        .arg(&registry)
        .args(["--pattern", "0,1,0,1,0,1,0,1,1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"found\": true"))
        .stdout(predicate::str::contains("tag-0001"));

    inkgrid()
        .arg("verify")
        .arg("--registry")
        .arg(&registry)
        .args(["--pattern", "1,1,0,0,1,0,1,0,0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"found\": false"));
}

#[test]
fn malformed_pattern_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = dir.path().join("registry.json");
    fs::write(&registry, REGISTRY).expect("write registry");

    inkgrid()
        .arg("verify")
        .arg("--registry")
        .arg(&registry)
        .args(["--pattern", "0,1,x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid ink id"));

    inkgrid()
        .arg("verify")
        .arg("--registry")
        .arg(&registry)
        .args(["--pattern", "0,1,0,1,0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotSquare"));
}

// Integration tests for `hgrid` against a mock hours API.
//
// Each test gets its own config directory (XDG_CONFIG_HOME) holding
// settings.json and auth.json, so nothing touches the real user config.
//
// Run with: cargo test -p hourgrid-cli --test cli_contract -- --nocapture

#![cfg(target_os = "linux")]

use std::path::Path;
use std::process::{Command, Output};

use httpmock::prelude::*;

struct Env {
    config: tempfile::TempDir,
    server: MockServer,
}

impl Env {
    fn new() -> Self {
        let env = Self { config: tempfile::tempdir().unwrap(), server: MockServer::start() };
        let dir = env.config.path().join("hourgrid");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("settings.json"),
            r#"{ "grid.categoryContext": "site-1", "grid.defaultView": "week" }"#,
        )
        .unwrap();
        env
    }

    fn login(&self) {
        let auth = serde_json::json!({ "token": "tok", "api_base": self.server.base_url() });
        std::fs::write(self.config.path().join("hourgrid/auth.json"), auth.to_string()).unwrap();
    }

    fn hgrid(&self, args: &[&str]) -> Output {
        run(self.config.path(), args)
    }

    fn mock_categories(&self) {
        self.server.mock(|when, then| {
            when.method(GET).path("/api/contexts/site-1/categories");
            then.status(200).json_body(serde_json::json!([
                {"id": "exc", "name": "Excavation"},
                {"id": "trn", "name": "Transport"}
            ]));
        });
    }

    fn mock_entries(&self, entries: serde_json::Value) {
        self.server.mock(|when, then| {
            when.method(GET).path("/api/subjects/truck-7/entries");
            then.status(200).json_body(entries);
        });
    }
}

fn run(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hgrid"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("HOURGRID_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("run hgrid")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn show_json_is_a_single_document() {
    let env = Env::new();
    env.login();
    env.mock_categories();
    env.mock_entries(serde_json::json!([
        {"id": 11, "date": "2024-03-02", "category_id": "exc", "quantity": 8.0, "owner_ref": "D1"}
    ]));

    let output = env.hgrid(&["show", "-s", "truck-7", "-y", "2024", "-m", "3", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let val: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(val["mode"], "week");
    assert_eq!(val["start"], "2024-03-01");
    assert_eq!(val["end"], "2024-03-07");
    assert_eq!(val["categories"].as_array().unwrap().len(), 2);
    assert_eq!(val["rows"][1]["cells"][0]["id"], "11");
    assert_eq!(val["total"], 8.0);
}

#[test]
fn show_without_login_exits_10() {
    let env = Env::new();
    let output = env.hgrid(&["show", "-s", "truck-7"]);
    assert_eq!(output.status.code(), Some(10));
    assert!(stderr(&output).contains("hgrid login"));
}

#[test]
fn set_creates_entry() {
    let env = Env::new();
    env.login();
    env.mock_categories();
    env.mock_entries(serde_json::json!([]));
    let create = env.server.mock(|when, then| {
        when.method(POST)
            .path("/api/subjects/truck-7/entries")
            .json_body(serde_json::json!({
                "date": "2024-03-10",
                "category_id": "trn",
                "quantity": 5.0,
                "owner_ref": "D2"
            }));
        then.status(201).json_body(serde_json::json!({"id": 77}));
    });

    let output = env.hgrid(&[
        "set", "-s", "truck-7", "--date", "2024-03-10", "--category", "transport", "--value", "5", "--owner", "D2",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    create.assert();
    assert!(stderr(&output).contains("1 saved"));
}

#[test]
fn set_over_capacity_exits_21_without_writing() {
    let env = Env::new();
    env.login();
    env.mock_categories();
    env.mock_entries(serde_json::json!([
        {"id": 1, "date": "2024-01-05", "category_id": "exc", "quantity": 20.0}
    ]));
    let create = env.server.mock(|when, then| {
        when.method(POST).path("/api/subjects/truck-7/entries");
        then.status(201).json_body(serde_json::json!({"id": 2}));
    });

    let output = env.hgrid(&["set", "-s", "truck-7", "--date", "2024-01-05", "--category", "trn", "--value", "5"]);
    assert_eq!(output.status.code(), Some(21), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("at most 4h"));
    create.assert_hits(0);
}

#[test]
fn failed_save_exits_23() {
    let env = Env::new();
    env.login();
    env.mock_categories();
    env.mock_entries(serde_json::json!([
        {"id": 5, "date": "2024-02-01", "category_id": "exc", "quantity": 8.0}
    ]));
    env.server.mock(|when, then| {
        when.method(DELETE).path("/api/entries/5");
        then.status(500).body("boom");
    });

    let output = env.hgrid(&["delete", "-s", "truck-7", "--date", "2024-02-01", "--category", "exc"]);
    assert_eq!(output.status.code(), Some(23), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("1 failed"));
}

#[test]
fn unknown_category_is_a_usage_error() {
    let env = Env::new();
    env.login();
    env.mock_categories();
    env.mock_entries(serde_json::json!([]));

    let output = env.hgrid(&["set", "-s", "truck-7", "--date", "2024-01-05", "--category", "Idle", "--value", "1"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("known: Excavation, Transport"));
}

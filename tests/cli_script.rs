//! Tests for the quizgrid binary.
//!
//! Run with: cargo test cli_script

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use serde_json::Value;
use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn quizgrid(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_quizgrid"))
        .args(args)
        .output()
        .unwrap()
}

fn script_file(script: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(script.to_string().as_bytes()).unwrap();
    file
}

fn battle_script() -> Value {
    let admin = serde_json::json!({"user": 1, "privileged": true});
    let north = serde_json::json!({"user": 10, "roster": 1});
    let south = serde_json::json!({"user": 20, "roster": 2});
    serde_json::json!({
        "start": "2024-05-01T10:00:00Z",
        "steps": [
            {"call": {"caller": admin, "request": {"op": "add_roster", "name": "North", "owner": 10, "coins": 100}}},
            {"call": {"caller": admin, "request": {"op": "add_roster", "name": "South", "owner": 20, "coins": 100}}},
            {"call": {"caller": admin, "request": {"op": "create_game", "name": "Castle", "rows": 2, "columns": 2, "participants": [1, 2]}}},
            {"call": {"caller": admin, "request": {"op": "enroll", "roster": 1, "status": "warrior",
                "template": {"name": "Knight", "attack": 80, "defense": 10, "healing": 10}}}},
            {"call": {"caller": admin, "request": {"op": "enroll", "roster": 2, "status": "warrior",
                "template": {"name": "Squire", "attack": 10, "defense": 40, "healing": 10, "health": 20}}}},
            {"connect": {"viewer": 20}},
            {"call": {"caller": north, "request": {"op": "place_unit", "cell": 1, "unit": 1}, "expect": 200}},
            {"call": {"caller": south, "request": {"op": "place_unit", "cell": 1, "unit": 2}, "expect": 409}},
            {"call": {"caller": south, "request": {"op": "place_unit", "cell": 4, "unit": 2}}},
            {"call": {"caller": north, "request": {"op": "create_battle", "name": "Duel",
                "attacker": {"unit": 1, "roster": 1}, "defender": {"unit": 2, "roster": 2}, "game": 1,
                "questions": [{"prompt": "2 + 2?", "answer": "4"}, {"prompt": "Capital of France?", "answer": "Paris"}]}}},
            {"call": {"caller": admin, "request": {"op": "assign_questions", "battle": 1,
                "assignments": [{"question": 1, "roster": 1}, {"question": 2, "roster": 2}]}}},
            {"call": {"caller": admin, "request": {"op": "start_battle", "battle": 1}}},
            {"call": {"caller": north, "request": {"op": "submit_answer", "question": 1, "answer": "4"}}},
            {"call": {"caller": south, "request": {"op": "submit_answer", "question": 2, "answer": "paris"}}},
            {"wait": {"seconds": 30}},
            {"call": {"request": {"op": "advance_turn", "game": 1}}},
            {"call": {"caller": admin, "request": {"op": "complete_battle", "battle": 1}, "expect": 200}}
        ]
    })
}

#[test]
fn test_run_script_json_report() {
    let file = script_file(&battle_script());
    let output = quizgrid(&[
        "run",
        file.path().to_str().unwrap(),
        "--format",
        "json",
        "--board",
        "1",
        "--check",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 15);
    assert_eq!(steps[13]["body"]["hold"], "paused");

    let resolution = &steps[14]["body"];
    assert_eq!(resolution["verdict"], "both_correct");
    assert_eq!(resolution["fallen"], serde_json::json!([2]));
    assert_eq!(resolution["released_game"], 1);

    assert_eq!(report["violations"], serde_json::json!([]));
    assert!(report["board"].as_str().unwrap().contains("Castle (game 1)"));
    let pushes = report["pushes"].as_array().unwrap();
    assert!(pushes.iter().all(|p| p["viewer"] == 20));
    assert!(pushes.iter().any(|p| p["frame"]["type"] == "game_update"));
}

#[test]
fn test_unexpected_status_fails_run() {
    let script = serde_json::json!({
        "steps": [
            {"call": {"request": {"op": "get_game", "game": 7}, "expect": 200}}
        ]
    });
    let file = script_file(&script);
    let output = quizgrid(&["run", file.path().to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected status"));
}

#[test]
fn test_missing_script_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    let output = quizgrid(&["run", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot read"), "{stderr}");
    assert!(stderr.contains("absent.json"), "{stderr}");
}

#[test]
fn test_damage_table() {
    let output = quizgrid(&["damage", "-a", "80", "-d", "40", "--format", "json"]);
    assert!(output.status.success());
    let table: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(table["damage"], 200.0);
    let outcomes = table["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["impact"]["defender_health"], 100);
    assert_eq!(outcomes[1]["impact"]["defender_health"], 200);
    assert_eq!(outcomes[2]["impact"]["attacker_stamina"], 25);
    assert_eq!(outcomes[3]["defender_health"], 75);
}

#[test]
fn test_levels_with_config_file() {
    let mut config = NamedTempFile::new().unwrap();
    config.write_all(br#"{"points_per_level": 50}"#).unwrap();
    let output = quizgrid(&[
        "levels",
        "--attack",
        "20",
        "--to-level",
        "3",
        "--format",
        "json",
        "--config",
        config.path().to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["stats"]["attack"], 120);
    assert_eq!(rows[2]["cost"], 30);
}

#[test]
fn test_contend_reports_one_advance_per_round() {
    let output = quizgrid(&["contend", "-n", "32", "--rounds", "3", "--format", "json"]);
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["advances"], 3);
    assert_eq!(report["holds"], 3 * 31);
    assert_eq!(report["errors"], 0);
}

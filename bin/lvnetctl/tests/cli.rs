//! ---
//! lvnet_section: "05-external-interfaces"
//! lvnet_subsection: "tests"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Command-line smoke tests for lvnetctl."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::tempdir;

const SCENARIO: &str = r#"{
  "scenario_id": "cli-1",
  "params": { "transformer_kva": 75.0, "demand_table": "NBR" },
  "nodes": [
    { "id": "TRAFO" },
    { "id": "P1", "parent_id": "TRAFO", "span_m": 40.0, "conductor": "CA-16",
      "load": { "residences": { "mono": 30 } } },
    { "id": "P2", "parent_id": "P1", "span_m": 40.0, "conductor": "CA-16",
      "load": { "residences": { "mono": 10 } } }
  ],
  "catalogs": {
    "conductors": {
      "CA-16": { "resistance_ohm_per_km": 1.91, "drop_coefficient": 0.30, "ampacity_a": 70.0 },
      "CA-50": { "resistance_ohm_per_km": 0.641, "drop_coefficient": 0.09, "ampacity_a": 135.0 }
    },
    "demand_tables": {
      "NBR": {
        "rows": [
          { "min_residences": 0, "max_residences": 100,
            "factors": { "a": 1.0, "b": 1.4, "c": 1.8, "d": 2.4 } }
        ]
      }
    }
  }
}"#;

fn lvnetctl(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lvnetctl").unwrap();
    cmd.current_dir(dir)
        .env_remove("LVNET_CONFIG")
        .env("LVNET_LOG", "off");
    cmd
}

#[test]
fn calculate_writes_reports_and_prints_json() {
    let dir = tempdir().unwrap();
    let scenario = dir.path().join("scenario.json");
    fs::write(&scenario, SCENARIO).unwrap();
    let reports = dir.path().join("reports");

    let output = lvnetctl(dir.path())
        .arg("calculate")
        .arg("--scenario")
        .arg(&scenario)
        .arg("--output")
        .arg(&reports)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["scenario_id"], "cli-1");
    assert!(result["kpis"]["total_load_kva"].as_f64().unwrap() > 50.0);
    assert!(reports.join("calculation.json").exists());
}

#[test]
fn optimize_rewrites_scenario() {
    let dir = tempdir().unwrap();
    let scenario = dir.path().join("scenario.json");
    fs::write(&scenario, SCENARIO).unwrap();
    let optimized = dir.path().join("optimized.json");

    lvnetctl(dir.path())
        .args(["optimize", "--output", "out", "--write-scenario"])
        .arg(&optimized)
        .arg("--scenario")
        .arg(&scenario)
        .assert()
        .success();

    let rewritten: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&optimized).unwrap()).unwrap();
    assert_eq!(rewritten["nodes"][1]["conductor"], "CA-50");
    assert!(dir.path().join("out/optimization.json").exists());
}

#[test]
fn validate_fails_on_unknown_conductor() {
    let dir = tempdir().unwrap();
    let scenario = dir.path().join("scenario.json");
    fs::write(&scenario, SCENARIO.replace("\"CA-16\",", "\"CA-999\",")).unwrap();

    lvnetctl(dir.path())
        .args(["validate", "--scenario"])
        .arg(&scenario)
        .assert()
        .failure();
}

#[test]
fn monte_carlo_rejects_zero_iterations() {
    let dir = tempdir().unwrap();
    let scenario = dir.path().join("scenario.json");
    fs::write(&scenario, SCENARIO).unwrap();

    lvnetctl(dir.path())
        .args(["monte-carlo", "-n", "0", "--scenario"])
        .arg(&scenario)
        .assert()
        .failure();

    lvnetctl(dir.path())
        .args(["monte-carlo", "-n", "20", "--json", "--scenario"])
        .arg(&scenario)
        .assert()
        .success();
}

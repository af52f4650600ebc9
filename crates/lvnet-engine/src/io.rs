//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Scenario and catalog loaders for JSON and YAML documents."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use std::{fs, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    errors::{CalcEngineError, Result},
    model::{Catalogs, NetworkPoint, ScenarioParams},
};

/// Everything needed for one calculation, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBundle {
    pub scenario_id: String,
    pub params: ScenarioParams,
    #[serde(default)]
    pub nodes: Vec<NetworkPoint>,
    #[serde(default)]
    pub catalogs: Catalogs,
}

pub fn load_scenario_from_file(path: impl AsRef<Path>) -> Result<ScenarioBundle> {
    load_document(path)
}

/// Loads a scenario and replaces its embedded catalogs with a shared catalog file.
pub fn load_scenario_with_catalogs(
    scenario: impl AsRef<Path>,
    catalogs: impl AsRef<Path>,
) -> Result<ScenarioBundle> {
    let mut bundle = load_scenario_from_file(scenario)?;
    bundle.catalogs = load_catalogs_from_file(catalogs)?;
    Ok(bundle)
}

pub fn load_catalogs_from_file(path: impl AsRef<Path>) -> Result<Catalogs> {
    load_document(path)
}

pub fn parse_scenario(data: &str) -> Result<ScenarioBundle> {
    parse_document(data)
}

fn load_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let data = fs::read_to_string(path)?;
    parse_document(&data)
}

fn parse_document<T: DeserializeOwned>(data: &str) -> Result<T> {
    let value = if data.trim_start().starts_with('{') {
        serde_json::from_str(data)?
    } else {
        serde_yaml::from_str(data).map_err(CalcEngineError::YamlSerializationFailed)?
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassMode;

    const YAML: &str = r#"
scenario_id: yaml-1
params:
  transformer_kva: 45.0
  profile:
    name: rural
    max_voltage_drop_percent: 7.0
    max_thermal_percent: 100.0
  class_mode: manual
  manual_class: C
  demand_table: NBR
nodes:
  - id: TRAFO
  - id: P1
    parent_id: TRAFO
    span_m: 35.0
    conductor: CA-35
    load:
      residences: { mono: 3, bi: 1, tri: 0 }
"#;

    #[test]
    fn yaml_and_json_are_both_accepted() {
        let bundle = parse_scenario(YAML).unwrap();
        assert_eq!(bundle.scenario_id, "yaml-1");
        assert_eq!(bundle.params.class_mode, ClassMode::Manual);
        assert_eq!(bundle.nodes.len(), 2);
        assert_eq!(bundle.nodes[1].load.residences.total(), 4);
        assert!(bundle.catalogs.conductors.is_empty());

        let json = serde_json::to_string(&bundle).unwrap();
        assert_eq!(parse_scenario(&json).unwrap(), bundle);
    }

    #[test]
    fn malformed_documents_are_reported() {
        let err = parse_scenario("{ \"scenario_id\": ").unwrap_err();
        assert!(matches!(err, CalcEngineError::SerializationFailed(_)));
        let err = parse_scenario("scenario_id: [").unwrap_err();
        assert!(matches!(err, CalcEngineError::YamlSerializationFailed(_)));
    }
}

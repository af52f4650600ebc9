//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "JSON report envelopes for calculation, risk and optimization results."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{errors::Result, optimizer::OptimizationOutcome, CalculationResult};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug)]
pub struct ReportExporter<'a> {
    result: &'a CalculationResult,
    run_id: Uuid,
    timestamp: DateTime<Utc>,
}

impl<'a> ReportExporter<'a> {
    pub fn new(result: &'a CalculationResult) -> Self {
        Self {
            result,
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Writes `calculation.json`, plus `risk.json` when a risk bundle is attached.
    pub fn export_all(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let timestamp = self.timestamp.to_rfc3339();
        let mut written = Vec::new();

        let calculation = ReportEnvelope::new(
            &timestamp,
            self.run_id,
            &self.result.scenario_id,
            calculation_schema(),
            self.result,
        );
        let path = output_dir.join("calculation.json");
        write_json(&path, &calculation)?;
        written.push(path);

        if let Some(risk) = &self.result.risk {
            let envelope = ReportEnvelope::new(
                &timestamp,
                self.run_id,
                &self.result.scenario_id,
                risk_schema(),
                risk,
            );
            let path = output_dir.join("risk.json");
            write_json(&path, &envelope)?;
            written.push(path);
        }

        info!(
            scenario = %self.result.scenario_id,
            run_id = %self.run_id,
            "Reports exported to {}",
            output_dir.display()
        );
        Ok(written)
    }
}

/// Writes `optimization.json` for a conductor optimization run.
pub fn export_optimization(
    scenario_id: &str,
    outcome: &OptimizationOutcome,
    output_dir: &Path,
) -> Result<PathBuf> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)?;
    }
    let timestamp = Utc::now().to_rfc3339();
    let envelope = ReportEnvelope::new(
        &timestamp,
        Uuid::new_v4(),
        scenario_id,
        optimization_schema(),
        outcome,
    );
    let path = output_dir.join("optimization.json");
    write_json(&path, &envelope)?;
    info!(scenario = scenario_id, "Optimization report written to {}", path.display());
    Ok(path)
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    run_id: Uuid,
    scenario_id: &'a str,
    engine_version: &'static str,
    schema: serde_json::Value,
    data: &'a T,
}

impl<'a, T: Serialize> ReportEnvelope<'a, T> {
    fn new(
        timestamp: &'a str,
        run_id: Uuid,
        scenario_id: &'a str,
        schema: serde_json::Value,
        data: &'a T,
    ) -> Self {
        Self {
            timestamp,
            run_id,
            scenario_id,
            engine_version: ENGINE_VERSION,
            schema,
            data,
        }
    }
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn calculation_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "CalculationReport",
        "type": "object",
        "properties": {
            "scenario_id": {"type": "string"},
            "nodes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "point": {"type": "object"},
                        "attached": {"type": "boolean"},
                        "demand": {"type": "object"},
                        "physics": {"type": "object"}
                    },
                    "required": ["point", "attached", "demand", "physics"]
                }
            },
            "kpis": {"type": "object"},
            "sustainability": {"type": "object"},
            "distributed_generation": {"type": "object"},
            "warnings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "kind": {},
                        "node_id": {"type": ["string", "null"]},
                        "detail": {"type": "string"}
                    },
                    "required": ["kind", "detail"]
                }
            },
            "validation": {"type": "object"},
            "risk": {"type": ["object", "null"]}
        },
        "required": [
            "scenario_id",
            "nodes",
            "kpis",
            "sustainability",
            "distributed_generation",
            "warnings",
            "validation"
        ]
    })
}

fn risk_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "RiskReport",
        "type": "object",
        "properties": {
            "iterations": {"type": "integer", "minimum": 1},
            "failures": {"type": "integer"},
            "limit_percent": {"type": "number"},
            "stability_index": {"type": "number", "minimum": 0, "maximum": 100},
            "failure_risk": {"type": "number", "minimum": 0, "maximum": 100},
            "mean_max_drop_percent": {"type": "number"},
            "p95_max_drop_percent": {"type": "number"},
            "histogram": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "lower": {"type": "number"},
                        "upper": {"type": "number"},
                        "count": {"type": "integer"}
                    },
                    "required": ["lower", "upper", "count"]
                }
            }
        },
        "required": ["iterations", "stability_index", "failure_risk", "histogram"]
    })
}

fn optimization_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "OptimizationReport",
        "type": "object",
        "properties": {
            "iterations": {"type": "integer"},
            "converged": {"type": "boolean"},
            "nodes": {"type": "array", "items": {"type": "object"}},
            "upgrades": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "node_id": {"type": "string"},
                        "from": {"type": "string"},
                        "to": {"type": "string"},
                        "iteration": {"type": "integer"}
                    },
                    "required": ["node_id", "from", "to", "iteration"]
                }
            }
        },
        "required": ["iterations", "converged", "nodes", "upgrades"]
    })
}

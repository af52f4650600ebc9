//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Load flow, conductor sizing and risk estimation for radial LV networks."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
//! Deterministic engine for radial low-voltage distribution trees.
//!
//! Every entry point is a pure function of its inputs and the [`EngineSettings`]:
//! nothing is cached between calls and the caller's points are never mutated.
//! [`Engine::calculate`] runs validation, demand aggregation, physics propagation
//! and KPI assembly once; [`Engine::optimize`] and [`Engine::run_monte_carlo`]
//! drive the same passes repeatedly over mutated copies.

pub mod api;
pub mod demand;
pub mod errors;
pub mod io;
pub mod kpi;
pub mod model;
pub mod monte_carlo;
pub mod optimizer;
pub mod physics;
pub mod reports;
pub mod settings;
pub mod topology;
pub mod validation;
pub mod warnings;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::{
    demand::{aggregate, DemandPass, NodeDemand},
    kpi::{
        assemble_distributed_generation, assemble_kpis, assemble_sustainability,
        DistributedGeneration, NetworkKpis, Sustainability,
    },
    model::{Catalogs, NetworkPoint, ScenarioParams},
    monte_carlo::RiskSummary,
    optimizer::OptimizationOutcome,
    physics::{propagate, NodePhysics, PhysicsPass},
    reports::ReportExporter,
    settings::ValidationPolicy,
    topology::Topology,
    validation::{validate_with_topology, IssueKind, ValidationReport},
    warnings::{Warning, WarningKind, WarningLog},
};

pub use errors::{CalcEngineError, Result};
pub use settings::{EngineConstants, EngineSettings};

/// Annotated copy of an input point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub point: NetworkPoint,
    /// Reachable from the source; detached points carry no propagated values.
    pub attached: bool,
    pub demand: NodeDemand,
    pub physics: NodePhysics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub scenario_id: String,
    pub nodes: Vec<NodeResult>,
    pub kpis: NetworkKpis,
    pub sustainability: Sustainability,
    pub distributed_generation: DistributedGeneration,
    pub warnings: Vec<Warning>,
    pub validation: ValidationReport,
    #[serde(default)]
    pub risk: Option<RiskSummary>,
}

impl CalculationResult {
    pub fn node(&self, id: &str) -> Option<&NodeResult> {
        self.nodes.iter().find(|node| node.point.id == id)
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub fn exporter(&self) -> ReportExporter<'_> {
        ReportExporter::new(self)
    }
}

/// Entry point carrying the constants and policies used by every pass.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn validate(
        &self,
        nodes: &[NetworkPoint],
        params: &ScenarioParams,
        catalogs: &Catalogs,
    ) -> ValidationReport {
        let topology = Topology::build(nodes, &self.settings.constants.source_id);
        validate_with_topology(nodes, &topology, params, catalogs)
    }

    pub fn calculate(
        &self,
        scenario_id: &str,
        nodes: &[NetworkPoint],
        params: &ScenarioParams,
        catalogs: &Catalogs,
    ) -> Result<CalculationResult> {
        let _span = info_span!("calculate", scenario = scenario_id).entered();
        let (topology, report) = self.prepare(nodes, params, catalogs)?;

        let mut warnings = WarningLog::new(&self.settings.warnings);
        if self.settings.validation == ValidationPolicy::Lenient {
            for issue in report.errors() {
                warnings.push(
                    WarningKind::Configuration(issue.kind),
                    issue.node_id.as_deref(),
                    issue.detail.clone(),
                );
            }
        }

        let (demand, physics) = self.run_passes(nodes, &topology, params, catalogs, &mut warnings);
        let constants = &self.settings.constants;
        let kpis = assemble_kpis(params, &demand, &physics);
        let sustainability = assemble_sustainability(&physics, constants);
        let distributed_generation = assemble_distributed_generation(&demand, &physics, constants);

        let node_results = nodes
            .iter()
            .enumerate()
            .map(|(idx, point)| NodeResult {
                point: point.clone(),
                attached: topology.is_attached(idx),
                demand: demand.nodes[idx],
                physics: physics.nodes[idx],
            })
            .collect();

        info!(
            nodes = nodes.len(),
            total_load_kva = kpis.total_load_kva,
            occupancy = kpis.transformer_occupancy_percent,
            max_drop = kpis.max_voltage_drop_percent,
            warnings = warnings.len(),
            "calculation completed"
        );

        Ok(CalculationResult {
            scenario_id: scenario_id.to_owned(),
            nodes: node_results,
            kpis,
            sustainability,
            distributed_generation,
            warnings: warnings.into_vec(),
            validation: report,
            risk: None,
        })
    }

    /// Runs [`Engine::calculate`] and attaches a Monte Carlo risk bundle.
    pub fn calculate_with_risk(
        &self,
        scenario_id: &str,
        nodes: &[NetworkPoint],
        params: &ScenarioParams,
        catalogs: &Catalogs,
        iterations: usize,
    ) -> Result<CalculationResult> {
        let mut result = self.calculate(scenario_id, nodes, params, catalogs)?;
        result.risk = Some(self.run_monte_carlo(nodes, params, catalogs, iterations)?);
        Ok(result)
    }

    /// Upgrades undersized conductors and returns the mutated topology.
    pub fn optimize(
        &self,
        scenario_id: &str,
        nodes: &[NetworkPoint],
        params: &ScenarioParams,
        catalogs: &Catalogs,
    ) -> Result<Vec<NetworkPoint>> {
        Ok(self
            .optimize_with_report(scenario_id, nodes, params, catalogs)?
            .nodes)
    }

    pub fn optimize_with_report(
        &self,
        scenario_id: &str,
        nodes: &[NetworkPoint],
        params: &ScenarioParams,
        catalogs: &Catalogs,
    ) -> Result<OptimizationOutcome> {
        let _span = info_span!("optimize", scenario = scenario_id).entered();
        let (topology, _) = self.prepare(nodes, params, catalogs)?;
        Ok(optimizer::optimize(self, nodes, &topology, params, catalogs))
    }

    pub fn run_monte_carlo(
        &self,
        nodes: &[NetworkPoint],
        params: &ScenarioParams,
        catalogs: &Catalogs,
        iterations: usize,
    ) -> Result<RiskSummary> {
        if iterations == 0 {
            return Err(CalcEngineError::InvalidIterations);
        }
        let _span = info_span!("monte_carlo", iterations).entered();
        let (topology, _) = self.prepare(nodes, params, catalogs)?;
        Ok(monte_carlo::simulate(
            self, nodes, &topology, params, catalogs, iterations,
        ))
    }

    /// Builds the arena and applies the validation policy.
    fn prepare(
        &self,
        nodes: &[NetworkPoint],
        params: &ScenarioParams,
        catalogs: &Catalogs,
    ) -> Result<(Topology, ValidationReport)> {
        let topology = Topology::build(nodes, &self.settings.constants.source_id);
        let report = validate_with_topology(nodes, &topology, params, catalogs);
        if self.settings.validation == ValidationPolicy::Strict && !report.is_ok() {
            let only_missing_source = report
                .errors()
                .all(|issue| issue.kind == IssueKind::MissingSource);
            if only_missing_source {
                return Err(CalcEngineError::MissingSource);
            }
            return Err(CalcEngineError::InvalidInput(report));
        }
        Ok((topology, report))
    }

    pub(crate) fn run_passes(
        &self,
        nodes: &[NetworkPoint],
        topology: &Topology,
        params: &ScenarioParams,
        catalogs: &Catalogs,
        warnings: &mut WarningLog<'_>,
    ) -> (DemandPass, PhysicsPass) {
        let demand = aggregate(nodes, topology, params, catalogs, &self.settings.constants);
        let physics = propagate(nodes, topology, &demand, catalogs, &self.settings, warnings);
        (demand, physics)
    }
}

/// [`Engine::calculate`] with default settings.
pub fn calculate(
    scenario_id: &str,
    nodes: &[NetworkPoint],
    params: &ScenarioParams,
    catalogs: &Catalogs,
) -> Result<CalculationResult> {
    Engine::default().calculate(scenario_id, nodes, params, catalogs)
}

/// [`Engine::optimize`] with default settings.
pub fn optimize(
    scenario_id: &str,
    nodes: &[NetworkPoint],
    params: &ScenarioParams,
    catalogs: &Catalogs,
) -> Result<Vec<NetworkPoint>> {
    Engine::default().optimize(scenario_id, nodes, params, catalogs)
}

/// [`Engine::run_monte_carlo`] with default settings.
pub fn run_monte_carlo(
    nodes: &[NetworkPoint],
    params: &ScenarioParams,
    catalogs: &Catalogs,
    iterations: usize,
) -> Result<RiskSummary> {
    Engine::default().run_monte_carlo(nodes, params, catalogs, iterations)
}

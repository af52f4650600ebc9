//! ---
//! lvnet_section: "05-external-interfaces"
//! lvnet_subsection: "binary"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Subcommand implementations for the lvnet control CLI."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use lvnet_common::AppConfig;
use lvnet_engine::{
    io::{load_scenario_from_file, load_scenario_with_catalogs, ScenarioBundle},
    reports::export_optimization,
    settings::ValidationPolicy,
    CalculationResult, Engine,
};
use serde::Serialize;

/// Inputs shared by every subcommand.
#[derive(Debug, Args)]
pub struct ScenarioArgs {
    /// Scenario file (JSON or YAML).
    #[arg(long, short = 's', value_name = "FILE")]
    scenario: PathBuf,

    /// Catalog file replacing the catalogs embedded in the scenario.
    #[arg(long, value_name = "FILE")]
    catalogs: Option<PathBuf>,

    /// Treat unresolved references as zero instead of rejecting the scenario.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    lenient: bool,

    /// Print the full result as JSON instead of a summary.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

impl ScenarioArgs {
    fn load(&self) -> Result<ScenarioBundle> {
        let bundle = match &self.catalogs {
            Some(catalogs) => load_scenario_with_catalogs(&self.scenario, catalogs),
            None => load_scenario_from_file(&self.scenario),
        };
        bundle.with_context(|| format!("loading scenario {}", self.scenario.display()))
    }

    fn engine(&self, config: &AppConfig) -> Engine {
        let mut settings = config.engine_settings();
        if self.lenient {
            settings.validation = ValidationPolicy::Lenient;
        }
        Engine::new(settings)
    }
}

#[derive(Debug, Args)]
pub struct CalculateCommand {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Attach a Monte Carlo risk bundle with this many iterations.
    #[arg(long, value_name = "N")]
    risk: Option<usize>,

    /// Report directory (defaults to `[reports].directory`).
    #[arg(long, short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,

    /// Skip writing report files.
    #[arg(long = "no-reports", action = clap::ArgAction::SetTrue)]
    no_reports: bool,
}

impl CalculateCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let bundle = self.scenario.load()?;
        let engine = self.scenario.engine(config);
        let result = match self.risk {
            Some(iterations) => engine.calculate_with_risk(
                &bundle.scenario_id,
                &bundle.nodes,
                &bundle.params,
                &bundle.catalogs,
                iterations,
            ),
            None => engine.calculate(
                &bundle.scenario_id,
                &bundle.nodes,
                &bundle.params,
                &bundle.catalogs,
            ),
        }
        .with_context(|| format!("calculating scenario {}", bundle.scenario_id))?;

        if !self.no_reports {
            let dir = self
                .output
                .clone()
                .unwrap_or_else(|| config.reports.directory.clone());
            let written = result.exporter().export_all(&dir)?;
            for path in written {
                eprintln!("report written: {}", path.display());
            }
        }

        if self.scenario.json {
            print_json(&result)
        } else {
            print_summary(&result);
            Ok(())
        }
    }
}

#[derive(Debug, Args)]
pub struct OptimizeCommand {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Write the scenario with upgraded conductors to this file (JSON).
    #[arg(long = "write-scenario", value_name = "FILE")]
    write_scenario: Option<PathBuf>,

    /// Report directory (defaults to `[reports].directory`).
    #[arg(long, short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,
}

impl OptimizeCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let mut bundle = self.scenario.load()?;
        let engine = self.scenario.engine(config);
        let outcome = engine
            .optimize_with_report(
                &bundle.scenario_id,
                &bundle.nodes,
                &bundle.params,
                &bundle.catalogs,
            )
            .with_context(|| format!("optimizing scenario {}", bundle.scenario_id))?;

        let dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.reports.directory.clone());
        let path = export_optimization(&bundle.scenario_id, &outcome, &dir)?;
        eprintln!("report written: {}", path.display());

        if let Some(target) = &self.write_scenario {
            bundle.nodes = outcome.nodes.clone();
            let serialized = serde_json::to_string_pretty(&bundle)?;
            fs::write(target, serialized)
                .with_context(|| format!("writing scenario {}", target.display()))?;
        }

        if self.scenario.json {
            return print_json(&outcome);
        }
        println!(
            "{} upgrade(s) over {} iteration(s), converged: {}",
            outcome.upgrades.len(),
            outcome.iterations,
            outcome.converged
        );
        for upgrade in &outcome.upgrades {
            println!(
                "  [{}] {}: {} -> {}",
                upgrade.iteration, upgrade.node_id, upgrade.from, upgrade.to
            );
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct MonteCarloCommand {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Trial count (defaults to `[monte_carlo].iterations`).
    #[arg(long, short = 'n', value_name = "N")]
    iterations: Option<usize>,

    /// Base seed; trial i uses seed + i.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

impl MonteCarloCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let bundle = self.scenario.load()?;
        let mut engine = self.scenario.engine(config);
        if let Some(seed) = self.seed {
            let mut settings = engine.settings().clone();
            settings.constants.monte_carlo_seed = seed;
            engine = Engine::new(settings);
        }
        let iterations = self.iterations.unwrap_or(config.monte_carlo.iterations);
        let risk = engine
            .run_monte_carlo(&bundle.nodes, &bundle.params, &bundle.catalogs, iterations)
            .with_context(|| format!("simulating scenario {}", bundle.scenario_id))?;

        if self.scenario.json {
            return print_json(&risk);
        }
        println!("iterations:        {}", risk.iterations);
        println!(
            "stability index:   {:.1}% (limit {:.2}%)",
            risk.stability_index, risk.limit_percent
        );
        println!("failure risk:      {:.1}%", risk.failure_risk);
        println!("mean max drop:     {:.3}%", risk.mean_max_drop_percent);
        println!("p95 max drop:      {:.3}%", risk.p95_max_drop_percent);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct ValidateCommand {
    #[command(flatten)]
    scenario: ScenarioArgs,
}

impl ValidateCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let bundle = self.scenario.load()?;
        let engine = self.scenario.engine(config);
        let report = engine.validate(&bundle.nodes, &bundle.params, &bundle.catalogs);

        if self.scenario.json {
            print_json(&report)?;
        } else {
            for issue in &report.issues {
                println!(
                    "{:?} {:?} {}: {}",
                    issue.kind.severity(),
                    issue.kind,
                    issue.node_id.as_deref().unwrap_or("-"),
                    issue.detail
                );
            }
        }

        if report.is_ok() {
            Ok(())
        } else {
            Err(anyhow!("scenario {} is invalid: {}", bundle.scenario_id, report))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(result: &CalculationResult) {
    let kpis = &result.kpis;
    println!("scenario:            {}", result.scenario_id);
    println!(
        "demand class:        {} (factor {:.2})",
        kpis.demand_class, kpis.diversification_factor
    );
    println!("total load:          {:.2} kVA", kpis.total_load_kva);
    println!(
        "transformer load:    {:.1}%",
        kpis.transformer_occupancy_percent
    );
    println!("max voltage drop:    {:.2}%", kpis.max_voltage_drop_percent);
    println!("customers:           {}", kpis.total_customers);
    println!(
        "annual losses:       {:.0} kWh ({:.2} cost)",
        result.sustainability.annual_energy_loss_kwh, result.sustainability.annual_financial_loss
    );
    if result.distributed_generation.installed_kva > 0.0 {
        println!(
            "solar:               {:.1} kVA, max rise {:.2}%, reverse flow: {}",
            result.distributed_generation.installed_kva,
            result.distributed_generation.max_voltage_rise_percent,
            result.distributed_generation.reverse_flow
        );
    }
    if let Some(risk) = &result.risk {
        println!(
            "stability index:     {:.1}% over {} trials",
            risk.stability_index, risk.iterations
        );
    }
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
}

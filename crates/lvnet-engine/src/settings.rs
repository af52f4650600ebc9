//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Physical and economic constants plus engine policies."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::warnings::WarningPolicy;

fn default_source_id() -> String {
    "TRAFO".to_owned()
}

fn default_line_voltage_kv() -> f64 {
    0.380
}

fn default_drop_scale() -> f64 {
    0.5
}

fn default_solar_netting_share() -> f64 {
    0.5
}

fn default_day_load_factor() -> f64 {
    0.30
}

fn default_solar_rise_limit_percent() -> f64 {
    5.0
}

fn default_load_loss_factor() -> f64 {
    0.25
}

fn default_hours_per_year() -> f64 {
    8760.0
}

fn default_energy_price_per_kwh() -> f64 {
    0.85
}

fn default_co2_kg_per_kwh() -> f64 {
    0.0817
}

fn default_mitigation_rate() -> f64 {
    0.35
}

fn default_projection_years() -> u32 {
    10
}

fn default_co2_kg_per_tree() -> f64 {
    163.0
}

fn default_max_optimizer_iterations() -> usize {
    10
}

fn default_monte_carlo_seed() -> u64 {
    0xA11CEu64
}

fn default_residence_spread() -> (f64, f64) {
    (0.85, 1.15)
}

fn default_point_load_spread() -> (f64, f64) {
    (0.90, 1.10)
}

fn default_solar_spread() -> (f64, f64) {
    (0.95, 1.05)
}

/// Fixed constants used by every pass. Defaults reproduce the reference figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConstants {
    /// Reserved identifier of the feeding transformer.
    #[serde(default = "default_source_id")]
    pub source_id: String,
    #[serde(default = "default_line_voltage_kv")]
    pub line_voltage_kv: f64,
    #[serde(default = "default_drop_scale")]
    pub drop_scale: f64,
    #[serde(default = "default_solar_netting_share")]
    pub solar_netting_share: f64,
    #[serde(default = "default_day_load_factor")]
    pub day_load_factor: f64,
    #[serde(default = "default_solar_rise_limit_percent")]
    pub solar_rise_limit_percent: f64,
    #[serde(default = "default_load_loss_factor")]
    pub load_loss_factor: f64,
    #[serde(default = "default_hours_per_year")]
    pub hours_per_year: f64,
    #[serde(default = "default_energy_price_per_kwh")]
    pub energy_price_per_kwh: f64,
    #[serde(default = "default_co2_kg_per_kwh")]
    pub co2_kg_per_kwh: f64,
    #[serde(default = "default_mitigation_rate")]
    pub mitigation_rate: f64,
    #[serde(default = "default_projection_years")]
    pub projection_years: u32,
    #[serde(default = "default_co2_kg_per_tree")]
    pub co2_kg_per_tree: f64,
    #[serde(default = "default_max_optimizer_iterations")]
    pub max_optimizer_iterations: usize,
    #[serde(default = "default_monte_carlo_seed")]
    pub monte_carlo_seed: u64,
    #[serde(default = "default_residence_spread")]
    pub residence_spread: (f64, f64),
    #[serde(default = "default_point_load_spread")]
    pub point_load_spread: (f64, f64),
    #[serde(default = "default_solar_spread")]
    pub solar_spread: (f64, f64),
}

impl EngineConstants {
    /// Three-phase divisor `√3 × U`, in kV.
    pub fn phase_divisor(&self) -> f64 {
        3f64.sqrt() * self.line_voltage_kv
    }

    pub fn current_for_kva(&self, kva: f64) -> f64 {
        let divisor = self.phase_divisor();
        if divisor == 0.0 {
            return 0.0;
        }
        kva / divisor
    }
}

impl Default for EngineConstants {
    fn default() -> Self {
        Self {
            source_id: default_source_id(),
            line_voltage_kv: default_line_voltage_kv(),
            drop_scale: default_drop_scale(),
            solar_netting_share: default_solar_netting_share(),
            day_load_factor: default_day_load_factor(),
            solar_rise_limit_percent: default_solar_rise_limit_percent(),
            load_loss_factor: default_load_loss_factor(),
            hours_per_year: default_hours_per_year(),
            energy_price_per_kwh: default_energy_price_per_kwh(),
            co2_kg_per_kwh: default_co2_kg_per_kwh(),
            mitigation_rate: default_mitigation_rate(),
            projection_years: default_projection_years(),
            co2_kg_per_tree: default_co2_kg_per_tree(),
            max_optimizer_iterations: default_max_optimizer_iterations(),
            monte_carlo_seed: default_monte_carlo_seed(),
            residence_spread: default_residence_spread(),
            point_load_spread: default_point_load_spread(),
            solar_spread: default_solar_spread(),
        }
    }
}

/// How unresolved references and malformed topologies are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Abort before any physics pass.
    #[default]
    Strict,
    /// Read absent entries as zero and report each issue as a warning.
    Lenient,
}

/// Share of public lighting removed from daytime demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LightingApportionment {
    /// Network total lighting divided evenly over every input point.
    #[default]
    NetworkEven,
    /// The node's own accumulated subtree lighting.
    Subtree,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub constants: EngineConstants,
    #[serde(default)]
    pub validation: ValidationPolicy,
    #[serde(default)]
    pub warnings: WarningPolicy,
    #[serde(default)]
    pub lighting: LightingApportionment,
}

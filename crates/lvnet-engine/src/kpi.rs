//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Scenario KPIs, sustainability projection and distributed-generation impact."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::{
    demand::DemandPass, model::DemandClass, model::ScenarioParams, physics::PhysicsPass,
    settings::EngineConstants,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkKpis {
    pub total_load_kva: f64,
    pub diversified_load_kva: f64,
    pub point_load_kva: f64,
    pub lighting_load_kva: f64,
    pub transformer_occupancy_percent: f64,
    pub max_voltage_drop_percent: f64,
    pub total_customers: u64,
    pub demand_class: DemandClass,
    pub diversification_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sustainability {
    pub annual_energy_loss_kwh: f64,
    pub annual_financial_loss: f64,
    pub annual_co2_kg: f64,
    pub projected_savings: f64,
    pub projected_co2_prevented_kg: f64,
    pub trees_equivalent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributedGeneration {
    pub installed_kva: f64,
    pub installed_units: u64,
    pub max_voltage_rise_percent: f64,
    pub reverse_flow: bool,
    pub max_reverse_current_a: f64,
    pub self_consumption_percent: f64,
}

pub fn assemble_kpis(
    params: &ScenarioParams,
    demand: &DemandPass,
    physics: &PhysicsPass,
) -> NetworkKpis {
    let totals = &demand.totals;
    let transformer_occupancy_percent = if params.transformer_kva > 0.0 {
        totals.load_kva / params.transformer_kva * 100.0
    } else {
        0.0
    };
    NetworkKpis {
        total_load_kva: totals.load_kva,
        diversified_load_kva: totals.diversified_kva,
        point_load_kva: totals.point_kva,
        lighting_load_kva: totals.lighting_kva,
        transformer_occupancy_percent,
        max_voltage_drop_percent: physics.max_voltage_drop_percent,
        total_customers: totals.customers,
        demand_class: demand.class,
        diversification_factor: demand.factor,
    }
}

pub fn assemble_sustainability(
    physics: &PhysicsPass,
    constants: &EngineConstants,
) -> Sustainability {
    let annual_energy_loss_kwh =
        physics.total_loss_w / 1000.0 * constants.hours_per_year * constants.load_loss_factor;
    let annual_financial_loss = annual_energy_loss_kwh * constants.energy_price_per_kwh;
    let annual_co2_kg = annual_energy_loss_kwh * constants.co2_kg_per_kwh;

    let horizon = constants.projection_years as f64 * constants.mitigation_rate;
    let projected_savings = annual_financial_loss * horizon;
    let projected_co2_prevented_kg = annual_co2_kg * horizon;
    let trees_equivalent = if constants.co2_kg_per_tree > 0.0 {
        projected_co2_prevented_kg / constants.co2_kg_per_tree
    } else {
        0.0
    };

    Sustainability {
        annual_energy_loss_kwh,
        annual_financial_loss,
        annual_co2_kg,
        projected_savings,
        projected_co2_prevented_kg,
        trees_equivalent,
    }
}

pub fn assemble_distributed_generation(
    demand: &DemandPass,
    physics: &PhysicsPass,
    constants: &EngineConstants,
) -> DistributedGeneration {
    let totals = &demand.totals;
    let day_demand_kva =
        ((totals.load_kva - totals.lighting_kva) * constants.day_load_factor).max(0.0);
    let self_consumption_percent = if totals.solar_kva > 0.0 {
        (day_demand_kva / totals.solar_kva * 100.0).min(100.0)
    } else {
        0.0
    };
    DistributedGeneration {
        installed_kva: totals.solar_kva,
        installed_units: totals.solar_units,
        max_voltage_rise_percent: physics.max_solar_rise_percent,
        reverse_flow: physics.reverse_flow,
        max_reverse_current_a: physics.max_reverse_current_a,
        self_consumption_percent,
    }
}

//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Top-down current, voltage drop, solar rise and loss propagation."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
//! Voltage drop and solar rise accumulate from the source outwards: every attached
//! point adds its own segment contribution to the value inherited from its parent,
//! so both are non-decreasing along any root-to-leaf path.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    demand::DemandPass,
    model::{Catalogs, ConductorSpec, NetworkPoint},
    settings::{EngineSettings, LightingApportionment},
    topology::Topology,
    warnings::{WarningKind, WarningLog},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePhysics {
    /// Night (peak) current through the segment feeding this point.
    pub current_a: f64,
    pub segment_drop_percent: f64,
    pub voltage_drop_percent: f64,
    pub solar_rise_percent: f64,
    pub day_demand_kva: f64,
    /// Daytime demand minus subtree solar; negative when the subtree injects.
    pub net_day_kva: f64,
    pub net_day_current_a: f64,
    pub thermal_loss_w: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsPass {
    pub nodes: Vec<NodePhysics>,
    pub total_loss_w: f64,
    pub max_voltage_drop_percent: f64,
    pub max_solar_rise_percent: f64,
    pub reverse_flow: bool,
    pub max_reverse_current_a: f64,
}

pub fn propagate(
    points: &[NetworkPoint],
    topology: &Topology,
    demand: &DemandPass,
    catalogs: &Catalogs,
    settings: &EngineSettings,
    warnings: &mut WarningLog<'_>,
) -> PhysicsPass {
    let constants = &settings.constants;
    let even_lighting_share = if points.is_empty() {
        0.0
    } else {
        demand.totals.lighting_kva / points.len() as f64
    };

    let mut pass = PhysicsPass {
        nodes: vec![NodePhysics::default(); points.len()],
        ..PhysicsPass::default()
    };

    for &idx in topology.pre_order() {
        let Some(parent) = topology.parent(idx) else {
            // The source carries no segment of its own.
            continue;
        };
        let point = &points[idx];
        let node_demand = &demand.nodes[idx];
        let inherited = pass.nodes[parent];

        let resolved = catalogs.conductor(&point.conductor);
        let conductor = resolved.copied().unwrap_or(ConductorSpec::UNRESOLVED);
        let span_hm = point.span_m / 100.0;
        let load_kva = node_demand.accumulated_load_kva;
        let solar_kva = node_demand.accumulated_solar_kva;

        let current_a = constants.current_for_kva(load_kva);
        if resolved.is_some() && current_a > conductor.ampacity_a {
            warnings.push(
                WarningKind::ThermalOverload,
                Some(&point.id),
                format!(
                    "Thermal overload at {}: {:.1} A exceeds ampacity {:.1} A",
                    point.id, current_a, conductor.ampacity_a
                ),
            );
        }

        let segment_drop_percent =
            load_kva * span_hm * conductor.drop_coefficient * constants.drop_scale;
        let voltage_drop_percent = inherited.voltage_drop_percent + segment_drop_percent;

        let lighting_share = match settings.lighting {
            LightingApportionment::NetworkEven => even_lighting_share,
            LightingApportionment::Subtree => node_demand.accumulated_lighting_kva,
        };
        let day_demand_kva = (load_kva - lighting_share) * constants.day_load_factor;
        let net_day_kva = day_demand_kva - solar_kva;
        let net_day_current_a = constants.current_for_kva(net_day_kva);

        if net_day_current_a < 0.0 {
            pass.reverse_flow = true;
            pass.max_reverse_current_a = pass.max_reverse_current_a.max(net_day_current_a.abs());
            warnings.push(
                WarningKind::ReverseFlow,
                Some(&point.id),
                "Reverse power flow detected: distributed generation exceeds daytime demand"
                    .to_owned(),
            );
        }

        let segment_rise = net_day_kva.min(0.0).abs()
            * span_hm
            * conductor.drop_coefficient
            * constants.drop_scale;
        let solar_rise_percent = inherited.solar_rise_percent + segment_rise;
        if solar_rise_percent > constants.solar_rise_limit_percent {
            warnings.push(
                WarningKind::SolarVoltageRise,
                Some(&point.id),
                format!(
                    "Solar voltage rise at {}: {:.2}% exceeds {:.1}% limit",
                    point.id, solar_rise_percent, constants.solar_rise_limit_percent
                ),
            );
        }

        let thermal_loss_w =
            3.0 * conductor.resistance_ohm_per_km * (point.span_m / 1000.0) * current_a.powi(2);

        pass.total_loss_w += thermal_loss_w;
        pass.max_voltage_drop_percent = pass.max_voltage_drop_percent.max(voltage_drop_percent);
        pass.max_solar_rise_percent = pass.max_solar_rise_percent.max(solar_rise_percent);
        pass.nodes[idx] = NodePhysics {
            current_a,
            segment_drop_percent,
            voltage_drop_percent,
            solar_rise_percent,
            day_demand_kva,
            net_day_kva,
            net_day_current_a,
            thermal_loss_w,
        };
    }

    debug!(
        losses_w = pass.total_loss_w,
        max_drop = pass.max_voltage_drop_percent,
        max_rise = pass.max_solar_rise_percent,
        reverse_flow = pass.reverse_flow,
        "physics propagated"
    );

    pass
}

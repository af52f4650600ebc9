//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Bottom-up diversified and solar demand aggregation."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    model::{Catalogs, DemandClass, NetworkPoint, ScenarioParams},
    settings::EngineConstants,
    topology::Topology,
};

/// Demand of a single point, own and accumulated over its subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDemand {
    pub residences: u64,
    pub diversified_kva: f64,
    pub lighting_kva: f64,
    pub point_kva: f64,
    /// Thermal demand after optional solar netting (qt-load).
    pub own_load_kva: f64,
    pub solar_kva: f64,
    pub accumulated_load_kva: f64,
    pub accumulated_solar_kva: f64,
    pub accumulated_lighting_kva: f64,
}

/// Network-wide sums over every input point, attached or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandTotals {
    pub residences: u64,
    pub customers: u64,
    pub diversified_kva: f64,
    pub lighting_kva: f64,
    pub point_kva: f64,
    pub load_kva: f64,
    pub solar_kva: f64,
    pub solar_units: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandPass {
    pub class: DemandClass,
    pub factor: f64,
    pub nodes: Vec<NodeDemand>,
    pub totals: DemandTotals,
}

/// Per-residence kVA factor for the network's total residence count.
pub fn resolve_factor(
    points: &[NetworkPoint],
    params: &ScenarioParams,
    catalogs: &Catalogs,
) -> (DemandClass, f64) {
    let total_residences: u64 = points.iter().map(|p| p.load.residences.total()).sum();
    let table = catalogs.demand_tables.get(&params.demand_table);
    let class = params.active_class(table);
    let factor = table
        .and_then(|t| t.row_for(total_residences))
        .map(|row| row.factors.get(class))
        .unwrap_or(0.0);
    (class, factor)
}

pub fn aggregate(
    points: &[NetworkPoint],
    topology: &Topology,
    params: &ScenarioParams,
    catalogs: &Catalogs,
    constants: &EngineConstants,
) -> DemandPass {
    let (class, factor) = resolve_factor(points, params, catalogs);
    let mut totals = DemandTotals::default();

    let mut nodes: Vec<NodeDemand> = points
        .iter()
        .map(|point| {
            let load = &point.load;
            let residences = load.residences.total();
            let diversified_kva = residences as f64 * factor;
            let lighting_kva = load
                .lighting
                .as_ref()
                .map(|l| l.count as f64 * catalogs.fixture_kva(&l.fixture).unwrap_or(0.0))
                .unwrap_or(0.0);
            let point_kva = load.point_load_kva;
            let solar_kva = load.solar_kva();

            let mut own_load_kva = diversified_kva + lighting_kva + point_kva;
            if params.net_solar_for_thermal {
                own_load_kva -= solar_kva * constants.solar_netting_share;
            }

            totals.residences += residences;
            totals.customers += load.customers();
            totals.diversified_kva += diversified_kva;
            totals.lighting_kva += lighting_kva;
            totals.point_kva += point_kva;
            totals.load_kva += own_load_kva;
            totals.solar_kva += solar_kva;
            totals.solar_units += load.solar.as_ref().map(|s| u64::from(s.units)).unwrap_or(0);

            NodeDemand {
                residences,
                diversified_kva,
                lighting_kva,
                point_kva,
                own_load_kva,
                solar_kva,
                ..NodeDemand::default()
            }
        })
        .collect();

    for &idx in topology.pre_order() {
        let node = &mut nodes[idx];
        node.accumulated_load_kva = node.own_load_kva;
        node.accumulated_solar_kva = node.solar_kva;
        node.accumulated_lighting_kva = node.lighting_kva;
    }

    for idx in topology.post_order() {
        if let Some(parent) = topology.parent(idx) {
            let child = nodes[idx];
            let parent = &mut nodes[parent];
            parent.accumulated_load_kva += child.accumulated_load_kva;
            parent.accumulated_solar_kva += child.accumulated_solar_kva;
            parent.accumulated_lighting_kva += child.accumulated_lighting_kva;
        }
    }

    debug!(
        class = %class,
        factor,
        residences = totals.residences,
        load_kva = totals.load_kva,
        "demand aggregated"
    );

    DemandPass {
        class,
        factor,
        nodes,
        totals,
    }
}

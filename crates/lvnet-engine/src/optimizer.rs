//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Iterative conductor upgrades under thermal and voltage constraints."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
//! Each pass recomputes the network, then moves every violating span one step up
//! the ampacity ladder. A conductor's rank never decreases and is bounded by the
//! catalog size, and the pass count is capped, so the loop always terminates.
//! Violations left when the cap is reached are returned as-is.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    model::{Catalogs, NetworkPoint, ScenarioParams},
    topology::Topology,
    warnings::WarningLog,
    Engine,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConductorUpgrade {
    pub node_id: String,
    pub from: String,
    pub to: String,
    pub iteration: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub nodes: Vec<NetworkPoint>,
    pub iterations: usize,
    /// The last pass found no violating span.
    pub converged: bool,
    pub upgrades: Vec<ConductorUpgrade>,
}

pub(crate) fn optimize(
    engine: &Engine,
    points: &[NetworkPoint],
    topology: &Topology,
    params: &ScenarioParams,
    catalogs: &Catalogs,
) -> OptimizationOutcome {
    let settings = engine.settings();
    let constants = &settings.constants;
    let ladder = catalogs.conductors_by_ampacity();
    let max_drop = params.profile.max_voltage_drop_percent;

    let mut nodes = points.to_vec();
    let mut upgrades = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < constants.max_optimizer_iterations {
        iterations += 1;
        let mut log = WarningLog::quiet(&settings.warnings);
        let (_, physics) = engine.run_passes(&nodes, topology, params, catalogs, &mut log);

        let mut violations = 0usize;
        let mut changed = false;
        for &idx in topology.pre_order() {
            if topology.parent(idx).is_none() {
                continue;
            }
            let state = physics.nodes[idx];
            let ampacity = catalogs
                .conductor(&nodes[idx].conductor)
                .map(|spec| spec.ampacity_a)
                .unwrap_or(0.0);
            let violates = state.current_a > ampacity
                || state.voltage_drop_percent > max_drop
                || state.solar_rise_percent > constants.solar_rise_limit_percent;
            if !violates {
                continue;
            }
            violations += 1;

            let next_rank = ladder
                .iter()
                .position(|key| *key == nodes[idx].conductor)
                .map(|rank| rank + 1)
                .unwrap_or(0);
            if let Some(next) = ladder.get(next_rank) {
                let node = &mut nodes[idx];
                debug!(node = %node.id, from = %node.conductor, to = %next, iteration = iterations, "conductor upgraded");
                upgrades.push(ConductorUpgrade {
                    node_id: node.id.clone(),
                    from: std::mem::replace(&mut node.conductor, next.clone()),
                    to: next.clone(),
                    iteration: iterations,
                });
                changed = true;
            }
        }

        if violations == 0 {
            converged = true;
        }
        if !changed {
            break;
        }
    }

    info!(
        iterations,
        converged,
        upgrades = upgrades.len(),
        "conductor optimization finished"
    );

    OptimizationOutcome {
        nodes,
        iterations,
        converged,
        upgrades,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            Catalogs, ConductorSpec, DemandClass, DemandFactors, DemandTable, DemandTableRow,
            LoadProfile, NetworkPoint, PointLoad, ScenarioParams, SolarInstallation,
        },
        Engine,
    };

    fn catalogs() -> Catalogs {
        let mut catalogs = Catalogs::default();
        for (key, r, k, amp) in [
            ("4AWG", 1.6, 0.30, 60.0),
            ("1/0AWG", 0.6, 0.15, 140.0),
            ("2AWG", 1.0, 0.22, 90.0),
            ("4/0AWG", 0.3, 0.08, 250.0),
        ] {
            catalogs.conductors.insert(
                key.into(),
                ConductorSpec {
                    resistance_ohm_per_km: r,
                    reactance_ohm_per_km: 0.1,
                    drop_coefficient: k,
                    ampacity_a: amp,
                },
            );
        }
        catalogs.demand_tables.insert(
            "T".into(),
            DemandTable {
                rows: vec![DemandTableRow {
                    min_residences: 0,
                    max_residences: 500,
                    factors: DemandFactors { a: 1.0, b: 1.5, c: 2.0, d: 2.5 },
                }],
                default_class: DemandClass::B,
            },
        );
        catalogs
    }

    fn params() -> ScenarioParams {
        ScenarioParams {
            transformer_kva: 112.5,
            profile: LoadProfile {
                name: "urban".into(),
                max_voltage_drop_percent: 5.0,
                max_thermal_percent: 100.0,
            },
            class_mode: Default::default(),
            manual_class: DemandClass::B,
            demand_table: "T".into(),
            net_solar_for_thermal: false,
        }
    }

    fn feeder() -> Vec<NetworkPoint> {
        vec![
            NetworkPoint::new("TRAFO", ""),
            NetworkPoint::new("P1", "TRAFO")
                .with_span(40.0, "4AWG")
                .with_load(PointLoad::residential(20, 0, 0)),
            NetworkPoint::new("P2", "P1")
                .with_span(40.0, "4AWG")
                .with_load(PointLoad::residential(20, 0, 0)),
            NetworkPoint::new("P3", "P2")
                .with_span(40.0, "4AWG")
                .with_load(PointLoad::residential(2, 0, 0)),
        ]
    }

    #[test]
    fn upgrades_until_constraints_hold() {
        let engine = Engine::default();
        let outcome = engine
            .optimize_with_report("opt", &feeder(), &params(), &catalogs())
            .unwrap();
        assert!(outcome.converged);
        assert!(outcome.iterations <= 10);
        assert!(!outcome.upgrades.is_empty());
        assert_ne!(outcome.nodes[1].conductor, "4AWG");

        let result = engine
            .calculate("check", &outcome.nodes, &params(), &catalogs())
            .unwrap();
        let catalogs = catalogs();
        for node in result.nodes.iter().skip(1) {
            let spec = catalogs.conductor(&node.point.conductor).unwrap();
            assert!(node.physics.current_a <= spec.ampacity_a);
            assert!(node.physics.voltage_drop_percent <= 5.0);
        }
    }

    #[test]
    fn ranks_never_decrease() {
        let catalogs = catalogs();
        let ladder = catalogs.conductors_by_ampacity();
        let rank = |key: &str| ladder.iter().position(|k| k == key).unwrap();
        let before = feeder();
        let after = Engine::default()
            .optimize("opt", &before, &params(), &catalogs)
            .unwrap();
        for (old, new) in before.iter().zip(&after).skip(1) {
            assert!(rank(&new.conductor) >= rank(&old.conductor));
        }
        assert_eq!(before[0], after[0]);
    }

    #[test]
    fn cap_is_a_soft_limit() {
        let mut params = params();
        params.profile.max_voltage_drop_percent = 0.001;
        let outcome = Engine::default()
            .optimize_with_report("opt", &feeder(), &params, &catalogs())
            .unwrap();
        assert!(!outcome.converged);
        assert!(outcome.iterations <= 10);
        assert!(outcome.nodes.iter().skip(1).all(|n| n.conductor == "4/0AWG"));
    }

    #[test]
    fn healthy_network_is_untouched() {
        let nodes = vec![
            NetworkPoint::new("TRAFO", ""),
            NetworkPoint::new("P1", "TRAFO")
                .with_span(10.0, "4/0AWG")
                .with_load(PointLoad::residential(2, 0, 0)),
        ];
        let outcome = Engine::default()
            .optimize_with_report("opt", &nodes, &params(), &catalogs())
            .unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.upgrades.is_empty());
        assert_eq!(outcome.nodes, nodes);
    }

    #[test]
    fn solar_rise_alone_moves_one_rank() {
        let nodes = vec![
            NetworkPoint::new("TRAFO", ""),
            NetworkPoint::new("P1", "TRAFO")
                .with_span(40.0, "2AWG")
                .with_load(PointLoad {
                    solar: Some(SolarInstallation { kva: 130.0, units: 1 }),
                    ..PointLoad::residential(1, 0, 0)
                }),
        ];
        let engine = Engine::default();
        let before = engine
            .calculate("pv", &nodes, &params(), &catalogs())
            .unwrap();
        let p1 = before.node("P1").unwrap().physics;
        assert!(p1.current_a <= 90.0);
        assert!(p1.voltage_drop_percent <= 5.0);
        assert!(p1.solar_rise_percent > 5.0);

        let outcome = engine
            .optimize_with_report("pv", &nodes, &params(), &catalogs())
            .unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.upgrades.len(), 1);
        assert_eq!(outcome.upgrades[0].from, "2AWG");
        assert_eq!(outcome.upgrades[0].to, "1/0AWG");
        assert_eq!(outcome.nodes[1].conductor, "1/0AWG");
    }
}

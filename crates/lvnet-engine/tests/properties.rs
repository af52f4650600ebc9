//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "tests"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Property checks over randomly generated radial trees."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use lvnet_engine::{
    model::{
        Catalogs, ConductorSpec, DemandClass, DemandFactors, DemandTable, DemandTableRow,
        NetworkPoint, PointLoad, ScenarioParams, SolarInstallation,
    },
    Engine,
};
use proptest::{prelude::*, sample::Index};

fn catalogs() -> Catalogs {
    let mut catalogs = Catalogs::default();
    for (key, r, k, amp) in [
        ("CA-16", 1.91, 0.30, 70.0),
        ("CA-35", 0.87, 0.14, 110.0),
        ("CA-70", 0.44, 0.07, 170.0),
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
        "NBR".into(),
        DemandTable {
            rows: vec![
                DemandTableRow {
                    min_residences: 0,
                    max_residences: 50,
                    factors: DemandFactors { a: 1.2, b: 1.6, c: 2.1, d: 2.8 },
                },
                DemandTableRow {
                    min_residences: 51,
                    max_residences: 400,
                    factors: DemandFactors { a: 0.9, b: 1.2, c: 1.6, d: 2.1 },
                },
            ],
            default_class: DemandClass::B,
        },
    );
    catalogs
}

fn params(transformer_kva: f64) -> ScenarioParams {
    ScenarioParams {
        transformer_kva,
        profile: Default::default(),
        class_mode: Default::default(),
        manual_class: DemandClass::B,
        demand_table: "NBR".into(),
        net_solar_for_thermal: false,
    }
}

/// A source followed by points that each hang off an earlier one.
fn radial_tree() -> impl Strategy<Value = Vec<NetworkPoint>> {
    prop::collection::vec(
        (any::<Index>(), 0u32..30, 1.0f64..80.0, 0.0f64..15.0),
        1..12,
    )
    .prop_map(|specs| {
        let mut nodes = vec![NetworkPoint::new("TRAFO", "")];
        for (i, (parent, residences, span, solar)) in specs.into_iter().enumerate() {
            let parent_id = nodes[parent.index(i + 1)].id.clone();
            let load = PointLoad {
                solar: (solar > 7.5).then_some(SolarInstallation {
                    kva: solar,
                    units: 1,
                }),
                ..PointLoad::residential(residences, 0, 0)
            };
            nodes.push(
                NetworkPoint::new(format!("P{}", i + 1), parent_id)
                    .with_span(span, "CA-16")
                    .with_load(load),
            );
        }
        nodes
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn own_loads_sum_to_total(nodes in radial_tree(), trafo in 15.0f64..300.0) {
        let result = Engine::default()
            .calculate("prop", &nodes, &params(trafo), &catalogs())
            .unwrap();
        let own: f64 = result.nodes.iter().map(|n| n.demand.own_load_kva).sum();
        prop_assert!((own - result.kpis.total_load_kva).abs() < 1e-9);
        let root = result.node("TRAFO").unwrap();
        prop_assert!((root.demand.accumulated_load_kva - own).abs() < 1e-9);
        prop_assert!(
            (result.kpis.transformer_occupancy_percent - own / trafo * 100.0).abs() < 1e-9
        );
    }

    #[test]
    fn drop_and_rise_never_decrease_downstream(nodes in radial_tree()) {
        let result = Engine::default()
            .calculate("prop", &nodes, &params(75.0), &catalogs())
            .unwrap();
        for node in result.nodes.iter().skip(1) {
            let parent = result.node(&node.point.parent_id).unwrap();
            prop_assert!(node.physics.voltage_drop_percent >= parent.physics.voltage_drop_percent);
            prop_assert!(node.physics.solar_rise_percent >= parent.physics.solar_rise_percent);
        }
        let max = result
            .nodes
            .iter()
            .map(|n| n.physics.voltage_drop_percent)
            .fold(0.0, f64::max);
        prop_assert_eq!(max, result.kpis.max_voltage_drop_percent);
    }

    #[test]
    fn optimizer_only_moves_up_the_ladder(nodes in radial_tree()) {
        let catalogs = catalogs();
        let ladder = catalogs.conductors_by_ampacity();
        let rank = |key: &str| ladder.iter().position(|k| k == key).unwrap();
        let outcome = Engine::default()
            .optimize_with_report("prop", &nodes, &params(75.0), &catalogs)
            .unwrap();
        prop_assert!(outcome.iterations <= 10);
        for (before, after) in nodes.iter().zip(&outcome.nodes).skip(1) {
            prop_assert!(rank(&after.conductor) >= rank(&before.conductor));
            prop_assert_eq!(&before.id, &after.id);
        }
    }

    #[test]
    fn risk_percentages_are_complementary(nodes in radial_tree(), iterations in 1usize..16) {
        let risk = Engine::default()
            .run_monte_carlo(&nodes, &params(75.0), &catalogs(), iterations)
            .unwrap();
        prop_assert_eq!(risk.iterations, iterations);
        prop_assert!((0.0..=100.0).contains(&risk.stability_index));
        prop_assert_eq!(risk.failure_risk, 100.0 - risk.stability_index);
        prop_assert!(risk.failures <= iterations);
        prop_assert_eq!(risk.histogram.iter().map(|b| b.count).sum::<usize>(), iterations);
        prop_assert!(risk.min_max_drop_percent <= risk.p95_max_drop_percent);
        prop_assert!(risk.p95_max_drop_percent <= risk.max_max_drop_percent);
    }
}

//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Input checks run before any physics pass."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::{
    model::{Catalogs, NetworkPoint, ScenarioParams},
    topology::Topology,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MissingSource,
    DuplicateId,
    Cycle,
    UnresolvedParent,
    DetachedNode,
    UnknownConductor,
    UnknownFixture,
    /// Unresolved catalog key on a point that is not fed by the source.
    DetachedReference,
    UnknownDemandTable,
    EmptyDemandTable,
    NegativeQuantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Advisory,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::UnresolvedParent
            | IssueKind::DetachedNode
            | IssueKind::DetachedReference => Severity::Advisory,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    #[serde(default)]
    pub node_id: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// `true` when no error-severity issue was found.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.kind.severity() == Severity::Error)
    }

    pub fn advisories(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.kind.severity() == Severity::Advisory)
    }

    pub fn has(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }

    fn push(&mut self, kind: IssueKind, node_id: Option<&str>, detail: String) {
        self.issues.push(ValidationIssue {
            kind,
            node_id: node_id.map(str::to_owned),
            detail,
        });
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let errors: Vec<&str> = self.errors().map(|issue| issue.detail.as_str()).collect();
        write!(f, "{} error(s)", errors.len())?;
        if !errors.is_empty() {
            write!(f, ": {}", errors.join("; "))?;
        }
        Ok(())
    }
}

/// Checks references, quantities and topology shape.
pub fn validate(
    points: &[NetworkPoint],
    params: &ScenarioParams,
    catalogs: &Catalogs,
    source_id: &str,
) -> ValidationReport {
    let topology = Topology::build(points, source_id);
    validate_with_topology(points, &topology, params, catalogs)
}

pub(crate) fn validate_with_topology(
    points: &[NetworkPoint],
    topology: &Topology,
    params: &ScenarioParams,
    catalogs: &Catalogs,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if topology.source().is_none() {
        report.push(
            IssueKind::MissingSource,
            None,
            "network has no source point".to_owned(),
        );
    }

    for &idx in topology.duplicates() {
        let id = points[idx].id.as_str();
        report.push(
            IssueKind::DuplicateId,
            Some(id),
            format!("point id {} is declared more than once", id),
        );
    }

    for cycle in topology.cycles() {
        let members: Vec<&str> = cycle.iter().map(|&idx| points[idx].id.as_str()).collect();
        report.push(
            IssueKind::Cycle,
            members.first().copied(),
            format!("parent links form a cycle: {}", members.join(" -> ")),
        );
    }

    for &idx in topology.unresolved_parents() {
        let point = &points[idx];
        report.push(
            IssueKind::UnresolvedParent,
            Some(&point.id),
            format!(
                "point {} references unknown parent {}",
                point.id, point.parent_id
            ),
        );
    }

    if topology.source().is_some() {
        let in_cycle = |idx: usize| topology.cycles().iter().any(|c| c.contains(&idx));
        for idx in topology.detached() {
            if in_cycle(idx) {
                continue;
            }
            let id = points[idx].id.as_str();
            report.push(
                IssueKind::DetachedNode,
                Some(id),
                format!("point {} is not fed by the source", id),
            );
        }
    }

    match catalogs.demand_tables.get(&params.demand_table) {
        None => report.push(
            IssueKind::UnknownDemandTable,
            None,
            format!("demand table {} is not in the catalog", params.demand_table),
        ),
        Some(table) if table.rows.is_empty() => report.push(
            IssueKind::EmptyDemandTable,
            None,
            format!("demand table {} has no rows", params.demand_table),
        ),
        Some(_) => {}
    }

    for (idx, point) in points.iter().enumerate() {
        let is_source = topology.source() == Some(idx);
        // Detached points are excluded from accumulation.
        let (conductor_kind, fixture_kind) = if topology.is_attached(idx) {
            (IssueKind::UnknownConductor, IssueKind::UnknownFixture)
        } else {
            (IssueKind::DetachedReference, IssueKind::DetachedReference)
        };
        if !is_source && catalogs.conductor(&point.conductor).is_none() {
            report.push(
                conductor_kind,
                Some(&point.id),
                format!(
                    "point {} uses conductor '{}' missing from the catalog",
                    point.id, point.conductor
                ),
            );
        }
        if let Some(lighting) = &point.load.lighting {
            if catalogs.fixture_kva(&lighting.fixture).is_none() {
                report.push(
                    fixture_kind,
                    Some(&point.id),
                    format!(
                        "point {} uses lighting fixture '{}' missing from the catalog",
                        point.id, lighting.fixture
                    ),
                );
            }
        }

        let quantities = [
            ("span", point.span_m),
            ("point load kVA", point.load.point_load_kva),
            ("solar kVA", point.load.solar_kva()),
        ];
        for (label, value) in quantities {
            if !value.is_finite() || value < 0.0 {
                report.push(
                    IssueKind::NegativeQuantity,
                    Some(&point.id),
                    format!("point {} has invalid {} {}", point.id, label, value),
                );
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ConductorSpec, DemandFactors, DemandTable, DemandTableRow, LightingLoad, LoadProfile,
        PointLoad, SolarInstallation,
    };

    fn catalogs() -> Catalogs {
        let mut catalogs = Catalogs::default();
        catalogs.conductors.insert(
            "3x50".into(),
            ConductorSpec {
                resistance_ohm_per_km: 0.641,
                reactance_ohm_per_km: 0.1,
                drop_coefficient: 0.09,
                ampacity_a: 135.0,
            },
        );
        catalogs.lighting.insert("LED-70".into(), 0.07);
        catalogs.demand_tables.insert(
            "T1".into(),
            DemandTable {
                rows: vec![DemandTableRow {
                    min_residences: 0,
                    max_residences: 100,
                    factors: DemandFactors { a: 1.0, b: 1.5, c: 2.0, d: 2.5 },
                }],
                default_class: Default::default(),
            },
        );
        catalogs
    }

    fn params() -> ScenarioParams {
        ScenarioParams {
            transformer_kva: 75.0,
            profile: LoadProfile::default(),
            class_mode: Default::default(),
            manual_class: Default::default(),
            demand_table: "T1".into(),
            net_solar_for_thermal: false,
        }
    }

    #[test]
    fn clean_network_passes() {
        let points = vec![
            NetworkPoint::new("TRAFO", ""),
            NetworkPoint::new("P1", "TRAFO").with_span(30.0, "3x50"),
        ];
        let report = validate(&points, &params(), &catalogs(), "TRAFO");
        assert!(report.is_ok());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn unknown_references_are_errors() {
        let load = PointLoad {
            lighting: Some(LightingLoad {
                fixture: "SODIUM-400".into(),
                count: 2,
            }),
            solar: Some(SolarInstallation { kva: -3.0, units: 1 }),
            ..PointLoad::default()
        };
        let points = vec![
            NetworkPoint::new("TRAFO", ""),
            NetworkPoint::new("P1", "TRAFO").with_span(30.0, "3x95").with_load(load),
        ];
        let mut params = params();
        params.demand_table = "NOPE".into();
        let report = validate(&points, &params, &catalogs(), "TRAFO");
        assert!(!report.is_ok());
        assert!(report.has(IssueKind::UnknownConductor));
        assert!(report.has(IssueKind::UnknownFixture));
        assert!(report.has(IssueKind::UnknownDemandTable));
        assert!(report.has(IssueKind::NegativeQuantity));
        assert!(report.to_string().starts_with("4 error(s)"));
    }

    #[test]
    fn orphans_are_advisory() {
        let points = vec![
            NetworkPoint::new("TRAFO", ""),
            NetworkPoint::new("P1", "GHOST").with_span(30.0, "3x50"),
            NetworkPoint::new("P2", "P1").with_span(30.0, "3x50"),
        ];
        let report = validate(&points, &params(), &catalogs(), "TRAFO");
        assert!(report.is_ok());
        assert!(report.has(IssueKind::UnresolvedParent));
        assert!(report.has(IssueKind::DetachedNode));
        assert_eq!(report.advisories().count(), 2);
    }

    #[test]
    fn detached_references_are_advisory() {
        let points = vec![
            NetworkPoint::new("TRAFO", ""),
            NetworkPoint::new("P1", "TRAFO").with_span(30.0, "3x50"),
            NetworkPoint::new("SPARE", ""),
            NetworkPoint::new("ORPHAN", "GHOST").with_load(PointLoad {
                lighting: Some(LightingLoad {
                    fixture: "SODIUM-400".into(),
                    count: 1,
                }),
                ..PointLoad::default()
            }),
        ];
        let report = validate(&points, &params(), &catalogs(), "TRAFO");
        assert!(report.is_ok());
        assert!(!report.has(IssueKind::UnknownConductor));
        assert!(!report.has(IssueKind::UnknownFixture));
        let detached: Vec<_> = report
            .issues
            .iter()
            .filter(|issue| issue.kind == IssueKind::DetachedReference)
            .map(|issue| issue.node_id.as_deref())
            .collect();
        assert_eq!(detached, vec![Some("SPARE"), Some("ORPHAN"), Some("ORPHAN")]);
    }

    #[test]
    fn missing_source_and_cycles_are_errors() {
        let points = vec![
            NetworkPoint::new("A", "B").with_span(10.0, "3x50"),
            NetworkPoint::new("B", "A").with_span(10.0, "3x50"),
        ];
        let report = validate(&points, &params(), &catalogs(), "TRAFO");
        assert!(report.has(IssueKind::MissingSource));
        assert!(report.has(IssueKind::Cycle));
        assert!(!report.has(IssueKind::DetachedNode));
    }
}

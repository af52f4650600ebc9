//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Network topology, load descriptors, catalogs and scenario parameters."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A point of the radial network: the transformer or any downstream pole/box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPoint {
    pub id: String,
    /// Empty for the source.
    #[serde(default)]
    pub parent_id: String,
    /// Span length to the parent, in meters.
    #[serde(default)]
    pub span_m: f64,
    /// Key into the conductor catalog.
    #[serde(default)]
    pub conductor: String,
    #[serde(default)]
    pub load: PointLoad,
}

impl NetworkPoint {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            span_m: 0.0,
            conductor: String::new(),
            load: PointLoad::default(),
        }
    }

    pub fn with_span(mut self, span_m: f64, conductor: impl Into<String>) -> Self {
        self.span_m = span_m;
        self.conductor = conductor.into();
        self
    }

    pub fn with_load(mut self, load: PointLoad) -> Self {
        self.load = load;
        self
    }

    pub fn has_parent(&self) -> bool {
        !self.parent_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointLoad {
    #[serde(default)]
    pub residences: ResidenceCounts,
    /// Number of explicit point-load customers.
    #[serde(default)]
    pub point_loads: u32,
    /// Total explicit point-load demand at this point.
    #[serde(default)]
    pub point_load_kva: f64,
    #[serde(default)]
    pub lighting: Option<LightingLoad>,
    #[serde(default)]
    pub solar: Option<SolarInstallation>,
}

impl PointLoad {
    pub fn residential(mono: u32, bi: u32, tri: u32) -> Self {
        Self {
            residences: ResidenceCounts { mono, bi, tri },
            ..Self::default()
        }
    }

    pub fn solar_kva(&self) -> f64 {
        self.solar.as_ref().map(|s| s.kva).unwrap_or(0.0)
    }

    pub fn customers(&self) -> u64 {
        self.residences.total() + u64::from(self.point_loads)
    }
}

/// Residential unit counts by phase configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidenceCounts {
    #[serde(default)]
    pub mono: u32,
    #[serde(default)]
    pub bi: u32,
    #[serde(default)]
    pub tri: u32,
}

impl ResidenceCounts {
    /// Summed in `u64` so any combination of `u32` counts fits.
    pub fn total(&self) -> u64 {
        u64::from(self.mono) + u64::from(self.bi) + u64::from(self.tri)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingLoad {
    /// Key into the lighting catalog.
    pub fixture: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarInstallation {
    /// Installed capacity at this point.
    pub kva: f64,
    #[serde(default)]
    pub units: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConductorSpec {
    pub resistance_ohm_per_km: f64,
    #[serde(default)]
    pub reactance_ohm_per_km: f64,
    /// Dimensionless voltage-drop coefficient applied per kVA·hm.
    pub drop_coefficient: f64,
    pub ampacity_a: f64,
}

impl ConductorSpec {
    /// Stand-in used when a key does not resolve and validation is lenient.
    pub const UNRESOLVED: ConductorSpec = ConductorSpec {
        resistance_ohm_per_km: 0.0,
        reactance_ohm_per_km: 0.0,
        drop_coefficient: 0.0,
        ampacity_a: 0.0,
    };
}

/// Demand class letter selecting a diversification column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemandClass {
    A,
    #[default]
    B,
    C,
    D,
}

impl std::fmt::Display for DemandClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            DemandClass::A => "A",
            DemandClass::B => "B",
            DemandClass::C => "C",
            DemandClass::D => "D",
        };
        f.write_str(letter)
    }
}

impl std::str::FromStr for DemandClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(DemandClass::A),
            "B" => Ok(DemandClass::B),
            "C" => Ok(DemandClass::C),
            "D" => Ok(DemandClass::D),
            other => Err(format!("unknown demand class: {}", other)),
        }
    }
}

/// Per-residence kVA factors, one column per demand class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandFactors {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl DemandFactors {
    pub fn get(&self, class: DemandClass) -> f64 {
        match class {
            DemandClass::A => self.a,
            DemandClass::B => self.b,
            DemandClass::C => self.c,
            DemandClass::D => self.d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandTableRow {
    pub min_residences: u32,
    pub max_residences: u32,
    pub factors: DemandFactors,
}

/// Normative diversification table. Rows are ordered; the last row's maximum is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandTable {
    pub rows: Vec<DemandTableRow>,
    #[serde(default)]
    pub default_class: DemandClass,
}

impl DemandTable {
    /// Row covering `residences`, clamped to the last row when nothing matches.
    pub fn row_for(&self, residences: u64) -> Option<&DemandTableRow> {
        self.rows
            .iter()
            .find(|row| {
                residences >= u64::from(row.min_residences)
                    && residences <= u64::from(row.max_residences)
            })
            .or_else(|| self.rows.last())
    }
}

/// Catalogs consulted by every pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalogs {
    #[serde(default)]
    pub conductors: IndexMap<String, ConductorSpec>,
    /// Fixture type to unit kVA.
    #[serde(default)]
    pub lighting: IndexMap<String, f64>,
    #[serde(default)]
    pub demand_tables: IndexMap<String, DemandTable>,
}

impl Catalogs {
    pub fn conductor(&self, key: &str) -> Option<&ConductorSpec> {
        self.conductors.get(key)
    }

    pub fn fixture_kva(&self, key: &str) -> Option<f64> {
        self.lighting.get(key).copied()
    }

    /// Conductor keys ordered by ascending ampacity.
    pub fn conductors_by_ampacity(&self) -> Vec<String> {
        let mut keys: Vec<(&String, f64)> = self
            .conductors
            .iter()
            .map(|(key, spec)| (key, spec.ampacity_a))
            .collect();
        keys.sort_by(|a, b| a.1.total_cmp(&b.1));
        keys.into_iter().map(|(key, _)| key.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    pub name: String,
    pub max_voltage_drop_percent: f64,
    /// Informational only; the engine does not enforce it.
    #[serde(default)]
    pub max_thermal_percent: f64,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            max_voltage_drop_percent: 5.0,
            max_thermal_percent: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassMode {
    #[default]
    Automatic,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub transformer_kva: f64,
    #[serde(default)]
    pub profile: LoadProfile,
    #[serde(default)]
    pub class_mode: ClassMode,
    #[serde(default)]
    pub manual_class: DemandClass,
    pub demand_table: String,
    /// Net half of each point's solar capacity against its thermal demand.
    #[serde(default)]
    pub net_solar_for_thermal: bool,
}

impl ScenarioParams {
    pub fn active_class(&self, table: Option<&DemandTable>) -> DemandClass {
        match self.class_mode {
            ClassMode::Manual => self.manual_class,
            ClassMode::Automatic => table.map(|t| t.default_class).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DemandTable {
        DemandTable {
            rows: vec![
                DemandTableRow {
                    min_residences: 1,
                    max_residences: 10,
                    factors: DemandFactors { a: 1.0, b: 2.0, c: 3.0, d: 4.0 },
                },
                DemandTableRow {
                    min_residences: 11,
                    max_residences: 20,
                    factors: DemandFactors { a: 0.8, b: 1.6, c: 2.4, d: 3.2 },
                },
            ],
            default_class: DemandClass::C,
        }
    }

    #[test]
    fn row_lookup_clamps_to_last_row() {
        let table = table();
        assert_eq!(table.row_for(5).unwrap().max_residences, 10);
        assert_eq!(table.row_for(11).unwrap().max_residences, 20);
        assert_eq!(table.row_for(500).unwrap().max_residences, 20);
        assert!(DemandTable::default().row_for(3).is_none());
    }

    #[test]
    fn active_class_follows_mode() {
        let mut params = ScenarioParams {
            transformer_kva: 75.0,
            profile: LoadProfile::default(),
            class_mode: ClassMode::Automatic,
            manual_class: DemandClass::A,
            demand_table: "t".into(),
            net_solar_for_thermal: false,
        };
        assert_eq!(params.active_class(Some(&table())), DemandClass::C);
        params.class_mode = ClassMode::Manual;
        assert_eq!(params.active_class(Some(&table())), DemandClass::A);
    }

    #[test]
    fn conductors_sort_by_ampacity() {
        let mut catalogs = Catalogs::default();
        for (key, amp) in [("big", 300.0), ("small", 90.0), ("mid", 150.0)] {
            catalogs.conductors.insert(
                key.into(),
                ConductorSpec {
                    resistance_ohm_per_km: 1.0,
                    reactance_ohm_per_km: 0.1,
                    drop_coefficient: 0.1,
                    ampacity_a: amp,
                },
            );
        }
        assert_eq!(catalogs.conductors_by_ampacity(), vec!["small", "mid", "big"]);
    }

    #[test]
    fn residence_totals_do_not_overflow() {
        let load = PointLoad {
            point_loads: u32::MAX,
            ..PointLoad::residential(u32::MAX, u32::MAX, u32::MAX)
        };
        assert_eq!(load.residences.total(), 3 * u64::from(u32::MAX));
        assert_eq!(load.customers(), 4 * u64::from(u32::MAX));
        assert_eq!(table().row_for(load.residences.total()).unwrap().max_residences, 20);
    }

    #[test]
    fn demand_class_parses_case_insensitively() {
        assert_eq!("c".parse::<DemandClass>().unwrap(), DemandClass::C);
        assert!("E".parse::<DemandClass>().is_err());
    }
}

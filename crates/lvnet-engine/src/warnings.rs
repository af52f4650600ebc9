//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Structured diagnostic warnings with keyed deduplication."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
//! Warnings are informational. Each record is keyed by `(kind, node)`; kinds listed
//! in [`WarningPolicy::network_wide`] collapse to a single record for the whole
//! network, keeping the node on which they were first observed. Repeated
//! configuration records for one node merge their details into the first record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::validation::IssueKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    ThermalOverload,
    ReverseFlow,
    SolarVoltageRise,
    /// Input problem tolerated under lenient validation.
    Configuration(IssueKind),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(default)]
    pub node_id: Option<String>,
    pub detail: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(node) => write!(f, "[{}] {}", node, self.detail),
            None => f.write_str(&self.detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningPolicy {
    /// Kinds reported at most once per calculation.
    #[serde(default)]
    pub network_wide: Vec<WarningKind>,
}

impl WarningPolicy {
    pub fn is_network_wide(&self, kind: WarningKind) -> bool {
        self.network_wide.contains(&kind)
    }
}

impl Default for WarningPolicy {
    fn default() -> Self {
        Self {
            network_wide: vec![WarningKind::ReverseFlow],
        }
    }
}

type WarningKey = (WarningKind, Option<String>);

#[derive(Debug, Clone)]
pub struct WarningLog<'a> {
    policy: &'a WarningPolicy,
    records: IndexMap<WarningKey, Warning>,
    emit: bool,
}

impl<'a> WarningLog<'a> {
    pub fn new(policy: &'a WarningPolicy) -> Self {
        Self {
            policy,
            records: IndexMap::new(),
            emit: true,
        }
    }

    /// Collects records without logging them; used by the repeated inner passes.
    pub fn quiet(policy: &'a WarningPolicy) -> Self {
        Self {
            emit: false,
            ..Self::new(policy)
        }
    }

    /// Records a warning; returns `false` when an equivalent record already exists.
    pub fn push(&mut self, kind: WarningKind, node_id: Option<&str>, detail: String) -> bool {
        let key_node = if self.policy.is_network_wide(kind) {
            None
        } else {
            node_id.map(str::to_owned)
        };
        let key = (kind, key_node);
        if let Some(existing) = self.records.get_mut(&key) {
            if matches!(kind, WarningKind::Configuration(_)) && existing.detail != detail {
                existing.detail.push_str("; ");
                existing.detail.push_str(&detail);
            }
            return false;
        }
        if self.emit {
            warn!(kind = ?kind, node = node_id.unwrap_or("-"), "{}", detail);
        }
        self.records.insert(
            key,
            Warning {
                kind,
                node_id: node_id.map(str::to_owned),
                detail,
            },
        );
        true
    }

    pub fn contains(&self, kind: WarningKind) -> bool {
        self.records.keys().any(|(k, _)| *k == kind)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.records.into_values().collect()
    }
}

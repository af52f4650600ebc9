//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Arena tree built from the flat list of network points."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
//! Graph node `i` always stands for input point `i`. Edges run parent → child and
//! are resolved once, so the passes never look up string ids again.

use std::collections::HashMap;

use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
    visit::Dfs,
};
use tracing::debug;

use crate::model::NetworkPoint;

#[derive(Debug, Clone)]
pub struct Topology {
    graph: DiGraph<usize, ()>,
    source: Option<usize>,
    parent: Vec<Option<usize>>,
    attached: Vec<bool>,
    pre_order: Vec<usize>,
    duplicates: Vec<usize>,
    unresolved: Vec<usize>,
    cycles: Vec<Vec<usize>>,
}

impl Topology {
    pub fn build(points: &[NetworkPoint], source_id: &str) -> Self {
        let mut graph = DiGraph::<usize, ()>::with_capacity(points.len(), points.len());
        let mut index_map: HashMap<&str, usize> = HashMap::with_capacity(points.len());
        let mut duplicates = Vec::new();

        for (idx, point) in points.iter().enumerate() {
            graph.add_node(idx);
            if index_map.contains_key(point.id.as_str()) {
                duplicates.push(idx);
            } else {
                index_map.insert(point.id.as_str(), idx);
            }
        }

        let source = points
            .iter()
            .position(|p| p.id == source_id)
            .or_else(|| points.iter().position(|p| !p.has_parent()));

        let mut parent = vec![None; points.len()];
        let mut unresolved = Vec::new();
        let mut cycles = Vec::new();

        for (idx, point) in points.iter().enumerate() {
            if Some(idx) == source || !point.has_parent() {
                continue;
            }
            match index_map.get(point.parent_id.as_str()) {
                Some(&parent_idx) if parent_idx == idx => cycles.push(vec![idx]),
                Some(&parent_idx) => {
                    graph.add_edge(NodeIndex::new(parent_idx), NodeIndex::new(idx), ());
                    parent[idx] = Some(parent_idx);
                }
                None => unresolved.push(idx),
            }
        }

        cycles.extend(
            tarjan_scc(&graph)
                .into_iter()
                .filter(|component| component.len() > 1)
                .map(|component| {
                    let mut members: Vec<usize> = component.iter().map(|n| n.index()).collect();
                    members.sort_unstable();
                    members
                }),
        );

        let mut attached = vec![false; points.len()];
        let mut pre_order = Vec::with_capacity(points.len());
        if let Some(root) = source {
            let mut dfs = Dfs::new(&graph, NodeIndex::new(root));
            while let Some(node) = dfs.next(&graph) {
                attached[node.index()] = true;
                pre_order.push(node.index());
            }
        }

        debug!(
            points = points.len(),
            attached = pre_order.len(),
            source = ?source.map(|s| points[s].id.as_str()),
            "topology built"
        );

        Self {
            graph,
            source,
            parent,
            attached,
            pre_order,
            duplicates,
            unresolved,
            cycles,
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn source(&self) -> Option<usize> {
        self.source
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parent[idx]
    }

    pub fn children(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors(NodeIndex::new(idx))
            .map(|n| self.graph[n])
    }

    pub fn is_attached(&self, idx: usize) -> bool {
        self.attached[idx]
    }

    /// Attached nodes, each parent before its children.
    pub fn pre_order(&self) -> &[usize] {
        &self.pre_order
    }

    /// Attached nodes, each child before its parent.
    pub fn post_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.pre_order.iter().rev().copied()
    }

    /// Points sharing an id with an earlier point.
    pub fn duplicates(&self) -> &[usize] {
        &self.duplicates
    }

    /// Points whose parent id names no point.
    pub fn unresolved_parents(&self) -> &[usize] {
        &self.unresolved
    }

    /// Parent-link cycles, including self-parenting points.
    pub fn cycles(&self) -> &[Vec<usize>] {
        &self.cycles
    }

    /// Points whose parent resolves but which still cannot reach the source.
    pub fn detached(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&idx| !self.attached[idx] && !self.unresolved.contains(&idx))
            .collect()
    }
}

//! Context-sensitive call graph
//!
//! Nodes are context-sensitive methods, edges connect context-sensitive call
//! sites to their resolved callees. Both reachability marking and edge
//! addition are idempotent; re-adding an existing fact is a no-op, which the
//! solver relies on when the same resolution is discovered twice.

use super::{CsCallSiteId, CsMethodId};
use crate::ir::CallKind;
use rustc_hash::{FxHashMap, FxHashSet};

/// A resolved call edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallEdge {
    pub call_site: CsCallSiteId,
    pub callee: CsMethodId,
    pub kind: CallKind,
}

/// The on-the-fly call graph
#[derive(Debug, Clone, Default)]
pub struct CsCallGraph {
    reachable: FxHashSet<CsMethodId>,
    /// Discovery order, for deterministic iteration
    reachable_order: Vec<CsMethodId>,
    edge_set: FxHashSet<(CsCallSiteId, CsMethodId)>,
    edges: Vec<CallEdge>,
    out_edges: FxHashMap<CsCallSiteId, Vec<CallEdge>>,
}

impl CsCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a method reachable. Returns true if it was not already.
    pub fn add_reachable(&mut self, method: CsMethodId) -> bool {
        if self.reachable.insert(method) {
            self.reachable_order.push(method);
            true
        } else {
            false
        }
    }

    pub fn is_reachable(&self, method: CsMethodId) -> bool {
        self.reachable.contains(&method)
    }

    /// Reachable methods in discovery order
    pub fn reachable_methods(&self) -> &[CsMethodId] {
        &self.reachable_order
    }

    pub fn num_reachable(&self) -> usize {
        self.reachable_order.len()
    }

    /// Add a call edge. Returns true if the (call site, callee) pair is new.
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        if !self.edge_set.insert((edge.call_site, edge.callee)) {
            return false;
        }
        self.edges.push(edge);
        self.out_edges.entry(edge.call_site).or_default().push(edge);
        true
    }

    pub fn has_edge(&self, call_site: CsCallSiteId, callee: CsMethodId) -> bool {
        self.edge_set.contains(&(call_site, callee))
    }

    /// Callees resolved for one context-sensitive call site
    pub fn callees_of(&self, call_site: CsCallSiteId) -> &[CallEdge] {
        self.out_edges
            .get(&call_site)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All edges in discovery order
    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
}

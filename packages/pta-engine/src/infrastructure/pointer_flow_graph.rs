//! Pointer flow graph
//!
//! Directed graph over canonical pointers; an edge is a propagation
//! obligation — the target's points-to set must become a superset of the
//! source's. Kinds record which statement form produced the edge. Self-loops
//! and parallel edges of different kinds are legal and distinguished by
//! kind; `add_edge` is idempotent per (source, target, kind) triple.

use crate::domain::PointerId;
use rustc_hash::FxHashSet;

/// What kind of statement a PFG edge models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Assign,
    InstanceLoad,
    InstanceStore,
    ArrayLoad,
    ArrayStore,
    StaticLoad,
    StaticStore,
    /// Argument → parameter passing at a call edge
    Parameter,
    /// Callee return variable → caller result variable
    Return,
    /// Receiver variable → callee `this` (special and CHA-resolved calls)
    ThisPassing,
}

/// An outgoing PFG edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PfgEdge {
    pub target: PointerId,
    pub kind: FlowKind,
}

/// The pointer flow graph
#[derive(Debug, Default)]
pub struct PointerFlowGraph {
    succs: Vec<Vec<PfgEdge>>,
    edge_set: FxHashSet<(PointerId, PointerId, FlowKind)>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge. Returns true if it is new.
    pub fn add_edge(&mut self, source: PointerId, target: PointerId, kind: FlowKind) -> bool {
        if !self.edge_set.insert((source, target, kind)) {
            return false;
        }
        let idx = source.0 as usize;
        if idx >= self.succs.len() {
            self.succs.resize_with(idx + 1, Vec::new);
        }
        self.succs[idx].push(PfgEdge { target, kind });
        true
    }

    /// Outgoing edges of `source` (empty for pointers with no edges yet)
    pub fn succs_of(&self, source: PointerId) -> &[PfgEdge] {
        self.succs
            .get(source.0 as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn num_edges(&self) -> usize {
        self.edge_set.len()
    }

    /// All edges as (source, target, kind) triples, grouped by source
    pub fn edges(&self) -> impl Iterator<Item = (PointerId, PfgEdge)> + '_ {
        self.succs.iter().enumerate().flat_map(|(i, edges)| {
            edges.iter().map(move |&e| (PointerId(i as u32), e))
        })
    }
}

//! Core value types of the analysis
//!
//! Context-sensitive entities are referred to by canonical interned ids
//! handed out by the solver-owned registries (`CsManager`): at most one id
//! exists per distinct (context, entity) pair, so identity comparison is
//! valid everywhere.

pub mod call_graph;
pub mod context;
pub mod heap;
pub mod object_set;

pub use call_graph::{CallEdge, CsCallGraph};
pub use context::{Context, ContextId, ContextStore};
pub use heap::{AbstractObject, HeapModel, HeapPolicy, ObjId};
pub use object_set::ObjectSet;

/// Canonical id of a context-sensitive abstract object (heap context, object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsObjId(pub u32);

/// Canonical id of a context-sensitive method (context, method)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsMethodId(pub u32);

/// Canonical id of a context-sensitive call site (context, call site)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsCallSiteId(pub u32);

/// Canonical id of a pointer-flow-graph node (any pointer kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

/*
 * PTA Engine - Context-Sensitive Pointer Analysis
 *
 * Layered architecture:
 * - ir/             : Immutable whole-program input (statements, hierarchy, builder)
 * - domain/         : Core value types (contexts, heap objects, points-to sets, call graph)
 * - infrastructure/ : Mechanisms (context selector, registries, PFG, plugins, solver)
 * - application/    : Embedder facade (config, analysis runner, result queries)
 *
 * Analysis:
 * - Andersen-style inclusion constraints, work-list fixed point
 * - k-limited call-site / object / type sensitivity behind one selector
 * - On-the-fly call graph (CHA mode available)
 * - Plugin events with queue-draining re-entrancy
 */

// Crate-level lint configuration
#![allow(clippy::should_implement_trait)] // from_str naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::collapsible_if)] // Readability over brevity

pub mod application;
pub mod domain;
pub mod errors;
pub mod infrastructure;
pub mod ir;

pub use application::{AnalysisConfig, AnalysisResult, PointerAnalysis};
pub use domain::{
    CallEdge, ContextId, CsCallGraph, CsCallSiteId, CsMethodId, CsObjId, HeapModel, HeapPolicy,
    ObjId, ObjectSet, PointerId,
};
pub use errors::{PtaError, Result};
pub use infrastructure::{
    CallGraphMode, ContextSelector, ContextStrategy, CsManager, FlowKind, Plugin, PointerFlowGraph,
    PointerKey, Solver, SolverOptions, SolverStats,
};
pub use ir::{
    CallKind, CallSiteId, ClassHierarchy, FieldId, MethodId, Program, ProgramBuilder, Stmt,
    StmtRef, TypeId, VarId,
};

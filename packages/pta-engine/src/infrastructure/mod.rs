//! Analysis machinery: registries, graphs, the solver and its plugins

pub mod context_selector;
pub mod cs_manager;
pub mod plugin;
pub mod pointer_flow_graph;
pub mod solver;

pub use context_selector::{ContextSelector, ContextStrategy, ReceiverInfo, MAX_CONTEXT_DEPTH};
pub use cs_manager::{CsManager, PointerKey};
pub use plugin::Plugin;
pub use pointer_flow_graph::{FlowKind, PfgEdge, PointerFlowGraph};
pub use solver::{CallGraphMode, Solver, SolverOptions, SolverOutcome, SolverStats};

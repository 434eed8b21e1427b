//! Plugin event protocol
//!
//! Plugins observe the solver's discoveries and may extend them: reflection
//! models, exception analyses, taint trackers. Each hook has a default no-op
//! body — implement only the events you care about. Registered plugins are
//! invoked in registration order; no ordering is guaranteed between events
//! fired for independent facts.
//!
//! Hooks receive the solver itself and must inject new facts through its
//! public entry points ([`Solver::add_points_to`], [`Solver::add_call_edge`],
//! [`Solver::add_reachable`]). Injections land on the solver's own work
//! queues and are drained before quiescence is declared, so plugins cannot
//! break monotonicity or termination.

use crate::domain::{CallEdge, ContextId, CsMethodId, CsObjId, ObjectSet, PointerId};
use crate::infrastructure::solver::Solver;
use crate::ir::{CallSiteId, StmtRef};

/// Capability set of solver events. All hooks default to no-ops.
#[allow(unused_variables)]
pub trait Plugin {
    /// Name used in logging
    fn name(&self) -> &str {
        "plugin"
    }

    /// Fired once before the fixed-point loop starts
    fn on_start(&mut self, solver: &mut Solver<'_>) {}

    /// Fired once after the loop reaches quiescence or aborts
    fn on_finish(&mut self, solver: &mut Solver<'_>) {}

    /// A pointer's points-to set grew by `delta`
    fn on_new_points_to(&mut self, solver: &mut Solver<'_>, pointer: PointerId, delta: &ObjectSet) {
    }

    /// A new call edge was added to the call graph
    fn on_new_call_edge(&mut self, solver: &mut Solver<'_>, edge: &CallEdge) {}

    /// A context-sensitive method became reachable
    fn on_new_method(&mut self, solver: &mut Solver<'_>, method: CsMethodId) {}

    /// A statement of a newly reachable method is about to be processed
    fn on_new_stmt(&mut self, solver: &mut Solver<'_>, stmt: StmtRef, method: CsMethodId) {}

    /// Dynamic dispatch failed for a newly observed receiver object. Absent
    /// plugin handling, the call produces no edge (sound-by-omission).
    fn on_unresolved_call(
        &mut self,
        solver: &mut Solver<'_>,
        recv: CsObjId,
        context: ContextId,
        site: CallSiteId,
    ) {
    }
}

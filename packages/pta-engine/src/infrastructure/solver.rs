//! Work-list fixed-point solver
//!
//! The driver of the whole analysis: owns the canonical registries, the
//! pointer flow graph, the points-to sets and the call graph, and grows all
//! of them monotonically until quiescence.
//!
//! Three queues feed the loop:
//! - newly reachable methods, whose statements are translated exactly once;
//! - resolved call edges awaiting argument/return linking;
//! - pointer entries `(pointer, objects)` awaiting delta propagation.
//!
//! Plugin fact injections land on the same queues — there is no separate
//! code path — so the termination argument (finite state space, monotone
//! updates, delta deduplication) covers plugin-driven growth too. The loop
//! is single-threaded and cooperative; a time limit or external abort flag
//! stops it at the next safe checkpoint, leaving a partial but still sound
//! result.
//!
//! References:
//! - Lhoták & Hendren "Scaling Java Points-to Analysis Using Spark" (CC 2003)
//! - Smaragdakis & Balatsouras "Pointer Analysis" (FnT PL 2015)

use crate::domain::{
    CallEdge, ContextId, CsCallGraph, CsMethodId, CsObjId, HeapModel, ObjectSet, PointerId,
};
use crate::errors::{PtaError, Result};
use crate::infrastructure::context_selector::{ContextSelector, ReceiverInfo};
use crate::infrastructure::cs_manager::{CsManager, PointerKey};
use crate::infrastructure::plugin::Plugin;
use crate::infrastructure::pointer_flow_graph::{FlowKind, PointerFlowGraph};
use crate::ir::{CallKind, CallSiteId, MethodId, Program, Stmt, StmtRef, VarId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How call edges are discovered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallGraphMode {
    /// Resolve dynamic dispatch against receiver points-to sets as they grow
    #[default]
    OnTheFly,
    /// Expand dynamic call sites over the class hierarchy when their
    /// enclosing method is reached
    Cha,
}

/// Runtime options of one solver instance
#[derive(Debug, Clone, Default)]
pub struct SolverOptions {
    pub call_graph_mode: CallGraphMode,
    /// Wall-clock budget; exceeding it aborts with a partial result
    pub time_limit: Option<Duration>,
    /// External abort flag (e.g. set from a signal handler)
    pub abort_flag: Option<Arc<AtomicBool>>,
}

/// Statistics of one solver run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolverStats {
    pub reachable_methods: usize,
    pub call_edges: usize,
    pub pointers: usize,
    pub objects: usize,
    pub contexts: usize,
    pub pfg_edges: usize,
    /// Work-list entries popped
    pub entries_processed: usize,
    /// Objects newly added to some points-to set
    pub objects_propagated: usize,
    /// Dispatch misses forwarded to plugins (analysis-quality signal)
    pub unresolved_calls: usize,
    pub duration_ms: f64,
    /// True when the run was cut short by the time limit or abort flag
    pub partial: bool,
}

/// Everything a completed run leaves behind, consumed by the result facade
#[derive(Debug)]
pub struct SolverOutcome {
    pub csm: CsManager,
    pub heap: HeapModel,
    pub points_to: Vec<ObjectSet>,
    pub call_graph: CsCallGraph,
    pub stats: SolverStats,
}

/// The fixed-point solver
pub struct Solver<'p> {
    program: &'p Program,
    options: SolverOptions,
    selector: ContextSelector,
    heap: HeapModel,
    csm: CsManager,
    points_to: Vec<ObjectSet>,
    pfg: PointerFlowGraph,
    call_graph: CsCallGraph,

    worklist: VecDeque<(PointerId, ObjectSet)>,
    pending_methods: VecDeque<CsMethodId>,
    pending_edges: VecDeque<CallEdge>,

    plugins: Vec<Box<dyn Plugin>>,
    entry_points: Vec<MethodId>,
    stats: SolverStats,
    deadline: Option<Instant>,
    partial: bool,
}

impl<'p> Solver<'p> {
    pub fn new(
        program: &'p Program,
        selector: ContextSelector,
        heap: HeapModel,
        options: SolverOptions,
    ) -> Self {
        Self {
            program,
            options,
            selector,
            heap,
            csm: CsManager::new(),
            points_to: Vec::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CsCallGraph::new(),
            worklist: VecDeque::new(),
            pending_methods: VecDeque::new(),
            pending_edges: VecDeque::new(),
            plugins: Vec::new(),
            entry_points: Vec::new(),
            stats: SolverStats::default(),
            deadline: None,
            partial: false,
        }
    }

    /// Register a plugin. Dispatch order is registration order.
    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn add_entry_point(&mut self, method: MethodId) {
        self.entry_points.push(method);
    }

    // ------------------------------------------------------------------
    // Fact-injection entry points (used internally and by plugins)
    // ------------------------------------------------------------------

    /// Assert that `pointer` may reference `objects`
    pub fn add_points_to(&mut self, pointer: PointerId, objects: ObjectSet) {
        if !objects.is_empty() {
            self.worklist.push_back((pointer, objects));
        }
    }

    /// Assert a resolved call edge
    pub fn add_call_edge(&mut self, edge: CallEdge) {
        self.pending_edges.push_back(edge);
    }

    /// Mark a context-sensitive method reachable
    pub fn add_reachable(&mut self, method: CsMethodId) {
        if self.call_graph.add_reachable(method) {
            self.pending_methods.push_back(method);
        }
    }

    // ------------------------------------------------------------------
    // Read access for plugins and tests
    // ------------------------------------------------------------------

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn csm(&self) -> &CsManager {
        &self.csm
    }

    /// Mutable registry access, for plugins that need to intern contexts,
    /// pointers or CS entities before injecting facts
    pub fn csm_mut(&mut self) -> &mut CsManager {
        &mut self.csm
    }

    pub fn heap_mut(&mut self) -> &mut HeapModel {
        &mut self.heap
    }

    pub fn selector(&self) -> &ContextSelector {
        &self.selector
    }

    pub fn call_graph(&self) -> &CsCallGraph {
        &self.call_graph
    }

    pub fn points_to_of(&self, pointer: PointerId) -> &ObjectSet {
        self.points_to
            .get(pointer.0 as usize)
            .unwrap_or_else(|| ObjectSet::empty_ref())
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    // ------------------------------------------------------------------
    // Fixed point
    // ------------------------------------------------------------------

    /// Run to quiescence (or abort) and hand back the computed state
    pub fn solve(mut self) -> Result<SolverOutcome> {
        let start = Instant::now();
        self.deadline = self.options.time_limit.map(|limit| start + limit);
        info!(
            strategy = %self.selector.strategy(),
            entry_points = self.entry_points.len(),
            "pointer analysis started"
        );

        self.dispatch_start();

        for m in self.entry_points.clone() {
            let cs = self.csm.cs_method(ContextId::EMPTY, m);
            self.add_reachable(cs);
        }

        self.drain()?;
        if !self.partial {
            // Finish hooks may inject final facts; drain them before
            // declaring quiescence
            self.dispatch_finish();
            self.drain()?;
        } else {
            self.dispatch_finish();
        }

        self.stats.partial = self.partial;
        self.stats.reachable_methods = self.call_graph.num_reachable();
        self.stats.call_edges = self.call_graph.num_edges();
        self.stats.pointers = self.csm.num_pointers();
        self.stats.objects = self.csm.num_cs_objs();
        self.stats.contexts = self.csm.num_contexts();
        self.stats.pfg_edges = self.pfg.num_edges();
        self.stats.duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        if !self.partial && cfg!(debug_assertions) {
            self.audit_fixed_point()?;
        }

        info!(
            reachable = self.stats.reachable_methods,
            call_edges = self.stats.call_edges,
            pointers = self.stats.pointers,
            partial = self.stats.partial,
            "pointer analysis finished"
        );

        Ok(SolverOutcome {
            csm: self.csm,
            heap: self.heap,
            points_to: self.points_to,
            call_graph: self.call_graph,
            stats: self.stats,
        })
    }

    fn drain(&mut self) -> Result<()> {
        loop {
            if self.abort_requested() {
                self.partial = true;
                warn!("pointer analysis aborted; reporting partial result");
                return Ok(());
            }
            if let Some(method) = self.pending_methods.pop_front() {
                self.process_method(method);
            } else if let Some(edge) = self.pending_edges.pop_front() {
                self.process_call_edge(edge);
            } else if let Some((pointer, objects)) = self.worklist.pop_front() {
                self.process_entry(pointer, objects)?;
            } else {
                return Ok(());
            }
        }
    }

    fn abort_requested(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        if let Some(flag) = &self.options.abort_flag {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        false
    }

    /// Translate the statements of a newly reachable method into PFG edges
    /// and initial points-to facts. Runs exactly once per CS method.
    fn process_method(&mut self, cs_method: CsMethodId) {
        let (ctx, m) = self.csm.cs_method_data(cs_method);
        debug!(method = m.0, context = ctx.0, "method became reachable");
        self.dispatch_new_method(cs_method);

        let program = self.program;
        for (index, stmt) in program.method(m).stmts.iter().enumerate() {
            self.dispatch_new_stmt(
                StmtRef {
                    method: m,
                    index: index as u32,
                },
                cs_method,
            );
            match *stmt {
                Stmt::New { lhs, site } => {
                    let ty = program.alloc_site(site).ty;
                    let obj = self.heap.get_object(site, ty);
                    let hctx = self.selector.select_heap(&mut self.csm.contexts, ctx);
                    let cs_obj = self.csm.cs_obj(hctx, obj);
                    let ptr = self.csm.var_ptr(ctx, lhs);
                    self.add_points_to(ptr, ObjectSet::singleton(cs_obj));
                }
                Stmt::Copy { lhs, rhs } => {
                    let src = self.csm.var_ptr(ctx, rhs);
                    let tgt = self.csm.var_ptr(ctx, lhs);
                    self.add_flow_edge(src, tgt, FlowKind::Assign);
                }
                Stmt::LoadStatic { lhs, field } => {
                    let src = self.csm.static_field_ptr(field);
                    let tgt = self.csm.var_ptr(ctx, lhs);
                    self.add_flow_edge(src, tgt, FlowKind::StaticLoad);
                }
                Stmt::StoreStatic { field, rhs } => {
                    let src = self.csm.var_ptr(ctx, rhs);
                    let tgt = self.csm.static_field_ptr(field);
                    self.add_flow_edge(src, tgt, FlowKind::StaticStore);
                }
                Stmt::Call { site } => self.process_call_stmt(ctx, site),
                // Field and array accesses become edges when the base
                // variable's points-to set grows; returns are linked at call
                // edges.
                Stmt::LoadField { .. }
                | Stmt::StoreField { .. }
                | Stmt::LoadArray { .. }
                | Stmt::StoreArray { .. }
                | Stmt::Return { .. } => {}
            }
        }
    }

    /// Handle a call statement at method-processing time. Static and special
    /// calls resolve immediately; dynamic calls wait for receiver objects,
    /// except in CHA mode where the hierarchy cone is expanded here.
    fn process_call_stmt(&mut self, ctx: ContextId, site: CallSiteId) {
        let program = self.program;
        let info = program.call_site(site);
        match info.kind {
            CallKind::Static | CallKind::Special => {
                let Some(target) = info.static_target else {
                    debug!(site = site.0, "static call without resolved target; skipped");
                    return;
                };
                let cs_site = self.csm.cs_call_site(ctx, site);
                let callee_ctx = self.selector.select_static(&mut self.csm.contexts, ctx, site);
                let callee = self.csm.cs_method(callee_ctx, target);
                if let (Some(recv), Some(this)) =
                    (info.recv, program.method(target).this_var)
                {
                    let src = self.csm.var_ptr(ctx, recv);
                    let tgt = self.csm.var_ptr(callee_ctx, this);
                    self.add_flow_edge(src, tgt, FlowKind::ThisPassing);
                }
                self.add_call_edge(CallEdge {
                    call_site: cs_site,
                    callee,
                    kind: info.kind,
                });
            }
            CallKind::Virtual | CallKind::Interface => {
                if self.options.call_graph_mode != CallGraphMode::Cha {
                    return;
                }
                let Some(declared) = info.declared_class else {
                    debug!(site = site.0, "dynamic call without declared class; skipped");
                    return;
                };
                let targets = program.hierarchy().resolve_cha(declared, info.callee_sig);
                let cs_site = self.csm.cs_call_site(ctx, site);
                for target in targets {
                    let callee_ctx =
                        self.selector.select_static(&mut self.csm.contexts, ctx, site);
                    let callee = self.csm.cs_method(callee_ctx, target);
                    if let (Some(recv), Some(this)) =
                        (info.recv, program.method(target).this_var)
                    {
                        let src = self.csm.var_ptr(ctx, recv);
                        let tgt = self.csm.var_ptr(callee_ctx, this);
                        self.add_flow_edge(src, tgt, FlowKind::ThisPassing);
                    }
                    self.add_call_edge(CallEdge {
                        call_site: cs_site,
                        callee,
                        kind: info.kind,
                    });
                }
            }
        }
    }

    /// Record a call edge; if new, make the callee reachable and link
    /// arguments to parameters and returns to the result variable
    fn process_call_edge(&mut self, edge: CallEdge) {
        if !self.call_graph.add_edge(edge) {
            return;
        }
        self.dispatch_new_call_edge(&edge);

        let (caller_ctx, site) = self.csm.cs_call_site_data(edge.call_site);
        let (callee_ctx, callee_m) = self.csm.cs_method_data(edge.callee);
        self.add_reachable(edge.callee);

        let program = self.program;
        let info = program.call_site(site);
        let callee = program.method(callee_m);
        for (&arg, &param) in info.args.iter().zip(callee.params.iter()) {
            let src = self.csm.var_ptr(caller_ctx, arg);
            let tgt = self.csm.var_ptr(callee_ctx, param);
            self.add_flow_edge(src, tgt, FlowKind::Parameter);
        }
        if let Some(result) = info.result {
            let tgt = self.csm.var_ptr(caller_ctx, result);
            for &ret in &callee.return_vars {
                let src = self.csm.var_ptr(callee_ctx, ret);
                self.add_flow_edge(src, tgt, FlowKind::Return);
            }
        }
    }

    /// Core propagation step: fold the delta into the pointer's set, push it
    /// along outgoing PFG edges, and react to receiver-variable growth
    fn process_entry(&mut self, pointer: PointerId, objects: ObjectSet) -> Result<()> {
        self.stats.entries_processed += 1;
        let delta = objects.difference(self.points_to_of(pointer));
        if delta.is_empty() {
            return Ok(());
        }

        let idx = pointer.0 as usize;
        if idx >= self.points_to.len() {
            self.points_to.resize_with(idx + 1, ObjectSet::new);
        }
        let added = self.points_to[idx].union_with(&delta);
        if added != delta.len() {
            // A shrinking or double-counted set would void the termination
            // and soundness argument
            return Err(PtaError::invariant(format!(
                "points-to set of pointer {} grew by {} objects, expected {}",
                pointer.0,
                added,
                delta.len()
            )));
        }
        self.stats.objects_propagated += added;

        let succs: Vec<_> = self.pfg.succs_of(pointer).to_vec();
        for edge in succs {
            self.add_points_to(edge.target, delta.clone());
        }

        if let PointerKey::Var(ctx, var) = self.csm.pointer_key(pointer) {
            self.process_var_growth(ctx, var, &delta);
        }

        self.dispatch_new_points_to(pointer, &delta);
        Ok(())
    }

    /// A variable's points-to set grew: materialize the field/array accesses
    /// anchored on it for each new object, and re-resolve dynamic call sites
    /// it is a receiver of
    fn process_var_growth(&mut self, ctx: ContextId, var: VarId, delta: &ObjectSet) {
        let program = self.program;
        let uses = program.uses_of(var);

        for &(field, lhs) in &uses.field_loads {
            let tgt = self.csm.var_ptr(ctx, lhs);
            for obj in delta.iter() {
                let src = self.csm.instance_field_ptr(obj, field);
                self.add_flow_edge(src, tgt, FlowKind::InstanceLoad);
            }
        }
        for &(field, rhs) in &uses.field_stores {
            let src = self.csm.var_ptr(ctx, rhs);
            for obj in delta.iter() {
                let tgt = self.csm.instance_field_ptr(obj, field);
                self.add_flow_edge(src, tgt, FlowKind::InstanceStore);
            }
        }
        for &lhs in &uses.array_loads {
            let tgt = self.csm.var_ptr(ctx, lhs);
            for obj in delta.iter() {
                let src = self.csm.array_ptr(obj);
                self.add_flow_edge(src, tgt, FlowKind::ArrayLoad);
            }
        }
        for &rhs in &uses.array_stores {
            let src = self.csm.var_ptr(ctx, rhs);
            for obj in delta.iter() {
                let tgt = self.csm.array_ptr(obj);
                self.add_flow_edge(src, tgt, FlowKind::ArrayStore);
            }
        }

        if self.options.call_graph_mode != CallGraphMode::OnTheFly {
            return;
        }
        for &site in &uses.invokes {
            let info = program.call_site(site);
            if !info.kind.is_dynamic() {
                continue;
            }
            for obj in delta.iter() {
                self.resolve_dynamic_call(ctx, site, obj);
            }
        }
    }

    /// Resolve one dynamic call site against one newly observed receiver
    /// object: dispatch, select the callee context, seed `this`, and queue
    /// the call edge. Dispatch misses become unresolved-call events.
    fn resolve_dynamic_call(&mut self, ctx: ContextId, site: CallSiteId, recv_obj: CsObjId) {
        let program = self.program;
        let info = program.call_site(site);
        let (heap_ctx, obj) = self.csm.cs_obj_data(recv_obj);
        let ty = self.heap.object_type(obj);

        let Some(target) = program.hierarchy().dispatch(ty, info.callee_sig) else {
            self.stats.unresolved_calls += 1;
            debug!(
                site = site.0,
                recv_type = program.hierarchy().class_name(ty),
                "unresolved dynamic dispatch forwarded to plugins"
            );
            self.dispatch_unresolved_call(recv_obj, ctx, site);
            return;
        };

        let recv = ReceiverInfo {
            heap_context: heap_ctx,
            obj,
            ty,
        };
        let callee_ctx = self
            .selector
            .select_instance(&mut self.csm.contexts, ctx, site, recv);
        let callee = self.csm.cs_method(callee_ctx, target);
        if let Some(this) = program.method(target).this_var {
            let this_ptr = self.csm.var_ptr(callee_ctx, this);
            self.add_points_to(this_ptr, ObjectSet::singleton(recv_obj));
        }
        let cs_site = self.csm.cs_call_site(ctx, site);
        self.add_call_edge(CallEdge {
            call_site: cs_site,
            callee,
            kind: info.kind,
        });
    }

    /// Add a PFG edge; a new edge immediately propagates the source's
    /// current set to the target
    fn add_flow_edge(&mut self, source: PointerId, target: PointerId, kind: FlowKind) {
        if self.pfg.add_edge(source, target, kind) {
            let pts = self.points_to_of(source).clone();
            self.add_points_to(target, pts);
        }
    }

    /// Post-quiescence audit: every PFG edge carries a subset obligation
    fn audit_fixed_point(&self) -> Result<()> {
        for (source, edge) in self.pfg.edges() {
            let src = self.points_to_of(source);
            let tgt = self.points_to_of(edge.target);
            if !src.is_subset_of(tgt) {
                return Err(PtaError::invariant(format!(
                    "fixed point violated on edge {} -> {} ({:?})",
                    source.0, edge.target.0, edge.kind
                )));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Plugin dispatch (registration order; injections only touch queues)
    // ------------------------------------------------------------------

    fn dispatch_start(&mut self) {
        let mut plugins = std::mem::take(&mut self.plugins);
        for p in plugins.iter_mut() {
            p.on_start(self);
        }
        self.plugins = plugins;
    }

    fn dispatch_finish(&mut self) {
        let mut plugins = std::mem::take(&mut self.plugins);
        for p in plugins.iter_mut() {
            p.on_finish(self);
        }
        self.plugins = plugins;
    }

    fn dispatch_new_points_to(&mut self, pointer: PointerId, delta: &ObjectSet) {
        let mut plugins = std::mem::take(&mut self.plugins);
        for p in plugins.iter_mut() {
            p.on_new_points_to(self, pointer, delta);
        }
        self.plugins = plugins;
    }

    fn dispatch_new_call_edge(&mut self, edge: &CallEdge) {
        let mut plugins = std::mem::take(&mut self.plugins);
        for p in plugins.iter_mut() {
            p.on_new_call_edge(self, edge);
        }
        self.plugins = plugins;
    }

    fn dispatch_new_method(&mut self, method: CsMethodId) {
        let mut plugins = std::mem::take(&mut self.plugins);
        for p in plugins.iter_mut() {
            p.on_new_method(self, method);
        }
        self.plugins = plugins;
    }

    fn dispatch_new_stmt(&mut self, stmt: StmtRef, method: CsMethodId) {
        let mut plugins = std::mem::take(&mut self.plugins);
        for p in plugins.iter_mut() {
            p.on_new_stmt(self, stmt, method);
        }
        self.plugins = plugins;
    }

    fn dispatch_unresolved_call(&mut self, recv: CsObjId, context: ContextId, site: CallSiteId) {
        let mut plugins = std::mem::take(&mut self.plugins);
        for p in plugins.iter_mut() {
            p.on_unresolved_call(self, recv, context, site);
        }
        self.plugins = plugins;
    }
}

//! Analysis facade
//!
//! [`PointerAnalysis`] is the entry point for embedders: validate a
//! configuration, attach plugins, run the solver, get back an immutable
//! [`AnalysisResult`] with the query API. Configuration problems fail here,
//! before any solving starts.

use crate::domain::{
    ContextId, CsCallGraph, CsObjId, HeapModel, HeapPolicy, ObjId, ObjectSet, PointerId,
};
use crate::errors::{PtaError, Result};
use crate::infrastructure::context_selector::{ContextSelector, ContextStrategy};
use crate::infrastructure::cs_manager::{CsManager, PointerKey};
use crate::infrastructure::plugin::Plugin;
use crate::infrastructure::solver::{CallGraphMode, Solver, SolverOptions, SolverStats};
use crate::ir::{FieldId, MethodId, Program, TypeId, VarId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Analysis configuration, loadable from YAML.
///
/// ```yaml
/// context: 2-obj+1-heap
/// heap-policy: per-site
/// call-graph-mode: on-the-fly
/// time-limit-ms: 60000
/// entry-points: [0]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AnalysisConfig {
    /// Context-sensitivity descriptor ("ci", "2-obj", "1-call", "2-type",
    /// optionally "+<h>-heap")
    pub context: ContextStrategy,
    pub heap_policy: HeapPolicy,
    pub call_graph_mode: CallGraphMode,
    /// Wall-clock budget in milliseconds; `None` means unbounded
    pub time_limit_ms: Option<u64>,
    pub entry_points: Vec<MethodId>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            context: ContextStrategy::default(),
            heap_policy: HeapPolicy::default(),
            call_graph_mode: CallGraphMode::default(),
            time_limit_ms: None,
            entry_points: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| PtaError::config(format!("invalid analysis config: {}", e)))
    }

    /// Check the configuration against the program it will analyze
    fn validate(&self, program: &Program) -> Result<()> {
        if self.entry_points.is_empty() {
            return Err(PtaError::config("no entry points configured"));
        }
        for &m in &self.entry_points {
            if !program.contains_method(m) {
                return Err(PtaError::config(format!(
                    "entry point {} is not a method of the program",
                    m.0
                )));
            }
        }
        if self.time_limit_ms == Some(0) {
            return Err(PtaError::config("time limit of 0 ms would abort immediately"));
        }
        Ok(())
    }
}

/// A configured, ready-to-run pointer analysis
pub struct PointerAnalysis<'p> {
    program: &'p Program,
    config: AnalysisConfig,
    plugins: Vec<Box<dyn Plugin>>,
    abort_flag: Option<Arc<AtomicBool>>,
}

impl<'p> PointerAnalysis<'p> {
    /// Validate `config` against `program`. All configuration errors surface
    /// here; `run` can only fail on internal invariant violations.
    pub fn new(program: &'p Program, config: AnalysisConfig) -> Result<Self> {
        config.validate(program)?;
        Ok(Self {
            program,
            config,
            plugins: Vec::new(),
            abort_flag: None,
        })
    }

    /// Attach a plugin; dispatch order is attachment order
    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Attach an abort flag the embedder may set from another thread
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort_flag = Some(flag);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the solver to completion (or abort) and freeze the result
    pub fn run(self) -> Result<AnalysisResult<'p>> {
        let options = SolverOptions {
            call_graph_mode: self.config.call_graph_mode,
            time_limit: self.config.time_limit_ms.map(Duration::from_millis),
            abort_flag: self.abort_flag,
        };
        let mut solver = Solver::new(
            self.program,
            ContextSelector::new(self.config.context),
            HeapModel::new(self.config.heap_policy),
            options,
        );
        for plugin in self.plugins {
            solver.register_plugin(plugin);
        }
        for &m in &self.config.entry_points {
            solver.add_entry_point(m);
        }
        let outcome = solver.solve()?;
        Ok(AnalysisResult {
            program: self.program,
            csm: outcome.csm,
            heap: outcome.heap,
            points_to: outcome.points_to,
            call_graph: outcome.call_graph,
            stats: outcome.stats,
        })
    }
}

/// Immutable result of one analysis run
pub struct AnalysisResult<'p> {
    program: &'p Program,
    csm: CsManager,
    heap: HeapModel,
    points_to: Vec<ObjectSet>,
    call_graph: CsCallGraph,
    stats: SolverStats,
}

impl<'p> AnalysisResult<'p> {
    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn call_graph(&self) -> &CsCallGraph {
        &self.call_graph
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn stats_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.stats)
            .map_err(|e| PtaError::invariant(format!("stats serialization failed: {}", e)))
    }

    fn pts(&self, ptr: PointerId) -> &ObjectSet {
        self.points_to
            .get(ptr.0 as usize)
            .unwrap_or_else(|| ObjectSet::empty_ref())
    }

    /// Points-to set of a variable under one specific context. Empty if the
    /// pair was never observed.
    pub fn points_to(&self, context: ContextId, var: VarId) -> &ObjectSet {
        match self.csm.find_pointer(PointerKey::Var(context, var)) {
            Some(ptr) => self.pts(ptr),
            None => ObjectSet::empty_ref(),
        }
    }

    /// Points-to set of an instance field of one abstract object
    pub fn field_points_to(&self, obj: CsObjId, field: FieldId) -> &ObjectSet {
        match self.csm.find_pointer(PointerKey::InstanceField(obj, field)) {
            Some(ptr) => self.pts(ptr),
            None => ObjectSet::empty_ref(),
        }
    }

    pub fn static_field_points_to(&self, field: FieldId) -> &ObjectSet {
        match self.csm.find_pointer(PointerKey::StaticField(field)) {
            Some(ptr) => self.pts(ptr),
            None => ObjectSet::empty_ref(),
        }
    }

    /// Context-insensitive projection: the variable's points-to sets merged
    /// across all contexts, with heap contexts erased. Sorted, deduplicated.
    pub fn ci_points_to(&self, var: VarId) -> Vec<ObjId> {
        let mut objs = Vec::new();
        for (ptr, key) in self.csm.pointer_keys() {
            if let PointerKey::Var(_, v) = key {
                if v == var {
                    for cs_obj in self.pts(ptr).iter() {
                        let (_, o) = self.csm.cs_obj_data(cs_obj);
                        objs.push(o);
                    }
                }
            }
        }
        objs.sort_unstable();
        objs.dedup();
        objs
    }

    /// Whether two variables may refer to the same abstract object under any
    /// context (on the context-insensitive projection)
    pub fn may_alias(&self, a: VarId, b: VarId) -> bool {
        let pa = self.ci_points_to(a);
        if pa.is_empty() {
            return false;
        }
        let pb = self.ci_points_to(b);
        let (mut i, mut j) = (0, 0);
        while i < pa.len() && j < pb.len() {
            match pa[i].cmp(&pb[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// Reachable methods with contexts erased, in discovery order
    pub fn reachable_methods(&self) -> Vec<MethodId> {
        let mut seen = Vec::new();
        for &cm in self.call_graph.reachable_methods() {
            let (_, m) = self.csm.cs_method_data(cm);
            if !seen.contains(&m) {
                seen.push(m);
            }
        }
        seen
    }

    pub fn is_reachable(&self, method: MethodId) -> bool {
        self.call_graph
            .reachable_methods()
            .iter()
            .any(|&cm| self.csm.cs_method_data(cm).1 == method)
    }

    /// Call edges with contexts erased, as (call site, callee) pairs,
    /// deduplicated in discovery order
    pub fn ci_call_edges(&self) -> Vec<(crate::ir::CallSiteId, MethodId)> {
        let mut out = Vec::new();
        for edge in self.call_graph.edges() {
            let (_, site) = self.csm.cs_call_site_data(edge.call_site);
            let (_, m) = self.csm.cs_method_data(edge.callee);
            if !out.contains(&(site, m)) {
                out.push((site, m));
            }
        }
        out
    }

    pub fn object_type(&self, obj: ObjId) -> TypeId {
        self.heap.object_type(obj)
    }

    /// Registry access for custom queries
    pub fn csm(&self) -> &CsManager {
        &self.csm
    }
}

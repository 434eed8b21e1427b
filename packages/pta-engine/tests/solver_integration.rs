//! End-to-end analysis scenarios through the public facade

use pretty_assertions::assert_eq;
use pta_engine::{
    AnalysisConfig, AnalysisResult, CallEdge, CallGraphMode, ContextId, CsObjId, MethodId, ObjId,
    Plugin, PointerAnalysis, Program, ProgramBuilder, Solver, VarId,
};
use pta_engine::ir::CallSiteId;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn run<'p>(program: &'p Program, entry: MethodId, context: &str) -> AnalysisResult<'p> {
    let config = AnalysisConfig {
        context: context.parse().unwrap(),
        entry_points: vec![entry],
        ..Default::default()
    };
    PointerAnalysis::new(program, config).unwrap().run().unwrap()
}

/// Two Box instances, each set/get once. The classic context-sensitivity
/// litmus test: 2-obj keeps the boxes apart, ci conflates them.
struct BoxProgram {
    program: Program,
    main: MethodId,
    a: VarId,
    b: VarId,
    ra: VarId,
    rb: VarId,
}

fn box_program() -> BoxProgram {
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let boxed = bld.add_class("Box", Some(obj));
    let ty_a = bld.add_class("A", Some(obj));
    let ty_b = bld.add_class("B", Some(obj));
    let f = bld.field("value");

    // Box.set(v) { this.value = v }
    let set = bld.add_method(boxed, "set", false);
    let set_this = bld.this_var(set).unwrap();
    let v = bld.add_param(set, "v");
    bld.store_field(set, set_this, f, v);

    // Box.get() { return this.value }
    let get = bld.add_method(boxed, "get", false);
    let get_this = bld.this_var(get).unwrap();
    let r = bld.add_local(get, "r");
    bld.load_field(get, r, get_this, f);
    bld.ret(get, Some(r));

    // main:
    //   box1 = new Box; box2 = new Box
    //   a = new A; b = new B
    //   box1.set(a); box2.set(b)
    //   ra = box1.get(); rb = box2.get()
    let main = bld.add_method(obj, "main", true);
    let box1 = bld.add_local(main, "box1");
    let box2 = bld.add_local(main, "box2");
    let a = bld.add_local(main, "a");
    let b = bld.add_local(main, "b");
    let ra = bld.add_local(main, "ra");
    let rb = bld.add_local(main, "rb");
    bld.new_object(main, box1, boxed);
    bld.new_object(main, box2, boxed);
    bld.new_object(main, a, ty_a);
    bld.new_object(main, b, ty_b);
    bld.call_virtual(main, boxed, "set", box1, vec![a], None);
    bld.call_virtual(main, boxed, "set", box2, vec![b], None);
    bld.call_virtual(main, boxed, "get", box1, vec![], Some(ra));
    bld.call_virtual(main, boxed, "get", box2, vec![], Some(rb));

    BoxProgram {
        program: bld.finish(),
        main,
        a,
        b,
        ra,
        rb,
    }
}

#[test]
fn object_sensitivity_separates_box_contents() {
    let p = box_program();
    let result = run(&p.program, p.main, "2-obj");

    assert_eq!(result.ci_points_to(p.ra), result.ci_points_to(p.a));
    assert_eq!(result.ci_points_to(p.rb), result.ci_points_to(p.b));
    assert!(!result.may_alias(p.ra, p.rb));
}

#[test]
fn context_insensitive_conflates_box_contents() {
    let p = box_program();
    let result = run(&p.program, p.main, "ci");

    // Sound but imprecise: both boxes share one `this`, so both gets see
    // both stored objects
    assert!(result.may_alias(p.ra, p.rb));
    assert_eq!(result.ci_points_to(p.ra).len(), 2);
}

#[test]
fn call_site_sensitivity_also_separates_boxes() {
    let p = box_program();
    let result = run(&p.program, p.main, "1-call");

    // 1-CFA distinguishes the two set() and the two get() call sites, which
    // is enough to keep the boxes apart here
    assert!(!result.may_alias(p.ra, p.rb));
}

#[test]
fn virtual_dispatch_resolves_per_observed_receiver_type() {
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let animal = bld.add_class("Animal", Some(obj));
    let cat = bld.add_class("Cat", Some(animal));
    let dog = bld.add_class("Dog", Some(animal));
    let fish = bld.add_class("Fish", Some(animal));
    let _speak_animal = bld.add_method(animal, "speak", false);
    let speak_cat = bld.add_method(cat, "speak", false);
    let speak_dog = bld.add_method(dog, "speak", false);
    let speak_fish = bld.add_method(fish, "speak", false);

    let main = bld.add_method(obj, "main", true);
    let pet = bld.add_local(main, "pet");
    bld.new_object(main, pet, cat);
    bld.new_object(main, pet, dog);
    let site = bld.call_virtual(main, animal, "speak", pet, vec![], None);
    let program = bld.finish();

    let result = run(&program, main, "2-obj");
    let edges = result.ci_call_edges();
    assert!(edges.contains(&(site, speak_cat)));
    assert!(edges.contains(&(site, speak_dog)));
    assert!(!edges.iter().any(|&(_, m)| m == speak_fish));
    assert_eq!(edges.len(), 2);
}

#[test]
fn cha_mode_covers_the_whole_hierarchy_cone() {
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let animal = bld.add_class("Animal", Some(obj));
    let cat = bld.add_class("Cat", Some(animal));
    let dog = bld.add_class("Dog", Some(animal));
    let speak_animal = bld.add_method(animal, "speak", false);
    let speak_cat = bld.add_method(cat, "speak", false);
    let speak_dog = bld.add_method(dog, "speak", false);

    let main = bld.add_method(obj, "main", true);
    let pet = bld.add_local(main, "pet");
    bld.new_object(main, pet, cat);
    bld.call_virtual(main, animal, "speak", pet, vec![], None);
    let program = bld.finish();

    let config = AnalysisConfig {
        context: "ci".parse().unwrap(),
        call_graph_mode: CallGraphMode::Cha,
        entry_points: vec![main],
        ..Default::default()
    };
    let result = PointerAnalysis::new(&program, config).unwrap().run().unwrap();

    // CHA ignores points-to information: every override in the declared
    // type's cone becomes a callee, even though only a Cat flows here
    let callees: Vec<MethodId> = result.ci_call_edges().iter().map(|&(_, m)| m).collect();
    assert!(callees.contains(&speak_animal));
    assert!(callees.contains(&speak_cat));
    assert!(callees.contains(&speak_dog));
}

#[test]
fn type_sensitivity_is_coarser_than_object_sensitivity() {
    // Two factories of the same class produce boxes at different sites;
    // 1-obj separates them, 1-type merges them (same allocating type).
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let boxed = bld.add_class("Box", Some(obj));
    let ty_a = bld.add_class("A", Some(obj));
    let ty_b = bld.add_class("B", Some(obj));
    let f = bld.field("value");

    let set = bld.add_method(boxed, "set", false);
    let set_this = bld.this_var(set).unwrap();
    let v = bld.add_param(set, "v");
    bld.store_field(set, set_this, f, v);

    let get = bld.add_method(boxed, "get", false);
    let get_this = bld.this_var(get).unwrap();
    let r = bld.add_local(get, "r");
    bld.load_field(get, r, get_this, f);
    bld.ret(get, Some(r));

    let main = bld.add_method(obj, "main", true);
    let box1 = bld.add_local(main, "box1");
    let box2 = bld.add_local(main, "box2");
    let a = bld.add_local(main, "a");
    let b = bld.add_local(main, "b");
    let ra = bld.add_local(main, "ra");
    let rb = bld.add_local(main, "rb");
    bld.new_object(main, box1, boxed);
    bld.new_object(main, box2, boxed);
    bld.new_object(main, a, ty_a);
    bld.new_object(main, b, ty_b);
    bld.call_virtual(main, boxed, "set", box1, vec![a], None);
    bld.call_virtual(main, boxed, "set", box2, vec![b], None);
    bld.call_virtual(main, boxed, "get", box1, vec![], Some(ra));
    bld.call_virtual(main, boxed, "get", box2, vec![], Some(rb));
    let program = bld.finish();

    let obj_result = run(&program, main, "1-obj");
    assert!(!obj_result.may_alias(ra, rb));

    // Both receivers carry the context [Box-object], but 1-obj contexts are
    // allocation *sites*, which differ; 1-type contexts are allocation
    // *types*, which coincide
    let type_result = run(&program, main, "1-type");
    assert!(type_result.may_alias(ra, rb));
}

#[test]
fn merged_heap_policy_conflates_same_type_sites() {
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let t = bld.add_class("T", Some(obj));
    let main = bld.add_method(obj, "main", true);
    let x = bld.add_local(main, "x");
    let y = bld.add_local(main, "y");
    bld.new_object(main, x, t);
    bld.new_object(main, y, t);
    let program = bld.finish();

    let per_site = run(&program, main, "ci");
    assert!(!per_site.may_alias(x, y));

    let config = AnalysisConfig {
        context: "ci".parse().unwrap(),
        heap_policy: pta_engine::HeapPolicy::MergedByType,
        entry_points: vec![main],
        ..Default::default()
    };
    let merged = PointerAnalysis::new(&program, config).unwrap().run().unwrap();
    assert!(merged.may_alias(x, y));
}

#[test]
fn static_fields_are_context_free_globals() {
    // Writer and reader methods communicate only through a static field
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let t = bld.add_class("T", Some(obj));
    let g = bld.field("G");

    let writer = bld.add_method(obj, "writer", true);
    let w = bld.add_local(writer, "w");
    bld.new_object(writer, w, t);
    bld.store_static(writer, g, w);

    let reader = bld.add_method(obj, "reader", true);
    let r = bld.add_local(reader, "r");
    bld.load_static(reader, r, g);
    bld.ret(reader, Some(r));

    let main = bld.add_method(obj, "main", true);
    let out = bld.add_local(main, "out");
    bld.call_static(main, writer, vec![], None);
    bld.call_static(main, reader, vec![], Some(out));
    let program = bld.finish();

    let result = run(&program, main, "2-obj");
    assert_eq!(result.ci_points_to(out), result.ci_points_to(w));
    assert_eq!(result.ci_points_to(out).len(), 1);
}

#[test]
fn array_elements_are_merged_per_object() {
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let arr = bld.add_class("Object[]", Some(obj));
    let ty_a = bld.add_class("A", Some(obj));
    let ty_b = bld.add_class("B", Some(obj));
    let main = bld.add_method(obj, "main", true);
    let xs = bld.add_local(main, "xs");
    let a = bld.add_local(main, "a");
    let b = bld.add_local(main, "b");
    let got = bld.add_local(main, "got");
    bld.new_object(main, xs, arr);
    bld.new_object(main, a, ty_a);
    bld.new_object(main, b, ty_b);
    bld.store_array(main, xs, a);
    bld.store_array(main, xs, b);
    bld.load_array(main, got, xs);
    let program = bld.finish();

    let result = run(&program, main, "ci");
    // One element pointer per array object: both stores land in it
    assert_eq!(result.ci_points_to(got).len(), 2);
    assert!(result.may_alias(got, a));
    assert!(result.may_alias(got, b));
}

/// A plugin that observes everything and injects nothing. The analysis
/// result must be identical with and without it.
#[derive(Default)]
struct CountingPlugin {
    events: Arc<AtomicUsize>,
}

impl Plugin for CountingPlugin {
    fn name(&self) -> &str {
        "counting"
    }

    fn on_new_points_to(
        &mut self,
        _solver: &mut Solver<'_>,
        _pointer: pta_engine::PointerId,
        _delta: &pta_engine::ObjectSet,
    ) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    fn on_new_call_edge(&mut self, _solver: &mut Solver<'_>, _edge: &CallEdge) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    fn on_new_method(&mut self, _solver: &mut Solver<'_>, _method: pta_engine::CsMethodId) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn observer_plugin_does_not_perturb_results() {
    let p = box_program();
    let plain = run(&p.program, p.main, "2-obj");

    let events = Arc::new(AtomicUsize::new(0));
    let config = AnalysisConfig {
        context: "2-obj".parse().unwrap(),
        entry_points: vec![p.main],
        ..Default::default()
    };
    let observed = PointerAnalysis::new(&p.program, config)
        .unwrap()
        .with_plugin(Box::new(CountingPlugin {
            events: events.clone(),
        }))
        .run()
        .unwrap();

    assert_eq!(plain.ci_points_to(p.ra), observed.ci_points_to(p.ra));
    assert_eq!(plain.ci_points_to(p.rb), observed.ci_points_to(p.rb));
    assert_eq!(plain.stats().call_edges, observed.stats().call_edges);
    assert!(events.load(Ordering::Relaxed) > 0);
}

/// A reflection-style model: when dispatch misses, route the call to a known
/// fallback method, injecting the edge through the public solver API.
struct ReflectionModel {
    fallback: MethodId,
    fired: Arc<AtomicUsize>,
}

impl Plugin for ReflectionModel {
    fn name(&self) -> &str {
        "reflection-model"
    }

    fn on_unresolved_call(
        &mut self,
        solver: &mut Solver<'_>,
        recv: CsObjId,
        context: ContextId,
        site: CallSiteId,
    ) {
        self.fired.fetch_add(1, Ordering::Relaxed);
        let fallback = self.fallback;
        let cs_site = solver.csm_mut().cs_call_site(context, site);
        let callee = solver.csm_mut().cs_method(ContextId::EMPTY, fallback);
        if let Some(this) = solver.program().method(fallback).this_var {
            let this_ptr = solver.csm_mut().var_ptr(ContextId::EMPTY, this);
            solver.add_points_to(this_ptr, pta_engine::ObjectSet::singleton(recv));
        }
        solver.add_call_edge(CallEdge {
            call_site: cs_site,
            callee,
            kind: pta_engine::CallKind::Virtual,
        });
    }
}

#[test]
fn unresolved_calls_can_be_modeled_by_plugins() {
    // `handle` is defined on Handler only; the receiver set contains a Plain
    // object with no such method, so dispatch misses for it
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let handler = bld.add_class("Handler", Some(obj));
    let plain = bld.add_class("Plain", Some(obj));
    let handle = bld.add_method(handler, "handle", false);
    let fallback = bld.add_method(plain, "fallback", false);
    let fb_this = bld.this_var(fallback).unwrap();
    let fb_out = bld.add_local(fallback, "out");
    bld.copy(fallback, fb_out, fb_this);

    let main = bld.add_method(obj, "main", true);
    let r = bld.add_local(main, "r");
    bld.new_object(main, r, handler);
    bld.new_object(main, r, plain);
    bld.call_virtual(main, obj, "handle", r, vec![], None);
    let program = bld.finish();

    // Without the plugin: one unresolved call, one edge (Handler.handle)
    let bare = run(&program, main, "ci");
    assert_eq!(bare.stats().unresolved_calls, 1);
    assert_eq!(bare.stats().call_edges, 1);
    assert!(!bare.is_reachable(fallback));

    // With the plugin: the miss is routed to Plain.fallback and the injected
    // receiver flows through the fallback body
    let fired = Arc::new(AtomicUsize::new(0));
    let config = AnalysisConfig {
        context: "ci".parse().unwrap(),
        entry_points: vec![main],
        ..Default::default()
    };
    let modeled = PointerAnalysis::new(&program, config)
        .unwrap()
        .with_plugin(Box::new(ReflectionModel {
            fallback,
            fired: fired.clone(),
        }))
        .run()
        .unwrap();

    assert_eq!(fired.load(Ordering::Relaxed), 1);
    assert!(modeled.is_reachable(fallback));
    assert_eq!(modeled.stats().call_edges, 2);
    let through: Vec<ObjId> = modeled.ci_points_to(fb_out);
    assert_eq!(through.len(), 1);
    assert_eq!(modeled.object_type(through[0]), plain);
    assert!(modeled.is_reachable(handle));
}

#[test]
fn abort_flag_produces_partial_result() {
    let p = box_program();
    let flag = Arc::new(AtomicBool::new(true));
    let config = AnalysisConfig {
        context: "2-obj".parse().unwrap(),
        entry_points: vec![p.main],
        ..Default::default()
    };
    let result = PointerAnalysis::new(&p.program, config)
        .unwrap()
        .with_abort_flag(flag)
        .run()
        .unwrap();

    assert!(result.stats().partial);
    // Partial means under-approximate, never wrong: whatever is reported is
    // a subset of the full result (here: nothing was computed at all)
    assert!(result.ci_points_to(p.ra).is_empty());
}

#[test]
fn stats_reflect_the_run() {
    let p = box_program();
    let result = run(&p.program, p.main, "2-obj");
    let stats = result.stats();

    // main + set/get under two receiver contexts each
    assert_eq!(stats.reachable_methods, 5);
    assert_eq!(stats.call_edges, 4);
    assert!(stats.pointers > 0);
    assert!(stats.objects >= 4);
    assert!(stats.entries_processed > 0);
    assert_eq!(stats.unresolved_calls, 0);
    assert!(!stats.partial);

    let json = result.stats_json().unwrap();
    assert!(json.contains("\"reachable_methods\": 5"));
}

#[test]
fn recursive_list_build_terminates_with_bounded_contexts() {
    // build(n) { node = new Node; node.next = build(); return node }
    // modeled without integers: build calls itself unconditionally; the
    // k-limit is what makes the context space finite
    let mut bld = ProgramBuilder::new();
    let obj = bld.add_class("Object", None);
    let node = bld.add_class("Node", Some(obj));
    let next = bld.field("next");

    let build = bld.add_method(obj, "build", true);
    let n = bld.add_local(build, "n");
    let rest = bld.add_local(build, "rest");
    bld.new_object(build, n, node);
    bld.call_static(build, build, vec![], Some(rest));
    bld.store_field(build, n, next, rest);
    bld.ret(build, Some(n));

    let main = bld.add_method(obj, "main", true);
    let head = bld.add_local(main, "head");
    bld.call_static(main, build, vec![], Some(head));
    let program = bld.finish();

    let result = run(&program, main, "2-call");
    assert!(!result.stats().partial);
    assert!(!result.ci_points_to(head).is_empty());
    // 2-call keeps at most the two most recent call sites
    assert!(result.stats().contexts <= 8);
}

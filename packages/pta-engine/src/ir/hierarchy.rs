//! Class hierarchy and method dispatch
//!
//! Single-inheritance class table with per-class method tables. Queries are
//! synchronous, pure and side-effect-free — the solver calls them from inside
//! the fixed-point loop.
//!
//! A dispatch miss is `None`, never an error: it feeds the unresolved-call
//! plugin event.

use super::{MethodId, SigId, TypeId};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct ClassData {
    name: String,
    super_class: Option<TypeId>,
    /// Signature → most-specific definition in this class
    methods: FxHashMap<SigId, MethodId>,
    subclasses: Vec<TypeId>,
}

/// The class hierarchy used for method resolution and subtyping queries
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    classes: Vec<ClassData>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. The superclass, if any, must already exist.
    pub fn add_class(&mut self, name: impl Into<String>, super_class: Option<TypeId>) -> TypeId {
        let id = TypeId(self.classes.len() as u32);
        self.classes.push(ClassData {
            name: name.into(),
            super_class,
            methods: FxHashMap::default(),
            subclasses: Vec::new(),
        });
        if let Some(sup) = super_class {
            self.classes[sup.0 as usize].subclasses.push(id);
        }
        id
    }

    /// Record that `class` defines (or overrides) `sig` with body `method`
    pub fn define_method(&mut self, class: TypeId, sig: SigId, method: MethodId) {
        self.classes[class.0 as usize].methods.insert(sig, method);
    }

    pub fn class_name(&self, ty: TypeId) -> &str {
        &self.classes[ty.0 as usize].name
    }

    pub fn super_of(&self, ty: TypeId) -> Option<TypeId> {
        self.classes[ty.0 as usize].super_class
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Most-specific override lookup: walk from `ty` up the superclass chain
    /// and return the first definition of `sig`.
    pub fn dispatch(&self, ty: TypeId, sig: SigId) -> Option<MethodId> {
        let mut cur = Some(ty);
        while let Some(t) = cur {
            let data = &self.classes[t.0 as usize];
            if let Some(&m) = data.methods.get(&sig) {
                return Some(m);
            }
            cur = data.super_class;
        }
        None
    }

    /// Whether `sub` is `sup` or a transitive subclass of it
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut cur = Some(sub);
        while let Some(t) = cur {
            if t == sup {
                return true;
            }
            cur = self.classes[t.0 as usize].super_class;
        }
        false
    }

    /// CHA resolution: every method `sig` may dispatch to when the receiver's
    /// static type is `declared` — the declared type's own resolution plus
    /// the overrides in all transitive subclasses. Deduplicated, in
    /// deterministic order.
    pub fn resolve_cha(&self, declared: TypeId, sig: SigId) -> Vec<MethodId> {
        let mut targets = Vec::new();
        let mut stack = vec![declared];
        while let Some(t) = stack.pop() {
            if let Some(m) = self.dispatch(t, sig) {
                if !targets.contains(&m) {
                    targets.push(m);
                }
            }
            stack.extend(self.classes[t.0 as usize].subclasses.iter().copied());
        }
        targets.sort_unstable();
        targets
    }
}

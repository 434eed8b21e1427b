//! Canonicalizing registries for context-sensitive entities
//!
//! The solver exclusively owns one [`CsManager`]; nothing else constructs
//! CSVar/CSObj/CSMethod/CSCallSite values. Every entity is interned: at most
//! one id per distinct pair, so identity comparison is valid and ids can key
//! dense vectors.
//!
//! Pointers of all four kinds share one id space ([`PointerId`]) — the
//! pointer flow graph and the points-to table never care which kind a node
//! is, and the solver matches on [`PointerKey`] exhaustively where it does.

use crate::domain::{ContextId, ContextStore, CsCallSiteId, CsMethodId, CsObjId, ObjId, PointerId};
use crate::ir::{CallSiteId, FieldId, MethodId, VarId};
use rustc_hash::FxHashMap;

/// The closed set of pointer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKey {
    /// A context-sensitive variable (CSVar)
    Var(ContextId, VarId),
    /// An instance field of an abstract object
    InstanceField(CsObjId, FieldId),
    /// The merged element pointer of an array object
    ArrayIndex(CsObjId),
    /// A static field
    StaticField(FieldId),
}

/// Solver-owned canonicalizing registries
#[derive(Debug, Default)]
pub struct CsManager {
    pub contexts: ContextStore,

    cs_objs: Vec<(ContextId, ObjId)>,
    cs_obj_map: FxHashMap<(ContextId, ObjId), CsObjId>,

    cs_methods: Vec<(ContextId, MethodId)>,
    cs_method_map: FxHashMap<(ContextId, MethodId), CsMethodId>,

    cs_call_sites: Vec<(ContextId, CallSiteId)>,
    cs_call_site_map: FxHashMap<(ContextId, CallSiteId), CsCallSiteId>,

    pointers: Vec<PointerKey>,
    pointer_map: FxHashMap<PointerKey, PointerId>,
}

impl CsManager {
    pub fn new() -> Self {
        Self {
            contexts: ContextStore::new(),
            ..Default::default()
        }
    }

    pub fn cs_obj(&mut self, heap_context: ContextId, obj: ObjId) -> CsObjId {
        if let Some(&id) = self.cs_obj_map.get(&(heap_context, obj)) {
            return id;
        }
        let id = CsObjId(self.cs_objs.len() as u32);
        self.cs_objs.push((heap_context, obj));
        self.cs_obj_map.insert((heap_context, obj), id);
        id
    }

    pub fn cs_obj_data(&self, id: CsObjId) -> (ContextId, ObjId) {
        self.cs_objs[id.0 as usize]
    }

    pub fn cs_method(&mut self, context: ContextId, method: MethodId) -> CsMethodId {
        if let Some(&id) = self.cs_method_map.get(&(context, method)) {
            return id;
        }
        let id = CsMethodId(self.cs_methods.len() as u32);
        self.cs_methods.push((context, method));
        self.cs_method_map.insert((context, method), id);
        id
    }

    pub fn cs_method_data(&self, id: CsMethodId) -> (ContextId, MethodId) {
        self.cs_methods[id.0 as usize]
    }

    pub fn cs_call_site(&mut self, context: ContextId, site: CallSiteId) -> CsCallSiteId {
        if let Some(&id) = self.cs_call_site_map.get(&(context, site)) {
            return id;
        }
        let id = CsCallSiteId(self.cs_call_sites.len() as u32);
        self.cs_call_sites.push((context, site));
        self.cs_call_site_map.insert((context, site), id);
        id
    }

    pub fn cs_call_site_data(&self, id: CsCallSiteId) -> (ContextId, CallSiteId) {
        self.cs_call_sites[id.0 as usize]
    }

    pub fn var_ptr(&mut self, context: ContextId, var: VarId) -> PointerId {
        self.intern_pointer(PointerKey::Var(context, var))
    }

    pub fn instance_field_ptr(&mut self, obj: CsObjId, field: FieldId) -> PointerId {
        self.intern_pointer(PointerKey::InstanceField(obj, field))
    }

    pub fn array_ptr(&mut self, obj: CsObjId) -> PointerId {
        self.intern_pointer(PointerKey::ArrayIndex(obj))
    }

    pub fn static_field_ptr(&mut self, field: FieldId) -> PointerId {
        self.intern_pointer(PointerKey::StaticField(field))
    }

    fn intern_pointer(&mut self, key: PointerKey) -> PointerId {
        if let Some(&id) = self.pointer_map.get(&key) {
            return id;
        }
        let id = PointerId(self.pointers.len() as u32);
        self.pointers.push(key);
        self.pointer_map.insert(key, id);
        id
    }

    pub fn pointer_key(&self, id: PointerId) -> PointerKey {
        self.pointers[id.0 as usize]
    }

    /// Non-interning lookup, for read-only queries after solving
    pub fn find_pointer(&self, key: PointerKey) -> Option<PointerId> {
        self.pointer_map.get(&key).copied()
    }

    pub fn find_cs_method(&self, context: ContextId, method: MethodId) -> Option<CsMethodId> {
        self.cs_method_map.get(&(context, method)).copied()
    }

    /// All interned pointers with their keys, in id order
    pub fn pointer_keys(&self) -> impl Iterator<Item = (PointerId, PointerKey)> + '_ {
        self.pointers
            .iter()
            .enumerate()
            .map(|(i, &k)| (PointerId(i as u32), k))
    }

    pub fn num_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn num_cs_objs(&self) -> usize {
        self.cs_objs.len()
    }

    pub fn num_cs_methods(&self) -> usize {
        self.cs_methods.len()
    }

    pub fn num_contexts(&self) -> usize {
        self.contexts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cs_obj_canonical() {
        let mut csm = CsManager::new();
        let a = csm.cs_obj(ContextId::EMPTY, ObjId(1));
        let b = csm.cs_obj(ContextId::EMPTY, ObjId(1));
        assert_eq!(a, b);
        assert_eq!(csm.num_cs_objs(), 1);

        let ctx = csm.contexts.intern(vec![9]);
        let c = csm.cs_obj(ctx, ObjId(1));
        assert_ne!(a, c);
        assert_eq!(csm.cs_obj_data(c), (ctx, ObjId(1)));
    }

    #[test]
    fn test_pointer_kinds_do_not_collide() {
        let mut csm = CsManager::new();
        let obj = csm.cs_obj(ContextId::EMPTY, ObjId(0));
        let p1 = csm.var_ptr(ContextId::EMPTY, VarId(0));
        let p2 = csm.instance_field_ptr(obj, FieldId(0));
        let p3 = csm.array_ptr(obj);
        let p4 = csm.static_field_ptr(FieldId(0));
        let all = [p1, p2, p3, p4];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(csm.pointer_key(p3), PointerKey::ArrayIndex(obj));
    }

    #[test]
    fn test_find_does_not_intern() {
        let mut csm = CsManager::new();
        assert_eq!(csm.find_pointer(PointerKey::StaticField(FieldId(3))), None);
        assert_eq!(csm.num_pointers(), 0);

        let p = csm.static_field_ptr(FieldId(3));
        assert_eq!(csm.find_pointer(PointerKey::StaticField(FieldId(3))), Some(p));
    }

    #[test]
    fn test_cs_method_and_call_site_canonical() {
        let mut csm = CsManager::new();
        let m1 = csm.cs_method(ContextId::EMPTY, MethodId(4));
        let m2 = csm.cs_method(ContextId::EMPTY, MethodId(4));
        assert_eq!(m1, m2);
        assert_eq!(csm.find_cs_method(ContextId::EMPTY, MethodId(4)), Some(m1));

        let c1 = csm.cs_call_site(ContextId::EMPTY, CallSiteId(2));
        let c2 = csm.cs_call_site(ContextId::EMPTY, CallSiteId(2));
        assert_eq!(c1, c2);
        assert_eq!(csm.cs_call_site_data(c1), (ContextId::EMPTY, CallSiteId(2)));
    }
}

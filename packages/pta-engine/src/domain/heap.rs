//! Heap abstraction
//!
//! Maps unboundedly many runtime objects to a finite set of abstract
//! objects. Two policies:
//! - **Per-site** (distinct): one abstract object per allocation site
//! - **Merged-by-type**: all sites of the same declared type collapse to one
//!   representative, trading precision for space
//!
//! `get_object` is deterministic and memoized — repeated calls for the same
//! inputs return the same object identity, and objects are never removed.

use crate::ir::{AllocId, TypeId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Heap-abstraction policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeapPolicy {
    /// One abstract object per allocation site
    #[default]
    PerSite,
    /// One abstract object per declared type
    MergedByType,
}

/// Abstract-object handle (context-free half of a CSObj)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

/// An abstract heap object
#[derive(Debug, Clone, Copy)]
pub struct AbstractObject {
    pub ty: TypeId,
    /// Originating allocation site; `None` for a merged-by-type
    /// representative
    pub site: Option<AllocId>,
}

/// The heap model: allocation sites → abstract objects
#[derive(Debug, Clone)]
pub struct HeapModel {
    policy: HeapPolicy,
    objects: Vec<AbstractObject>,
    by_site: FxHashMap<AllocId, ObjId>,
    by_type: FxHashMap<TypeId, ObjId>,
}

impl HeapModel {
    pub fn new(policy: HeapPolicy) -> Self {
        Self {
            policy,
            objects: Vec::new(),
            by_site: FxHashMap::default(),
            by_type: FxHashMap::default(),
        }
    }

    pub fn policy(&self) -> HeapPolicy {
        self.policy
    }

    /// The abstract object modeling an allocation of `ty` at `site`
    pub fn get_object(&mut self, site: AllocId, ty: TypeId) -> ObjId {
        match self.policy {
            HeapPolicy::PerSite => {
                if let Some(&o) = self.by_site.get(&site) {
                    return o;
                }
                let o = self.push(AbstractObject {
                    ty,
                    site: Some(site),
                });
                self.by_site.insert(site, o);
                o
            }
            HeapPolicy::MergedByType => {
                if let Some(&o) = self.by_type.get(&ty) {
                    return o;
                }
                let o = self.push(AbstractObject { ty, site: None });
                self.by_type.insert(ty, o);
                o
            }
        }
    }

    fn push(&mut self, obj: AbstractObject) -> ObjId {
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(obj);
        id
    }

    pub fn object(&self, id: ObjId) -> AbstractObject {
        self.objects[id.0 as usize]
    }

    pub fn object_type(&self, id: ObjId) -> TypeId {
        self.objects[id.0 as usize].ty
    }

    /// Number of abstract objects created so far
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_site_is_memoized() {
        let mut heap = HeapModel::new(HeapPolicy::PerSite);
        let a = heap.get_object(AllocId(0), TypeId(1));
        let b = heap.get_object(AllocId(0), TypeId(1));
        assert_eq!(a, b);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.object(a).site, Some(AllocId(0)));
    }

    #[test]
    fn test_per_site_distinguishes_sites_of_same_type() {
        let mut heap = HeapModel::new(HeapPolicy::PerSite);
        let a = heap.get_object(AllocId(0), TypeId(1));
        let b = heap.get_object(AllocId(1), TypeId(1));
        assert_ne!(a, b);
        assert_eq!(heap.object_type(a), heap.object_type(b));
    }

    #[test]
    fn test_merged_collapses_by_type() {
        let mut heap = HeapModel::new(HeapPolicy::MergedByType);
        let a = heap.get_object(AllocId(0), TypeId(1));
        let b = heap.get_object(AllocId(7), TypeId(1));
        let c = heap.get_object(AllocId(8), TypeId(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.object(a).site, None);
    }
}

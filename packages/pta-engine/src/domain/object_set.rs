//! Points-to set representation
//!
//! Sorted-vector set over canonical object ids:
//! - Insert: O(n) worst case, O(1) appends for monotonically growing ids
//! - Union: O(n + m) merge
//! - Difference: O(n + m) merge (the solver's delta computation)
//!
//! Growth is monotone by construction — there is no removal operation, which
//! is half of the termination argument.

use super::CsObjId;
use std::cmp::Ordering;

/// A set of context-sensitive abstract objects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSet {
    /// Sorted, deduplicated
    elems: Vec<CsObjId>,
}

impl ObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(obj: CsObjId) -> Self {
        Self { elems: vec![obj] }
    }

    /// A shared empty set, for lookups of pointers with no facts yet
    pub fn empty_ref() -> &'static ObjectSet {
        static EMPTY: ObjectSet = ObjectSet { elems: Vec::new() };
        &EMPTY
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    #[inline]
    pub fn contains(&self, obj: CsObjId) -> bool {
        self.elems.binary_search(&obj).is_ok()
    }

    /// Insert one object. Returns true if it was not present.
    pub fn insert(&mut self, obj: CsObjId) -> bool {
        match self.elems.last() {
            // Fast path: ids are handed out in increasing order, so most
            // inserts append
            Some(&last) if obj > last => {
                self.elems.push(obj);
                true
            }
            None => {
                self.elems.push(obj);
                true
            }
            _ => match self.elems.binary_search(&obj) {
                Ok(_) => false,
                Err(pos) => {
                    self.elems.insert(pos, obj);
                    true
                }
            },
        }
    }

    /// Merge `other` into `self`, returning how many objects were new
    pub fn union_with(&mut self, other: &ObjectSet) -> usize {
        if other.is_empty() {
            return 0;
        }
        if self.is_empty() {
            self.elems = other.elems.clone();
            return self.elems.len();
        }
        let mut merged = Vec::with_capacity(self.elems.len() + other.elems.len());
        let mut added = 0;
        let (mut i, mut j) = (0, 0);
        while i < self.elems.len() && j < other.elems.len() {
            match self.elems[i].cmp(&other.elems[j]) {
                Ordering::Less => {
                    merged.push(self.elems[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(other.elems[j]);
                    added += 1;
                    j += 1;
                }
                Ordering::Equal => {
                    merged.push(self.elems[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.elems[i..]);
        added += other.elems.len() - j;
        merged.extend_from_slice(&other.elems[j..]);
        self.elems = merged;
        added
    }

    /// Objects of `self` not present in `other` — the propagation delta
    pub fn difference(&self, other: &ObjectSet) -> ObjectSet {
        if other.is_empty() {
            return self.clone();
        }
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.elems.len() {
            if j >= other.elems.len() {
                out.extend_from_slice(&self.elems[i..]);
                break;
            }
            match self.elems[i].cmp(&other.elems[j]) {
                Ordering::Less => {
                    out.push(self.elems[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    j += 1;
                }
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        ObjectSet { elems: out }
    }

    /// Whether every object of `self` is in `other`
    pub fn is_subset_of(&self, other: &ObjectSet) -> bool {
        self.difference(other).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CsObjId> + '_ {
        self.elems.iter().copied()
    }
}

impl FromIterator<CsObjId> for ObjectSet {
    fn from_iter<T: IntoIterator<Item = CsObjId>>(iter: T) -> Self {
        let mut elems: Vec<CsObjId> = iter.into_iter().collect();
        elems.sort_unstable();
        elems.dedup();
        Self { elems }
    }
}

//! Calling and heap contexts
//!
//! A context is an immutable, k-limited sequence of elements — call sites,
//! allocation sites or types, depending on the selector strategy. Contexts
//! are interned in a [`ContextStore`] so the rest of the engine works with
//! cheap, identity-comparable [`ContextId`]s; id 0 is always the empty
//! (context-insensitive) context.

use rustc_hash::FxHashMap;

/// Interned context handle. `ContextId::EMPTY` is the distinguished
/// context-insensitive context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

impl ContextId {
    pub const EMPTY: ContextId = ContextId(0);
}

/// The element sequence behind a [`ContextId`]
pub type Context = Vec<u32>;

/// Canonicalizing store for contexts
#[derive(Debug, Clone)]
pub struct ContextStore {
    data: Vec<Context>,
    map: FxHashMap<Context, ContextId>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        map.insert(Vec::new(), ContextId::EMPTY);
        Self {
            data: vec![Vec::new()],
            map,
        }
    }

    /// Intern an element sequence, returning its canonical id
    pub fn intern(&mut self, elements: Context) -> ContextId {
        if let Some(&id) = self.map.get(&elements) {
            return id;
        }
        let id = ContextId(self.data.len() as u32);
        self.data.push(elements.clone());
        self.map.insert(elements, id);
        id
    }

    pub fn elements(&self, id: ContextId) -> &[u32] {
        &self.data[id.0 as usize]
    }

    pub fn depth(&self, id: ContextId) -> usize {
        self.elements(id).len()
    }

    /// Number of distinct contexts created so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        // The empty context always exists
        false
    }

    /// Append `element` to `base`, k-limiting by discarding the oldest
    /// elements. `k == 0` collapses to the empty context.
    pub fn push_limited(&mut self, base: ContextId, element: u32, k: usize) -> ContextId {
        if k == 0 {
            return ContextId::EMPTY;
        }
        let mut elements = self.elements(base).to_vec();
        elements.push(element);
        if elements.len() > k {
            let excess = elements.len() - k;
            elements.drain(..excess);
        }
        self.intern(elements)
    }

    /// Keep only the `k` most recent elements of `base` (heap-context
    /// derivation)
    pub fn suffix(&mut self, base: ContextId, k: usize) -> ContextId {
        if k == 0 {
            return ContextId::EMPTY;
        }
        let elements = self.elements(base);
        if elements.len() <= k {
            return base;
        }
        let suffix = elements[elements.len() - k..].to_vec();
        self.intern(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_context_is_id_zero() {
        let store = ContextStore::new();
        assert_eq!(store.elements(ContextId::EMPTY), &[] as &[u32]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_push_and_k_limit() {
        let mut store = ContextStore::new();
        let c1 = store.push_limited(ContextId::EMPTY, 1, 3);
        let c2 = store.push_limited(c1, 2, 3);
        let c3 = store.push_limited(c2, 3, 3);
        assert_eq!(store.elements(c3), &[1, 2, 3]);

        // Fourth element drops the oldest
        let c4 = store.push_limited(c3, 4, 3);
        assert_eq!(store.elements(c4), &[2, 3, 4]);
    }

    #[test]
    fn test_zero_depth_collapses_to_empty() {
        let mut store = ContextStore::new();
        let c = store.push_limited(ContextId::EMPTY, 42, 0);
        assert_eq!(c, ContextId::EMPTY);
    }

    #[test]
    fn test_interning_is_canonical() {
        let mut store = ContextStore::new();
        let a = store.push_limited(ContextId::EMPTY, 7, 2);
        let b = store.push_limited(ContextId::EMPTY, 7, 2);
        assert_eq!(a, b);

        let c = store.intern(vec![7]);
        assert_eq!(a, c);
    }

    #[test]
    fn test_suffix_truncation() {
        let mut store = ContextStore::new();
        let c = store.intern(vec![1, 2, 3, 4]);
        let s = store.suffix(c, 2);
        assert_eq!(store.elements(s), &[3, 4]);

        // Already short enough: identity
        assert_eq!(store.suffix(s, 3), s);
        assert_eq!(store.suffix(c, 0), ContextId::EMPTY);
    }

    #[test]
    fn test_same_element_twice() {
        let mut store = ContextStore::new();
        let c1 = store.push_limited(ContextId::EMPTY, 5, 4);
        let c2 = store.push_limited(c1, 5, 4);
        assert_eq!(store.elements(c2), &[5, 5]);
        assert_ne!(c1, c2);
    }

    proptest! {
        #[test]
        fn prop_depth_never_exceeds_k(elems in proptest::collection::vec(0u32..100, 0..32), k in 0usize..6) {
            let mut store = ContextStore::new();
            let mut ctx = ContextId::EMPTY;
            for e in elems {
                ctx = store.push_limited(ctx, e, k);
                prop_assert!(store.depth(ctx) <= k);
            }
        }

        #[test]
        fn prop_push_keeps_most_recent(elems in proptest::collection::vec(0u32..100, 1..32), k in 1usize..6) {
            let mut store = ContextStore::new();
            let mut ctx = ContextId::EMPTY;
            for &e in &elems {
                ctx = store.push_limited(ctx, e, k);
            }
            let expect: Vec<u32> = elems[elems.len().saturating_sub(k)..].to_vec();
            prop_assert_eq!(store.elements(ctx), expect.as_slice());
        }
    }
}

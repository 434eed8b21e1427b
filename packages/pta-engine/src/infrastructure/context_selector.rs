//! Context-sensitivity strategies
//!
//! One selector covers the interchangeable variants:
//! - **k-call-site** (k-CFA): contexts are the k most recent call sites
//! - **k-object**: contexts are the receiver's allocation history
//! - **k-type**: like k-object but tracking the receiver's type
//! - **context-insensitive**: the empty context everywhere
//!
//! Selection is a pure function of its inputs — the store only memoizes, so
//! re-deriving a context for the same inputs is stable. k-limiting truncates
//! the oldest element; it bounds the state space at a precision cost and is
//! the mechanism by which the analysis scales. k = 0 collapses any variant
//! to context-insensitive.
//!
//! References:
//! - Milanova et al. "Parameterized Object Sensitivity" (TOSEM 2005)
//! - Smaragdakis et al. "Pick Your Contexts Well" (POPL 2011)

use crate::domain::{ContextId, ContextStore, ObjId};
use crate::errors::PtaError;
use crate::ir::{CallSiteId, TypeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on accepted context depth; larger values are a configuration
/// error rather than a silent state-space explosion
pub const MAX_CONTEXT_DEPTH: usize = 16;

/// Context-sensitivity variant descriptor.
///
/// Parsed from the textual form used in configuration: `"ci"`, `"2-obj"`,
/// `"1-call"`, `"2-type"`, optionally suffixed with a heap depth as in
/// `"2-obj+1-heap"`. Without a suffix the heap depth defaults to `k - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContextStrategy {
    /// Context-insensitive baseline
    Insensitive,
    /// k-limiting call-string sensitivity (k-CFA)
    CallSite { k: usize, heap_k: usize },
    /// k-object sensitivity: receiver allocation sites
    Object { k: usize, heap_k: usize },
    /// k-type sensitivity: receiver allocation types
    Type { k: usize, heap_k: usize },
}

impl Default for ContextStrategy {
    fn default() -> Self {
        ContextStrategy::Object { k: 2, heap_k: 1 }
    }
}

impl ContextStrategy {
    /// Method-context depth
    pub fn k(&self) -> usize {
        match *self {
            ContextStrategy::Insensitive => 0,
            ContextStrategy::CallSite { k, .. }
            | ContextStrategy::Object { k, .. }
            | ContextStrategy::Type { k, .. } => k,
        }
    }

    /// Heap-context depth
    pub fn heap_k(&self) -> usize {
        match *self {
            ContextStrategy::Insensitive => 0,
            ContextStrategy::CallSite { heap_k, .. }
            | ContextStrategy::Object { heap_k, .. }
            | ContextStrategy::Type { heap_k, .. } => heap_k,
        }
    }
}

impl fmt::Display for ContextStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ContextStrategy::Insensitive => write!(f, "ci"),
            ContextStrategy::CallSite { k, heap_k } => write!(f, "{}-call+{}-heap", k, heap_k),
            ContextStrategy::Object { k, heap_k } => write!(f, "{}-obj+{}-heap", k, heap_k),
            ContextStrategy::Type { k, heap_k } => write!(f, "{}-type+{}-heap", k, heap_k),
        }
    }
}

impl From<ContextStrategy> for String {
    fn from(s: ContextStrategy) -> String {
        s.to_string()
    }
}

impl TryFrom<String> for ContextStrategy {
    type Error = PtaError;

    fn try_from(s: String) -> Result<Self, PtaError> {
        s.parse()
    }
}

impl FromStr for ContextStrategy {
    type Err = PtaError;

    fn from_str(s: &str) -> Result<Self, PtaError> {
        let text = s.trim().to_ascii_lowercase();
        if matches!(text.as_str(), "ci" | "insensitive" | "context-insensitive") {
            return Ok(ContextStrategy::Insensitive);
        }

        let (main, heap) = match text.split_once('+') {
            Some((m, h)) => (m, Some(h)),
            None => (text.as_str(), None),
        };

        let (k, variant) = parse_depth_part(main)?;
        if k > MAX_CONTEXT_DEPTH {
            return Err(PtaError::config(format!(
                "context depth {} exceeds maximum {}",
                k, MAX_CONTEXT_DEPTH
            )));
        }
        let heap_k = match heap {
            Some(h) => {
                let (hk, hv) = parse_depth_part(h)?;
                if hv != "heap" {
                    return Err(PtaError::config(format!(
                        "invalid heap-context suffix in '{}'",
                        s
                    )));
                }
                if hk > MAX_CONTEXT_DEPTH {
                    return Err(PtaError::config(format!(
                        "heap-context depth {} exceeds maximum {}",
                        hk, MAX_CONTEXT_DEPTH
                    )));
                }
                hk
            }
            None => k.saturating_sub(1),
        };

        match variant {
            "call" | "cfa" | "callsite" => Ok(ContextStrategy::CallSite { k, heap_k }),
            "obj" | "object" => Ok(ContextStrategy::Object { k, heap_k }),
            "type" => Ok(ContextStrategy::Type { k, heap_k }),
            other => Err(PtaError::config(format!(
                "unknown context-sensitivity variant '{}' in '{}'",
                other, s
            ))),
        }
    }
}

fn parse_depth_part(part: &str) -> Result<(usize, &str), PtaError> {
    let (num, variant) = part
        .split_once('-')
        .ok_or_else(|| PtaError::config(format!("invalid context descriptor part '{}'", part)))?;
    let k = num
        .parse::<usize>()
        .map_err(|_| PtaError::config(format!("invalid context depth '{}'", num)))?;
    Ok((k, variant))
}

/// Information about a receiver object needed for context selection
#[derive(Debug, Clone, Copy)]
pub struct ReceiverInfo {
    /// The receiver's heap context
    pub heap_context: ContextId,
    /// The receiver's abstract object (object-sensitivity element)
    pub obj: ObjId,
    /// The receiver's type (type-sensitivity element)
    pub ty: TypeId,
}

/// Derives callee and heap contexts according to the configured strategy
#[derive(Debug, Clone, Copy)]
pub struct ContextSelector {
    strategy: ContextStrategy,
}

impl ContextSelector {
    pub fn new(strategy: ContextStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ContextStrategy {
        self.strategy
    }

    /// Callee context for a call whose target does not depend on a receiver
    /// object (static/special calls, and CHA-mode dynamic calls)
    pub fn select_static(
        &self,
        store: &mut ContextStore,
        caller: ContextId,
        site: CallSiteId,
    ) -> ContextId {
        match self.strategy {
            ContextStrategy::Insensitive => ContextId::EMPTY,
            ContextStrategy::CallSite { k, .. } => store.push_limited(caller, site.0, k),
            // Object/type sensitivity: static calls inherit the caller context
            ContextStrategy::Object { .. } | ContextStrategy::Type { .. } => caller,
        }
    }

    /// Callee context for an instance call resolved against a receiver object
    pub fn select_instance(
        &self,
        store: &mut ContextStore,
        caller: ContextId,
        site: CallSiteId,
        recv: ReceiverInfo,
    ) -> ContextId {
        match self.strategy {
            ContextStrategy::Insensitive => ContextId::EMPTY,
            ContextStrategy::CallSite { k, .. } => store.push_limited(caller, site.0, k),
            ContextStrategy::Object { k, .. } => {
                store.push_limited(recv.heap_context, recv.obj.0, k)
            }
            ContextStrategy::Type { k, .. } => store.push_limited(recv.heap_context, recv.ty.0, k),
        }
    }

    /// Heap context for an allocation performed under method context `ctx`
    pub fn select_heap(&self, store: &mut ContextStore, ctx: ContextId) -> ContextId {
        match self.strategy {
            ContextStrategy::Insensitive => ContextId::EMPTY,
            _ => store.suffix(ctx, self.strategy.heap_k()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptors() {
        assert_eq!(
            "ci".parse::<ContextStrategy>().unwrap(),
            ContextStrategy::Insensitive
        );
        assert_eq!(
            "2-obj".parse::<ContextStrategy>().unwrap(),
            ContextStrategy::Object { k: 2, heap_k: 1 }
        );
        assert_eq!(
            "2-obj+2-heap".parse::<ContextStrategy>().unwrap(),
            ContextStrategy::Object { k: 2, heap_k: 2 }
        );
        assert_eq!(
            "1-call".parse::<ContextStrategy>().unwrap(),
            ContextStrategy::CallSite { k: 1, heap_k: 0 }
        );
        assert_eq!(
            "3-type+1-heap".parse::<ContextStrategy>().unwrap(),
            ContextStrategy::Type { k: 3, heap_k: 1 }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("2-banana".parse::<ContextStrategy>().is_err());
        assert!("obj-2".parse::<ContextStrategy>().is_err());
        assert!("2-obj+heap".parse::<ContextStrategy>().is_err());
        assert!("99-obj".parse::<ContextStrategy>().is_err());
        assert!("".parse::<ContextStrategy>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for s in [
            ContextStrategy::Insensitive,
            ContextStrategy::Object { k: 2, heap_k: 1 },
            ContextStrategy::CallSite { k: 1, heap_k: 0 },
            ContextStrategy::Type { k: 3, heap_k: 2 },
        ] {
            let parsed: ContextStrategy = s.to_string().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }

    #[test]
    fn test_insensitive_selects_empty_everywhere() {
        let sel = ContextSelector::new(ContextStrategy::Insensitive);
        let mut store = ContextStore::new();
        let recv = ReceiverInfo {
            heap_context: ContextId::EMPTY,
            obj: ObjId(5),
            ty: TypeId(1),
        };
        assert_eq!(
            sel.select_static(&mut store, ContextId::EMPTY, CallSiteId(1)),
            ContextId::EMPTY
        );
        assert_eq!(
            sel.select_instance(&mut store, ContextId::EMPTY, CallSiteId(1), recv),
            ContextId::EMPTY
        );
        assert_eq!(
            sel.select_heap(&mut store, ContextId::EMPTY),
            ContextId::EMPTY
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_object_sensitive_contexts_track_receivers() {
        let sel = ContextSelector::new(ContextStrategy::Object { k: 2, heap_k: 1 });
        let mut store = ContextStore::new();
        let recv_a = ReceiverInfo {
            heap_context: ContextId::EMPTY,
            obj: ObjId(1),
            ty: TypeId(0),
        };
        let recv_b = ReceiverInfo {
            heap_context: ContextId::EMPTY,
            obj: ObjId(2),
            ty: TypeId(0),
        };
        let site = CallSiteId(0);

        let ca = sel.select_instance(&mut store, ContextId::EMPTY, site, recv_a);
        let cb = sel.select_instance(&mut store, ContextId::EMPTY, site, recv_b);
        assert_ne!(ca, cb);
        assert_eq!(store.elements(ca), &[1]);
        assert_eq!(store.elements(cb), &[2]);

        // Same inputs, same output: the selector is pure
        let ca2 = sel.select_instance(&mut store, ContextId::EMPTY, site, recv_a);
        assert_eq!(ca, ca2);
    }

    #[test]
    fn test_call_site_sensitive_pushes_sites() {
        let sel = ContextSelector::new(ContextStrategy::CallSite { k: 2, heap_k: 1 });
        let mut store = ContextStore::new();
        let c1 = sel.select_static(&mut store, ContextId::EMPTY, CallSiteId(10));
        let c2 = sel.select_static(&mut store, c1, CallSiteId(20));
        let c3 = sel.select_static(&mut store, c2, CallSiteId(30));
        assert_eq!(store.elements(c3), &[20, 30]);
    }

    #[test]
    fn test_heap_context_truncation() {
        let sel = ContextSelector::new(ContextStrategy::Object { k: 2, heap_k: 1 });
        let mut store = ContextStore::new();
        let ctx = store.intern(vec![3, 7]);
        let h = sel.select_heap(&mut store, ctx);
        assert_eq!(store.elements(h), &[7]);
    }
}

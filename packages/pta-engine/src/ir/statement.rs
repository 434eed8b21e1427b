//! IR statements
//!
//! The statement forms the solver understands, one variant per pointer
//! operation: allocation, copy, instance/array/static field access, call and
//! return. Anything else a frontend produces is irrelevant to pointers and
//! is expected to be filtered out before the program reaches the engine.

use super::{CallSiteId, FieldId, MethodId, SigId, TypeId, VarId};

/// Call-site dispatch kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Static call: target fixed by the call site
    Static,
    /// Special call (constructor, private, super): target fixed, but a
    /// receiver is passed
    Special,
    /// Virtual call: target depends on the receiver's runtime type
    Virtual,
    /// Interface call: virtual dispatch through an interface type
    Interface,
}

impl CallKind {
    /// Whether resolution depends on receiver points-to information
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, CallKind::Virtual | CallKind::Interface)
    }
}

/// A call site: declared target plus argument/result variables
#[derive(Debug, Clone)]
pub struct CallSite {
    pub kind: CallKind,

    /// Signature used for dynamic dispatch
    pub callee_sig: SigId,

    /// Static type of the receiver (virtual/interface only); the root of the
    /// CHA resolution cone
    pub declared_class: Option<TypeId>,

    /// Resolved target for static/special calls
    pub static_target: Option<MethodId>,

    /// Receiver variable (absent for static calls)
    pub recv: Option<VarId>,

    pub args: Vec<VarId>,

    /// Variable receiving the return value, if any
    pub result: Option<VarId>,
}

/// A pointer-relevant IR statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `x = new T()` — the allocation site injects an abstract object
    New { lhs: VarId, site: super::AllocId },

    /// `x = y`
    Copy { lhs: VarId, rhs: VarId },

    /// `x = base.f`
    LoadField {
        lhs: VarId,
        base: VarId,
        field: FieldId,
    },

    /// `base.f = y`
    StoreField {
        base: VarId,
        field: FieldId,
        rhs: VarId,
    },

    /// `x = base[*]` — array elements are merged into one pointer per object
    LoadArray { lhs: VarId, base: VarId },

    /// `base[*] = y`
    StoreArray { base: VarId, rhs: VarId },

    /// `x = T.f`
    LoadStatic { lhs: VarId, field: FieldId },

    /// `T.f = y`
    StoreStatic { field: FieldId, rhs: VarId },

    /// Any call; the payload lives in the program's call-site table
    Call { site: CallSiteId },

    /// `return v` — linked to caller result variables at call edges
    Return { value: Option<VarId> },
}

//! Intermediate representation consumed by the solver
//!
//! The analysis treats the IR as an external input: statements are consumed,
//! never rewritten. This module holds the minimal immutable representation
//! the engine needs — typed identifiers, statements, the class hierarchy used
//! for dispatch, and a [`ProgramBuilder`] for assembling test programs and
//! frontend output.

pub mod hierarchy;
pub mod program;
pub mod statement;

pub use hierarchy::ClassHierarchy;
pub use program::{AllocSite, Method, Program, ProgramBuilder, VarUses};
pub use statement::{CallKind, CallSite, Stmt};

use serde::{Deserialize, Serialize};

/// Class/interface type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Method identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub u32);

/// Program variable identifier (local, parameter, or `this`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

/// Instance or static field identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u32);

/// Allocation-site identifier (one per `new` statement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocId(pub u32);

/// Call-site identifier (one per call statement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallSiteId(pub u32);

/// Interned method-signature identifier (the dispatch key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SigId(pub u32);

/// Position of a statement inside its enclosing method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtRef {
    pub method: MethodId,
    pub index: u32,
}

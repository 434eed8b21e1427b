//! Program representation and builder
//!
//! A [`Program`] is the immutable whole-program input to the solver: the
//! class hierarchy, method bodies, allocation sites, call sites, and a
//! per-variable use index. The use index is what makes delta-driven solving
//! cheap — when a variable's points-to set grows, the solver asks for the
//! field/array accesses and call sites anchored on that variable instead of
//! rescanning statements.

use super::hierarchy::ClassHierarchy;
use super::statement::{CallKind, CallSite, Stmt};
use super::{AllocId, CallSiteId, FieldId, MethodId, SigId, TypeId, VarId};
use rustc_hash::FxHashMap;

/// A method body plus its pointer-relevant interface variables
#[derive(Debug, Clone)]
pub struct Method {
    pub sig: SigId,
    pub owner: TypeId,
    pub is_static: bool,
    /// Receiver variable (instance methods only)
    pub this_var: Option<VarId>,
    pub params: Vec<VarId>,
    /// Variables flowing out through `return` statements
    pub return_vars: Vec<VarId>,
    pub stmts: Vec<Stmt>,
}

/// An allocation site: one per `new` statement
#[derive(Debug, Clone, Copy)]
pub struct AllocSite {
    pub ty: TypeId,
    pub method: MethodId,
}

#[derive(Debug, Clone)]
struct CallSiteInfo {
    site: CallSite,
    container: MethodId,
}

/// All pointer-relevant uses anchored on one base variable
#[derive(Debug, Clone, Default)]
pub struct VarUses {
    /// `x = base.f` occurrences as (f, x)
    pub field_loads: Vec<(FieldId, VarId)>,
    /// `base.f = y` occurrences as (f, y)
    pub field_stores: Vec<(FieldId, VarId)>,
    /// `x = base[*]` occurrences as x
    pub array_loads: Vec<VarId>,
    /// `base[*] = y` occurrences as y
    pub array_stores: Vec<VarId>,
    /// Call sites whose receiver is this variable
    pub invokes: Vec<CallSiteId>,
}

/// Immutable whole-program IR
#[derive(Debug, Clone)]
pub struct Program {
    hierarchy: ClassHierarchy,
    methods: Vec<Method>,
    var_names: Vec<String>,
    field_names: Vec<String>,
    sig_names: Vec<String>,
    alloc_sites: Vec<AllocSite>,
    call_sites: Vec<CallSiteInfo>,
    uses: Vec<VarUses>,
}

impl Program {
    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    pub fn method(&self, m: MethodId) -> &Method {
        &self.methods[m.0 as usize]
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    pub fn num_vars(&self) -> usize {
        self.var_names.len()
    }

    pub fn var_name(&self, v: VarId) -> &str {
        &self.var_names[v.0 as usize]
    }

    pub fn field_name(&self, f: FieldId) -> &str {
        &self.field_names[f.0 as usize]
    }

    pub fn sig_name(&self, s: SigId) -> &str {
        &self.sig_names[s.0 as usize]
    }

    pub fn alloc_site(&self, a: AllocId) -> AllocSite {
        self.alloc_sites[a.0 as usize]
    }

    pub fn num_alloc_sites(&self) -> usize {
        self.alloc_sites.len()
    }

    pub fn call_site(&self, c: CallSiteId) -> &CallSite {
        &self.call_sites[c.0 as usize].site
    }

    pub fn call_site_container(&self, c: CallSiteId) -> MethodId {
        self.call_sites[c.0 as usize].container
    }

    pub fn num_call_sites(&self) -> usize {
        self.call_sites.len()
    }

    pub fn uses_of(&self, v: VarId) -> &VarUses {
        &self.uses[v.0 as usize]
    }

    /// Whether `m` is a valid method id in this program
    pub fn contains_method(&self, m: MethodId) -> bool {
        (m.0 as usize) < self.methods.len()
    }
}

/// Builder assembling an immutable [`Program`]
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    hierarchy: ClassHierarchy,
    methods: Vec<Method>,
    var_names: Vec<String>,
    field_names: Vec<String>,
    field_map: FxHashMap<String, FieldId>,
    sig_names: Vec<String>,
    sig_map: FxHashMap<String, SigId>,
    alloc_sites: Vec<AllocSite>,
    call_sites: Vec<CallSiteInfo>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, name: &str, super_class: Option<TypeId>) -> TypeId {
        self.hierarchy.add_class(name, super_class)
    }

    /// Intern a field name
    pub fn field(&mut self, name: &str) -> FieldId {
        if let Some(&f) = self.field_map.get(name) {
            return f;
        }
        let f = FieldId(self.field_names.len() as u32);
        self.field_names.push(name.to_string());
        self.field_map.insert(name.to_string(), f);
        f
    }

    /// Intern a method signature (the dispatch key)
    pub fn sig(&mut self, name: &str) -> SigId {
        if let Some(&s) = self.sig_map.get(name) {
            return s;
        }
        let s = SigId(self.sig_names.len() as u32);
        self.sig_names.push(name.to_string());
        self.sig_map.insert(name.to_string(), s);
        s
    }

    /// Add a method to `owner`'s dispatch table. Instance methods get a
    /// `this` variable automatically.
    pub fn add_method(&mut self, owner: TypeId, sig_name: &str, is_static: bool) -> MethodId {
        let sig = self.sig(sig_name);
        let id = MethodId(self.methods.len() as u32);
        let this_var = if is_static {
            None
        } else {
            Some(self.fresh_var(&format!("{}#this", sig_name)))
        };
        self.methods.push(Method {
            sig,
            owner,
            is_static,
            this_var,
            params: Vec::new(),
            return_vars: Vec::new(),
            stmts: Vec::new(),
        });
        self.hierarchy.define_method(owner, sig, id);
        id
    }

    pub fn this_var(&self, m: MethodId) -> Option<VarId> {
        self.methods[m.0 as usize].this_var
    }

    pub fn add_param(&mut self, m: MethodId, name: &str) -> VarId {
        let v = self.fresh_var(name);
        self.methods[m.0 as usize].params.push(v);
        v
    }

    pub fn add_local(&mut self, m: MethodId, name: &str) -> VarId {
        let _ = m;
        self.fresh_var(name)
    }

    fn fresh_var(&mut self, name: &str) -> VarId {
        let v = VarId(self.var_names.len() as u32);
        self.var_names.push(name.to_string());
        v
    }

    /// `lhs = new ty()`
    pub fn new_object(&mut self, m: MethodId, lhs: VarId, ty: TypeId) -> AllocId {
        let site = AllocId(self.alloc_sites.len() as u32);
        self.alloc_sites.push(AllocSite { ty, method: m });
        self.methods[m.0 as usize].stmts.push(Stmt::New { lhs, site });
        site
    }

    /// `lhs = rhs`
    pub fn copy(&mut self, m: MethodId, lhs: VarId, rhs: VarId) {
        self.methods[m.0 as usize].stmts.push(Stmt::Copy { lhs, rhs });
    }

    /// `lhs = base.field`
    pub fn load_field(&mut self, m: MethodId, lhs: VarId, base: VarId, field: FieldId) {
        self.methods[m.0 as usize]
            .stmts
            .push(Stmt::LoadField { lhs, base, field });
    }

    /// `base.field = rhs`
    pub fn store_field(&mut self, m: MethodId, base: VarId, field: FieldId, rhs: VarId) {
        self.methods[m.0 as usize]
            .stmts
            .push(Stmt::StoreField { base, field, rhs });
    }

    /// `lhs = base[*]`
    pub fn load_array(&mut self, m: MethodId, lhs: VarId, base: VarId) {
        self.methods[m.0 as usize]
            .stmts
            .push(Stmt::LoadArray { lhs, base });
    }

    /// `base[*] = rhs`
    pub fn store_array(&mut self, m: MethodId, base: VarId, rhs: VarId) {
        self.methods[m.0 as usize]
            .stmts
            .push(Stmt::StoreArray { base, rhs });
    }

    /// `lhs = field` (static)
    pub fn load_static(&mut self, m: MethodId, lhs: VarId, field: FieldId) {
        self.methods[m.0 as usize]
            .stmts
            .push(Stmt::LoadStatic { lhs, field });
    }

    /// `field = rhs` (static)
    pub fn store_static(&mut self, m: MethodId, field: FieldId, rhs: VarId) {
        self.methods[m.0 as usize]
            .stmts
            .push(Stmt::StoreStatic { field, rhs });
    }

    /// `return value`
    pub fn ret(&mut self, m: MethodId, value: Option<VarId>) {
        self.methods[m.0 as usize].stmts.push(Stmt::Return { value });
    }

    pub fn call_static(
        &mut self,
        m: MethodId,
        target: MethodId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        let sig = self.methods[target.0 as usize].sig;
        self.push_call(
            m,
            CallSite {
                kind: CallKind::Static,
                callee_sig: sig,
                declared_class: None,
                static_target: Some(target),
                recv: None,
                args,
                result,
            },
        )
    }

    pub fn call_special(
        &mut self,
        m: MethodId,
        target: MethodId,
        recv: VarId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        let sig = self.methods[target.0 as usize].sig;
        self.push_call(
            m,
            CallSite {
                kind: CallKind::Special,
                callee_sig: sig,
                declared_class: None,
                static_target: Some(target),
                recv: Some(recv),
                args,
                result,
            },
        )
    }

    pub fn call_virtual(
        &mut self,
        m: MethodId,
        declared: TypeId,
        sig_name: &str,
        recv: VarId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        let sig = self.sig(sig_name);
        self.push_call(
            m,
            CallSite {
                kind: CallKind::Virtual,
                callee_sig: sig,
                declared_class: Some(declared),
                static_target: None,
                recv: Some(recv),
                args,
                result,
            },
        )
    }

    pub fn call_interface(
        &mut self,
        m: MethodId,
        declared: TypeId,
        sig_name: &str,
        recv: VarId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        let sig = self.sig(sig_name);
        self.push_call(
            m,
            CallSite {
                kind: CallKind::Interface,
                callee_sig: sig,
                declared_class: Some(declared),
                static_target: None,
                recv: Some(recv),
                args,
                result,
            },
        )
    }

    fn push_call(&mut self, m: MethodId, site: CallSite) -> CallSiteId {
        let id = CallSiteId(self.call_sites.len() as u32);
        self.call_sites.push(CallSiteInfo {
            site,
            container: m,
        });
        self.methods[m.0 as usize].stmts.push(Stmt::Call { site: id });
        id
    }

    /// Freeze into an immutable program: collect return variables and build
    /// the per-variable use index.
    pub fn finish(mut self) -> Program {
        let mut uses = vec![VarUses::default(); self.var_names.len()];

        for method in &mut self.methods {
            for stmt in &method.stmts {
                match *stmt {
                    Stmt::Return { value: Some(v) } => {
                        if !method.return_vars.contains(&v) {
                            method.return_vars.push(v);
                        }
                    }
                    Stmt::LoadField { lhs, base, field } => {
                        uses[base.0 as usize].field_loads.push((field, lhs));
                    }
                    Stmt::StoreField { base, field, rhs } => {
                        uses[base.0 as usize].field_stores.push((field, rhs));
                    }
                    Stmt::LoadArray { lhs, base } => {
                        uses[base.0 as usize].array_loads.push(lhs);
                    }
                    Stmt::StoreArray { base, rhs } => {
                        uses[base.0 as usize].array_stores.push(rhs);
                    }
                    _ => {}
                }
            }
        }
        for (idx, info) in self.call_sites.iter().enumerate() {
            if let Some(recv) = info.site.recv {
                uses[recv.0 as usize].invokes.push(CallSiteId(idx as u32));
            }
        }

        Program {
            hierarchy: self.hierarchy,
            methods: self.methods,
            var_names: self.var_names,
            field_names: self.field_names,
            sig_names: self.sig_names,
            alloc_sites: self.alloc_sites,
            call_sites: self.call_sites,
            uses,
        }
    }
}

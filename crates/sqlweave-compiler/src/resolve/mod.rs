//! Static flow resolution: classify bindings and expressions across the
//! whole module graph.
//!
//! Resolution is deliberately conservative (sound by refusal): a value is
//! only classified when it can be traced through unconditional,
//! single-assignment declarations, static member accesses, and the export
//! graph. Function bodies are never evaluated to discover return values;
//! that is a hard boundary, not an optimization gap.

mod lattice;
mod registry;
mod scope;
mod walk;

#[cfg(test)]
mod resolve_tests;

pub use lattice::{FragmentId, FuncId, OpaqueReason, Value};
pub use registry::{FragmentSite, FuncSite, Registry};
pub use scope::{build_scope, function_scope, BindingInfo, Scope, ScopeChain};
pub use walk::{
    resolve_program, CallSiteRecord, ParamsArg, ProgramResolution, Recognized, ServerCallRecord,
};

use indexmap::{IndexMap, IndexSet};

use crate::graph::{ModuleGraph, ResolvedExport};
use crate::source_map::{SourceId, SourceMap};
use crate::syntax::{AstMap, Expr, ObjectLit, ObjectProp};

/// Alias chains longer than this stop resolving. Refusal is sound; a chain
/// this deep in real code is already pathological.
const MAX_ALIAS_DEPTH: u32 = 128;

/// Module-level binding tables for every module, built once per run.
#[derive(Debug, Default)]
pub struct ModuleScopes<'a> {
    scopes: IndexMap<SourceId, Scope<'a>>,
}

impl<'a> ModuleScopes<'a> {
    pub fn build(modules: &'a AstMap, registry: &Registry) -> Self {
        static NO_PARAMS: Vec<String> = Vec::new();
        let scopes = modules
            .iter()
            .map(|(&source, module)| {
                (
                    source,
                    build_scope(source, &module.items, &NO_PARAMS, registry),
                )
            })
            .collect();
        Self { scopes }
    }

    pub fn get(&self, module: SourceId) -> Option<&Scope<'a>> {
        self.scopes.get(&module)
    }
}

/// Whole-program value resolution with a memo over module-level bindings.
pub struct Resolver<'a> {
    sources: &'a SourceMap,
    graph: &'a ModuleGraph,
    registry: &'a Registry,
    scopes: &'a ModuleScopes<'a>,
    tag: &'a str,
    cache: IndexMap<(SourceId, String), Value>,
    visiting: IndexSet<(SourceId, String)>,
    depth: u32,
}

impl<'a> Resolver<'a> {
    pub fn new(
        sources: &'a SourceMap,
        graph: &'a ModuleGraph,
        registry: &'a Registry,
        scopes: &'a ModuleScopes<'a>,
        tag: &'a str,
    ) -> Self {
        Self {
            sources,
            graph,
            registry,
            scopes,
            tag,
            cache: IndexMap::new(),
            visiting: IndexSet::new(),
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Classify an expression in the given module and local scope chain.
    pub fn resolve_expr(
        &mut self,
        module: SourceId,
        chain: &ScopeChain<'a>,
        expr: &'a Expr,
    ) -> Value {
        match expr {
            Expr::Template(template) => {
                if template.has_tag(self.tag) {
                    match self.registry.fragment_at(module, template.span) {
                        Some(id) => Value::Fragment(id),
                        None => Value::Opaque(OpaqueReason::Unresolved),
                    }
                } else {
                    Value::Opaque(OpaqueReason::Unresolved)
                }
            }

            Expr::Ident(ident) => {
                if let Some(info) = chain.lookup(&ident.name) {
                    self.binding_value(module, chain, info)
                } else {
                    self.module_binding(module, &ident.name)
                }
            }

            Expr::Member(member) => {
                if member.computed {
                    return Value::Opaque(OpaqueReason::DynamicAccess);
                }
                let Some(property) = member.property.as_deref() else {
                    return Value::Opaque(OpaqueReason::DynamicAccess);
                };
                match self.resolve_expr(module, chain, &member.object) {
                    Value::Namespace(target) => self.export_value(target, property),
                    Value::Object(map) => map
                        .get(property)
                        .cloned()
                        .unwrap_or(Value::Opaque(OpaqueReason::Unresolved)),
                    // Keep the precise reason: a member of a require()d
                    // module is still an unsupported dynamic import.
                    Value::Opaque(reason) => Value::Opaque(reason),
                    _ => Value::Opaque(OpaqueReason::Unresolved),
                }
            }

            Expr::Call(call) => {
                if call.callee.as_ident() == Some("require") {
                    Value::Opaque(OpaqueReason::DynamicImport)
                } else {
                    Value::Opaque(OpaqueReason::CallResult)
                }
            }

            Expr::Func(func) => match self.registry.function_at(module, func.span) {
                Some(id) => Value::Function(id),
                None => Value::Opaque(OpaqueReason::Unresolved),
            },

            Expr::Object(object) => self.object_value(module, chain, object),

            Expr::Opaque(_) => Value::Opaque(OpaqueReason::Unresolved),
        }
    }

    /// Value of a module-level binding, memoized per (module, name).
    pub fn module_binding(&mut self, module: SourceId, name: &str) -> Value {
        let key = (module, name.to_owned());
        if let Some(value) = self.cache.get(&key) {
            return value.clone();
        }
        if !self.visiting.insert(key.clone()) {
            return Value::Opaque(OpaqueReason::Unresolved);
        }

        let value = match self.scopes.get(module).and_then(|s| s.get(name)) {
            Some(info) => {
                let chain = ScopeChain::new();
                self.binding_value(module, &chain, info)
            }
            None => Value::Opaque(OpaqueReason::Unresolved),
        };

        self.visiting.swap_remove(&key);
        self.cache.insert(key, value.clone());
        value
    }

    /// Value of an exported name of a module, through the export graph.
    pub fn export_value(&mut self, module: SourceId, name: &str) -> Value {
        match self.graph.resolve_export(self.sources, module, name) {
            Some(ResolvedExport::Binding(binding)) => {
                self.module_binding(binding.module, &binding.name)
            }
            Some(ResolvedExport::Namespace(target)) => Value::Namespace(target),
            None => Value::Opaque(OpaqueReason::Unresolved),
        }
    }

    fn binding_value(
        &mut self,
        module: SourceId,
        chain: &ScopeChain<'a>,
        info: &BindingInfo<'a>,
    ) -> Value {
        match info {
            BindingInfo::Assignable { sources } => {
                if sources.iter().any(|(_, conditional)| *conditional) {
                    return Value::Opaque(OpaqueReason::Conditional);
                }
                match sources.as_slice() {
                    [] => Value::Unknown,
                    [(expr, _)] => self.guarded(module, chain, expr),
                    many => {
                        // Multiple unconditional writes: join them. Identical
                        // values survive, anything else refuses.
                        let mut iter = many.iter();
                        let (first, _) = iter.next().expect("slice has >1 element");
                        let mut value = self.guarded(module, chain, first);
                        for (expr, _) in iter {
                            value = value.join(self.guarded(module, chain, expr));
                        }
                        value
                    }
                }
            }
            BindingInfo::Func(id) => Value::Function(*id),
            BindingInfo::Import { specifier, kind } => {
                let Some(target) = self.sources.resolve_specifier(module, specifier) else {
                    return Value::Opaque(OpaqueReason::Unresolved);
                };
                match kind {
                    crate::syntax::ImportKind::Namespace => Value::Namespace(target),
                    crate::syntax::ImportKind::Default => self.export_value(target, "default"),
                    crate::syntax::ImportKind::Named { imported } => {
                        self.export_value(target, imported)
                    }
                }
            }
            BindingInfo::Param => Value::Opaque(OpaqueReason::Unresolved),
        }
    }

    fn guarded(&mut self, module: SourceId, chain: &ScopeChain<'a>, expr: &'a Expr) -> Value {
        if self.depth >= MAX_ALIAS_DEPTH {
            return Value::Opaque(OpaqueReason::Unresolved);
        }
        self.depth += 1;
        let value = self.resolve_expr(module, chain, expr);
        self.depth -= 1;
        value
    }

    fn object_value(
        &mut self,
        module: SourceId,
        chain: &ScopeChain<'a>,
        object: &'a ObjectLit,
    ) -> Value {
        let mut map = IndexMap::new();
        for prop in &object.props {
            match prop {
                ObjectProp::Static { key, value, .. } => {
                    let resolved = self.resolve_expr(module, chain, value);
                    if !resolved.is_fragment_shaped() {
                        return Value::Opaque(OpaqueReason::Unresolved);
                    }
                    map.insert(key.clone(), resolved);
                }
                ObjectProp::Dynamic { .. } => {
                    return Value::Opaque(OpaqueReason::Unresolved);
                }
            }
        }
        Value::Object(map)
    }
}

//! Per-scope binding tables.
//!
//! A scope records, for every locally-declared name, where its value comes
//! from: declarator initializers and later assignments (with a conditional
//! flag), a function declaration, an import, or a parameter. Assignments
//! reached through a conditionally-executed region or a nested function
//! body are always flagged conditional; the resolver's join rule turns any
//! such binding Opaque.

use indexmap::IndexMap;

use crate::source_map::SourceId;
use crate::syntax::{Expr, FuncDecl, ImportKind, Item, ObjectProp};

use super::lattice::FuncId;
use super::registry::Registry;

#[derive(Debug)]
pub enum BindingInfo<'a> {
    /// Declared with `const`/`let`/`var`; `sources` lists every expression
    /// assigned to it, in program order, with a conditional flag.
    Assignable { sources: Vec<(&'a Expr, bool)> },
    Func(FuncId),
    Import {
        specifier: &'a str,
        kind: &'a ImportKind,
    },
    Param,
}

#[derive(Debug, Default)]
pub struct Scope<'a> {
    bindings: IndexMap<&'a str, BindingInfo<'a>>,
}

impl<'a> Scope<'a> {
    pub fn get(&self, name: &str) -> Option<&BindingInfo<'a>> {
        self.bindings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().copied()
    }
}

/// Build the binding table for a function or module body.
pub fn build_scope<'a>(
    source: SourceId,
    items: &'a [Item],
    params: &'a [String],
    registry: &Registry,
) -> Scope<'a> {
    let mut scope = Scope::default();
    for param in params {
        scope.bindings.insert(param.as_str(), BindingInfo::Param);
    }
    declare(source, items, false, registry, &mut scope);
    collect_assigns(items, false, &mut scope);
    scope
}

/// First pass: record declarations. Function bodies are skipped; they get
/// their own scopes.
fn declare<'a>(
    source: SourceId,
    items: &'a [Item],
    conditional: bool,
    registry: &Registry,
    scope: &mut Scope<'a>,
) {
    for item in items {
        match item {
            Item::Decl(decl) => {
                for d in &decl.declarators {
                    let sources = match &d.init {
                        Some(init) => vec![(init, conditional)],
                        None => Vec::new(),
                    };
                    scope
                        .bindings
                        .insert(d.name.as_str(), BindingInfo::Assignable { sources });
                }
            }
            Item::Func(func) => {
                if let Some(name) = &func.name
                    && let Some(id) = registry.function_at(source, func.span)
                {
                    scope.bindings.insert(name.as_str(), BindingInfo::Func(id));
                }
            }
            Item::Import(import) => {
                for binding in &import.bindings {
                    scope.bindings.insert(
                        binding.local.as_str(),
                        BindingInfo::Import {
                            specifier: import.specifier.as_str(),
                            kind: &binding.kind,
                        },
                    );
                }
            }
            Item::ExportDefault(default) => {
                // `default` is a reserved word, so this synthetic binding
                // can never collide with a user identifier.
                scope.bindings.insert(
                    "default",
                    BindingInfo::Assignable {
                        sources: vec![(&default.value, conditional)],
                    },
                );
            }
            Item::Cond(inner) => declare(source, inner, true, registry, scope),
            Item::ExportClause(_) | Item::ExportStar(_) | Item::Assign(_) | Item::Expr(_) => {}
        }
    }
}

/// Second pass: attach assignments to bindings declared in this scope,
/// descending into conditional regions and nested function bodies (both
/// make the assignment conditional).
fn collect_assigns<'a>(items: &'a [Item], conditional: bool, scope: &mut Scope<'a>) {
    for item in items {
        match item {
            Item::Assign(assign) => {
                if let Some(name) = assign.target.as_ident()
                    && let Some(BindingInfo::Assignable { sources }) = scope.bindings.get_mut(name)
                {
                    sources.push((&assign.value, conditional));
                }
                visit_expr_funcs(&assign.value, scope);
            }
            Item::Cond(inner) => collect_assigns(inner, true, scope),
            Item::Func(func) => collect_assigns(&func.body, true, scope),
            Item::Decl(decl) => {
                for d in &decl.declarators {
                    if let Some(init) = &d.init {
                        visit_expr_funcs(init, scope);
                    }
                }
            }
            Item::Expr(expr) => visit_expr_funcs(expr, scope),
            Item::ExportDefault(default) => visit_expr_funcs(&default.value, scope),
            Item::Import(_) | Item::ExportClause(_) | Item::ExportStar(_) => {}
        }
    }
}

/// Find function bodies nested inside an expression and collect their
/// assignments as conditional.
fn visit_expr_funcs<'a>(expr: &'a Expr, scope: &mut Scope<'a>) {
    match expr {
        Expr::Func(func) => collect_assigns(&func.body, true, scope),
        Expr::Member(member) => visit_expr_funcs(&member.object, scope),
        Expr::Call(call) => {
            visit_expr_funcs(&call.callee, scope);
            for arg in &call.args {
                visit_expr_funcs(arg, scope);
            }
        }
        Expr::Template(template) => {
            for interp in &template.interps {
                visit_expr_funcs(interp, scope);
            }
        }
        Expr::Object(object) => {
            for prop in &object.props {
                if let ObjectProp::Static { value, .. } = prop {
                    visit_expr_funcs(value, scope);
                }
            }
        }
        Expr::Opaque(opaque) => {
            for child in &opaque.children {
                visit_expr_funcs(child, scope);
            }
        }
        Expr::Ident(_) => {}
    }
}

/// Scope stack used while walking a module: function scopes innermost-last,
/// with the module scope at the bottom.
pub struct ScopeChain<'a> {
    scopes: Vec<Scope<'a>>,
}

impl<'a> ScopeChain<'a> {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn push(&mut self, scope: Scope<'a>) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Innermost-first lookup, module scope excluded.
    pub fn lookup(&self, name: &str) -> Option<&BindingInfo<'a>> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

impl Default for ScopeChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience used by scope construction at function entry.
pub fn function_scope<'a>(
    source: SourceId,
    func: &'a FuncDecl,
    registry: &Registry,
) -> Scope<'a> {
    build_scope(source, &func.body, &func.params, registry)
}

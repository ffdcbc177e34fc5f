//! Whole-program resolution walk.
//!
//! One pass over every module with a live scope chain: resolves the
//! interpolations of every `sql` template, records every recognized
//! `.executeQuery(...)` call site with its resolved arguments, and counts
//! transaction-style server calls (left untouched by codegen).

use indexmap::IndexMap;

use crate::diagnostics::Span;
use crate::source_map::SourceId;
use crate::syntax::{AstMap, Call, Expr, FuncDecl, Item, ObjectProp, Template};

use super::lattice::{FragmentId, Value};
use super::scope::{function_scope, ScopeChain};
use super::Resolver;

/// Resolved argument in the params position.
#[derive(Debug, Clone)]
pub struct ParamsArg {
    pub span: Span,
    /// Functions in this position are ignored for parameter purposes.
    pub is_function: bool,
}

/// One recognized execute call, arguments resolved but not yet judged.
#[derive(Debug, Clone)]
pub struct CallSiteRecord {
    pub source: SourceId,
    pub span: Span,
    pub query_span: Span,
    pub query: Value,
    pub params: Option<ParamsArg>,
    /// Trailing arguments with their resolved values, in order.
    pub validators: Vec<(Value, Span)>,
}

/// A call whose first argument is `<recv>.beginTx()`; recognized and left
/// untouched.
#[derive(Debug, Clone)]
pub struct ServerCallRecord {
    pub source: SourceId,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct ProgramResolution {
    /// Per-fragment resolved interpolation values, in template order.
    pub interps: IndexMap<FragmentId, Vec<Value>>,
    pub call_sites: Vec<CallSiteRecord>,
    pub server_calls: Vec<ServerCallRecord>,
}

/// Method names the walk recognizes.
pub struct Recognized<'a> {
    pub tag: &'a str,
    pub execute_method: &'a str,
    pub begin_tx_method: &'a str,
}

pub fn resolve_program<'a>(
    modules: &'a AstMap,
    resolver: &mut Resolver<'a>,
    recognized: &Recognized<'_>,
) -> ProgramResolution {
    let mut resolution = ProgramResolution::default();
    for (&source, module) in modules {
        let mut walk = Walk {
            resolver,
            resolution: &mut resolution,
            recognized,
            source,
            chain: ScopeChain::new(),
        };
        walk.items(&module.items);
    }
    resolution
}

struct Walk<'w, 'a, 'r> {
    resolver: &'w mut Resolver<'a>,
    resolution: &'w mut ProgramResolution,
    recognized: &'w Recognized<'r>,
    source: SourceId,
    chain: ScopeChain<'a>,
}

impl<'a> Walk<'_, 'a, '_> {
    fn items(&mut self, items: &'a [Item]) {
        for item in items {
            match item {
                Item::Func(func) => self.func(func),
                Item::Decl(decl) => {
                    for d in &decl.declarators {
                        if let Some(init) = &d.init {
                            self.expr(init);
                        }
                    }
                }
                Item::Assign(assign) => {
                    self.expr(&assign.target);
                    self.expr(&assign.value);
                }
                Item::Expr(expr) => self.expr(expr),
                Item::ExportDefault(default) => self.expr(&default.value),
                Item::Cond(inner) => self.items(inner),
                Item::Import(_) | Item::ExportClause(_) | Item::ExportStar(_) => {}
            }
        }
    }

    fn func(&mut self, func: &'a FuncDecl) {
        let scope = function_scope(self.source, func, self.resolver_registry());
        self.chain.push(scope);
        self.items(&func.body);
        self.chain.pop();
    }

    fn resolver_registry(&self) -> &'a super::Registry {
        self.resolver.registry()
    }

    fn template(&mut self, template: &'a Template) {
        if template.has_tag(self.recognized.tag)
            && let Some(id) = self
                .resolver_registry()
                .fragment_at(self.source, template.span)
        {
            let values: Vec<Value> = template
                .interps
                .iter()
                .map(|interp| self.resolver.resolve_expr(self.source, &self.chain, interp))
                .collect();
            self.resolution.interps.insert(id, values);
        }
        for interp in &template.interps {
            self.expr(interp);
        }
    }

    fn call(&mut self, call: &'a Call, span: Span) {
        if let Expr::Member(member) = &call.callee
            && !member.computed
            && member.property.as_deref() == Some(self.recognized.execute_method)
            && !call.args.is_empty()
        {
            let query_expr = &call.args[0];
            let query = self
                .resolver
                .resolve_expr(self.source, &self.chain, query_expr);

            let params = call.args.get(1).map(|arg| {
                let value = self.resolver.resolve_expr(self.source, &self.chain, arg);
                ParamsArg {
                    span: arg.span(),
                    is_function: matches!(value, Value::Function(_))
                        || matches!(arg, Expr::Func(_)),
                }
            });

            let validators = call
                .args
                .get(2..)
                .unwrap_or_default()
                .iter()
                .map(|arg| {
                    let value = self.resolver.resolve_expr(self.source, &self.chain, arg);
                    (value, arg.span())
                })
                .collect();

            self.resolution.call_sites.push(CallSiteRecord {
                source: self.source,
                span,
                query_span: query_expr.span(),
                query,
                params,
                validators,
            });
        } else if self.is_server_call(call) {
            self.resolution.server_calls.push(ServerCallRecord {
                source: self.source,
                span,
            });
        }

        self.expr(&call.callee);
        for arg in &call.args {
            self.expr(arg);
        }
    }

    /// `f(<recv>.beginTx(), ...)` — the transaction-begin convention. The
    /// receiver's identity is never checked, only the method name and the
    /// absence of arguments.
    fn is_server_call(&self, call: &Call) -> bool {
        let Some(Expr::Call(first)) = call.args.first() else {
            return false;
        };
        if !first.args.is_empty() {
            return false;
        }
        matches!(
            &first.callee,
            Expr::Member(member)
                if !member.computed
                    && member.property.as_deref() == Some(self.recognized.begin_tx_method)
        )
    }

    fn expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Template(template) => self.template(template),
            Expr::Call(call) => self.call(call, expr.span()),
            Expr::Func(func) => self.func(func),
            Expr::Member(member) => self.expr(&member.object),
            Expr::Object(object) => {
                for prop in &object.props {
                    if let ObjectProp::Static { value, .. } = prop {
                        self.expr(value);
                    }
                }
            }
            Expr::Opaque(opaque) => {
                for child in &opaque.children {
                    self.expr(child);
                }
            }
            Expr::Ident(_) => {}
        }
    }
}

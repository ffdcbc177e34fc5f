//! Program registry: every `sql` template site and every function site,
//! discovered in one deterministic walk before resolution starts.

use indexmap::IndexMap;

use crate::diagnostics::Span;
use crate::source_map::SourceId;
use crate::syntax::{AstMap, Expr, FuncDecl, Item, ObjectProp, Template};

use super::lattice::{FragmentId, FuncId};

/// One `sql`-tagged template occurrence.
#[derive(Debug, Clone)]
pub struct FragmentSite {
    pub source: SourceId,
    pub span: Span,
    /// The template body, kept so fragment compilation does not need to
    /// re-walk the module.
    pub template: Template,
}

/// One function occurrence (declaration, expression, or arrow).
#[derive(Debug, Clone)]
pub struct FuncSite {
    pub source: SourceId,
    /// Declared or binding name; None for anonymous inline functions.
    pub name: Option<String>,
    pub exported: bool,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct Registry {
    fragments: Vec<FragmentSite>,
    functions: Vec<FuncSite>,
    fragment_by_pos: IndexMap<(SourceId, usize), FragmentId>,
    function_by_pos: IndexMap<(SourceId, usize), FuncId>,
}

impl Registry {
    /// Walk every module and record template and function sites in order.
    pub fn collect(modules: &AstMap, tag: &str) -> Self {
        let mut registry = Self::default();
        for (&source, module) in modules {
            let mut walker = Walker {
                registry: &mut registry,
                source,
                tag,
            };
            walker.items(&module.items);
        }
        registry
    }

    pub fn fragment_at(&self, source: SourceId, span: Span) -> Option<FragmentId> {
        self.fragment_by_pos.get(&(source, span.start)).copied()
    }

    pub fn function_at(&self, source: SourceId, span: Span) -> Option<FuncId> {
        self.function_by_pos.get(&(source, span.start)).copied()
    }

    pub fn fragment(&self, id: FragmentId) -> &FragmentSite {
        &self.fragments[id.index()]
    }

    pub fn function(&self, id: FuncId) -> &FuncSite {
        &self.functions[id.index()]
    }

    pub fn fragments(&self) -> impl Iterator<Item = (FragmentId, &FragmentSite)> {
        self.fragments
            .iter()
            .enumerate()
            .map(|(i, site)| (FragmentId(i as u32), site))
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    fn add_fragment(&mut self, source: SourceId, span: Span, template: &Template) {
        let key = (source, span.start);
        if self.fragment_by_pos.contains_key(&key) {
            return;
        }
        let id = FragmentId(self.fragments.len() as u32);
        self.fragments.push(FragmentSite {
            source,
            span,
            template: template.clone(),
        });
        self.fragment_by_pos.insert(key, id);
    }

    fn add_function(&mut self, source: SourceId, span: Span, name: Option<String>, exported: bool) {
        let key = (source, span.start);
        if self.function_by_pos.contains_key(&key) {
            return;
        }
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(FuncSite {
            source,
            name,
            exported,
            span,
        });
        self.function_by_pos.insert(key, id);
    }
}

struct Walker<'r, 's> {
    registry: &'r mut Registry,
    source: SourceId,
    tag: &'s str,
}

impl Walker<'_, '_> {
    fn items(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::Func(func) => self.func(func, func.name.clone(), func.exported),
                Item::Decl(decl) => {
                    for d in &decl.declarators {
                        match &d.init {
                            // A function bound by a declarator carries the
                            // declarator's name and export status.
                            Some(Expr::Func(func)) => {
                                self.func(func, Some(d.name.clone()), decl.exported)
                            }
                            Some(init) => self.expr(init),
                            None => {}
                        }
                    }
                }
                Item::ExportDefault(default) => match &default.value {
                    // A default-exported function is importable under the
                    // `default` name.
                    Expr::Func(func) => self.func(func, Some("default".to_owned()), true),
                    value => self.expr(value),
                },
                Item::Assign(assign) => {
                    self.expr(&assign.target);
                    self.expr(&assign.value);
                }
                Item::Expr(expr) => self.expr(expr),
                Item::Cond(inner) => self.items(inner),
                Item::Import(_) | Item::ExportClause(_) | Item::ExportStar(_) => {}
            }
        }
    }

    fn func(&mut self, func: &FuncDecl, name: Option<String>, exported: bool) {
        self.registry
            .add_function(self.source, func.span, name, exported);
        self.items(&func.body);
    }

    fn template(&mut self, template: &Template) {
        if template.has_tag(self.tag) {
            self.registry.add_fragment(self.source, template.span, template);
        }
        if let Some(tag) = &template.tag {
            self.expr(tag);
        }
        for interp in &template.interps {
            self.expr(interp);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Template(template) => self.template(template),
            Expr::Func(func) => self.func(func, None, false),
            Expr::Ident(_) => {}
            Expr::Member(member) => self.expr(&member.object),
            Expr::Call(call) => {
                self.expr(&call.callee);
                for arg in &call.args {
                    self.expr(arg);
                }
            }
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
        }
    }
}

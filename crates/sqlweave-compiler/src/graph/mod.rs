//! Module graph: per-module export tables and whole-program resolution of
//! `(module, exported name)` pairs to terminal bindings.
//!
//! Re-export chains (`export {X} from "./m"`, `export * from "./m"`,
//! `export * as ns from "./m"`) are followed to a fixed point. Cycles in
//! the re-export graph are a fatal error: they indicate malformed input the
//! compiler cannot make progress on, regardless of diagnostic policy.


use indexmap::{IndexMap, IndexSet};

use crate::diagnostics::Span;
use crate::source_map::{SourceId, SourceMap};
use crate::syntax::{AstMap, Item};
use crate::{Error, Result};

/// Where an exported name points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A binding declared in the exporting module itself.
    Local(String),
    /// `export {name as exported} from "specifier"`.
    Reexport { specifier: String, name: String },
    /// `export * as exported from "specifier"` — a whole-module namespace.
    StarNamespace { specifier: String },
}

#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub target: ExportTarget,
    pub span: Span,
}

/// The export surface of one module.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    pub named: IndexMap<String, ExportEntry>,
    /// `export * from "specifier"` sources, in declaration order.
    pub stars: Vec<(String, Span)>,
}

/// A terminal local binding reached through the export graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingRef {
    pub module: SourceId,
    pub name: String,
}

/// Result of resolving one exported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedExport {
    Binding(BindingRef),
    Namespace(SourceId),
}

/// Whole-program export resolution. Constructed once per build and dropped
/// with it; never persisted across runs.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    exports: IndexMap<SourceId, ExportTable>,
}

impl ModuleGraph {
    /// Collect export tables for all modules and verify the re-export
    /// graph is acyclic.
    pub fn build(sources: &SourceMap, modules: &AstMap) -> Result<Self> {
        let mut graph = Self::default();
        for (&source, module) in modules {
            let mut table = ExportTable::default();
            for item in &module.items {
                collect_exports(item, &mut table);
            }
            graph.exports.insert(source, table);
        }
        graph.verify_acyclic(sources)?;
        Ok(graph)
    }

    pub fn exports_of(&self, module: SourceId) -> Option<&ExportTable> {
        self.exports.get(&module)
    }

    /// Exported names of a module, stars not expanded.
    pub fn exported_names(&self, module: SourceId) -> impl Iterator<Item = &str> {
        self.exports
            .get(&module)
            .into_iter()
            .flat_map(|t| t.named.keys().map(String::as_str))
    }

    /// Resolve `(module, name)` to its terminal binding or namespace.
    ///
    /// Returns `None` for names that do not exist or leave the input set
    /// (external packages). Cycles were rejected at build time; the seen
    /// set here only guards against resolution re-entering itself through
    /// star fan-out.
    pub fn resolve_export(
        &self,
        sources: &SourceMap,
        module: SourceId,
        name: &str,
    ) -> Option<ResolvedExport> {
        let mut seen = IndexSet::new();
        self.resolve_inner(sources, module, name, &mut seen)
    }

    fn resolve_inner(
        &self,
        sources: &SourceMap,
        module: SourceId,
        name: &str,
        seen: &mut IndexSet<(SourceId, String)>,
    ) -> Option<ResolvedExport> {
        if !seen.insert((module, name.to_owned())) {
            return None;
        }
        let table = self.exports.get(&module)?;

        if let Some(entry) = table.named.get(name) {
            return match &entry.target {
                ExportTarget::Local(local) => Some(ResolvedExport::Binding(BindingRef {
                    module,
                    name: local.clone(),
                })),
                ExportTarget::Reexport { specifier, name } => {
                    let target = sources.resolve_specifier(module, specifier)?;
                    self.resolve_inner(sources, target, name, seen)
                }
                ExportTarget::StarNamespace { specifier } => {
                    let target = sources.resolve_specifier(module, specifier)?;
                    Some(ResolvedExport::Namespace(target))
                }
            };
        }

        // `export *` never re-exports the default binding.
        if name == "default" {
            return None;
        }
        for (specifier, _) in &table.stars {
            let Some(target) = sources.resolve_specifier(module, specifier) else {
                continue;
            };
            if let Some(resolved) = self.resolve_inner(sources, target, name, seen) {
                return Some(resolved);
            }
        }
        None
    }

    /// DFS coloring over the re-export edges. Grey re-entry is a cycle.
    fn verify_acyclic(&self, sources: &SourceMap) -> Result<()> {
        // Edges between whole modules: `export * from`.
        let star_edges: IndexMap<SourceId, Vec<SourceId>> = self
            .exports
            .iter()
            .map(|(&m, table)| {
                let targets = table
                    .stars
                    .iter()
                    .filter_map(|(spec, _)| sources.resolve_specifier(m, spec))
                    .collect();
                (m, targets)
            })
            .collect();

        let mut colors: IndexMap<SourceId, Color> = IndexMap::new();
        let mut stack: Vec<SourceId> = Vec::new();
        for &m in self.exports.keys() {
            if !colors.contains_key(&m) {
                visit_star(m, &star_edges, &mut colors, &mut stack, sources)?;
            }
        }

        // Edges between (module, name) pairs: named re-exports.
        let mut pair_colors: IndexMap<(SourceId, String), Color> = IndexMap::new();
        for (&m, table) in &self.exports {
            for name in table.named.keys() {
                if !pair_colors.contains_key(&(m, name.clone())) {
                    self.visit_named(m, name, sources, &mut pair_colors)?;
                }
            }
        }
        Ok(())
    }

    fn visit_named(
        &self,
        module: SourceId,
        name: &str,
        sources: &SourceMap,
        colors: &mut IndexMap<(SourceId, String), Color>,
    ) -> Result<()> {
        let key = (module, name.to_owned());
        match colors.get(&key) {
            Some(Color::Grey) => {
                return Err(Error::CyclicExport(format!(
                    "`{}` in {}",
                    name,
                    sources.name(module)
                )));
            }
            Some(Color::Black) => return Ok(()),
            None => {}
        }
        colors.insert(key.clone(), Color::Grey);

        if let Some(table) = self.exports.get(&module)
            && let Some(entry) = table.named.get(name)
            && let ExportTarget::Reexport {
                specifier,
                name: original,
            } = &entry.target
            && let Some(target) = sources.resolve_specifier(module, specifier)
        {
            self.visit_named(target, original, sources, colors)?;
        }

        colors.insert(key, Color::Black);
        Ok(())
    }
}

/// DFS coloring state shared by both cycle checks.
#[derive(Clone, Copy, PartialEq)]
enum Color {
    Grey,
    Black,
}

fn visit_star(
    module: SourceId,
    edges: &IndexMap<SourceId, Vec<SourceId>>,
    colors: &mut IndexMap<SourceId, Color>,
    stack: &mut Vec<SourceId>,
    sources: &SourceMap,
) -> Result<()> {
    match colors.get(&module) {
        Some(Color::Grey) => {
            let mut chain: Vec<&str> = stack.iter().map(|&m| sources.name(m)).collect();
            chain.push(sources.name(module));
            return Err(Error::CyclicExport(chain.join(" -> ")));
        }
        Some(Color::Black) => return Ok(()),
        None => {}
    }
    colors.insert(module, Color::Grey);
    stack.push(module);
    if let Some(targets) = edges.get(&module) {
        for &target in targets {
            visit_star(target, edges, colors, stack, sources)?;
        }
    }
    stack.pop();
    colors.insert(module, Color::Black);
    Ok(())
}

fn collect_exports(item: &Item, table: &mut ExportTable) {
    match item {
        Item::ExportClause(clause) => {
            for spec in &clause.items {
                let target = match &clause.from {
                    Some(specifier) => ExportTarget::Reexport {
                        specifier: specifier.clone(),
                        name: spec.local.clone(),
                    },
                    None => ExportTarget::Local(spec.local.clone()),
                };
                table.named.insert(
                    spec.exported.clone(),
                    ExportEntry {
                        target,
                        span: spec.span,
                    },
                );
            }
        }
        Item::ExportStar(star) => match &star.alias {
            Some(alias) => {
                table.named.insert(
                    alias.clone(),
                    ExportEntry {
                        target: ExportTarget::StarNamespace {
                            specifier: star.specifier.clone(),
                        },
                        span: star.span,
                    },
                );
            }
            None => table.stars.push((star.specifier.clone(), star.span)),
        },
        Item::ExportDefault(default) => {
            // The defining expression lives in the module's scope table
            // under the reserved name `default` (never a user identifier).
            table.named.insert(
                "default".to_owned(),
                ExportEntry {
                    target: ExportTarget::Local("default".to_owned()),
                    span: default.span,
                },
            );
        }
        Item::Decl(decl) if decl.exported => {
            for d in &decl.declarators {
                table.named.insert(
                    d.name.clone(),
                    ExportEntry {
                        target: ExportTarget::Local(d.name.clone()),
                        span: d.span,
                    },
                );
            }
        }
        Item::Func(func) if func.exported => {
            if let Some(name) = &func.name {
                table.named.insert(
                    name.clone(),
                    ExportEntry {
                        target: ExportTarget::Local(name.clone()),
                        span: func.span,
                    },
                );
            }
        }
        _ => {}
    }
}

//! Fragment compilation: one `sql` template into a composed, parameterized,
//! content-addressed query.
//!
//! Interpolations that resolved to fragments become positional `%{i}` merge
//! markers with the sub-fragment kept as a unit; all other interpolations
//! become `$N` bind markers with a recorded bound parameter. User-authored
//! `%{name}` placeholders stay verbatim as late-bound parameters.
//!
//! Fragments compile bottom-up in dependency order; a reference cycle is a
//! fatal error detected by DFS coloring, never by running out of stack.

mod text;

#[cfg(test)]
mod compile_tests;

pub use text::{classify_kind, has_multiple_statements, is_ambiguous_marker, scan_late_params, Piece};

use indexmap::{IndexMap, IndexSet};

use sqlweave_core::{BoundParam, CompiledQuery, Digest, LateParam, SourceLocation};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::hash::{digest_query, DigestCache};
use crate::resolve::{FragmentId, OpaqueReason, ProgramResolution, Registry, Value};
use crate::source_map::SourceMap;
use crate::{Error, PassResult};

use text::scan_label;

/// All compiled fragments of a build.
#[derive(Debug, Default)]
pub struct CompiledProgram {
    queries: IndexMap<FragmentId, CompiledQuery>,
    /// Fragments whose compiled text carries an error (ambiguous markers);
    /// call sites reaching one are excluded from codegen.
    poisoned: IndexSet<FragmentId>,
    canonical: DigestCache,
}

impl CompiledProgram {
    pub fn get(&self, id: FragmentId) -> Option<&CompiledQuery> {
        self.queries.get(&id)
    }

    pub fn get_mut(&mut self, id: FragmentId) -> Option<&mut CompiledQuery> {
        self.queries.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FragmentId, &CompiledQuery)> {
        self.queries.iter().map(|(&id, q)| (id, q))
    }

    pub fn is_poisoned(&self, id: FragmentId) -> bool {
        self.poisoned.contains(&id)
    }

    /// Canonical fragment for a digest (first compiled wins).
    pub fn canonical(&self, digest: &Digest) -> Option<FragmentId> {
        self.canonical.get(digest)
    }

    /// The fragment ids a compiled query merges, in positional order.
    pub fn sub_ids(&self, id: FragmentId) -> Vec<FragmentId> {
        self.queries
            .get(&id)
            .map(|q| {
                q.sub_fragments
                    .iter()
                    .filter_map(|d| self.canonical.get(d))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full parameter map of a query including merged sub-fragments:
    /// name to source expression for bound params, None for late-bound.
    /// Own params come first, then each sub-fragment's in positional order.
    pub fn union_params(&self, id: FragmentId) -> IndexMap<String, Option<String>> {
        let mut map = IndexMap::new();
        self.collect_params(id, &mut map, &mut IndexSet::new());
        map
    }

    fn collect_params(
        &self,
        id: FragmentId,
        map: &mut IndexMap<String, Option<String>>,
        seen: &mut IndexSet<FragmentId>,
    ) {
        if !seen.insert(id) {
            return;
        }
        let Some(query) = self.queries.get(&id) else {
            return;
        };
        for p in &query.bound {
            map.entry(p.name.clone()).or_insert(Some(p.expr.clone()));
        }
        for p in &query.late {
            map.entry(p.name.clone()).or_insert(None);
        }
        for sub in self.sub_ids(id) {
            self.collect_params(sub, map, seen);
        }
    }
}

/// Compile every registered fragment in dependency order.
pub fn compile_fragments(
    sources: &SourceMap,
    registry: &Registry,
    resolution: &ProgramResolution,
) -> PassResult<CompiledProgram> {
    let mut compiler = Compiler {
        sources,
        registry,
        resolution,
        program: CompiledProgram::default(),
        diag: Diagnostics::new(),
        colors: IndexMap::new(),
    };

    for (id, _) in registry.fragments() {
        compiler.visit(id)?;
    }

    Ok((compiler.program, compiler.diag))
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Grey,
    Black,
}

struct Compiler<'a> {
    sources: &'a SourceMap,
    registry: &'a Registry,
    resolution: &'a ProgramResolution,
    program: CompiledProgram,
    diag: Diagnostics,
    colors: IndexMap<FragmentId, Color>,
}

impl Compiler<'_> {
    /// DFS in dependency order: sub-fragments compile before composites.
    fn visit(&mut self, id: FragmentId) -> Result<(), Error> {
        match self.colors.get(&id) {
            Some(Color::Black) => return Ok(()),
            Some(Color::Grey) => {
                let site = self.registry.fragment(id);
                let file = self.sources.name(site.source).to_owned();
                let line = self.sources.line_of(site.source, site.span.start);
                return Err(Error::CyclicFragment(file, line));
            }
            None => {}
        }
        self.colors.insert(id, Color::Grey);

        let deps: Vec<FragmentId> = self
            .resolution
            .interps
            .get(&id)
            .map(|values| values.iter().filter_map(Value::as_fragment).collect())
            .unwrap_or_default();
        for dep in deps {
            self.visit(dep)?;
        }

        self.compile(id);
        self.colors.insert(id, Color::Black);
        Ok(())
    }

    fn compile(&mut self, id: FragmentId) {
        let site = self.registry.fragment(id);
        let template = &site.template;
        let values = self.resolution.interps.get(&id);

        let mut text = String::new();
        let mut sub_fragments: Vec<Digest> = Vec::new();
        let mut bound: Vec<BoundParam> = Vec::new();
        let mut late: Vec<LateParam> = Vec::new();
        let mut poisoned = false;

        self.chunk(&template.quasis[0], site, &mut text, &mut late, &mut poisoned);

        for (i, interp) in template.interps.iter().enumerate() {
            let value = values
                .and_then(|v| v.get(i))
                .cloned()
                .unwrap_or(Value::Opaque(OpaqueReason::Unresolved));
            let (label, tail) = scan_label(&template.quasis[i + 1]);

            match value.as_fragment() {
                Some(sub_id) => {
                    let sub = &self.program.queries[&sub_id];
                    text.push_str(&format!("%{{{}}}", sub_fragments.len()));
                    sub_fragments.push(sub.digest);
                    if self.program.poisoned.contains(&sub_id) {
                        poisoned = true;
                    }
                }
                None => {
                    let marker = format!("${}", bound.len());
                    text.push_str(&marker);
                    let name = label
                        .map(str::to_owned)
                        .or_else(|| interp.as_ident().map(str::to_owned))
                        .unwrap_or(marker);
                    let expr_span = interp.span();
                    let expr = self.sources.content(site.source)[expr_span.range()].to_owned();
                    bound.push(BoundParam { name, expr });
                }
            }

            self.chunk(tail, site, &mut text, &mut late, &mut poisoned);
        }

        if has_multiple_statements(&text) {
            self.diag
                .report(DiagnosticKind::MultiStatementQuery, site.span)
                .emit();
        }

        let digest = digest_query(
            &text,
            &sub_fragments,
            bound
                .iter()
                .map(|p| p.name.as_str())
                .chain(late.iter().map(|p| p.name.as_str())),
        );

        let compiled = CompiledQuery {
            digest,
            kind: classify_kind(&text),
            text,
            sub_fragments,
            bound,
            late,
            defined_at: SourceLocation {
                file: self.sources.name(site.source).to_owned(),
                line: self.sources.line_of(site.source, site.span.start),
            },
            usages: Vec::new(),
        };

        self.program.canonical.intern(digest, id);
        self.program.queries.insert(id, compiled);
        if poisoned {
            self.program.poisoned.insert(id);
        }
    }

    /// Append one raw chunk, extracting `%{name}` late params.
    fn chunk(
        &mut self,
        chunk: &str,
        site: &crate::resolve::FragmentSite,
        text: &mut String,
        late: &mut Vec<LateParam>,
        poisoned: &mut bool,
    ) {
        for piece in scan_late_params(chunk) {
            match piece {
                Piece::Text(t) => text.push_str(&t),
                Piece::Late(name) => {
                    if is_ambiguous_marker(&name) {
                        self.diag
                            .report(DiagnosticKind::AmbiguousMarker, site.span)
                            .message(format!("%{{{name}}}"))
                            .emit();
                        *poisoned = true;
                    }
                    text.push_str(&format!("%{{{name}}}"));
                    if !late.iter().any(|l| l.name == name) {
                        late.push(LateParam { name });
                    }
                }
            }
        }
    }
}

//! Source rewriting: replace each live `sql` template with its compiled
//! object literal.
//!
//! A query without merges becomes
//! `{query: "<hex>", text: "<normalized>", params: {...}}`; a query with
//! merges is wrapped as `sql.merge(obj, sub0, sub1, ...)` with each merged
//! sub-expression passed through (inline templates recursively emit their
//! own compiled objects). Unreachable and ambiguous templates are left
//! untouched.

use indexmap::IndexMap;

use crate::diagnostics::Span;
use crate::fragment::CompiledProgram;
use crate::resolve::{FragmentId, ProgramResolution, Registry, Value};
use crate::source_map::{SourceId, SourceMap};

use super::dce::Liveness;

pub struct Emitter<'a> {
    pub sources: &'a SourceMap,
    pub registry: &'a Registry,
    pub resolution: &'a ProgramResolution,
    pub program: &'a CompiledProgram,
    pub tag: &'a str,
}

impl Emitter<'_> {
    /// Rewritten text for every module, in source order.
    pub fn rewrite_sources(&self, live: &Liveness) -> IndexMap<SourceId, String> {
        let mut out = IndexMap::new();
        for source in self.sources.iter() {
            let replacements = self.replacements_for(source.id, live);
            out.insert(source.id, splice(source.content, replacements));
        }
        out
    }

    fn replacements_for(&self, source: SourceId, live: &Liveness) -> Vec<(Span, String)> {
        let sites: Vec<(FragmentId, Span)> = self
            .registry
            .fragments()
            .filter(|(_, site)| site.source == source)
            .map(|(id, site)| (id, site.span))
            .collect();

        let mut replacements = Vec::new();
        for &(id, span) in &sites {
            if !live.fragments.contains(&id) || self.program.is_poisoned(id) {
                continue;
            }
            // Nested templates are emitted by their enclosing site.
            let nested = sites
                .iter()
                .any(|&(_, outer)| outer.start < span.start && span.end <= outer.end);
            if nested {
                continue;
            }
            replacements.push((span, self.fragment_expr(id)));
        }
        replacements
    }

    /// The compiled JavaScript expression for one fragment.
    pub fn fragment_expr(&self, id: FragmentId) -> String {
        let query = self.program.get(id).expect("fragment compiled");

        let mut params = String::new();
        for p in &query.bound {
            if !params.is_empty() {
                params.push_str(", ");
            }
            params.push_str(&format!("{}: {}", object_key(&p.name), p.expr));
        }
        for p in &query.late {
            if !params.is_empty() {
                params.push_str(", ");
            }
            params.push_str(&format!("{}: undefined", object_key(&p.name)));
        }

        let object = format!(
            "{{query: {}, text: {}, params: {{{}}}}}",
            js_string(&query.digest.to_hex()),
            js_string(&query.text),
            params
        );

        let merged = self.merged_sub_exprs(id);
        if merged.is_empty() {
            object
        } else {
            format!("{}.merge({}, {})", self.tag, object, merged.join(", "))
        }
    }

    /// Runtime expressions for the merged interpolations, in positional
    /// order. An inline template recursively emits its compiled object;
    /// anything else passes the source text through.
    fn merged_sub_exprs(&self, id: FragmentId) -> Vec<String> {
        let site = self.registry.fragment(id);
        let Some(values) = self.resolution.interps.get(&id) else {
            return Vec::new();
        };
        site.template
            .interps
            .iter()
            .zip(values)
            .filter(|(_, value)| matches!(value, Value::Fragment(_)))
            .map(|(interp, value)| {
                let sub = value.as_fragment().expect("filtered to fragments");
                let inline = self
                    .registry
                    .fragment_at(site.source, interp.span())
                    .is_some_and(|inline_id| inline_id == sub);
                if inline {
                    self.fragment_expr(sub)
                } else {
                    self.sources.content(site.source)[interp.span().range()].to_owned()
                }
            })
            .collect()
    }
}

/// Apply span replacements back-to-front so earlier offsets stay valid.
fn splice(source: &str, mut replacements: Vec<(Span, String)>) -> String {
    replacements.sort_by_key(|(span, _)| span.start);
    let mut text = source.to_owned();
    for (span, replacement) in replacements.into_iter().rev() {
        text.replace_range(span.range(), &replacement);
    }
    text
}

/// Quote an object key unless it is a valid JavaScript identifier.
fn object_key(name: &str) -> String {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if valid {
        name.to_owned()
    } else {
        js_string(name)
    }
}

/// A double-quoted JavaScript string literal.
fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:04x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

//! Call-site judgment and codegen.
//!
//! Every recognized `.executeQuery(...)` record is judged: a call whose
//! query argument resolved to a fragment is retained and emitted; anything
//! else is excluded with a per-call-site diagnostic, and compilation of the
//! remaining call sites proceeds unaffected. After judgment, validator
//! liveness is recomputed over the retained set and dead validators are
//! dropped from output.

mod dce;
mod emit;


pub use dce::Liveness;

use indexmap::{IndexMap, IndexSet};

use sqlweave_core::{CallDescriptor, ManifestEntry, QueryManifest, SourceLocation, ValidatorRef};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::fragment::CompiledProgram;
use crate::resolve::{
    CallSiteRecord, FragmentId, FuncId, OpaqueReason, ProgramResolution, Registry, Value,
};
use crate::source_map::{SourceId, SourceMap};
use crate::PassResult;

/// Everything codegen produces for one build.
#[derive(Debug, Default)]
pub struct RewriteOutput {
    /// One descriptor per retained call site, in program order.
    pub descriptors: Vec<CallDescriptor>,
    /// Deterministic manifest of every query reachable from a retained
    /// call site.
    pub manifest: QueryManifest,
    /// Rewritten module text, keyed by source.
    pub rewritten: IndexMap<SourceId, String>,
    /// Live validators, first-reference order, each exactly once.
    pub live_validators: Vec<ValidatorRef>,
    /// Recognized transaction-style calls, left untouched.
    pub server_call_count: usize,
}

pub fn rewrite(
    sources: &SourceMap,
    registry: &Registry,
    resolution: &ProgramResolution,
    program: &mut CompiledProgram,
    tag: &str,
) -> PassResult<RewriteOutput> {
    let mut diag = Diagnostics::new();
    let mut retained: Vec<(&CallSiteRecord, FragmentId, Vec<FuncId>)> = Vec::new();

    for record in &resolution.call_sites {
        let Some(fragment) = judge_query(record, program, &mut diag) else {
            continue;
        };
        let validators = judge_validators(record, sources, registry, &mut diag);
        judge_params(record, fragment, program, &mut diag);
        retained.push((record, fragment, validators));
    }

    // Usage locations attach to the query each retained call executes.
    for (record, fragment, _) in &retained {
        let location = SourceLocation {
            file: sources.name(record.source).to_owned(),
            line: sources.line_of(record.source, record.span.start),
        };
        if let Some(query) = program.get_mut(*fragment)
            && !query.usages.contains(&location)
        {
            query.usages.push(location);
        }
    }

    let live = dce::compute(
        retained
            .iter()
            .map(|(_, fragment, validators)| (*fragment, validators.clone())),
        program,
    );

    // Unreachable queries are reported once and left untouched in output.
    for (id, site) in registry.fragments() {
        if !live.fragments.contains(&id) && !program.is_poisoned(id) {
            diag.report(DiagnosticKind::UnusedQuery, site.span).emit();
        }
    }

    let mut live_validators = Vec::new();
    let mut seen: IndexSet<FuncId> = IndexSet::new();
    for (_, _, validators) in &retained {
        for &id in validators {
            if seen.insert(id) {
                live_validators.push(validator_ref(id, sources, registry));
            }
        }
    }

    let descriptors = retained
        .iter()
        .map(|(record, fragment, validators)| {
            let query = program.get(*fragment).expect("fragment compiled");
            CallDescriptor {
                query: query.digest,
                text: query.text.clone(),
                params: program.union_params(*fragment),
                validators: validators
                    .iter()
                    .map(|&id| validator_ref(id, sources, registry))
                    .collect(),
                called_at: SourceLocation {
                    file: sources.name(record.source).to_owned(),
                    line: sources.line_of(record.source, record.span.start),
                },
            }
        })
        .collect();

    let manifest = QueryManifest::new(
        live.fragments
            .iter()
            .filter_map(|id| program.get(*id))
            .map(ManifestEntry::from_query)
            .collect(),
    );

    let emitter = emit::Emitter {
        sources,
        registry,
        resolution,
        program,
        tag,
    };
    let rewritten = emitter.rewrite_sources(&live);

    Ok((
        RewriteOutput {
            descriptors,
            manifest,
            rewritten,
            live_validators,
            server_call_count: resolution.server_calls.len(),
        },
        diag,
    ))
}

/// Argument 0 must resolve to a fragment; everything else excludes the
/// call with the most precise kind the resolver recorded.
fn judge_query(
    record: &CallSiteRecord,
    program: &CompiledProgram,
    diag: &mut Diagnostics,
) -> Option<FragmentId> {
    match &record.query {
        Value::Fragment(id) => {
            if program.is_poisoned(*id) {
                // The marker ambiguity was already reported at the
                // template; the call is excluded without a second record.
                return None;
            }
            Some(*id)
        }
        other => {
            let kind = match other.opaque_reason() {
                Some(OpaqueReason::Conditional) => DiagnosticKind::ConditionalAssignment,
                Some(OpaqueReason::DynamicAccess) => DiagnosticKind::DynamicIndexAccess,
                Some(OpaqueReason::DynamicImport) => DiagnosticKind::UnsupportedDynamicImport,
                _ => DiagnosticKind::UnresolvedQuery,
            };
            diag.report(kind, record.query_span).emit();
            None
        }
    }
}

/// Trailing arguments keep only function bindings; a kept one must be
/// exported so the runtime can reach it by name.
fn judge_validators(
    record: &CallSiteRecord,
    sources: &SourceMap,
    registry: &Registry,
    diag: &mut Diagnostics,
) -> Vec<FuncId> {
    let mut kept = Vec::new();
    for (value, span) in &record.validators {
        match value.as_function() {
            Some(id) => {
                let site = registry.function(id);
                if site.exported {
                    kept.push(id);
                } else {
                    let name = site.name.as_deref().unwrap_or("<anonymous>");
                    diag.report(DiagnosticKind::ValidatorNotExported, *span)
                        .message(name)
                        .emit();
                }
            }
            None => {
                let text = &sources.content(span.source)[span.range()];
                diag.report(DiagnosticKind::DroppedValidator, *span)
                    .message(text)
                    .emit();
            }
        }
    }
    kept
}

/// The params position: a function there is advisory-ignored; a query with
/// late-bound params and no params object cannot bind at runtime.
fn judge_params(
    record: &CallSiteRecord,
    fragment: FragmentId,
    program: &CompiledProgram,
    diag: &mut Diagnostics,
) {
    let params_usable = match &record.params {
        Some(arg) if arg.is_function => {
            diag.report(DiagnosticKind::ValidatorAsParams, arg.span).emit();
            false
        }
        Some(_) => true,
        None => false,
    };

    if params_usable {
        return;
    }
    let late: Vec<String> = program
        .union_params(fragment)
        .iter()
        .filter(|(_, expr)| expr.is_none())
        .map(|(name, _)| format!("`%{{{name}}}`"))
        .collect();
    if !late.is_empty() {
        diag.report(DiagnosticKind::UnresolvedParams, record.span)
            .message(late.join(", "))
            .emit();
    }
}

fn validator_ref(id: FuncId, sources: &SourceMap, registry: &Registry) -> ValidatorRef {
    let site = registry.function(id);
    ValidatorRef {
        name: site.name.clone().unwrap_or_else(|| "<anonymous>".to_owned()),
        module: sources.name(site.source).to_owned(),
    }
}

//! Compiled query representation: composed text, parameters, call output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Digest;

/// Statement class of a composed query, taken from its leading keyword
/// (ignoring SQL line and block comments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueryKind::Select => "select",
            QueryKind::Insert => "insert",
            QueryKind::Update => "update",
            QueryKind::Delete => "delete",
            QueryKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A `${}` interpolation that resolved to a runtime value.
///
/// `name` keys the entry in the emitted params object: the identifier text
/// for a bare identifier, an explicit `:label:` when the source supplies
/// one, the positional marker `$N` otherwise. `expr` is the source text of
/// the interpolated expression, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundParam {
    pub name: String,
    pub expr: String,
}

/// A user-authored `%{name}` placeholder with no compile-time value.
///
/// Resolved only from a runtime-supplied params object keyed by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateParam {
    pub name: String,
}

/// Location of a definition or usage in the original sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// The compiled, content-addressed form of one SQL template.
///
/// `text` carries positional markers in place of interpolations: `$N`
/// (0-based bound-parameter ordinal) where a runtime value is bound, and
/// `%{i}` (0-based sub-fragment ordinal) where another fragment was merged.
/// User-authored `%{name}` placeholders remain verbatim. Immutable once the
/// digest is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub digest: Digest,
    pub text: String,
    pub kind: QueryKind,
    pub sub_fragments: Vec<Digest>,
    pub bound: Vec<BoundParam>,
    pub late: Vec<LateParam>,
    pub defined_at: SourceLocation,
    pub usages: Vec<SourceLocation>,
}

impl CompiledQuery {
    /// Parameter names in declared order: bound params first, then late
    /// params. This is the order the digest covers.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.bound
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.late.iter().map(|p| p.name.as_str()))
    }
}

/// A live validator reference attached to a call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorRef {
    /// Exported name of the validator function.
    pub name: String,
    /// Module that exports it.
    pub module: String,
}

/// Output descriptor for one resolved `.executeQuery(...)` call site.
///
/// `params` maps parameter name to the verbatim source expression for bound
/// params, `None` for late-bound ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDescriptor {
    pub query: Digest,
    pub text: String,
    pub params: IndexMap<String, Option<String>>,
    pub validators: Vec<ValidatorRef>,
    pub called_at: SourceLocation,
}

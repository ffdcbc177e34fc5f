use crate::source_map::SourceId;

/// A source span: which input the diagnostic belongs to and the byte range
/// underlined in output. Byte offsets come straight from tree-sitter nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub source: SourceId,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(source: SourceId, start: usize, end: usize) -> Self {
        Self { source, start, end }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Diagnostic kinds ordered by priority (highest priority first).
///
/// When two diagnostics have overlapping spans, the higher-priority one
/// suppresses the lower-priority one. This prevents cascading noise: a call
/// site whose query argument is conditionally assigned does not also need
/// an unused-query warning for each branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    // Structural errors; these also abort the run via `Error`
    CyclicExport,
    CyclicFragment,

    // Fragment text problems
    AmbiguousMarker,

    // Per-call-site resolution failures
    UnresolvedQuery,
    ConditionalAssignment,
    DynamicIndexAccess,
    UnsupportedDynamicImport,
    UnresolvedParams,
    ValidatorNotExported,

    // Advisory findings; codegen proceeds
    DroppedValidator,
    ValidatorAsParams,
    MultiStatementQuery,
    UnusedQuery,
}

impl DiagnosticKind {
    /// Default severity for this kind.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::DroppedValidator
            | Self::ValidatorAsParams
            | Self::MultiStatementQuery
            | Self::UnusedQuery => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Whether this kind suppresses `other` when spans overlap.
    ///
    /// Uses enum discriminant ordering: lower position = higher priority.
    pub fn suppresses(&self, other: &DiagnosticKind) -> bool {
        self < other
    }

    /// Base message for this diagnostic kind, used when no custom detail is
    /// provided.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::CyclicExport => "cyclic re-export chain",
            Self::CyclicFragment => "cyclic fragment reference",
            Self::AmbiguousMarker => {
                "all-digit placeholder names are reserved for merge markers"
            }
            Self::UnresolvedQuery => "could not identify the query argument",
            Self::ConditionalAssignment => "value is assigned on more than one control-flow path",
            Self::DynamicIndexAccess => "computed property access cannot be resolved statically",
            Self::UnsupportedDynamicImport => {
                "require() imports are not supported, use ES module imports"
            }
            Self::UnresolvedParams => {
                "query has late-bound parameters but the call provides no params object"
            }
            Self::ValidatorNotExported => "validator must be an exported function",
            Self::DroppedValidator => "argument does not resolve to a function and is ignored",
            Self::ValidatorAsParams => {
                "function in the params position is not treated as a validator"
            }
            Self::MultiStatementQuery => {
                "query contains multiple statements; only the last result is returned"
            }
            Self::UnusedQuery => "query is unused",
        }
    }

    /// Template for custom messages. Contains `{}` for caller-provided detail.
    pub fn custom_message(&self) -> String {
        match self {
            Self::CyclicExport => "cyclic re-export chain: {}".to_string(),
            Self::ConditionalAssignment => {
                "`{}` is assigned on more than one control-flow path".to_string()
            }
            Self::DynamicIndexAccess => "`{}` is accessed with a computed key".to_string(),
            Self::AmbiguousMarker => {
                "placeholder `{}` collides with merge-marker numbering".to_string()
            }
            Self::ValidatorNotExported => "`{}` must be exported".to_string(),
            Self::DroppedValidator => {
                "`{}` does not resolve to a function and is ignored".to_string()
            }
            Self::UnresolvedParams => "missing params object for {}".to_string(),
            _ => format!("{}: {{}}", self.fallback_message()),
        }
    }

    /// Render the final message.
    ///
    /// - `None` → returns `fallback_message()`
    /// - `Some(detail)` → returns `custom_message()` with `{}` replaced
    pub fn message(&self, msg: Option<&str>) -> String {
        match msg {
            None => self.fallback_message().to_string(),
            Some(detail) => self.custom_message().replace("{}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub(crate) span: Span,
    pub(crate) message: String,
}

impl RelatedInfo {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiagnosticMessage {
    pub(crate) kind: DiagnosticKind,
    pub(crate) span: Span,
    pub(crate) message: String,
    pub(crate) related: Vec<RelatedInfo>,
}

impl DiagnosticMessage {
    pub(crate) fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub(crate) fn with_default_message(kind: DiagnosticKind, span: Span) -> Self {
        Self::new(kind, span, kind.fallback_message())
    }

    pub(crate) fn severity(&self) -> Severity {
        self.kind.default_severity()
    }

    pub(crate) fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub(crate) fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity(),
            self.span.start,
            self.span.end,
            self.message
        )?;
        for related in &self.related {
            write!(
                f,
                " (related: {} at {}..{})",
                related.message, related.span.start, related.span.end
            )?;
        }
        Ok(())
    }
}

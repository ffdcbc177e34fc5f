//! sqlweave compiler: module graph, flow resolution, and query compilation.
//!
//! This crate provides the compilation pipeline for sqlweave builds:
//! - `syntax` - tree-sitter frontend and the lowered item/expression IR
//! - `graph` - module graph construction and export resolution
//! - `resolve` - per-scope binding classification and alias chains
//! - `fragment` - template composition and parameter extraction
//! - `hash` - content digests and deduplication
//! - `rewrite` - call-site resolution, validator liveness, codegen
//! - `diagnostics` - error reporting
//! - `build` - high-level staged Build facade

pub mod build;
pub mod diagnostics;
pub mod fragment;
pub mod graph;
pub mod hash;
pub mod resolve;
pub mod rewrite;
pub mod source_map;
pub mod syntax;

#[cfg(test)]
pub mod test_utils;

pub use build::{Build, BuildBuilder, BuildOutput};
pub use diagnostics::{DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity, Span};
pub use source_map::{Source, SourceId, SourceKind, SourceMap};

/// Result type for passes that produce both output and diagnostics.
///
/// Each pass returns its typed output alongside any diagnostics it
/// collected. Fatal structural errors use the outer `Result`.
pub type PassResult<T> = std::result::Result<(T, Diagnostics), Error>;

/// Errors that abort a compilation run.
///
/// Per-call-site resolution failures are not errors; they are recorded as
/// diagnostics and the offending call site is excluded from codegen. Only
/// structural problems the compiler cannot make progress on are fatal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A re-export chain loops back on itself.
    #[error("cyclic export chain through `{0}`")]
    CyclicExport(String),

    /// A fragment is merged, directly or transitively, into itself.
    #[error("cyclic fragment reference at {0}:{1}")]
    CyclicFragment(String, u32),

    #[error("build failed with {} errors", .0.error_count())]
    BuildFailed(Diagnostics),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, Error>;

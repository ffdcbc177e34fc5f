//! Core data structures for sqlweave compiled queries.
//!
//! Two layers:
//! - **Compilation layer**: [`CompiledQuery`], [`BoundParam`], [`LateParam`] —
//!   the fully-resolved form of one SQL template after merge and parameter
//!   extraction.
//! - **Output layer**: [`CallDescriptor`] and [`QueryManifest`] — the
//!   serialized artifacts emitted for call sites and the build as a whole.

mod digest;
mod manifest;
mod query;

#[cfg(test)]
mod digest_tests;
#[cfg(test)]
mod query_tests;

pub use digest::Digest;
pub use manifest::{ManifestEntry, QueryManifest};
pub use query::{
    BoundParam, CallDescriptor, CompiledQuery, LateParam, QueryKind, SourceLocation, ValidatorRef,
};

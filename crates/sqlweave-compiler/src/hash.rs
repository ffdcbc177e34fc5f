//! Content hashing and deduplication.
//!
//! A digest is a pure function of the composed text, the sub-fragment
//! digests in positional order, and the parameter names in declared order —
//! never of parameter values or the defining module. Two identical queries
//! in unrelated modules hash identically; that is the deduplication
//! invariant the manifest relies on.

use indexmap::IndexMap;
use sha2::{Digest as _, Sha256};

use sqlweave_core::Digest;

use crate::resolve::FragmentId;

/// SHA-256 over the composed text, sub-fragment digests, and parameter
/// names. Fields are NUL-separated so adjacent fields cannot alias.
pub fn digest_query<'a>(
    text: &str,
    sub_fragments: &[Digest],
    param_names: impl IntoIterator<Item = &'a str>,
) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);
    for sub in sub_fragments {
        hasher.update(sub.as_bytes());
    }
    hasher.update([0u8]);
    for name in param_names {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    Digest::from_bytes(hasher.finalize().into())
}

/// Build-wide digest-to-fragment cache. First writer wins; later identical
/// fragments observe the first one's id. Recomputing a digest is harmless
/// (the function is pure), so the cache only saves work, never correctness.
#[derive(Debug, Default)]
pub struct DigestCache {
    entries: IndexMap<Digest, FragmentId>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` for `digest` unless a writer got there first; returns
    /// the canonical id either way.
    pub fn intern(&mut self, digest: Digest, id: FragmentId) -> FragmentId {
        *self.entries.entry(digest).or_insert(id)
    }

    pub fn get(&self, digest: &Digest) -> Option<FragmentId> {
        self.entries.get(digest).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! The query manifest: every compiled query reachable from a resolved call
//! site, in a deterministic order suitable for diffing across builds.

use serde::{Deserialize, Serialize};

use crate::query::{CompiledQuery, QueryKind, SourceLocation};
use crate::Digest;

/// One manifest row, serialized to JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: Digest,
    pub query: String,
    #[serde(rename = "type")]
    pub kind: QueryKind,
    pub defined_at: SourceLocation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<SourceLocation>,
    /// Parameter names in declared order, to assist reading the manifest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fragments: Vec<Digest>,
}

impl ManifestEntry {
    pub fn from_query(q: &CompiledQuery) -> Self {
        Self {
            id: q.digest,
            query: q.text.clone(),
            kind: q.kind,
            defined_at: q.defined_at.clone(),
            usages: q.usages.clone(),
            params: q.param_names().map(String::from).collect(),
            fragments: q.sub_fragments.clone(),
        }
    }

    fn sort_key(&self) -> (QueryKind, &str, u32) {
        (self.kind, &self.defined_at.file, self.defined_at.line)
    }
}

/// All compiled queries of a build, sorted by (kind, file, line).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryManifest {
    entries: Vec<ManifestEntry>,
}

impl QueryManifest {
    pub fn new(mut entries: Vec<ManifestEntry>) -> Self {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        let mut seen = std::collections::HashSet::new();
        entries.retain(|e| seen.insert(e.id));
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.entries).expect("manifest entries serialize")
    }
}

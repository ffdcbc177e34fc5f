//! Source storage for a compilation session.
//!
//! Stores sources as owned strings and resolves module specifiers
//! (`./filters`, `./nested/other`) against the importing file's directory,
//! with `.js` and `/index.js` completion.

use indexmap::IndexMap;

/// Lightweight handle to a source in a compilation session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct SourceId(pub(crate) u32);

/// Describes the origin of a source.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SourceKind {
    /// An inline module passed directly (tests, embedding).
    Inline,
    /// A file with its project-relative path.
    File(String),
}

impl SourceKind {
    /// Returns the display name for diagnostics.
    pub fn display_name(&self) -> &str {
        match self {
            SourceKind::Inline => "<inline>",
            SourceKind::File(path) => path,
        }
    }
}

/// A borrowed view of a source: id, kind, and content.
#[derive(Clone, Debug)]
pub struct Source<'a> {
    pub id: SourceId,
    pub kind: &'a SourceKind,
    pub content: &'a str,
}

impl<'a> Source<'a> {
    pub fn as_str(&self) -> &'a str {
        self.content
    }
}

#[derive(Clone, Debug)]
struct SourceEntry {
    kind: SourceKind,
    content: String,
}

/// Registry of all sources in a build.
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    entries: Vec<SourceEntry>,
    by_path: IndexMap<String, SourceId>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file source with its project-relative path.
    pub fn add_file(&mut self, path: &str, content: &str) -> SourceId {
        let path = normalize(path);
        let id = self.push_entry(SourceKind::File(path.clone()), content);
        self.by_path.insert(path, id);
        id
    }

    /// Add an inline source with no path (single-module builds, tests).
    pub fn add_inline(&mut self, content: &str) -> SourceId {
        self.push_entry(SourceKind::Inline, content)
    }

    /// Create a SourceMap with a single inline source.
    pub fn inline(content: &str) -> Self {
        let mut map = Self::new();
        map.add_inline(content);
        map
    }

    pub fn content(&self, id: SourceId) -> &str {
        self.entry(id).content.as_str()
    }

    pub fn kind(&self, id: SourceId) -> &SourceKind {
        &self.entry(id).kind
    }

    /// Display name of a source, for diagnostics and the manifest.
    pub fn name(&self, id: SourceId) -> &str {
        self.entry(id).kind.display_name()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: SourceId) -> Source<'_> {
        let entry = self.entry(id);
        Source {
            id,
            kind: &entry.kind,
            content: &entry.content,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Source<'_>> {
        self.entries.iter().enumerate().map(|(idx, entry)| Source {
            id: SourceId(idx as u32),
            kind: &entry.kind,
            content: &entry.content,
        })
    }

    /// Resolve an import specifier relative to the importing source.
    ///
    /// Only relative specifiers can resolve; package imports (`"pg"`,
    /// `"sqlweave"`) are external and return `None`. Tries the literal
    /// path, then `.js`, then `/index.js`, the way a bundler would.
    pub fn resolve_specifier(&self, from: SourceId, specifier: &str) -> Option<SourceId> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            return None;
        }
        let base = match &self.entry(from).kind {
            SourceKind::File(path) => parent_dir(path),
            SourceKind::Inline => "",
        };
        let joined = normalize(&join(base, specifier));
        let trimmed = joined.trim_end_matches('/');

        for candidate in [
            trimmed.to_owned(),
            format!("{trimmed}.js"),
            format!("{trimmed}/index.js"),
        ] {
            if let Some(&id) = self.by_path.get(&candidate) {
                return Some(id);
            }
        }
        None
    }

    /// 1-based line number of a byte offset within a source.
    pub fn line_of(&self, id: SourceId, offset: usize) -> u32 {
        let content = self.content(id).as_bytes();
        let end = offset.min(content.len());
        content[..end].iter().filter(|&&b| b == b'\n').count() as u32 + 1
    }

    fn entry(&self, id: SourceId) -> &SourceEntry {
        self.entries.get(id.0 as usize).expect("invalid SourceId")
    }

    fn push_entry(&mut self, kind: SourceKind, content: &str) -> SourceId {
        let id = SourceId(self.entries.len() as u32);
        self.entries.push(SourceEntry {
            kind,
            content: content.to_owned(),
        });
        id
    }
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn join(base: &str, rel: &str) -> String {
    if base.is_empty() {
        rel.to_owned()
    } else {
        format!("{base}/{rel}")
    }
}

/// Collapse `.` and `..` components and strip any leading `/`.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let mut out = parts.join("/");
    if path.ends_with('/') && !out.is_empty() {
        out.push('/');
    }
    out
}

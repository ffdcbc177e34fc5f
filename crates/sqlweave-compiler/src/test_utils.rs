//! Shared helpers for unit tests.

use crate::build::{Build, BuildBuilder};
use crate::source_map::SourceMap;
use crate::syntax::{self, AstMap};

/// Build a SourceMap from (path, content) pairs.
pub fn sources(files: &[(&str, &str)]) -> SourceMap {
    let mut map = SourceMap::new();
    for (path, content) in files {
        map.add_file(path, content);
    }
    map
}

/// Lower every source in the map.
pub fn lower_all(map: &SourceMap) -> AstMap {
    map.iter()
        .map(|s| (s.id, syntax::lower_module(s.id, s.content)))
        .collect()
}

/// Run the full pipeline over the given files.
pub fn compile(files: &[(&str, &str)]) -> crate::Result<Build> {
    BuildBuilder::new(sources(files)).parse()?.link()?.compile()
}

/// Run the full pipeline over a single inline module.
pub fn compile_one(content: &str) -> crate::Result<Build> {
    compile(&[("app.js", content)])
}

/// Compile and expect no error-severity diagnostics.
pub fn expect_valid(files: &[(&str, &str)]) -> Build {
    let build = compile(files).expect("build aborted on a fatal error");
    assert!(
        !build.diagnostics().has_errors(),
        "unexpected errors:\n{}",
        build.diagnostics().printer().render()
    );
    build
}

/// Compile and expect at least one error-severity diagnostic.
pub fn expect_invalid(files: &[(&str, &str)]) -> Build {
    let build = compile(files).expect("build aborted on a fatal error");
    assert!(
        build.diagnostics().has_errors(),
        "expected errors, found none"
    );
    build
}

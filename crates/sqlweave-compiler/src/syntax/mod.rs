//! JavaScript frontend: tree-sitter parsing and the lowered IR.

mod ast;
mod dump;
mod lower;

#[cfg(test)]
mod lower_tests;

pub use ast::*;
pub use dump::dump_module;
pub use lower::{lower_module, parse};

/// All lowered modules of a build, keyed by source.
pub type AstMap = indexmap::IndexMap<crate::source_map::SourceId, ModuleAst>;

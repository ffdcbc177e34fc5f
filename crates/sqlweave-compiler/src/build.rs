//! High-level staged build facade.
//!
//! Stages: lower → link → compile. Modules are independent until linking;
//! the module graph is the synchronization barrier, since a re-export chain
//! can reference any module. Each stage accumulates into one diagnostics
//! collection; only structural errors (cyclic exports, cyclic fragments)
//! abort a stage with `Error`.

use std::ops::Deref;

use crate::diagnostics::Diagnostics;
use crate::fragment::compile_fragments;
use crate::graph::ModuleGraph;
use crate::resolve::{resolve_program, ModuleScopes, Recognized, Registry, Resolver};
use crate::rewrite;
use crate::source_map::SourceMap;
use crate::syntax::{self, AstMap};
use crate::{Error, Result};

pub use crate::rewrite::RewriteOutput as BuildOutput;

const DEFAULT_TAG: &str = "sql";
const DEFAULT_EXECUTE_METHOD: &str = "executeQuery";
const DEFAULT_BEGIN_TX_METHOD: &str = "beginTx";

/// Names of the recognized runtime surface.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub tag: String,
    pub execute_method: String,
    pub begin_tx_method: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_owned(),
            execute_method: DEFAULT_EXECUTE_METHOD.to_owned(),
            begin_tx_method: DEFAULT_BEGIN_TX_METHOD.to_owned(),
        }
    }
}

pub struct BuildBuilder {
    source_map: SourceMap,
    config: BuildConfig,
}

impl BuildBuilder {
    pub fn new(source_map: SourceMap) -> Self {
        Self {
            source_map,
            config: BuildConfig::default(),
        }
    }

    /// Single inline module, for embedding and tests.
    pub fn inline(content: &str) -> Self {
        Self::new(SourceMap::inline(content))
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.tag = tag.into();
        self
    }

    pub fn with_execute_method(mut self, name: impl Into<String>) -> Self {
        self.config.execute_method = name.into();
        self
    }

    pub fn with_begin_tx_method(mut self, name: impl Into<String>) -> Self {
        self.config.begin_tx_method = name.into();
        self
    }

    /// Lower every module. Modules are independent here; nothing
    /// cross-module happens before `link`.
    pub fn parse(self) -> Result<BuildParsed> {
        let modules: AstMap = self
            .source_map
            .iter()
            .map(|source| (source.id, syntax::lower_module(source.id, source.content)))
            .collect();
        Ok(BuildParsed {
            source_map: self.source_map,
            config: self.config,
            modules,
            diag: Diagnostics::new(),
        })
    }
}

#[derive(Debug)]
pub struct BuildParsed {
    source_map: SourceMap,
    config: BuildConfig,
    modules: AstMap,
    diag: Diagnostics,
}

impl BuildParsed {
    /// Build the module graph. Fatal on cyclic re-export chains.
    pub fn link(self) -> Result<BuildLinked> {
        let graph = ModuleGraph::build(&self.source_map, &self.modules)?;
        Ok(BuildLinked {
            parsed: self,
            graph,
        })
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn modules(&self) -> &AstMap {
        &self.modules
    }
}

#[derive(Debug)]
pub struct BuildLinked {
    parsed: BuildParsed,
    graph: ModuleGraph,
}

impl Deref for BuildLinked {
    type Target = BuildParsed;

    fn deref(&self) -> &Self::Target {
        &self.parsed
    }
}

impl BuildLinked {
    /// Resolve flows, compile fragments bottom-up, judge call sites, and
    /// emit. Fatal on cyclic fragment references.
    pub fn compile(self) -> Result<Build> {
        let BuildLinked { parsed, graph } = self;
        let BuildParsed {
            source_map,
            config,
            modules,
            mut diag,
        } = parsed;

        let registry = Registry::collect(&modules, &config.tag);
        let resolution = {
            let scopes = ModuleScopes::build(&modules, &registry);
            let mut resolver =
                Resolver::new(&source_map, &graph, &registry, &scopes, &config.tag);
            let recognized = Recognized {
                tag: &config.tag,
                execute_method: &config.execute_method,
                begin_tx_method: &config.begin_tx_method,
            };
            resolve_program(&modules, &mut resolver, &recognized)
        };

        let (mut program, fragment_diag) = compile_fragments(&source_map, &registry, &resolution)?;
        diag.extend(fragment_diag);

        let (output, rewrite_diag) =
            rewrite::rewrite(&source_map, &registry, &resolution, &mut program, &config.tag)?;
        diag.extend(rewrite_diag);

        Ok(Build {
            source_map,
            config,
            output,
            diag,
        })
    }
}

/// A finished build: outputs plus every diagnostic from every stage.
#[derive(Debug)]
pub struct Build {
    source_map: SourceMap,
    config: BuildConfig,
    output: BuildOutput,
    diag: Diagnostics,
}

impl Build {
    /// Build is valid when no error-severity diagnostics were recorded
    /// (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        !self.diag.has_errors()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn output(&self) -> &BuildOutput {
        &self.output
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn render_diagnostics(&self) -> String {
        self.diag.render(&self.source_map)
    }

    /// The output, or `BuildFailed` carrying the diagnostics when any
    /// error-severity record exists.
    pub fn finish(self) -> Result<BuildOutput> {
        if self.diag.has_errors() {
            return Err(Error::BuildFailed(self.diag));
        }
        Ok(self.output)
    }
}

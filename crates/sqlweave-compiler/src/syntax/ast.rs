//! Lowered item/expression IR.
//!
//! The analysis only needs a narrow slice of JavaScript: import/export
//! declarations, variable declarations and single assignments, functions,
//! tagged templates, object literals, member accesses, and calls. Everything
//! else lowers to [`Expr::Opaque`], which still carries its lowered child
//! expressions so call sites inside unmodeled constructs are discovered.

use crate::diagnostics::Span;
use crate::source_map::SourceId;

/// One lowered module: the ordered top-level items of a source file.
#[derive(Debug, Clone)]
pub struct ModuleAst {
    pub source: SourceId,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub enum Item {
    Import(ImportDecl),
    ExportClause(ExportClause),
    ExportStar(ExportStar),
    ExportDefault(ExportDefault),
    Decl(VarDecl),
    Func(FuncDecl),
    Assign(Assign),
    Expr(Expr),
    /// Statements inside a conditionally-executed region (`if`, loops,
    /// `try`, `switch`). Assignments in here never resolve; call sites in
    /// here are still call sites.
    Cond(Vec<Item>),
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub specifier: String,
    pub bindings: Vec<ImportBinding>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportBinding {
    pub local: String,
    pub kind: ImportKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    Named { imported: String },
    Default,
    Namespace,
}

/// `export {a, b as c}`, optionally re-exporting `from` another module.
#[derive(Debug, Clone)]
pub struct ExportClause {
    pub items: Vec<ExportSpecifier>,
    pub from: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExportSpecifier {
    /// Name in the source module (or the local binding when `from` is None).
    pub local: String,
    /// Name visible to importers.
    pub exported: String,
    pub span: Span,
}

/// `export * from "./m"` or `export * as ns from "./m"`.
#[derive(Debug, Clone)]
pub struct ExportStar {
    pub specifier: String,
    pub alias: Option<String>,
    pub span: Span,
}

/// `export default <expr>`.
#[derive(Debug, Clone)]
pub struct ExportDefault {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub declarators: Vec<Declarator>,
    pub exported: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Item>,
    pub exported: bool,
    pub span: Span,
}

/// `target = value` at statement level.
#[derive(Debug, Clone)]
pub struct Assign {
    pub target: Expr,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    Member(Box<Member>),
    Call(Box<Call>),
    Template(Box<Template>),
    Object(ObjectLit),
    Func(Box<FuncDecl>),
    Opaque(OpaqueExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(i) => i.span,
            Expr::Member(m) => m.span,
            Expr::Call(c) => c.span,
            Expr::Template(t) => t.span,
            Expr::Object(o) => o.span,
            Expr::Func(f) => f.span,
            Expr::Opaque(o) => o.span,
        }
    }

    /// The identifier name, when this is a bare identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(i) => Some(&i.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Property access. `computed` is true only for non-literal subscripts
/// (`obj[key]`); a string-literal subscript (`obj["prop"]`) lowers to a
/// static access like `obj.prop` does.
#[derive(Debug, Clone)]
pub struct Member {
    pub object: Expr,
    pub property: Option<String>,
    pub computed: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub callee: Expr,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// A template literal. `quasis` holds the raw text chunks, always one more
/// than `interps`.
#[derive(Debug, Clone)]
pub struct Template {
    pub tag: Option<Expr>,
    pub quasis: Vec<String>,
    pub interps: Vec<Expr>,
    pub span: Span,
}

impl Template {
    /// True when tagged with the given tag identifier.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tag.as_ref().and_then(|t| t.as_ident()) == Some(name)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectLit {
    pub props: Vec<ObjectProp>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ObjectProp {
    /// `key: value` or shorthand with a statically-known key.
    Static { key: String, value: Expr, span: Span },
    /// Computed key, spread, method — the object never resolves.
    Dynamic { span: Span },
}

/// Any expression the analysis does not model. Child expressions are kept
/// so call-site discovery can descend into them.
#[derive(Debug, Clone)]
pub struct OpaqueExpr {
    pub children: Vec<Expr>,
    pub span: Span,
}

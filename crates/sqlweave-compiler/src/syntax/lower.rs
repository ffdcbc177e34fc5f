//! Lowering from the tree-sitter CST to the item/expression IR.
//!
//! This is the only module that touches tree-sitter nodes. The lowering is
//! deliberately partial: statements and expressions outside the analyzed
//! subset turn into `Item::Cond` regions and `Expr::Opaque` nodes, which
//! keep child expressions reachable for call-site discovery without giving
//! them any static meaning.

use arborium_tree_sitter as tree_sitter;
use tree_sitter::Node;

use crate::diagnostics::Span;
use crate::source_map::SourceId;

use super::ast::*;

/// Parse one module with the JavaScript grammar.
pub fn parse(source: &str) -> tree_sitter::Tree {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&arborium_javascript::language().into())
        .expect("failed to set language");
    parser.parse(source, None).expect("failed to parse source")
}

/// Parse and lower one module.
pub fn lower_module(source_id: SourceId, source: &str) -> ModuleAst {
    let tree = parse(source);
    let lower = Lower {
        source: source_id,
        text: source,
    };
    let mut items = Vec::new();
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        lower.stmt(child, &mut items);
    }
    ModuleAst {
        source: source_id,
        items,
    }
}

struct Lower<'s> {
    source: SourceId,
    text: &'s str,
}

impl<'s> Lower<'s> {
    fn span(&self, node: Node<'_>) -> Span {
        Span::new(self.source, node.start_byte(), node.end_byte())
    }

    fn text_of(&self, node: Node<'_>) -> &'s str {
        &self.text[node.byte_range()]
    }

    /// Literal value of a string node, without quotes.
    fn string_value(&self, node: Node<'_>) -> String {
        let mut cursor = node.walk();
        let fragments: String = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "string_fragment" || c.kind() == "escape_sequence")
            .map(|c| self.text_of(c))
            .collect();
        if fragments.is_empty() {
            let raw = self.text_of(node);
            raw.trim_matches(|c| c == '"' || c == '\'').to_owned()
        } else {
            fragments
        }
    }

    fn stmt(&self, node: Node<'_>, out: &mut Vec<Item>) {
        match node.kind() {
            "comment" | "empty_statement" | "hash_bang_line" => {}

            "import_statement" => {
                if let Some(import) = self.import_decl(node) {
                    out.push(Item::Import(import));
                }
            }

            "export_statement" => self.export_stmt(node, out),

            "lexical_declaration" | "variable_declaration" => {
                out.push(Item::Decl(self.var_decl(node, false)));
            }

            "function_declaration" | "generator_function_declaration" => {
                out.push(Item::Func(self.func(node, false)));
            }

            "expression_statement" => {
                let Some(expr) = node.named_child(0) else {
                    return;
                };
                self.expr_stmt(expr, out);
            }

            "return_statement" | "throw_statement" => {
                if let Some(inner) = node.named_child(0) {
                    out.push(Item::Expr(self.expr(inner)));
                }
            }

            // A bare block introduces no conditional path.
            "statement_block" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.stmt(child, out);
                }
            }

            // Conditionally-executed regions. Anything assigned in here is
            // unresolvable by the join rule; call sites remain call sites.
            "if_statement" | "else_clause" | "for_statement" | "for_in_statement"
            | "while_statement" | "do_statement" | "try_statement" | "catch_clause"
            | "finally_clause" | "switch_statement" | "switch_body" | "switch_case"
            | "switch_default" | "labeled_statement" | "with_statement" => {
                let mut inner = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.stmt(child, &mut inner);
                }
                if !inner.is_empty() {
                    out.push(Item::Cond(inner));
                }
            }

            "class_declaration" => {}

            kind if is_expression_kind(kind) => {
                out.push(Item::Expr(self.expr(node)));
            }

            _ => {
                // Unmodeled statement: descend conservatively.
                let mut inner = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.stmt(child, &mut inner);
                }
                if !inner.is_empty() {
                    out.push(Item::Cond(inner));
                }
            }
        }
    }

    fn expr_stmt(&self, node: Node<'_>, out: &mut Vec<Item>) {
        match node.kind() {
            "assignment_expression" => {
                let target = node
                    .child_by_field_name("left")
                    .map(|n| self.expr(n))
                    .unwrap_or_else(|| self.opaque(node));
                let value = node
                    .child_by_field_name("right")
                    .map(|n| self.expr(n))
                    .unwrap_or_else(|| self.opaque(node));
                out.push(Item::Assign(Assign {
                    target,
                    value,
                    span: self.span(node),
                }));
            }
            "sequence_expression" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.expr_stmt(child, out);
                }
            }
            _ => out.push(Item::Expr(self.expr(node))),
        }
    }

    fn import_decl(&self, node: Node<'_>) -> Option<ImportDecl> {
        let specifier = self.string_value(node.child_by_field_name("source")?);
        let mut bindings = Vec::new();

        let mut cursor = node.walk();
        for clause in node.named_children(&mut cursor) {
            if clause.kind() != "import_clause" {
                continue;
            }
            let mut inner = clause.walk();
            for child in clause.named_children(&mut inner) {
                match child.kind() {
                    "identifier" => bindings.push(ImportBinding {
                        local: self.text_of(child).to_owned(),
                        kind: ImportKind::Default,
                        span: self.span(child),
                    }),
                    "namespace_import" => {
                        if let Some(name) = child.named_child(0) {
                            bindings.push(ImportBinding {
                                local: self.text_of(name).to_owned(),
                                kind: ImportKind::Namespace,
                                span: self.span(name),
                            });
                        }
                    }
                    "named_imports" => {
                        let mut specs = child.walk();
                        for spec in child.named_children(&mut specs) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            let Some(name) = spec.child_by_field_name("name") else {
                                continue;
                            };
                            let imported = self.text_of(name).to_owned();
                            let local = spec
                                .child_by_field_name("alias")
                                .map(|a| self.text_of(a).to_owned())
                                .unwrap_or_else(|| imported.clone());
                            bindings.push(ImportBinding {
                                local,
                                kind: ImportKind::Named { imported },
                                span: self.span(spec),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(ImportDecl {
            specifier,
            bindings,
            span: self.span(node),
        })
    }

    fn export_stmt(&self, node: Node<'_>, out: &mut Vec<Item>) {
        let is_default = {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).any(|c| c.kind() == "default");
            found
        };
        let from = node
            .child_by_field_name("source")
            .map(|n| self.string_value(n));

        if let Some(decl) = node.child_by_field_name("declaration") {
            match decl.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    out.push(Item::Decl(self.var_decl(decl, true)));
                }
                "function_declaration" | "generator_function_declaration" => {
                    let func = self.func(decl, true);
                    if is_default {
                        if let Some(name) = func.name.clone() {
                            out.push(Item::ExportClause(ExportClause {
                                items: vec![ExportSpecifier {
                                    local: name,
                                    exported: "default".to_owned(),
                                    span: self.span(decl),
                                }],
                                from: None,
                                span: self.span(node),
                            }));
                            out.push(Item::Func(func));
                        } else {
                            out.push(Item::ExportDefault(ExportDefault {
                                value: Expr::Func(Box::new(func)),
                                span: self.span(node),
                            }));
                        }
                    } else {
                        out.push(Item::Func(func));
                    }
                }
                _ => {}
            }
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            out.push(Item::ExportDefault(ExportDefault {
                value: self.expr(value),
                span: self.span(node),
            }));
            return;
        }

        let mut cursor = node.walk();
        let mut star = false;
        for child in node.children(&mut cursor) {
            match child.kind() {
                "*" => star = true,
                "namespace_export" => {
                    if let Some(name) = child.named_child(0)
                        && let Some(specifier) = from.clone()
                    {
                        out.push(Item::ExportStar(ExportStar {
                            specifier,
                            alias: Some(self.text_of(name).to_owned()),
                            span: self.span(node),
                        }));
                        return;
                    }
                }
                "export_clause" => {
                    let mut specs = child.walk();
                    let mut items = Vec::new();
                    for spec in child.named_children(&mut specs) {
                        if spec.kind() != "export_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let local = self.text_of(name).to_owned();
                        let exported = spec
                            .child_by_field_name("alias")
                            .map(|a| self.text_of(a).to_owned())
                            .unwrap_or_else(|| local.clone());
                        items.push(ExportSpecifier {
                            local,
                            exported,
                            span: self.span(spec),
                        });
                    }
                    out.push(Item::ExportClause(ExportClause {
                        items,
                        from: from.clone(),
                        span: self.span(node),
                    }));
                    return;
                }
                _ => {}
            }
        }

        if star && let Some(specifier) = from {
            out.push(Item::ExportStar(ExportStar {
                specifier,
                alias: None,
                span: self.span(node),
            }));
        }
    }

    fn var_decl(&self, node: Node<'_>, exported: bool) -> VarDecl {
        let mut declarators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = child.child_by_field_name("name") else {
                continue;
            };
            // Destructuring patterns never resolve; skip them entirely.
            if name.kind() != "identifier" {
                continue;
            }
            declarators.push(Declarator {
                name: self.text_of(name).to_owned(),
                init: child.child_by_field_name("value").map(|v| self.expr(v)),
                span: self.span(child),
            });
        }
        VarDecl {
            declarators,
            exported,
            span: self.span(node),
        }
    }

    fn func(&self, node: Node<'_>, exported: bool) -> FuncDecl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text_of(n).to_owned());

        let mut params = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for param in parameters.named_children(&mut cursor) {
                if param.kind() == "identifier" {
                    params.push(self.text_of(param).to_owned());
                }
            }
        } else if let Some(param) = node.child_by_field_name("parameter") {
            // Single-parameter arrow without parentheses.
            if param.kind() == "identifier" {
                params.push(self.text_of(param).to_owned());
            }
        }

        let mut body = Vec::new();
        if let Some(body_node) = node.child_by_field_name("body") {
            if body_node.kind() == "statement_block" {
                let mut cursor = body_node.walk();
                for child in body_node.named_children(&mut cursor) {
                    self.stmt(child, &mut body);
                }
            } else {
                // Expression-bodied arrow.
                body.push(Item::Expr(self.expr(body_node)));
            }
        }

        FuncDecl {
            name,
            params,
            body,
            exported,
            span: self.span(node),
        }
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        match node.kind() {
            "identifier" => Expr::Ident(Ident {
                name: self.text_of(node).to_owned(),
                span: self.span(node),
            }),

            "member_expression" => {
                let object = node
                    .child_by_field_name("object")
                    .map(|o| self.expr(o))
                    .unwrap_or_else(|| self.opaque(node));
                let property = node
                    .child_by_field_name("property")
                    .map(|p| self.text_of(p).to_owned());
                Expr::Member(Box::new(Member {
                    object,
                    property,
                    computed: false,
                    span: self.span(node),
                }))
            }

            "subscript_expression" => {
                let object = node
                    .child_by_field_name("object")
                    .map(|o| self.expr(o))
                    .unwrap_or_else(|| self.opaque(node));
                let index = node.child_by_field_name("index");
                let (property, computed) = match index {
                    Some(idx) if idx.kind() == "string" => (Some(self.string_value(idx)), false),
                    _ => (None, true),
                };
                Expr::Member(Box::new(Member {
                    object,
                    property,
                    computed,
                    span: self.span(node),
                }))
            }

            "call_expression" => {
                let callee = node
                    .child_by_field_name("function")
                    .map(|f| self.expr(f))
                    .unwrap_or_else(|| self.opaque(node));
                let Some(arguments) = node.child_by_field_name("arguments") else {
                    return self.opaque(node);
                };
                if arguments.kind() == "template_string" {
                    return self.template(arguments, Some(callee), self.span(node));
                }
                let mut args = Vec::new();
                let mut cursor = arguments.walk();
                for arg in arguments.named_children(&mut cursor) {
                    if arg.kind() == "comment" {
                        continue;
                    }
                    args.push(self.expr(arg));
                }
                Expr::Call(Box::new(Call {
                    callee,
                    args,
                    span: self.span(node),
                }))
            }

            "template_string" => self.template(node, None, self.span(node)),

            "object" => {
                let mut props = Vec::new();
                let mut cursor = node.walk();
                for prop in node.named_children(&mut cursor) {
                    match prop.kind() {
                        "pair" => {
                            let key = prop.child_by_field_name("key");
                            let value = prop.child_by_field_name("value");
                            let static_key = key.and_then(|k| match k.kind() {
                                "property_identifier" | "number" => {
                                    Some(self.text_of(k).to_owned())
                                }
                                "string" => Some(self.string_value(k)),
                                _ => None,
                            });
                            match (static_key, value) {
                                (Some(key), Some(value)) => props.push(ObjectProp::Static {
                                    key,
                                    value: self.expr(value),
                                    span: self.span(prop),
                                }),
                                _ => props.push(ObjectProp::Dynamic {
                                    span: self.span(prop),
                                }),
                            }
                        }
                        "shorthand_property_identifier" => {
                            let name = self.text_of(prop).to_owned();
                            props.push(ObjectProp::Static {
                                key: name.clone(),
                                value: Expr::Ident(Ident {
                                    name,
                                    span: self.span(prop),
                                }),
                                span: self.span(prop),
                            });
                        }
                        "comment" => {}
                        _ => props.push(ObjectProp::Dynamic {
                            span: self.span(prop),
                        }),
                    }
                }
                Expr::Object(ObjectLit {
                    props,
                    span: self.span(node),
                })
            }

            "arrow_function" | "function_expression" | "function" | "generator_function" => {
                Expr::Func(Box::new(self.func(node, false)))
            }

            "parenthesized_expression" | "await_expression" => node
                .named_child(0)
                .map(|inner| self.expr(inner))
                .unwrap_or_else(|| self.opaque(node)),

            _ => self.opaque(node),
        }
    }

    /// Lower an unmodeled expression, keeping children discoverable.
    fn opaque(&self, node: Node<'_>) -> Expr {
        let mut children = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "comment" {
                continue;
            }
            children.push(self.expr(child));
        }
        Expr::Opaque(OpaqueExpr {
            children,
            span: self.span(node),
        })
    }

    fn template(&self, node: Node<'_>, tag: Option<Expr>, span: Span) -> Expr {
        let mut quasis = vec![String::new()];
        let mut interps = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "string_fragment" | "escape_sequence" => {
                    quasis
                        .last_mut()
                        .expect("quasis is never empty")
                        .push_str(self.text_of(child));
                }
                "template_substitution" => {
                    let expr = child
                        .named_child(0)
                        .map(|e| self.expr(e))
                        .unwrap_or_else(|| self.opaque(child));
                    interps.push(expr);
                    quasis.push(String::new());
                }
                _ => {}
            }
        }
        Expr::Template(Box::new(Template {
            tag,
            quasis,
            interps,
            span,
        }))
    }
}

fn is_expression_kind(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "member_expression"
            | "subscript_expression"
            | "call_expression"
            | "template_string"
            | "object"
            | "array"
            | "arrow_function"
            | "function_expression"
            | "function"
            | "generator_function"
            | "parenthesized_expression"
            | "await_expression"
            | "binary_expression"
            | "ternary_expression"
            | "unary_expression"
            | "update_expression"
            | "new_expression"
            | "assignment_expression"
            | "augmented_assignment_expression"
            | "sequence_expression"
            | "yield_expression"
            | "string"
            | "number"
            | "regex"
            | "true"
            | "false"
            | "null"
            | "undefined"
    )
}

//! Debug dump of the lowered IR, used by tests and troubleshooting.

use std::fmt::Write;

use super::ast::*;

/// Render a module's items as an indented outline.
pub fn dump_module(module: &ModuleAst) -> String {
    let mut out = String::new();
    for item in &module.items {
        dump_item(item, 0, &mut out);
    }
    out
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn dump_item(item: &Item, depth: usize, out: &mut String) {
    indent(depth, out);
    match item {
        Item::Import(import) => {
            let _ = writeln!(out, "import \"{}\"", import.specifier);
            for binding in &import.bindings {
                indent(depth + 1, out);
                let desc = match &binding.kind {
                    ImportKind::Named { imported } if *imported == binding.local => {
                        format!("named {}", binding.local)
                    }
                    ImportKind::Named { imported } => {
                        format!("named {} as {}", imported, binding.local)
                    }
                    ImportKind::Default => format!("default {}", binding.local),
                    ImportKind::Namespace => format!("namespace {}", binding.local),
                };
                let _ = writeln!(out, "{desc}");
            }
        }
        Item::ExportClause(clause) => {
            let from = clause
                .from
                .as_deref()
                .map(|f| format!(" from \"{f}\""))
                .unwrap_or_default();
            let specs: Vec<String> = clause
                .items
                .iter()
                .map(|s| {
                    if s.local == s.exported {
                        s.local.clone()
                    } else {
                        format!("{} as {}", s.local, s.exported)
                    }
                })
                .collect();
            let _ = writeln!(out, "export {{{}}}{}", specs.join(", "), from);
        }
        Item::ExportStar(star) => {
            let alias = star
                .alias
                .as_deref()
                .map(|a| format!(" as {a}"))
                .unwrap_or_default();
            let _ = writeln!(out, "export *{} from \"{}\"", alias, star.specifier);
        }
        Item::ExportDefault(default) => {
            let _ = writeln!(out, "export default {}", describe_expr(&default.value));
        }
        Item::Decl(decl) => {
            let prefix = if decl.exported { "export const" } else { "const" };
            if decl.declarators.is_empty() {
                let _ = writeln!(out, "{prefix} <pattern>");
            }
            for (i, d) in decl.declarators.iter().enumerate() {
                if i > 0 {
                    indent(depth, out);
                }
                match &d.init {
                    Some(init) => {
                        let _ = writeln!(out, "{prefix} {} = {}", d.name, describe_expr(init));
                    }
                    None => {
                        let _ = writeln!(out, "{prefix} {}", d.name);
                    }
                }
            }
        }
        Item::Func(func) => {
            let prefix = if func.exported { "export fn" } else { "fn" };
            let name = func.name.as_deref().unwrap_or("<anon>");
            let _ = writeln!(out, "{prefix} {}({})", name, func.params.join(", "));
            for inner in &func.body {
                dump_item(inner, depth + 1, out);
            }
        }
        Item::Assign(assign) => {
            let _ = writeln!(
                out,
                "{} = {}",
                describe_expr(&assign.target),
                describe_expr(&assign.value)
            );
        }
        Item::Expr(expr) => {
            let _ = writeln!(out, "{}", describe_expr(expr));
        }
        Item::Cond(items) => {
            let _ = writeln!(out, "cond");
            for inner in items {
                dump_item(inner, depth + 1, out);
            }
        }
    }
}

fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(i) => i.name.clone(),
        Expr::Member(m) => {
            let prop = match (&m.property, m.computed) {
                (Some(p), false) => format!(".{p}"),
                (Some(p), true) => format!("[\"{p}\"]"),
                (None, _) => "[<dyn>]".to_owned(),
            };
            format!("{}{}", describe_expr(&m.object), prop)
        }
        Expr::Call(c) => {
            let args: Vec<String> = c.args.iter().map(describe_expr).collect();
            format!("{}({})", describe_expr(&c.callee), args.join(", "))
        }
        Expr::Template(t) => {
            let tag = t
                .tag
                .as_ref()
                .map(|tag| describe_expr(tag))
                .unwrap_or_default();
            let mut body = String::new();
            for (i, quasi) in t.quasis.iter().enumerate() {
                body.push_str(quasi);
                if i < t.interps.len() {
                    let _ = write!(body, "${{{}}}", describe_expr(&t.interps[i]));
                }
            }
            format!("{tag}`{body}`")
        }
        Expr::Object(o) => {
            let props: Vec<String> = o
                .props
                .iter()
                .map(|p| match p {
                    ObjectProp::Static { key, value, .. } => {
                        format!("{key}: {}", describe_expr(value))
                    }
                    ObjectProp::Dynamic { .. } => "<dyn>".to_owned(),
                })
                .collect();
            format!("{{{}}}", props.join(", "))
        }
        Expr::Func(f) => format!(
            "fn {}({})",
            f.name.as_deref().unwrap_or("<anon>"),
            f.params.join(", ")
        ),
        Expr::Opaque(o) => {
            if o.children.is_empty() {
                "<opaque>".to_owned()
            } else {
                let children: Vec<String> = o.children.iter().map(describe_expr).collect();
                format!("<opaque {}>", children.join(", "))
            }
        }
    }
}

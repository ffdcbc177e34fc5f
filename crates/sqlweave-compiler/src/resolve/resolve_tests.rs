use indoc::indoc;

use crate::graph::ModuleGraph;
use crate::test_utils::{lower_all, sources};

use super::{ModuleScopes, OpaqueReason, Registry, Resolver, Value};

/// Resolve a module-level binding and describe the resulting lattice value.
fn value_of(files: &[(&str, &str)], module: &str, name: &str) -> String {
    let map = sources(files);
    let modules = lower_all(&map);
    let graph = ModuleGraph::build(&map, &modules).expect("acyclic exports");
    let registry = Registry::collect(&modules, "sql");
    let scopes = ModuleScopes::build(&modules, &registry);
    let mut resolver = Resolver::new(&map, &graph, &registry, &scopes, "sql");

    let id = map
        .iter()
        .find(|s| s.kind.display_name() == module)
        .map(|s| s.id)
        .expect("module exists");
    let value = resolver.module_binding(id, name);
    describe(&value, &map, &registry)
}

fn describe(value: &Value, map: &crate::source_map::SourceMap, registry: &Registry) -> String {
    match value {
        Value::Unknown => "unknown".to_owned(),
        Value::Fragment(id) => {
            let site = registry.fragment(*id);
            let text = &map.content(site.source)[site.span.range()];
            format!("fragment {text}")
        }
        Value::Function(id) => {
            let site = registry.function(*id);
            format!("function {}", site.name.as_deref().unwrap_or("<anon>"))
        }
        Value::Object(props) => {
            let inner: Vec<String> = props
                .iter()
                .map(|(k, v)| format!("{k}: {}", describe(v, map, registry)))
                .collect();
            format!("object {{{}}}", inner.join(", "))
        }
        Value::Namespace(m) => format!("namespace {}", map.name(*m)),
        Value::Opaque(OpaqueReason::Conditional) => "opaque (conditional)".to_owned(),
        Value::Opaque(OpaqueReason::CallResult) => "opaque (call result)".to_owned(),
        Value::Opaque(OpaqueReason::DynamicImport) => "opaque (dynamic import)".to_owned(),
        Value::Opaque(OpaqueReason::DynamicAccess) => "opaque (dynamic access)".to_owned(),
        Value::Opaque(OpaqueReason::Unresolved) => "opaque".to_owned(),
    }
}

#[test]
fn direct_template_binding() {
    let files = [("a.js", "const q = sql`SELECT 1`;\n")];
    insta::assert_snapshot!(value_of(&files, "a.js", "q"), @"fragment sql`SELECT 1`");
}

#[test]
fn alias_chain_of_arbitrary_length() {
    let files = [(
        "a.js",
        indoc! {r#"
            const x = sql`SELECT 1`;
            const a = x;
            const b = a;
            const c = b;
            const d = c;
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "d"), @"fragment sql`SELECT 1`");
}

#[test]
fn conditional_assignment_refuses() {
    let files = [(
        "a.js",
        indoc! {r#"
            let q;
            if (flag) {
              q = sql`A`;
            } else {
              q = sql`B`;
            }
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "q"), @"opaque (conditional)");
}

#[test]
fn double_unconditional_assignment_of_same_value_survives() {
    let files = [(
        "a.js",
        indoc! {r#"
            const x = sql`A`;
            let q = x;
            q = x;
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "q"), @"fragment sql`A`");
}

#[test]
fn double_unconditional_assignment_of_different_values_refuses() {
    let files = [(
        "a.js",
        indoc! {r#"
            let q = sql`A`;
            q = sql`B`;
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "q"), @"opaque (conditional)");
}

#[test]
fn function_call_results_are_opaque() {
    let files = [(
        "a.js",
        indoc! {r#"
            function make() { return sql`X`; }
            const q = make();
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "q"), @"opaque (call result)");
}

#[test]
fn require_is_a_dynamic_import() {
    let files = [("a.js", "const nested = require(\"./nested\");\n")];
    insta::assert_snapshot!(value_of(&files, "a.js", "nested"), @"opaque (dynamic import)");
}

#[test]
fn member_of_required_module_keeps_the_reason() {
    let files = [(
        "a.js",
        indoc! {r#"
            const nested = require("./nested");
            const q = nested.ONE_LEVEL_DEEP;
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "q"), @"opaque (dynamic import)");
}

#[test]
fn object_of_fragments_with_static_access() {
    let files = [(
        "a.js",
        indoc! {r#"
            const qs = {a: sql`A`, b: sql`B`};
            const picked = qs.a;
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "qs"), @"object {a: fragment sql`A`, b: fragment sql`B`}");
    insta::assert_snapshot!(value_of(&files, "a.js", "picked"), @"fragment sql`A`");
}

#[test]
fn mixed_object_is_opaque() {
    let files = [(
        "a.js",
        indoc! {r#"
            const qs = {a: sql`A`, b: somethingElse};
            const picked = qs.a;
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "picked"), @"opaque");
}

#[test]
fn computed_access_is_dynamic() {
    let files = [(
        "a.js",
        indoc! {r#"
            const qs = {a: sql`A`};
            const picked = qs[key];
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "picked"), @"opaque (dynamic access)");
}

#[test]
fn string_literal_subscript_is_static() {
    let files = [(
        "a.js",
        indoc! {r#"
            const qs = {a: sql`A`};
            const picked = qs["a"];
        "#},
    )];
    insta::assert_snapshot!(value_of(&files, "a.js", "picked"), @"fragment sql`A`");
}

#[test]
fn named_import_resolves_across_modules() {
    let files = [
        ("app.js", "import {q as renamed} from \"./lib\";\nconst local = renamed;\n"),
        ("lib.js", "export const q = sql`SELECT 1`;\n"),
    ];
    insta::assert_snapshot!(value_of(&files, "app.js", "local"), @"fragment sql`SELECT 1`");
}

#[test]
fn default_import_resolves() {
    let files = [
        ("app.js", "import dq from \"./lib\";\nconst local = dq;\n"),
        ("lib.js", "const q = sql`SELECT 1`;\nexport default q;\n"),
    ];
    insta::assert_snapshot!(value_of(&files, "app.js", "local"), @"fragment sql`SELECT 1`");
}

#[test]
fn namespace_import_and_member() {
    let files = [
        ("app.js", "import * as lib from \"./lib\";\nconst local = lib.q;\n"),
        ("lib.js", "export const q = sql`SELECT 1`;\n"),
    ];
    insta::assert_snapshot!(value_of(&files, "app.js", "local"), @"fragment sql`SELECT 1`");
}

#[test]
fn namespace_alias_chain_to_member() {
    let files = [
        (
            "app.js",
            indoc! {r#"
                import * as outer from "./outer";
                const alias = outer.inner;
                const alias2 = alias;
                const local = alias2.q;
            "#},
        ),
        ("outer.js", "export * as inner from \"./inner\";\n"),
        ("inner.js", "export const q = sql`SELECT 4`;\n"),
    ];
    insta::assert_snapshot!(value_of(&files, "app.js", "local"), @"fragment sql`SELECT 4`");
}

#[test]
fn reexport_chain_resolves_to_fragment() {
    let files = [
        ("app.js", "import {Q} from \"./a\";\nconst local = Q;\n"),
        ("a.js", "export {R as Q} from \"./b\";\n"),
        ("b.js", "export const R = sql`SELECT 2`;\n"),
    ];
    insta::assert_snapshot!(value_of(&files, "app.js", "local"), @"fragment sql`SELECT 2`");
}

#[test]
fn external_package_import_is_opaque() {
    let files = [("app.js", "import {helper} from \"somepkg\";\nconst local = helper;\n")];
    insta::assert_snapshot!(value_of(&files, "app.js", "local"), @"opaque");
}

#[test]
fn mutual_alias_cycle_refuses_instead_of_looping() {
    let files = [
        ("a.js", "import {b} from \"./b\";\nexport const a = b;\n"),
        ("b.js", "import {a} from \"./a\";\nexport const b = a;\n"),
    ];
    insta::assert_snapshot!(value_of(&files, "a.js", "a"), @"opaque");
}

#[test]
fn function_declaration_binding() {
    let files = [("a.js", "export function check(e, s) {}\nconst v = check;\n")];
    insta::assert_snapshot!(value_of(&files, "a.js", "v"), @"function check");
}

#[test]
fn arrow_bound_to_const_carries_binding_name() {
    let files = [("a.js", "export const arrow_validator = () => {};\nconst v = arrow_validator;\n")];
    insta::assert_snapshot!(value_of(&files, "a.js", "v"), @"function arrow_validator");
}

use indoc::indoc;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::graph::ModuleGraph;
use crate::resolve::{
    resolve_program, FragmentId, ModuleScopes, ProgramResolution, Recognized, Registry, Resolver,
};
use crate::test_utils::{lower_all, sources};
use crate::Error;

use super::{compile_fragments, CompiledProgram};

#[derive(Debug)]
struct Fixture {
    program: CompiledProgram,
    diag: Diagnostics,
    resolution: ProgramResolution,
    fragment_count: usize,
}

fn compile(files: &[(&str, &str)]) -> Result<Fixture, Error> {
    let map = sources(files);
    let modules = lower_all(&map);
    let graph = ModuleGraph::build(&map, &modules)?;
    let registry = Registry::collect(&modules, "sql");
    let scopes = ModuleScopes::build(&modules, &registry);
    let mut resolver = Resolver::new(&map, &graph, &registry, &scopes, "sql");
    let recognized = Recognized {
        tag: "sql",
        execute_method: "executeQuery",
        begin_tx_method: "beginTx",
    };
    let resolution = resolve_program(&modules, &mut resolver, &recognized);
    let (program, diag) = compile_fragments(&map, &registry, &resolution)?;
    Ok(Fixture {
        program,
        diag,
        resolution,
        fragment_count: registry.fragment_count(),
    })
}

impl Fixture {
    /// Find the compiled fragment whose composed text contains `needle`.
    fn by_text(&self, needle: &str) -> FragmentId {
        self.program
            .iter()
            .find(|(_, q)| q.text.contains(needle))
            .map(|(id, _)| id)
            .unwrap_or_else(|| panic!("no compiled query containing {needle:?}"))
    }

    fn dump(&self, id: FragmentId) -> String {
        let q = self.program.get(id).expect("fragment compiled");
        let mut out = String::new();
        out.push_str(&format!("text: {}\n", q.text));
        out.push_str(&format!("kind: {}\n", q.kind));
        if !q.sub_fragments.is_empty() {
            out.push_str(&format!("subs: {}\n", q.sub_fragments.len()));
        }
        for p in &q.bound {
            out.push_str(&format!("bound: {} <- {}\n", p.name, p.expr));
        }
        for p in &q.late {
            out.push_str(&format!("late: {}\n", p.name));
        }
        out
    }

    fn union(&self, id: FragmentId) -> String {
        self.program
            .union_params(id)
            .iter()
            .map(|(name, expr)| match expr {
                Some(e) => format!("{name} <- {e}"),
                None => format!("{name} (late)"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[test]
fn plain_query_has_no_params() {
    let fx = compile(&[("app.js", "const q = sql`select 1`;\n")]).unwrap();
    let id = fx.by_text("select 1");
    insta::assert_snapshot!(fx.dump(id), @r"
    text: select 1
    kind: select
    ");
}

#[test]
fn bare_identifier_interpolation_keeps_its_name() {
    let fx = compile(&[(
        "app.js",
        "const q = sql`select * from foo where bar = ${bar} and baz = ${baz}`;\n",
    )])
    .unwrap();
    let id = fx.by_text("select *");
    insta::assert_snapshot!(fx.dump(id), @r"
    text: select * from foo where bar = $0 and baz = $1
    kind: select
    bound: bar <- bar
    bound: baz <- baz
    ");
}

#[test]
fn non_identifier_interpolation_gets_positional_name() {
    let fx = compile(&[(
        "app.js",
        "const q = sql`select 1 where a = ${n + 1} and b = ${obj.field}`;\n",
    )])
    .unwrap();
    let id = fx.by_text("select 1");
    insta::assert_snapshot!(fx.dump(id), @r"
    text: select 1 where a = $0 and b = $1
    kind: select
    bound: $0 <- n + 1
    bound: $1 <- obj.field
    ");
}

#[test]
fn explicit_label_overrides_the_name_and_is_consumed() {
    let fx = compile(&[(
        "app.js",
        "const q = sql`select 1 where id = ${user.id}:user_id: and x = 2`;\n",
    )])
    .unwrap();
    let id = fx.by_text("select 1");
    insta::assert_snapshot!(fx.dump(id), @r"
    text: select 1 where id = $0 and x = 2
    kind: select
    bound: user_id <- user.id
    ");
}

#[test]
fn late_params_stay_verbatim_and_deduplicate() {
    let fx = compile(&[(
        "app.js",
        "const q = sql`update t set a = %{owner}, b = %{owner}, c = %{id}`;\n",
    )])
    .unwrap();
    let id = fx.by_text("update t");
    insta::assert_snapshot!(fx.dump(id), @r"
    text: update t set a = %{owner}, b = %{owner}, c = %{id}
    kind: update
    late: owner
    late: id
    ");
}

#[test]
fn merge_produces_positional_markers_in_declaration_order() {
    let fx = compile(&[(
        "app.js",
        indoc! {r#"
            const filter = sql`o.product_id = ${value}`;
            const orderClause = sql`ORDER BY o.created_at DESC`;
            const query = sql`SELECT * FROM orders AS o WHERE ${filter} ${orderClause}`;
        "#},
    )])
    .unwrap();
    let id = fx.by_text("SELECT * FROM orders");
    insta::assert_snapshot!(fx.dump(id), @r"
    text: SELECT * FROM orders AS o WHERE %{0} %{1}
    kind: select
    subs: 2
    ");
    insta::assert_snapshot!(fx.union(id), @"value <- value");
}

#[test]
fn merged_params_union_in_positional_order() {
    let fx = compile(&[(
        "app.js",
        indoc! {r#"
            const a = sql`x = ${x} and late = %{later}`;
            const b = sql`y = ${y}`;
            const q = sql`select 1 where own = ${own} and ${a} and ${b}`;
        "#},
    )])
    .unwrap();
    let id = fx.by_text("select 1");
    insta::assert_snapshot!(fx.union(id), @r"
    own <- own
    x <- x
    later (late)
    y <- y
    ");
}

#[test]
fn nested_merges_compile_bottom_up() {
    let fx = compile(&[(
        "app.js",
        indoc! {r#"
            const inner = sql`c = ${c}`;
            const middle = sql`b = ${b} and ${inner}`;
            const outer = sql`select 1 where a = ${a} and ${middle}`;
        "#},
    )])
    .unwrap();
    let outer = fx.by_text("select 1");
    insta::assert_snapshot!(fx.dump(outer), @r"
    text: select 1 where a = $0 and %{0}
    kind: select
    subs: 1
    bound: a <- a
    ");
    let middle = fx.by_text("b = $0");
    insta::assert_snapshot!(fx.dump(middle), @r"
    text: b = $0 and %{0}
    kind: other
    subs: 1
    bound: b <- b
    ");
}

#[test]
fn identical_fragments_in_unrelated_modules_share_a_digest() {
    let fx = compile(&[
        ("one.js", "const q = sql`select * from t where id = ${id}`;\n"),
        ("two.js", "const q = sql`select * from t where id = ${id}`;\n"),
    ])
    .unwrap();
    let queries: Vec<_> = fx.program.iter().collect();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].1.digest, queries[1].1.digest);
    // First writer owns the canonical entry.
    assert_eq!(
        fx.program.canonical(&queries[0].1.digest),
        Some(queries[0].0)
    );
}

#[test]
fn distinct_column_fragments_get_distinct_text_and_digests() {
    // Five single-column fragments: every one keeps its own text.
    let fx = compile(&[(
        "app.js",
        indoc! {r#"
            const SORT_COLS = {
              "product_id": sql`product_id`,
              "order_id": sql`order_id`,
              "customer_id": sql`customer_id`,
              "total": sql`total`,
              "created_at": sql`created_at`
            };
        "#},
    )])
    .unwrap();
    let texts: Vec<_> = fx.program.iter().map(|(_, q)| q.text.as_str()).collect();
    assert_eq!(
        texts,
        ["product_id", "order_id", "customer_id", "total", "created_at"]
    );
    let mut digests: Vec<_> = fx.program.iter().map(|(_, q)| q.digest).collect();
    digests.sort();
    digests.dedup();
    assert_eq!(digests.len(), 5);
}

#[test]
fn parameter_names_change_the_digest() {
    let fx = compile(&[
        ("one.js", "const q = sql`select ${a}`;\n"),
        ("two.js", "const q = sql`select ${b}`;\n"),
    ])
    .unwrap();
    let queries: Vec<_> = fx.program.iter().collect();
    assert_eq!(queries[0].1.text, queries[1].1.text);
    assert_ne!(queries[0].1.digest, queries[1].1.digest);
}

#[test]
fn all_digit_placeholder_is_ambiguous_and_poisons() {
    let fx = compile(&[("app.js", "const q = sql`select %{0}`;\n")]).unwrap();
    let id = fx.by_text("select");
    assert!(fx.program.is_poisoned(id));
    assert!(fx
        .diag
        .kinds()
        .any(|k| k == DiagnosticKind::AmbiguousMarker));
}

#[test]
fn poison_propagates_through_merges() {
    let fx = compile(&[(
        "app.js",
        indoc! {r#"
            const bad = sql`%{7}`;
            const q = sql`select 1 from ${bad}`;
        "#},
    )])
    .unwrap();
    let outer = fx.by_text("select 1");
    assert!(fx.program.is_poisoned(outer));
}

#[test]
fn multi_statement_body_is_advisory_only() {
    let fx = compile(&[("app.js", "const q = sql`select 1; select 2`;\n")]).unwrap();
    assert!(fx
        .diag
        .kinds()
        .any(|k| k == DiagnosticKind::MultiStatementQuery));
    assert!(!fx.diag.has_errors());
}

#[test]
fn cyclic_fragment_reference_is_fatal() {
    let err = compile(&[(
        "app.js",
        indoc! {r#"
            const a = sql`left ${b}`;
            const b = sql`right ${a}`;
        "#},
    )])
    .unwrap_err();
    assert!(matches!(err, Error::CyclicFragment(_, _)));
}

#[test]
fn unresolved_interpolations_become_bound_params() {
    let fx = compile(&[(
        "app.js",
        indoc! {r#"
            function make() { return sql`x`; }
            const q = sql`select ${make()}`;
        "#},
    )])
    .unwrap();
    // Both the inner template and the outer one compile; the call result
    // interpolation binds as a runtime value, it never merges.
    assert_eq!(fx.fragment_count, 2);
    let outer = fx.by_text("select");
    insta::assert_snapshot!(fx.dump(outer), @r"
    text: select $0
    kind: select
    bound: $0 <- make()
    ");
    assert!(fx.resolution.interps.contains_key(&outer));
}

#[test]
fn comment_leading_queries_classify_by_first_keyword() {
    let fx = compile(&[(
        "app.js",
        "const q = sql`-- Comments are allowed\n\tUPDATE nested SET foo = %{bar}`;\n",
    )])
    .unwrap();
    let id = fx.by_text("UPDATE nested");
    let q = fx.program.get(id).unwrap();
    assert_eq!(q.kind, sqlweave_core::QueryKind::Update);
    assert_eq!(q.text, "-- Comments are allowed\n\tUPDATE nested SET foo = %{bar}");
    assert_eq!(q.late.len(), 1);
    assert_eq!(q.late[0].name, "bar");
}

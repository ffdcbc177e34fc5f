use indoc::indoc;

use crate::source_map::SourceId;

use super::{dump_module, lower_module};

fn lower(src: &str) -> String {
    dump_module(&lower_module(SourceId::default(), src))
}

#[test]
fn imports_in_every_form() {
    let input = indoc! {r#"
        import def from "./a";
        import {one, two as renamed} from "./b";
        import * as ns from "./c";
    "#};

    insta::assert_snapshot!(lower(input), @r#"
    import "./a"
      default def
    import "./b"
      named one
      named two as renamed
    import "./c"
      namespace ns
    "#);
}

#[test]
fn exports_in_every_form() {
    let input = indoc! {r#"
        export const q = 1;
        export {a, b as c};
        export {X} from "./m";
        export * from "./n";
        export * as ns from "./o";
        export default q;
        export function f(ctx) {}
    "#};

    insta::assert_snapshot!(lower(input), @r#"
    export const q = <opaque>
    export {a, b as c}
    export {X} from "./m"
    export * from "./n"
    export * as ns from "./o"
    export default q
    export fn f(ctx)
    "#);
}

#[test]
fn tagged_template_with_interpolations() {
    let input = "const q = sql`SELECT * FROM t WHERE a = ${x} AND b = ${y.z}`;\n";

    insta::assert_snapshot!(lower(input), @"const q = sql`SELECT * FROM t WHERE a = ${x} AND b = ${y.z}`");
}

#[test]
fn object_literal_with_static_and_dynamic_keys() {
    let input = indoc! {r#"
        const qs = {
          a: sql`A`,
          'b': sql`B`,
          [key]: sql`C`,
        };
    "#};

    insta::assert_snapshot!(lower(input), @"const qs = {a: sql`A`, b: sql`B`, <dyn>}");
}

#[test]
fn member_access_static_vs_computed() {
    let input = indoc! {r#"
        use(qs.a);
        use(qs["b"]);
        use(qs[key]);
    "#};

    // A string-literal subscript lowers to the same static access as dot
    // notation.
    insta::assert_snapshot!(lower(input), @r"
    use(qs.a)
    use(qs.b)
    use(qs[<dyn>])
    ");
}

#[test]
fn conditional_assignment_lowers_into_cond_region() {
    let input = indoc! {r#"
        let q;
        if (flag) {
          q = sql`A`;
        } else {
          q = sql`B`;
        }
        use(q);
    "#};

    insta::assert_snapshot!(lower(input), @r"
    const q
    cond
      flag
      q = sql`A`
      cond
        q = sql`B`
    use(q)
    ");
}

#[test]
fn nested_function_scopes_preserved() {
    let input = indoc! {r#"
        function outer(fs, bar) {
          const query = sql`SELECT ${bar}`;
          const closure = (baz) => {
            fs.executeQuery(query);
          };
          return closure;
        }
    "#};

    insta::assert_snapshot!(lower(input), @r"
    fn outer(fs, bar)
      const query = sql`SELECT ${bar}`
      const closure = fn <anon>(baz)
      closure
    ");
}

#[test]
fn call_sites_inside_opaque_expressions_survive() {
    let input = "flag && fs.executeQuery(q);\n";

    insta::assert_snapshot!(lower(input), @"<opaque flag, fs.executeQuery(q)>");
}

#[test]
fn iife_argument_is_discoverable() {
    let input = "((query) => { fs.executeQuery(query) })(sql`select 1`);\n";

    insta::assert_snapshot!(lower(input), @"fn <anon>(query)(sql`select 1`)");
}

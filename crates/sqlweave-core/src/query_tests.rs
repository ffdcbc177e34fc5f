use crate::{BoundParam, CompiledQuery, Digest, LateParam, QueryKind, SourceLocation};

fn query_with_params() -> CompiledQuery {
    CompiledQuery {
        digest: Digest::from_bytes([7u8; 32]),
        text: "select * from orders where id = $0 and owner = %{owner}".into(),
        kind: QueryKind::Select,
        sub_fragments: Vec::new(),
        bound: vec![BoundParam {
            name: "id".into(),
            expr: "id".into(),
        }],
        late: vec![LateParam { name: "owner".into() }],
        defined_at: SourceLocation {
            file: "orders.js".into(),
            line: 3,
        },
        usages: Vec::new(),
    }
}

#[test]
fn param_names_bound_before_late() {
    let q = query_with_params();
    let names: Vec<_> = q.param_names().collect();
    assert_eq!(names, ["id", "owner"]);
}

#[test]
fn kind_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&QueryKind::Select).unwrap(), "\"select\"");
    assert_eq!(serde_json::to_string(&QueryKind::Other).unwrap(), "\"other\"");
    assert_eq!(QueryKind::Update.to_string(), "update");
}

#[test]
fn location_uses_camel_case_field_names() {
    let loc = SourceLocation {
        file: "app.js".into(),
        line: 12,
    };
    assert_eq!(
        serde_json::to_string(&loc).unwrap(),
        r#"{"file":"app.js","line":12}"#
    );
}

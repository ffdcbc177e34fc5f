//! Raw template text handling: late-bound placeholders, explicit parameter
//! labels, and query-kind classification.

use std::sync::LazyLock;

use regex::Regex;

use sqlweave_core::QueryKind;

/// User-authored late-bound placeholder: `%{name}`.
static LATE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\{([a-zA-Z0-9_.\-]+?)\}").expect("late-param pattern compiles"));

/// Leading keyword of the composed text, skipping SQL line and block
/// comments.
static LEADING_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:\s+|--[^\n]*\n?|/\*.*?\*/)*(\w+)").expect("keyword pattern compiles")
});

/// One piece of a raw text chunk after placeholder scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    /// `%{name}` — resolved only from a runtime-supplied params object.
    Late(String),
}

/// Split a raw chunk into literal text and late-bound placeholders.
pub fn scan_late_params(chunk: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for caps in LATE_PARAM.captures_iter(chunk) {
        let whole = caps.get(0).expect("group 0 always present");
        if whole.start() > last {
            pieces.push(Piece::Text(chunk[last..whole.start()].to_owned()));
        }
        pieces.push(Piece::Late(caps[1].to_owned()));
        last = whole.end();
    }
    if last < chunk.len() || pieces.is_empty() {
        pieces.push(Piece::Text(chunk[last..].to_owned()));
    }
    pieces
}

/// An all-digit placeholder name is indistinguishable from a synthesized
/// merge marker.
pub fn is_ambiguous_marker(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Parse an explicit `:label:` directly after an interpolation.
///
/// Returns the label and the rest of the chunk with the label consumed.
/// `sql`... ${expr}:user_id: AND ...`` names the bound parameter `user_id`.
pub fn scan_label(chunk: &str) -> (Option<&str>, &str) {
    let Some(rest) = chunk.strip_prefix(':') else {
        return (None, chunk);
    };
    let Some(end) = rest.find(':') else {
        return (None, chunk);
    };
    let label = &rest[..end];
    if label.is_empty() || !label.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return (None, chunk);
    }
    (Some(label), &rest[end + 1..])
}

/// Classify the composed text by its leading keyword.
pub fn classify_kind(text: &str) -> QueryKind {
    let Some(caps) = LEADING_KEYWORD.captures(text) else {
        return QueryKind::Other;
    };
    match caps[1].to_ascii_lowercase().as_str() {
        "select" => QueryKind::Select,
        "insert" => QueryKind::Insert,
        "update" => QueryKind::Update,
        "delete" => QueryKind::Delete,
        _ => QueryKind::Other,
    }
}

/// True when the text holds more than one `;`-separated statement.
pub fn has_multiple_statements(text: &str) -> bool {
    let trimmed = text.trim_end();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    trimmed.contains(';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_params_split_around_text() {
        let pieces = scan_late_params("WHERE a = %{id} AND b = %{owner}!");
        assert_eq!(
            pieces,
            vec![
                Piece::Text("WHERE a = ".into()),
                Piece::Late("id".into()),
                Piece::Text(" AND b = ".into()),
                Piece::Late("owner".into()),
                Piece::Text("!".into()),
            ]
        );
    }

    #[test]
    fn chunk_without_placeholders_is_one_text_piece() {
        assert_eq!(scan_late_params(""), vec![Piece::Text(String::new())]);
        assert_eq!(scan_late_params("abc"), vec![Piece::Text("abc".into())]);
    }

    #[test]
    fn dotted_names_are_allowed() {
        let pieces = scan_late_params("%{a.b-c_d}");
        assert_eq!(pieces, vec![Piece::Late("a.b-c_d".into())]);
    }

    #[test]
    fn digit_only_names_are_ambiguous() {
        assert!(is_ambiguous_marker("0"));
        assert!(is_ambiguous_marker("42"));
        assert!(!is_ambiguous_marker("a1"));
        assert!(!is_ambiguous_marker("1a"));
    }

    #[test]
    fn labels_consume_their_delimiters() {
        assert_eq!(scan_label(":user_id: AND"), (Some("user_id"), " AND"));
        assert_eq!(scan_label(" no label"), (None, " no label"));
        assert_eq!(scan_label(":: empty"), (None, ":: empty"));
        // A lone colon (e.g. a cast) is not a label.
        assert_eq!(scan_label(":rest"), (None, ":rest"));
    }

    #[test]
    fn classification_skips_comments() {
        assert_eq!(classify_kind("select 1"), QueryKind::Select);
        assert_eq!(classify_kind("  SELECT 1"), QueryKind::Select);
        assert_eq!(
            classify_kind("-- a comment\nUPDATE t SET x = 1"),
            QueryKind::Update
        );
        assert_eq!(
            classify_kind("/* spanning\n comment */ insert into t"),
            QueryKind::Insert
        );
        assert_eq!(classify_kind("delete from t"), QueryKind::Delete);
        assert_eq!(classify_kind("with cte as (select 1)"), QueryKind::Other);
        assert_eq!(classify_kind("-- only a comment"), QueryKind::Other);
    }

    #[test]
    fn multi_statement_detection_ignores_trailing_semicolon() {
        assert!(has_multiple_statements("select 1; select 2"));
        assert!(has_multiple_statements("select 1; select 2;"));
        assert!(!has_multiple_statements("select 1"));
        assert!(!has_multiple_statements("select 1;"));
        assert!(!has_multiple_statements("select 1;  \n"));
    }
}

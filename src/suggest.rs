//! Context-aware autocomplete.
//!
//! The input is re-tokenized only up to the cursor, then replayed through a
//! state machine that mirrors the parser's productions to find out which
//! grammatical role is expected at the cursor. Suggestions are generated
//! for that role and ranked against the partially typed token. This runs on
//! every keystroke, including mid-edit invalid states, so it never returns
//! an error: unparsable input degrades to an empty list.

use crate::ast::CompOp;
use crate::lexer::scan_prefix;
use crate::schema::{FieldSpec, FieldType, Schema, FUNCTIONS};
use crate::token::{Token, TokenKind};

/// What kind of thing a suggestion inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Field,
    Operator,
    Function,
    Value,
    Keyword,
}

/// One autocomplete entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Display text.
    pub text: String,
    /// Text to insert (quoted for string values).
    pub insert_text: String,
    pub kind: SuggestionKind,
    pub detail: Option<String>,
}

impl Suggestion {
    fn new(text: impl Into<String>, kind: SuggestionKind) -> Self {
        let text = text.into();
        Self { insert_text: text.clone(), text, kind, detail: None }
    }

    fn with_insert(text: impl Into<String>, insert: impl Into<String>, kind: SuggestionKind) -> Self {
        Self { text: text.into(), insert_text: insert.into(), kind, detail: None }
    }

    fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// The grammatical role expected at the cursor.
#[derive(Debug, Clone, PartialEq)]
enum Context {
    /// Expecting a field name (query start, after AND/OR/NOT/`(`).
    ClauseStart,
    /// Expecting an operator for `field`.
    Operator { field: String },
    /// After `field NOT`, expecting IN.
    FieldNot { field: String },
    /// After `field IS`, expecting EMPTY or NOT.
    AfterIs,
    /// After `field IS NOT`, expecting EMPTY.
    AfterIsNot,
    /// Expecting a value for `field`, either after a comparison operator or
    /// inside an IN list.
    Value { field: String, in_list: bool },
    /// After `field IN`, expecting `(`.
    InOpen { field: String },
    /// Inside an IN list after a value, expecting `,` or `)`.
    InAfterValue { field: String },
    /// Inside a function argument list; consumed until the closing paren.
    FunctionArgs { field: String, in_list: bool, depth: usize },
    /// After a bare function name in value position, expecting `(`.
    FunctionName { field: String, in_list: bool },
    /// A complete clause behind us: AND / OR / ORDER BY or end of input.
    AfterClause,
    /// After ORDER, expecting BY.
    AfterOrder,
    /// Expecting a sortable field name.
    SortField,
    /// After a sort field, expecting ASC / DESC / `,`.
    AfterSortField,
    /// After ASC/DESC, expecting `,` or end of input.
    AfterSortDirection,
    /// The prefix does not fit the grammar; no role detected.
    Broken,
}

/// Compute suggestions for `input` with the cursor at byte offset `cursor`.
pub fn suggest(input: &str, cursor: usize, schema: &Schema) -> Vec<Suggestion> {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    let prefix_input = &input[..cursor];
    let scan = scan_prefix(prefix_input);

    // A string literal is still open under the cursor: the only sensible
    // suggestions are enumerated values for the current field.
    if let Some((_, partial)) = &scan.open_string {
        let (context, _) = replay(&scan.tokens);
        let suggestions = match context {
            Context::Value { field, .. } => enumerated_values(&field, schema),
            _ => Vec::new(),
        };
        return rank(suggestions, partial);
    }

    // A word the cursor is touching is a partial token, not settled syntax:
    // drop it and rank candidates against its text instead.
    let (tokens, partial) = match scan.tokens.split_last() {
        Some((last, rest)) if last.kind.is_wordlike() && last.span.end == cursor => {
            (rest, token_text(last, prefix_input))
        }
        _ => (&scan.tokens[..], ""),
    };

    let (context, depth) = replay(tokens);
    tracing::debug!(?context, partial, "suggest context detected");
    let candidates = candidates_for(&context, depth, schema);
    rank(candidates, partial)
}

fn token_text<'a>(token: &Token<'a>, input: &'a str) -> &'a str {
    &input[token.span.start..token.span.end]
}

/// Replay the token stream through the grammar to find the expected role
/// after the last token, plus the open-parenthesis depth at that point.
fn replay(tokens: &[Token<'_>]) -> (Context, usize) {
    let mut context = Context::ClauseStart;
    let mut depth = 0usize;

    for token in tokens {
        context = match context {
            Context::ClauseStart => match &token.kind {
                TokenKind::Identifier(name) => Context::Operator { field: name.to_string() },
                TokenKind::Not => Context::ClauseStart,
                TokenKind::LParen => {
                    depth += 1;
                    Context::ClauseStart
                }
                TokenKind::Order => Context::AfterOrder,
                _ => Context::Broken,
            },
            Context::Operator { field } => match &token.kind {
                TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Gt
                | TokenKind::Lt
                | TokenKind::Gte
                | TokenKind::Lte
                | TokenKind::Contains
                | TokenKind::NotContains => Context::Value { field, in_list: false },
                TokenKind::In => Context::InOpen { field },
                TokenKind::Not => Context::FieldNot { field },
                TokenKind::Is => Context::AfterIs,
                _ => Context::Broken,
            },
            Context::FieldNot { field } => match &token.kind {
                TokenKind::In => Context::InOpen { field },
                _ => Context::Broken,
            },
            Context::AfterIs => match &token.kind {
                TokenKind::Empty => Context::AfterClause,
                TokenKind::Not => Context::AfterIsNot,
                _ => Context::Broken,
            },
            Context::AfterIsNot => match &token.kind {
                TokenKind::Empty => Context::AfterClause,
                _ => Context::Broken,
            },
            Context::Value { field, in_list } => match &token.kind {
                TokenKind::String(_) | TokenKind::Number(_) | TokenKind::Date(_) => {
                    if in_list {
                        Context::InAfterValue { field }
                    } else {
                        Context::AfterClause
                    }
                }
                TokenKind::Identifier(_) => Context::FunctionName { field, in_list },
                _ => Context::Broken,
            },
            Context::FunctionName { field, in_list } => match &token.kind {
                TokenKind::LParen => Context::FunctionArgs { field, in_list, depth: 1 },
                _ => Context::Broken,
            },
            Context::FunctionArgs { field, in_list, depth: fn_depth } => match &token.kind {
                TokenKind::LParen => {
                    Context::FunctionArgs { field, in_list, depth: fn_depth + 1 }
                }
                TokenKind::RParen => {
                    if fn_depth == 1 {
                        if in_list {
                            Context::InAfterValue { field }
                        } else {
                            Context::AfterClause
                        }
                    } else {
                        Context::FunctionArgs { field, in_list, depth: fn_depth - 1 }
                    }
                }
                _ => Context::FunctionArgs { field, in_list, depth: fn_depth },
            },
            Context::InOpen { field } => match &token.kind {
                TokenKind::LParen => Context::Value { field, in_list: true },
                _ => Context::Broken,
            },
            Context::InAfterValue { field } => match &token.kind {
                TokenKind::Comma => Context::Value { field, in_list: true },
                TokenKind::RParen => Context::AfterClause,
                _ => Context::Broken,
            },
            Context::AfterClause => match &token.kind {
                TokenKind::And | TokenKind::Or => Context::ClauseStart,
                TokenKind::RParen => {
                    depth = depth.saturating_sub(1);
                    Context::AfterClause
                }
                TokenKind::Order => Context::AfterOrder,
                _ => Context::Broken,
            },
            Context::AfterOrder => match &token.kind {
                TokenKind::By => Context::SortField,
                _ => Context::Broken,
            },
            Context::SortField => match &token.kind {
                TokenKind::Identifier(_) => Context::AfterSortField,
                _ => Context::Broken,
            },
            Context::AfterSortField => match &token.kind {
                TokenKind::Asc | TokenKind::Desc => Context::AfterSortDirection,
                TokenKind::Comma => Context::SortField,
                _ => Context::Broken,
            },
            Context::AfterSortDirection => match &token.kind {
                TokenKind::Comma => Context::SortField,
                _ => Context::Broken,
            },
            Context::Broken => Context::Broken,
        };
    }
    (context, depth)
}

fn candidates_for(context: &Context, depth: usize, schema: &Schema) -> Vec<Suggestion> {
    match context {
        Context::ClauseStart => schema
            .fields()
            .iter()
            .map(|f| {
                Suggestion::new(f.name.clone(), SuggestionKind::Field)
                    .detail(f.field_type.name())
            })
            .collect(),
        Context::Operator { field } => operator_candidates(schema.field(field)),
        Context::FieldNot { .. } => vec![Suggestion::new("IN", SuggestionKind::Keyword)],
        Context::AfterIs => vec![
            Suggestion::new("EMPTY", SuggestionKind::Keyword),
            Suggestion::new("NOT EMPTY", SuggestionKind::Keyword),
        ],
        Context::AfterIsNot => vec![Suggestion::new("EMPTY", SuggestionKind::Keyword)],
        Context::Value { field, .. } => {
            let mut candidates = enumerated_values(field, schema);
            candidates.extend(function_candidates(field, schema));
            candidates
        }
        Context::AfterClause => {
            let mut candidates = vec![
                Suggestion::new("AND", SuggestionKind::Keyword),
                Suggestion::new("OR", SuggestionKind::Keyword),
            ];
            // ORDER BY only continues the query at the top level, not
            // inside an unclosed group.
            if depth == 0 {
                candidates.push(Suggestion::new("ORDER BY", SuggestionKind::Keyword));
            }
            candidates
        }
        Context::AfterOrder => vec![Suggestion::new("BY", SuggestionKind::Keyword)],
        Context::SortField => schema
            .fields()
            .iter()
            .filter(|f| f.sortable)
            .map(|f| {
                Suggestion::new(f.name.clone(), SuggestionKind::Field)
                    .detail(f.field_type.name())
            })
            .collect(),
        Context::AfterSortField => vec![
            Suggestion::new("ASC", SuggestionKind::Keyword),
            Suggestion::new("DESC", SuggestionKind::Keyword),
        ],
        // No useful completion at these positions.
        Context::InOpen { .. }
        | Context::InAfterValue { .. }
        | Context::FunctionName { .. }
        | Context::FunctionArgs { .. }
        | Context::AfterSortDirection
        | Context::Broken => Vec::new(),
    }
}

fn operator_candidates(spec: Option<&FieldSpec>) -> Vec<Suggestion> {
    let ops: Vec<CompOp> = match spec {
        Some(spec) => spec.legal_operators().to_vec(),
        // Unknown field: fall back to the full operator set.
        None => vec![
            CompOp::Eq,
            CompOp::NotEq,
            CompOp::Gt,
            CompOp::Lt,
            CompOp::Gte,
            CompOp::Lte,
            CompOp::Contains,
            CompOp::NotContains,
        ],
    };
    let mut candidates: Vec<Suggestion> = ops
        .into_iter()
        .map(|op| Suggestion::new(op.symbol(), SuggestionKind::Operator))
        .collect();
    candidates.extend([
        Suggestion::new("IN", SuggestionKind::Keyword),
        Suggestion::new("NOT IN", SuggestionKind::Keyword),
        Suggestion::new("IS EMPTY", SuggestionKind::Keyword),
        Suggestion::new("IS NOT EMPTY", SuggestionKind::Keyword),
    ]);
    candidates
}

/// Literal hints for a field: its enumerated values, quoted on insert.
fn enumerated_values(field: &str, schema: &Schema) -> Vec<Suggestion> {
    let Some(spec) = schema.field(field) else {
        return Vec::new();
    };
    spec.values
        .iter()
        .map(|v| {
            Suggestion::with_insert(v.clone(), format!("\"{}\"", v), SuggestionKind::Value)
                .detail(spec.name.clone())
        })
        .collect()
}

/// Functions whose return type fits the field's value type.
fn function_candidates(field: &str, schema: &Schema) -> Vec<Suggestion> {
    let field_type = schema.field(field).map(|s| s.field_type);
    FUNCTIONS
        .iter()
        .filter(|f| match field_type {
            // List fields hold strings
            Some(FieldType::List) => f.returns == FieldType::String,
            Some(t) => f.returns == t,
            None => true,
        })
        .map(|f| {
            Suggestion::new(format!("{}()", f.name), SuggestionKind::Function)
                .detail(f.returns.name())
        })
        .collect()
}

/// Rank candidates against the partially typed text: exact-prefix matches
/// first, then subsequence matches, alphabetical within each band, with the
/// original (schema declaration) order breaking ties. With nothing typed,
/// candidates keep their declaration order.
fn rank(candidates: Vec<Suggestion>, partial: &str) -> Vec<Suggestion> {
    if partial.is_empty() {
        return candidates;
    }
    let needle = partial.to_lowercase();
    let mut scored: Vec<(u8, String, usize, Suggestion)> = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, suggestion)| {
            let haystack = suggestion.text.to_lowercase();
            let band = if haystack.starts_with(&needle) {
                0
            } else if is_subsequence(&needle, &haystack) {
                1
            } else {
                return None;
            };
            Some((band, haystack, index, suggestion))
        })
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)).then_with(|| a.2.cmp(&b.2)));
    scored.into_iter().map(|(_, _, _, s)| s).collect()
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    needle.chars().all(|n| chars.any(|h| h == n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};

    fn test_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::system("key", FieldType::String),
            FieldSpec {
                values: vec!["Open".into(), "In Progress".into(), "Done".into()],
                ..FieldSpec::system("status", FieldType::String)
            },
            FieldSpec::system("assignee", FieldType::String),
            FieldSpec::system("updated", FieldType::Date),
            FieldSpec::new("storyPoints", FieldType::Number),
            FieldSpec {
                sortable: false,
                ..FieldSpec::new("labels", FieldType::List)
            },
        ])
    }

    fn texts(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.text.as_str()).collect()
    }

    fn at_end(input: &str) -> Vec<Suggestion> {
        suggest(input, input.len(), &test_schema())
    }

    #[test]
    fn test_empty_input_suggests_fields_in_declaration_order() {
        let suggestions = at_end("");
        assert_eq!(
            texts(&suggestions),
            vec!["key", "status", "assignee", "updated", "storyPoints", "labels"]
        );
        assert!(suggestions.iter().all(|s| s.kind == SuggestionKind::Field));
    }

    #[test]
    fn test_partial_field_ranks_prefix_first() {
        let suggestions = at_end("statu");
        assert_eq!(texts(&suggestions)[0], "status");
    }

    #[test]
    fn test_prefix_band_is_alphabetical() {
        let suggestions = at_end("st");
        assert_eq!(texts(&suggestions), vec!["status", "storyPoints"]);
    }

    #[test]
    fn test_subsequence_match_ranks_after_prefix() {
        // "sp" is a prefix of nothing, but a subsequence of "storyPoints"
        let suggestions = at_end("sp");
        assert_eq!(texts(&suggestions), vec!["storyPoints"]);
    }

    #[test]
    fn test_operators_filtered_by_field_type() {
        let suggestions = at_end("storyPoints ");
        let names = texts(&suggestions);
        assert!(names.contains(&">"));
        assert!(!names.contains(&"~"));

        let suggestions = at_end("status ");
        let names = texts(&suggestions);
        assert!(names.contains(&"~"));
        assert!(!names.contains(&">"));
        assert!(names.contains(&"IS EMPTY"));
    }

    #[test]
    fn test_value_position_suggests_enumerated_values_and_functions() {
        let suggestions = at_end("status = ");
        let names = texts(&suggestions);
        assert!(names.contains(&"Open"));
        assert!(names.contains(&"currentUser()"));
        assert!(!names.contains(&"now()")); // date-valued, status is a string

        let quoted = suggestions.iter().find(|s| s.text == "Open").unwrap();
        assert_eq!(quoted.insert_text, "\"Open\"");
    }

    #[test]
    fn test_date_field_value_suggests_now() {
        let names_owned = at_end("updated > ");
        let names = texts(&names_owned);
        assert!(names.contains(&"now()"));
        assert!(!names.contains(&"currentUser()"));
    }

    #[test]
    fn test_inside_open_string_suggests_values() {
        let input = r#"status = "In"#;
        let suggestions = suggest(input, input.len(), &test_schema());
        assert_eq!(texts(&suggestions), vec!["In Progress"]);
    }

    #[test]
    fn test_after_clause_suggests_connectives() {
        let suggestions = at_end(r#"status = "Done" "#);
        assert_eq!(texts(&suggestions), vec!["AND", "OR", "ORDER BY"]);
    }

    #[test]
    fn test_order_by_not_suggested_inside_group() {
        let suggestions = at_end(r#"(status = "Done" "#);
        assert_eq!(texts(&suggestions), vec!["AND", "OR"]);
    }

    #[test]
    fn test_partial_keyword() {
        let suggestions = at_end(r#"status = "Done" OR"#);
        assert_eq!(texts(&suggestions)[0], "OR");

        let suggestions = at_end(r#"status = "Done" ORD"#);
        assert_eq!(texts(&suggestions), vec!["ORDER BY"]);
    }

    #[test]
    fn test_order_by_flow() {
        let suggestions = at_end("ORDER ");
        assert_eq!(texts(&suggestions), vec!["BY"]);

        // only sortable fields offered as sort keys
        let suggestions = at_end("ORDER BY ");
        let names = texts(&suggestions);
        assert!(names.contains(&"updated"));
        assert!(!names.contains(&"labels"));

        let suggestions = at_end("ORDER BY updated ");
        assert_eq!(texts(&suggestions), vec!["ASC", "DESC"]);
    }

    #[test]
    fn test_is_flow() {
        let suggestions = at_end("labels IS ");
        assert_eq!(texts(&suggestions), vec!["EMPTY", "NOT EMPTY"]);

        let suggestions = at_end("labels IS NOT ");
        assert_eq!(texts(&suggestions), vec!["EMPTY"]);
    }

    #[test]
    fn test_in_list_values() {
        let suggestions = at_end(r#"status IN ("Open", "#);
        let names = texts(&suggestions);
        assert!(names.contains(&"Done"));
    }

    #[test]
    fn test_cursor_in_the_middle_only_sees_prefix() {
        // Cursor right after "statu", ignoring what follows
        let input = r#"statu = "Done""#;
        let suggestions = suggest(input, 5, &test_schema());
        assert_eq!(texts(&suggestions)[0], "status");
    }

    #[test]
    fn test_malformed_input_degrades_to_empty() {
        assert!(at_end("= = =").is_empty());
        assert!(at_end(r#"status = "x" bogus bogus"#).is_empty());
    }

    #[test]
    fn test_illegal_characters_are_skipped_not_fatal() {
        // the '#' is dropped by the tolerant scan; the role is still detected
        let suggestions = at_end("status # ");
        assert!(suggestions.iter().any(|s| s.text == "IS EMPTY"));
    }

    #[test]
    fn test_never_panics_on_arbitrary_cursor() {
        let input = r#"status = "Done" AND assignee = currentUser() ORDER BY updated DESC"#;
        for cursor in 0..=input.len() {
            let _ = suggest(input, cursor, &test_schema());
        }
        // cursor past the end is clamped
        let _ = suggest(input, input.len() + 10, &test_schema());
    }
}

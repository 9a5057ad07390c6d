//! A JQL-style query engine: parse a user-typed filter string, evaluate it
//! against an in-memory issue collection, and offer context-aware
//! autocomplete while the user types.
//!
//! Every entry point is a pure function of its arguments plus the injected
//! [`EvalContext`]; the engine holds no state between calls.

pub mod ast;
pub mod config;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod suggest;
pub mod token;

pub use ast::{describe, Query};
pub use error::{Diagnostic, DiagnosticKind, Stage};
pub use executor::{EvalContext, FieldValue, Issue};
pub use schema::{FieldSpec, FieldType, Schema};
pub use suggest::{Suggestion, SuggestionKind};

use parser::Parser;

/// Tokenize, parse and (when a schema is given) validate a query string.
pub fn parse_query(input: &str, schema: Option<&Schema>) -> error::Result<Query> {
    let tokens = lexer::tokenize(input)?;
    let query = Parser::new(&tokens).parse()?;
    if let Some(schema) = schema {
        schema::validate(&query, schema)?;
    }
    Ok(query)
}

/// The full pipeline: lex → parse → validate → execute. The first error
/// short-circuits the remaining stages and is returned as the single
/// diagnostic for the query.
pub fn parse_and_execute(
    input: &str,
    issues: &[Issue],
    schema: &Schema,
    ctx: &EvalContext,
) -> error::Result<Vec<Issue>> {
    let query = parse_query(input, Some(schema))?;
    executor::execute(&query, issues, schema, ctx)
}

/// Autocomplete for the query bar. Runs on every keystroke and never
/// returns an error; malformed input yields an empty list.
pub fn get_suggestions(input: &str, cursor: usize, schema: &Schema) -> Vec<Suggestion> {
    suggest::suggest(input, cursor, schema)
}

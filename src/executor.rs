//! Query execution against an in-memory issue collection.
//!
//! Evaluation is schema-driven: system fields read fixed issue properties,
//! custom fields read the issue's field map. Boolean evaluation
//! short-circuits, and every time-dependent value resolves against the
//! injected context, never the wall clock, so running the same query twice
//! with the same context yields identical ordered results.

use crate::ast::{CompOp, Expr, LogicalKind, Query, SortDirection, Value};
use crate::error::{Diagnostic, DiagnosticKind, Result};
use crate::schema::{FieldSpec, Schema};
use crate::token::Span;
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A single issue record. The engine never mutates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub status: String,
    #[serde(default)]
    pub assignee: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Custom field values keyed by field name.
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

/// A field value as stored on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Date(DateTime<Utc>),
    String(String),
    List(Vec<String>),
}

/// The caller-supplied evaluation context. `now` anchors relative dates,
/// `current_user` resolves `currentUser()`.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub now: DateTime<Utc>,
    pub current_user: String,
}

/// A literal after resolving functions and date arithmetic.
#[derive(Debug, Clone)]
enum Resolved {
    String(String),
    Number(f64),
    Date(DateTime<Utc>),
}

/// Filter and sort `issues` by the query. Returns the matching issues in a
/// new vector; on any evaluation failure the whole query aborts with one
/// diagnostic and no partial results.
pub fn execute(
    query: &Query,
    issues: &[Issue],
    schema: &Schema,
    ctx: &EvalContext,
) -> Result<Vec<Issue>> {
    execute_with(query, issues, schema, ctx, &mut field_value)
}

/// Like [`execute`] but with an explicit field accessor, so tests can count
/// accesses and callers can override how values are read.
pub fn execute_with<F>(
    query: &Query,
    issues: &[Issue],
    schema: &Schema,
    ctx: &EvalContext,
    accessor: &mut F,
) -> Result<Vec<Issue>>
where
    F: FnMut(&Issue, &FieldSpec) -> Option<FieldValue>,
{
    let mut results = Vec::new();
    for issue in issues {
        let matched = match &query.filter {
            Some(expr) => eval_expr(expr, issue, schema, ctx, accessor)?,
            None => true,
        };
        if matched {
            results.push(issue.clone());
        }
    }

    if !query.order_by.is_empty() {
        // Resolve sort keys up front so the comparator itself cannot fail.
        let mut keys = Vec::with_capacity(query.order_by.len());
        for key in &query.order_by {
            let spec = schema.field(&key.field.name).ok_or_else(|| {
                Diagnostic::validate(
                    DiagnosticKind::UnknownField,
                    format!("unknown field '{}'", key.field.name),
                    key.field.span,
                )
            })?;
            keys.push((spec, key.direction));
        }
        // Vec::sort_by is stable: issues with equal keys keep input order.
        results.sort_by(|a, b| {
            for (spec, direction) in &keys {
                let ordering = compare_sort_values(
                    accessor(a, spec).as_ref(),
                    accessor(b, spec).as_ref(),
                    *direction,
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    tracing::debug!(
        matched = results.len(),
        scanned = issues.len(),
        "query executed"
    );
    Ok(results)
}

/// The default accessor. System fields read fixed properties, custom fields
/// read the field map (exact name first, then case-insensitive).
pub fn field_value(issue: &Issue, spec: &FieldSpec) -> Option<FieldValue> {
    if spec.is_system {
        return match spec.name.to_ascii_lowercase().as_str() {
            "key" => Some(FieldValue::String(issue.key.clone())),
            "type" => Some(FieldValue::String(issue.issue_type.clone())),
            "status" => Some(FieldValue::String(issue.status.clone())),
            "assignee" => issue.assignee.clone().map(FieldValue::String),
            "created" => Some(FieldValue::Date(issue.created)),
            "updated" => Some(FieldValue::Date(issue.updated)),
            _ => None,
        };
    }
    if let Some(value) = issue.fields.get(&spec.name) {
        return Some(value.clone());
    }
    issue
        .fields
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&spec.name))
        .map(|(_, value)| value.clone())
}

fn eval_expr<F>(
    expr: &Expr,
    issue: &Issue,
    schema: &Schema,
    ctx: &EvalContext,
    accessor: &mut F,
) -> Result<bool>
where
    F: FnMut(&Issue, &FieldSpec) -> Option<FieldValue>,
{
    match expr {
        Expr::Logical { kind, operands, span } => match kind {
            // AND stops at the first false operand, OR at the first true one
            LogicalKind::And => {
                for operand in operands {
                    if !eval_expr(operand, issue, schema, ctx, accessor)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LogicalKind::Or => {
                for operand in operands {
                    if eval_expr(operand, issue, schema, ctx, accessor)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LogicalKind::Not => {
                let inner = operands.first().ok_or_else(|| {
                    Diagnostic::execute(
                        DiagnosticKind::TypeCoercionFailed,
                        "NOT without an operand",
                        *span,
                    )
                })?;
                Ok(!eval_expr(inner, issue, schema, ctx, accessor)?)
            }
        },
        Expr::Comparison { field, op, value, span } => {
            let spec = resolve_field(&field.name, field.span, schema)?;
            let resolved = resolve_value(value, ctx)?;
            match accessor(issue, spec) {
                // A missing value matches no comparison.
                None => Ok(false),
                Some(actual) => compare(&actual, *op, &resolved, spec, *span),
            }
        }
        Expr::In { field, negated, values, .. } => {
            let spec = resolve_field(&field.name, field.span, schema)?;
            let mut list = Vec::with_capacity(values.len());
            for value in values {
                list.push(resolve_value(value, ctx)?);
            }
            let contained = match accessor(issue, spec) {
                None => false,
                Some(FieldValue::List(elements)) => {
                    // Multi-value membership: any element intersects the list
                    elements.iter().any(|e| list.iter().any(|r| resolved_eq_str(r, e, spec)))
                }
                Some(actual) => list.iter().any(|r| value_eq(&actual, r, spec)),
            };
            Ok(contained != *negated)
        }
        Expr::Empty { field, negated, .. } => {
            let spec = resolve_field(&field.name, field.span, schema)?;
            let empty = match accessor(issue, spec) {
                None => true,
                Some(FieldValue::List(elements)) => elements.is_empty(),
                Some(FieldValue::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            Ok(empty != *negated)
        }
    }
}

fn resolve_field<'s>(name: &str, span: Span, schema: &'s Schema) -> Result<&'s FieldSpec> {
    schema.field(name).ok_or_else(|| {
        Diagnostic::validate(
            DiagnosticKind::UnknownField,
            format!("unknown field '{}'", name),
            span,
        )
    })
}

/// Resolve a literal into a concrete value using the injected context.
fn resolve_value(value: &Value, ctx: &EvalContext) -> Result<Resolved> {
    match value {
        Value::String { value, .. } => Ok(Resolved::String(value.clone())),
        Value::Number { value, .. } => Ok(Resolved::Number(*value)),
        Value::Date { raw, span } => resolve_date(raw, *span, ctx).map(Resolved::Date),
        Value::Function { name, span, .. } => {
            if name.eq_ignore_ascii_case("currentUser") {
                Ok(Resolved::String(ctx.current_user.clone()))
            } else if name.eq_ignore_ascii_case("now") {
                Ok(Resolved::Date(ctx.now))
            } else {
                Err(Diagnostic::validate(
                    DiagnosticKind::BadFunctionCall,
                    format!("unknown function '{}'", name),
                    *span,
                ))
            }
        }
    }
}

/// Resolve an absolute (`2024-03-01`) or relative (`-1d`, `-2w`, `-1M`)
/// date literal. Relative dates are anchored on `ctx.now`.
fn resolve_date(raw: &str, span: Span, ctx: &EvalContext) -> Result<DateTime<Utc>> {
    let coercion_error = || {
        Diagnostic::execute(
            DiagnosticKind::TypeCoercionFailed,
            format!("'{}' is not a valid date", raw),
            span,
        )
    };

    if let Some(rest) = raw.strip_prefix('-').or_else(|| raw.strip_prefix('+')) {
        let negative = raw.starts_with('-');
        let unit = rest.chars().last().ok_or_else(coercion_error)?;
        let amount: i64 = rest[..rest.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| coercion_error())?;
        let signed = if negative { -amount } else { amount };
        let shifted = match unit {
            'd' => Duration::try_days(signed).and_then(|d| ctx.now.checked_add_signed(d)),
            'w' => Duration::try_weeks(signed).and_then(|d| ctx.now.checked_add_signed(d)),
            'M' => u32::try_from(amount.unsigned_abs()).ok().and_then(|m| {
                let months = Months::new(m);
                if negative {
                    ctx.now.checked_sub_months(months)
                } else {
                    ctx.now.checked_add_months(months)
                }
            }),
            _ => None,
        };
        return shifted.ok_or_else(coercion_error);
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| coercion_error())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(coercion_error)?;
    Ok(midnight.and_utc())
}

/// Apply a comparison operator. A runtime type mismatch (a malformed
/// literal that slipped past validation, or a field holding an unexpected
/// value) aborts with `TypeCoercionFailed`.
fn compare(
    actual: &FieldValue,
    op: CompOp,
    resolved: &Resolved,
    spec: &FieldSpec,
    span: Span,
) -> Result<bool> {
    match op {
        CompOp::Eq => Ok(value_eq(actual, resolved, spec)),
        CompOp::NotEq => Ok(!value_eq(actual, resolved, spec)),
        CompOp::Contains | CompOp::NotContains => {
            let (FieldValue::String(haystack), Resolved::String(needle)) = (actual, resolved)
            else {
                return Err(type_error(actual, resolved, spec, span));
            };
            let found = haystack.to_lowercase().contains(&needle.to_lowercase());
            Ok(if op == CompOp::Contains { found } else { !found })
        }
        CompOp::Gt | CompOp::Lt | CompOp::Gte | CompOp::Lte => {
            let ordering = match (actual, resolved) {
                (FieldValue::Number(a), Resolved::Number(b)) => {
                    a.partial_cmp(b).ok_or_else(|| type_error(actual, resolved, spec, span))?
                }
                (FieldValue::Date(a), Resolved::Date(b)) => a.cmp(b),
                _ => return Err(type_error(actual, resolved, spec, span)),
            };
            Ok(match op {
                CompOp::Gt => ordering == Ordering::Greater,
                CompOp::Lt => ordering == Ordering::Less,
                CompOp::Gte => ordering != Ordering::Less,
                CompOp::Lte => ordering != Ordering::Greater,
                _ => unreachable!("handled above"),
            })
        }
    }
}

fn type_error(actual: &FieldValue, resolved: &Resolved, spec: &FieldSpec, span: Span) -> Diagnostic {
    let actual_name = match actual {
        FieldValue::String(_) => "string",
        FieldValue::Number(_) => "number",
        FieldValue::Date(_) => "date",
        FieldValue::List(_) => "list",
    };
    let resolved_name = match resolved {
        Resolved::String(_) => "string",
        Resolved::Number(_) => "number",
        Resolved::Date(_) => "date",
    };
    Diagnostic::execute(
        DiagnosticKind::TypeCoercionFailed,
        format!(
            "cannot compare {} field '{}' against a {} value",
            actual_name, spec.name, resolved_name
        ),
        span,
    )
}

/// Equality between a field value and a resolved literal. Strings compare
/// case-insensitively unless the field is marked case-sensitive; a list
/// field equals a string when any element does.
fn value_eq(actual: &FieldValue, resolved: &Resolved, spec: &FieldSpec) -> bool {
    match (actual, resolved) {
        (FieldValue::String(a), Resolved::String(b)) => str_eq(a, b, spec),
        (FieldValue::Number(a), Resolved::Number(b)) => a == b,
        (FieldValue::Date(a), Resolved::Date(b)) => a == b,
        (FieldValue::List(elements), Resolved::String(b)) => {
            elements.iter().any(|e| str_eq(e, b, spec))
        }
        _ => false,
    }
}

fn resolved_eq_str(resolved: &Resolved, element: &str, spec: &FieldSpec) -> bool {
    match resolved {
        Resolved::String(s) => str_eq(element, s, spec),
        _ => false,
    }
}

fn str_eq(a: &str, b: &str, spec: &FieldSpec) -> bool {
    if spec.case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Ordering for ORDER BY keys. Missing values sort last regardless of
/// direction, so the direction flip only applies between present values.
fn compare_sort_values(
    a: Option<&FieldValue>,
    b: Option<&FieldValue>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Number(a), FieldValue::Number(b)) => {
            a.partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
        (FieldValue::String(a), FieldValue::String(b)) => {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
        (FieldValue::List(a), FieldValue::List(b)) => {
            a.join(",").to_lowercase().cmp(&b.join(",").to_lowercase())
        }
        // Mixed types have no meaningful order; treat as equal to keep the
        // sort stable.
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::schema::{validate, FieldSpec, FieldType};
    use chrono::TimeZone;

    fn test_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::system("key", FieldType::String),
            FieldSpec::system("status", FieldType::String),
            FieldSpec::system("assignee", FieldType::String),
            FieldSpec::system("created", FieldType::Date),
            FieldSpec::system("updated", FieldType::Date),
            FieldSpec::new("priority", FieldType::String),
            FieldSpec::new("summary", FieldType::String),
            FieldSpec::new("storyPoints", FieldType::Number),
            FieldSpec::new("labels", FieldType::List),
        ])
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    fn issue(key: &str, status: &str) -> Issue {
        Issue {
            key: key.to_string(),
            issue_type: "Task".to_string(),
            status: status.to_string(),
            assignee: None,
            created: day(1),
            updated: day(1),
            fields: HashMap::new(),
        }
    }

    fn ctx() -> EvalContext {
        EvalContext {
            now: day(15),
            current_user: "alice".to_string(),
        }
    }

    fn run(input: &str, issues: &[Issue]) -> Result<Vec<Issue>> {
        let schema = test_schema();
        let tokens = tokenize(input)?;
        let query = Parser::new(&tokens).parse()?;
        validate(&query, &schema)?;
        execute(&query, issues, &schema, &ctx())
    }

    fn keys(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn test_status_equality() {
        let issues = vec![issue("A-1", "Done"), issue("A-2", "Open")];
        let results = run(r#"status = "Done""#, &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);
    }

    #[test]
    fn test_string_equality_is_case_insensitive() {
        let issues = vec![issue("A-1", "Done")];
        let results = run(r#"status = "done""#, &issues).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let issues = vec![issue("A-1", "Done"), issue("A-2", "Open")];
        assert_eq!(run("", &issues).unwrap().len(), 2);
    }

    #[test]
    fn test_current_user_function() {
        let mut a = issue("A-1", "Open");
        a.assignee = Some("alice".to_string());
        let mut b = issue("A-2", "Open");
        b.assignee = Some("bob".to_string());
        let c = issue("A-3", "Open");

        let results = run("assignee = currentUser()", &[a, b, c]).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);
    }

    #[test]
    fn test_missing_value_never_matches_comparison() {
        // A-1 has no assignee: neither = nor != matches it
        let issues = vec![issue("A-1", "Open")];
        assert!(run(r#"assignee = "alice""#, &issues).unwrap().is_empty());
        assert!(run(r#"assignee != "alice""#, &issues).unwrap().is_empty());
    }

    #[test]
    fn test_in_and_not_in() {
        let issues = vec![
            issue("A-1", "Open"),
            issue("A-2", "Done"),
            issue("A-3", "Closed"),
        ];
        let results = run(r#"status IN ("Done", "Closed")"#, &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-2", "A-3"]);

        let results = run(r#"status NOT IN ("Done", "Closed")"#, &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);
    }

    #[test]
    fn test_in_on_multivalue_field_intersects() {
        let mut a = issue("A-1", "Open");
        a.fields.insert(
            "labels".to_string(),
            FieldValue::List(vec!["infra".to_string(), "ux".to_string()]),
        );
        let mut b = issue("A-2", "Open");
        b.fields.insert("labels".to_string(), FieldValue::List(vec!["docs".to_string()]));

        let results = run(r#"labels IN ("ux", "backend")"#, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);

        // NOT IN: no element may intersect
        let results = run(r#"labels NOT IN ("ux", "backend")"#, &[a, b]).unwrap();
        assert_eq!(keys(&results), vec!["A-2"]);
    }

    #[test]
    fn test_is_empty_on_lists() {
        let mut a = issue("A-1", "Open");
        a.fields.insert("labels".to_string(), FieldValue::List(vec![]));
        let mut b = issue("A-2", "Open");
        b.fields.insert("labels".to_string(), FieldValue::List(vec!["x".to_string()]));
        let c = issue("A-3", "Open"); // no labels entry at all

        let results = run("labels IS EMPTY", &[a.clone(), b.clone(), c.clone()]).unwrap();
        assert_eq!(keys(&results), vec!["A-1", "A-3"]);

        let results = run("labels IS NOT EMPTY", &[a, b, c]).unwrap();
        assert_eq!(keys(&results), vec!["A-2"]);
    }

    #[test]
    fn test_contains() {
        let mut a = issue("A-1", "Open");
        a.fields.insert(
            "summary".to_string(),
            FieldValue::String("Fix login crash".to_string()),
        );
        let mut b = issue("A-2", "Open");
        b.fields.insert(
            "summary".to_string(),
            FieldValue::String("Update docs".to_string()),
        );

        let results = run(r#"summary ~ "LOGIN""#, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);
        let results = run(r#"summary !~ "login""#, &[a, b]).unwrap();
        assert_eq!(keys(&results), vec!["A-2"]);
    }

    #[test]
    fn test_number_comparisons() {
        let mut a = issue("A-1", "Open");
        a.fields.insert("storyPoints".to_string(), FieldValue::Number(8.0));
        let mut b = issue("A-2", "Open");
        b.fields.insert("storyPoints".to_string(), FieldValue::Number(2.0));

        let results = run("storyPoints >= 5", &[a, b]).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);
    }

    #[test]
    fn test_absolute_and_relative_dates() {
        let mut a = issue("A-1", "Open");
        a.updated = day(14);
        let mut b = issue("A-2", "Open");
        b.updated = day(2);

        // absolute: after March 10th
        let results = run("updated > 2024-03-10", &[a.clone(), b.clone()]).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);

        // relative: within the last week of now (= March 15th noon)
        let results = run("updated > -1w", &[a.clone(), b.clone()]).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);

        // relative months
        let results = run("updated < -1M", &[a, b]).unwrap();
        assert!(keys(&results).is_empty());
    }

    #[test]
    fn test_malformed_date_aborts_with_coercion_error() {
        let mut a = issue("A-1", "Open");
        a.updated = day(14);
        // "2024-13" lexes as a date literal but does not resolve
        let err = run("updated > 2024-13", &[a]).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::TypeCoercionFailed);
        assert_eq!(err.span, Span::new(10, 17));
    }

    #[test]
    fn test_order_by_stable_multi_key() {
        let mut issues = Vec::new();
        for (key, status, d) in [
            ("A-1", "Open", 3),
            ("A-2", "Done", 5),
            ("A-3", "Open", 3),
            ("A-4", "Done", 1),
        ] {
            let mut i = issue(key, status);
            i.updated = day(d);
            issues.push(i);
        }

        // Equal updated days keep input order (A-1 before A-3)
        let results = run("ORDER BY updated ASC, key ASC", &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-4", "A-1", "A-3", "A-2"]);

        let results = run("ORDER BY updated DESC", &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-2", "A-1", "A-3", "A-4"]);
    }

    #[test]
    fn test_missing_sort_values_go_last_both_directions() {
        let mut a = issue("A-1", "Open");
        a.fields.insert("storyPoints".to_string(), FieldValue::Number(3.0));
        let b = issue("A-2", "Open"); // no storyPoints
        let mut c = issue("A-3", "Open");
        c.fields.insert("storyPoints".to_string(), FieldValue::Number(1.0));

        let issues = [a, b, c];
        let results = run("ORDER BY storyPoints ASC", &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-3", "A-1", "A-2"]);
        let results = run("ORDER BY storyPoints DESC", &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-1", "A-3", "A-2"]);
    }

    #[test]
    fn test_idempotent_execution() {
        let issues = vec![issue("A-1", "Open"), issue("A-2", "Done"), issue("A-3", "Open")];
        let first = run(r#"status = "Open" ORDER BY key DESC"#, &issues).unwrap();
        let second = run(r#"status = "Open" ORDER BY key DESC"#, &issues).unwrap();
        assert_eq!(keys(&first), keys(&second));
    }

    #[test]
    fn test_and_short_circuits() {
        let schema = test_schema();
        let tokens = tokenize(r#"status = "Done" AND summary ~ "x""#).unwrap();
        let query = Parser::new(&tokens).parse().unwrap();

        let mut accesses = Vec::new();
        let mut spy = |issue: &Issue, spec: &FieldSpec| {
            accesses.push(spec.name.clone());
            field_value(issue, spec)
        };
        // status is "Open": the AND's first operand is false, so the
        // summary accessor must never run.
        let issues = vec![issue("A-1", "Open")];
        execute_with(&query, &issues, &schema, &ctx(), &mut spy).unwrap();
        assert_eq!(accesses, vec!["status".to_string()]);
    }

    #[test]
    fn test_or_short_circuits() {
        let schema = test_schema();
        let tokens = tokenize(r#"status = "Open" OR summary ~ "x""#).unwrap();
        let query = Parser::new(&tokens).parse().unwrap();

        let mut count = 0usize;
        let mut spy = |issue: &Issue, spec: &FieldSpec| {
            count += 1;
            field_value(issue, spec)
        };
        let issues = vec![issue("A-1", "Open")];
        execute_with(&query, &issues, &schema, &ctx(), &mut spy).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_not_negates() {
        let issues = vec![issue("A-1", "Open"), issue("A-2", "Done")];
        let results = run(r#"NOT status = "Done""#, &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-1"]);
    }

    #[test]
    fn test_scenario_priority_in_order_by_updated() {
        let mut issues = Vec::new();
        for (key, priority, d) in [
            ("A-1", "High", 2),
            ("A-2", "Low", 9),
            ("A-3", "Highest", 7),
            ("A-4", "High", 4),
        ] {
            let mut i = issue(key, "Open");
            i.fields.insert(
                "priority".to_string(),
                FieldValue::String(priority.to_string()),
            );
            i.updated = day(d);
            issues.push(i);
        }
        let results =
            run(r#"priority IN ("High", "Highest") ORDER BY updated DESC"#, &issues).unwrap();
        assert_eq!(keys(&results), vec!["A-3", "A-4", "A-1"]);
    }
}

//! Field schema and the validation pass over a parsed query.
//!
//! The schema is supplied by the surrounding application (it owns the field
//! catalog); the engine only consults it. It is serde-deserializable so the
//! binary can load it from a JSON file.

use crate::ast::{CompOp, Expr, FieldRef, Query, Value};
use crate::error::{Diagnostic, DiagnosticKind, Result};
use serde::{Deserialize, Serialize};

/// The value type a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Date,
    /// A list of strings, e.g. labels.
    List,
}

impl FieldType {
    /// The operators a field of this type supports by default.
    pub fn default_operators(self) -> &'static [CompOp] {
        match self {
            FieldType::String => &[CompOp::Eq, CompOp::NotEq, CompOp::Contains, CompOp::NotContains],
            FieldType::Number | FieldType::Date => {
                &[CompOp::Eq, CompOp::NotEq, CompOp::Gt, CompOp::Lt, CompOp::Gte, CompOp::Lte]
            }
            FieldType::List => &[CompOp::Eq, CompOp::NotEq],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::List => "list",
        }
    }
}

/// A single known field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// System fields are read from fixed issue properties, custom fields
    /// from the issue's field map.
    #[serde(default, rename = "isSystem")]
    pub is_system: bool,
    /// Explicit operator set; empty means "derived from the type".
    #[serde(default)]
    pub operators: Vec<CompOp>,
    #[serde(default, rename = "caseSensitive")]
    pub case_sensitive: bool,
    #[serde(default = "default_sortable")]
    pub sortable: bool,
    /// Enumerated values, used by autocomplete (e.g. the status names).
    #[serde(default)]
    pub values: Vec<String>,
}

fn default_sortable() -> bool {
    true
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_system: false,
            operators: Vec::new(),
            case_sensitive: false,
            sortable: true,
            values: Vec::new(),
        }
    }

    pub fn system(name: impl Into<String>, field_type: FieldType) -> Self {
        Self { is_system: true, ..Self::new(name, field_type) }
    }

    pub fn supports(&self, op: CompOp) -> bool {
        if self.operators.is_empty() {
            self.field_type.default_operators().contains(&op)
        } else {
            self.operators.contains(&op)
        }
    }

    pub fn legal_operators(&self) -> &[CompOp] {
        if self.operators.is_empty() {
            self.field_type.default_operators()
        } else {
            &self.operators
        }
    }
}

/// The set of known fields, in declaration order (the order matters for
/// autocomplete tie-breaking).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Look up a field, case-insensitively.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

/// A function usable as a value: name, arity and the type it produces.
pub struct FunctionSpec {
    pub name: &'static str,
    pub arity: usize,
    pub returns: FieldType,
}

/// The functions the engine knows.
pub const FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec { name: "currentUser", arity: 0, returns: FieldType::String },
    FunctionSpec { name: "now", arity: 0, returns: FieldType::Date },
];

pub fn function(name: &str) -> Option<&'static FunctionSpec> {
    FUNCTIONS.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

/// Validate a parsed query against the schema: every field must be known,
/// every operator legal for its field's type, every function call known and
/// of the right arity, and every ORDER BY key sortable.
pub fn validate(query: &Query, schema: &Schema) -> Result<()> {
    if let Some(expr) = &query.filter {
        validate_expr(expr, schema)?;
    }
    for key in &query.order_by {
        let spec = resolve_field(&key.field, schema)?;
        if !spec.sortable {
            return Err(Diagnostic::validate(
                DiagnosticKind::UnsortableField,
                format!("field '{}' cannot be used in ORDER BY", key.field.name),
                key.field.span,
            ));
        }
    }
    Ok(())
}

fn validate_expr(expr: &Expr, schema: &Schema) -> Result<()> {
    match expr {
        Expr::Comparison { field, op, value, .. } => {
            let spec = resolve_field(field, schema)?;
            if !spec.supports(*op) {
                return Err(Diagnostic::validate(
                    DiagnosticKind::IncompatibleOperator,
                    format!(
                        "operator '{}' is not supported by {} field '{}'",
                        op.symbol(),
                        spec.field_type.name(),
                        field.name
                    ),
                    expr.span(),
                ));
            }
            validate_value(value, spec)
        }
        Expr::In { field, values, .. } => {
            let spec = resolve_field(field, schema)?;
            for value in values {
                validate_value(value, spec)?;
            }
            Ok(())
        }
        Expr::Empty { field, .. } => {
            resolve_field(field, schema)?;
            Ok(())
        }
        Expr::Logical { operands, .. } => {
            for operand in operands {
                validate_expr(operand, schema)?;
            }
            Ok(())
        }
    }
}

fn resolve_field<'s>(field: &FieldRef, schema: &'s Schema) -> Result<&'s FieldSpec> {
    schema.field(&field.name).ok_or_else(|| {
        Diagnostic::validate(
            DiagnosticKind::UnknownField,
            format!("unknown field '{}'", field.name),
            field.span,
        )
    })
}

/// Check that a literal or function value fits the field's type.
fn validate_value(value: &Value, spec: &FieldSpec) -> Result<()> {
    let value_type = match value {
        Value::String { .. } => FieldType::String,
        Value::Number { .. } => FieldType::Number,
        Value::Date { .. } => FieldType::Date,
        Value::Function { name, args, span } => {
            let func = function(name).ok_or_else(|| {
                Diagnostic::validate(
                    DiagnosticKind::BadFunctionCall,
                    format!("unknown function '{}'", name),
                    *span,
                )
            })?;
            if args.len() != func.arity {
                return Err(Diagnostic::validate(
                    DiagnosticKind::BadFunctionCall,
                    format!(
                        "function '{}' takes {} argument(s), got {}",
                        func.name,
                        func.arity,
                        args.len()
                    ),
                    *span,
                ));
            }
            func.returns
        }
    };
    let compatible = match spec.field_type {
        // List fields hold strings, so string values compare against them.
        FieldType::List | FieldType::String => value_type == FieldType::String,
        FieldType::Number => value_type == FieldType::Number,
        FieldType::Date => value_type == FieldType::Date,
    };
    if !compatible {
        return Err(Diagnostic::validate(
            DiagnosticKind::IncompatibleOperator,
            format!(
                "{} value cannot be compared against {} field '{}'",
                value_type.name(),
                spec.field_type.name(),
                spec.name
            ),
            value.span(),
        ));
    }
    Ok(())
}

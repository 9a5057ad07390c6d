//! The diagnostic type shared by every stage of the pipeline.
//!
//! Each stage returns a tagged `Diagnostic` instead of throwing, so the
//! search bar can underline `span` and show `message` no matter which
//! stage failed.

use crate::token::Span;
use thiserror::Error;

/// The pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
    Validate,
    Execute,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Lex => write!(f, "lex"),
            Stage::Parse => write!(f, "parse"),
            Stage::Validate => write!(f, "validate"),
            Stage::Execute => write!(f, "execute"),
        }
    }
}

/// What went wrong, independent of the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    // Lex
    UnexpectedChar,
    UnterminatedString,
    // Parse
    UnexpectedToken,
    MissingToken,
    TrailingInput,
    // Validate
    UnknownField,
    IncompatibleOperator,
    BadFunctionCall,
    UnsortableField,
    // Execute
    TypeCoercionFailed,
}

/// A single diagnostic: stage, kind, message and the source range to underline.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{stage} error: {message}")]
pub struct Diagnostic {
    pub stage: Stage,
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn lex(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self { stage: Stage::Lex, kind, message: message.into(), span }
    }

    pub fn parse(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self { stage: Stage::Parse, kind, message: message.into(), span }
    }

    pub fn validate(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self { stage: Stage::Validate, kind, message: message.into(), span }
    }

    pub fn execute(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self { stage: Stage::Execute, kind, message: message.into(), span }
    }
}

/// A specialized `Result` for engine operations.
pub type Result<T> = std::result::Result<T, Diagnostic>;

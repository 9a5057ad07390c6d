//! The token definition for the query language.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    And,   // "AND"
    Or,    // "OR"
    Not,   // "NOT"
    In,    // "IN"
    Is,    // "IS"
    Empty, // "EMPTY"
    Order, // "ORDER"
    By,    // "BY"
    Asc,   // "ASC"
    Desc,  // "DESC"

    // Literals
    Identifier(&'a str),
    /// The string content with escape sequences already resolved.
    String(std::string::String),
    Number(f64),
    /// A date literal, kept verbatim: "2024-03-01", "-1d", "-2w", "+3M".
    /// The executor resolves it against the injected clock.
    Date(&'a str),

    // Punctuation
    LParen, // (
    RParen, // )
    Comma,  // ,

    // Operators
    Eq,          // =
    NotEq,       // !=
    Gt,          // >
    Lt,          // <
    Gte,         // >=
    Lte,         // <=
    Contains,    // ~
    NotContains, // !~

    // Special
    Eof, // End of input
}

impl<'a> TokenKind<'a> {
    /// Whether this token is made of identifier characters, so a cursor
    /// sitting right after it is still "inside" the word being typed.
    pub fn is_wordlike(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::In
                | TokenKind::Is
                | TokenKind::Empty
                | TokenKind::Order
                | TokenKind::By
                | TokenKind::Asc
                | TokenKind::Desc
        )
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

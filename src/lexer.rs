//! 查询语言的词法分析器

use crate::error::{Diagnostic, DiagnosticKind, Result};
use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

/// 容错扫描的结果，供自动补全使用
#[derive(Debug)]
pub struct PrefixScan<'a> {
    pub tokens: Vec<Token<'a>>,
    /// 光标落在一个未闭合的字符串字面量内部时，记录其起始偏移和已输入的内容
    pub open_string: Option<(usize, String)>,
}

/// 对完整输入进行分词，返回的 token 流以 Eof 结尾
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(input.len(), input.len()),
    });
    Ok(tokens)
}

/// 容错分词：未闭合字符串被单独记录，非法字符被跳过。
/// 自动补全在每次按键时调用，因此绝不返回错误。
pub fn scan_prefix(input: &str) -> PrefixScan<'_> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    let mut open_string = None;
    loop {
        match lexer.next_token() {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => break,
            Err(diag) => match diag.kind {
                DiagnosticKind::UnterminatedString => {
                    let content = lexer.unterminated_content(diag.span.start);
                    open_string = Some((diag.span.start, content));
                    break;
                }
                // 非法字符已被消费，跳过继续扫描
                _ => {}
            },
        }
    }
    PrefixScan { tokens, open_string }
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取下一个 token；输入结束返回 None
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '=' => self.single(start, TokenKind::Eq),
            '~' => self.single(start, TokenKind::Contains),
            '(' => self.single(start, TokenKind::LParen),
            ')' => self.single(start, TokenKind::RParen),
            ',' => self.single(start, TokenKind::Comma),
            '<' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::Lte, span: Span::new(start, self.position) }
                } else {
                    Token { kind: TokenKind::Lt, span: Span::new(start, self.position) }
                }
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::Gte, span: Span::new(start, self.position) }
                } else {
                    Token { kind: TokenKind::Gt, span: Span::new(start, self.position) }
                }
            }
            '!' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        Token { kind: TokenKind::NotEq, span: Span::new(start, self.position) }
                    }
                    Some('~') => {
                        self.bump();
                        Token { kind: TokenKind::NotContains, span: Span::new(start, self.position) }
                    }
                    _ => {
                        return Err(Diagnostic::lex(
                            DiagnosticKind::UnexpectedChar,
                            "unexpected character '!'",
                            Span::new(start, self.position),
                        ));
                    }
                }
            }
            '"' | '\'' => {
                self.bump();
                self.read_string(c, start)?
            }
            '-' | '+' => {
                // 符号后跟数字才可能是相对日期（-1d）或带符号数字
                if self.peek_next().map(|n| n.is_ascii_digit()).unwrap_or(false) {
                    self.bump();
                    self.read_signed_number_or_relative_date(start)
                } else {
                    self.bump();
                    return Err(Diagnostic::lex(
                        DiagnosticKind::UnexpectedChar,
                        format!("unexpected character '{}'", c),
                        Span::new(start, self.position),
                    ));
                }
            }
            c if c.is_ascii_digit() => self.read_number_or_date(start),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(start),
            _ => {
                self.bump();
                return Err(Diagnostic::lex(
                    DiagnosticKind::UnexpectedChar,
                    format!("unexpected character '{}'", c),
                    Span::new(start, self.position),
                ));
            }
        };
        Ok(Some(token))
    }

    fn single(&mut self, start: usize, kind: TokenKind<'a>) -> Token<'a> {
        self.bump();
        Token { kind, span: Span::new(start, self.position) }
    }

    /// 读取引号包围的字符串字面量，处理 \"、\'、\\ 转义
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, quote: char, start: usize) -> Result<Token<'a>> {
        let mut content = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(Diagnostic::lex(
                        DiagnosticKind::UnterminatedString,
                        "unterminated string literal",
                        Span::new(start, self.input.len()),
                    ));
                }
                Some(c) if c == quote => {
                    self.bump(); // 消费结束引号
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some(e @ ('"' | '\'' | '\\')) => {
                            self.bump();
                            content.push(e);
                        }
                        Some(other) => {
                            // 未知转义原样保留
                            self.bump();
                            content.push('\\');
                            content.push(other);
                        }
                        None => {
                            return Err(Diagnostic::lex(
                                DiagnosticKind::UnterminatedString,
                                "unterminated string literal",
                                Span::new(start, self.input.len()),
                            ));
                        }
                    }
                }
                Some(c) => {
                    self.bump();
                    content.push(c);
                }
            }
        }
        Ok(Token {
            kind: TokenKind::String(content),
            span: Span::new(start, self.position),
        })
    }

    /// 未闭合字符串的已输入内容（转义已解析），供容错扫描使用
    fn unterminated_content(&self, start: usize) -> String {
        let rest = &self.input[start..];
        let mut chars = rest.chars();
        chars.next(); // 跳过开引号
        let mut content = String::new();
        let mut escaped = false;
        for c in chars {
            if escaped {
                content.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else {
                content.push(c);
            }
        }
        content
    }

    /// 读取数字或绝对日期字面量（YYYY-MM-DD）。
    /// 专用字符类扫描保证偏移精确，不借助正则。
    fn read_number_or_date(&mut self, start: usize) -> Token<'a> {
        self.consume_digits();
        // 数字后紧跟 "-数字" 则按日期处理，继续吞掉所有 "-数字" 段
        let mut is_date = false;
        while self.peek() == Some('-')
            && self.peek_next().map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            is_date = true;
            self.bump(); // '-'
            self.consume_digits();
        }
        let text = &self.input[start..self.position];
        if is_date {
            Token { kind: TokenKind::Date(text), span: Span::new(start, self.position) }
        } else {
            self.finish_number(start)
        }
    }

    /// 符号已消费。数字后跟单位字母（d/w/M）则是相对日期，否则是带符号数字
    fn read_signed_number_or_relative_date(&mut self, start: usize) -> Token<'a> {
        self.consume_digits();
        if let Some(unit @ ('d' | 'w' | 'M')) = self.peek() {
            // 单位后不能再接标识符字符，否则按普通标识符处理会更混乱，
            // 这里直接把整段当作相对日期，由执行器报告格式错误
            let _ = unit;
            self.bump();
            let text = &self.input[start..self.position];
            return Token { kind: TokenKind::Date(text), span: Span::new(start, self.position) };
        }
        self.finish_number(start)
    }

    /// 小数部分处理与最终数值解析
    fn finish_number(&mut self, start: usize) -> Token<'a> {
        if self.peek() == Some('.')
            && self.peek_next().map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            self.bump(); // '.'
            self.consume_digits();
        }
        let text = &self.input[start..self.position];
        let value = text.parse::<f64>().unwrap_or(0.0); // 字符类扫描保证可解析
        Token { kind: TokenKind::Number(value), span: Span::new(start, self.position) }
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取标识符或关键字，标识符可以包含字母、数字和下划线
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        let kind = match_keyword(literal);
        Token { kind, span: Span::new(start, self.position) }
    }
}

fn match_keyword(s: &str) -> TokenKind<'_> {
    match s.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "is" => TokenKind::Is,
        "empty" => TokenKind::Empty,
        "order" => TokenKind::Order,
        "by" => TokenKind::By,
        "asc" => TokenKind::Asc,
        "desc" => TokenKind::Desc,
        _ => TokenKind::Identifier(s),
    }
}

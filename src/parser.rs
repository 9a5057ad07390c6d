//! 查询语言的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   ├─ [可选] parse_or_expression()        ← 过滤表达式
//!   │    ├─ parse_and_expression()
//!   │    │    ├─ parse_not_expression()
//!   │    │    │    └─ parse_primary()
//!   │    │    │         ├─ "(" → 分组表达式 (递归调用parse_or_expression)
//!   │    │    │         └─ 字段名 ──┬─ 比较运算符 + 值
//!   │    │    │                     ├─ [NOT] IN (值列表)
//!   │    │    │                     └─ IS [NOT] EMPTY
//!   │    │    │
//!   │    │    └─ 遇到AND时，继续解析右侧NOT表达式
//!   │    │
//!   │    └─ 遇到OR时，继续解析右侧AND表达式
//!   │
//!   ├─ [可选] parse_order_by()             ← ORDER BY 排序键列表
//!   │    └─ 字段名 [ASC|DESC] ("," 字段名 [ASC|DESC])*
//!   │
//!   └─ 期望 Eof，否则报 TrailingInput
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **NOT操作** `NOT expression`
//! 3. **比较操作** `field = value`, `field IN (...)`, `field IS EMPTY`
//! 4. **AND操作** `expr1 AND expr2`
//! 5. **OR操作** `expr1 OR expr2`
//!
//! ## 值类型
//! - **字符串**: `"quoted string"` 或 `'quoted string'`
//! - **数字**: `123`, `2.5`
//! - **日期**: `2024-03-01`, 相对形式 `-1d`, `-2w`, `-1M`
//! - **函数调用**: `currentUser()`, `now()`
//!
//! ## 解析示例
//!
//! ```text
//! // 简单过滤
//! status = "Open"
//!
//! // 复杂条件
//! priority IN ("High", "Highest") AND (assignee = currentUser() OR assignee IS EMPTY)
//!
//! // 带排序
//! created > -2w ORDER BY updated DESC, key ASC
//! ```
//!
//! 解析器状态是显式的游标（token 切片 + 位置），不依赖任何模块级
//! 可变状态，多个解析可以并发进行互不干扰。遇到第一个结构错误即
//! 停止并返回单个诊断，不做多错误恢复。

use crate::ast::{CompOp, Expr, FieldRef, LogicalKind, OrderBy, Query, SortDirection, Value};
use crate::error::{Diagnostic, DiagnosticKind, Result};
use crate::token::{Span, Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
}

impl<'a> Parser<'a> {
    /// token 流必须以 Eof 结尾（`lexer::tokenize` 保证这一点）
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self { tokens, position: 0 }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> &Token<'a> {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .expect("token stream always ends with Eof")
    }

    /// 返回当前 token 并推进位置（停在 Eof 上不再前进）
    fn advance(&mut self) -> &Token<'a> {
        let token = &self.tokens[self.position.min(self.tokens.len() - 1)];
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, expected: TokenKind) -> Result<&Token<'a>> {
        if self.match_token(&expected) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            let kind = if token.kind == TokenKind::Eof {
                DiagnosticKind::MissingToken
            } else {
                DiagnosticKind::UnexpectedToken
            };
            Err(Diagnostic::parse(
                kind,
                format!("expected {}, found {}", token_name(&expected), token_name(&token.kind)),
                token.span,
            ))
        }
    }

    /// 检查当前 token 是否为比较运算符
    fn comparison_operator(&self) -> Option<CompOp> {
        match self.peek().kind {
            TokenKind::Eq => Some(CompOp::Eq),
            TokenKind::NotEq => Some(CompOp::NotEq),
            TokenKind::Gt => Some(CompOp::Gt),
            TokenKind::Lt => Some(CompOp::Lt),
            TokenKind::Gte => Some(CompOp::Gte),
            TokenKind::Lte => Some(CompOp::Lte),
            TokenKind::Contains => Some(CompOp::Contains),
            TokenKind::NotContains => Some(CompOp::NotContains),
            _ => None,
        }
    }

    pub fn parse(&mut self) -> Result<Query> {
        let filter = if self.match_token(&TokenKind::Eof) || self.match_token(&TokenKind::Order) {
            None
        } else {
            Some(self.parse_or_expression()?)
        };

        let order_by = if self.match_token(&TokenKind::Order) {
            self.parse_order_by()?
        } else {
            Vec::new()
        };

        let token = self.peek();
        if token.kind != TokenKind::Eof {
            return Err(Diagnostic::parse(
                DiagnosticKind::TrailingInput,
                format!("unexpected trailing input starting at {}", token_name(&token.kind)),
                token.span,
            ));
        }

        // 根节点区间覆盖整个输入（Eof 的偏移即输入长度）
        Ok(Query {
            filter,
            order_by,
            span: Span::new(0, token.span.end),
        })
    }

    /// 解析OR表达式 (最低优先级)
    ///
    /// 语法: `and_expr (OR and_expr)*`
    fn parse_or_expression(&mut self) -> Result<Expr> {
        let first = self.parse_and_expression()?;
        let mut operands = vec![first];

        while self.match_token(&TokenKind::Or) {
            self.advance(); // 消费 OR
            operands.push(self.parse_and_expression()?);
        }

        Ok(combine(LogicalKind::Or, operands))
    }

    /// 解析AND表达式 (中等优先级)
    ///
    /// 语法: `not_expr (AND not_expr)*`
    fn parse_and_expression(&mut self) -> Result<Expr> {
        let first = self.parse_not_expression()?;
        let mut operands = vec![first];

        while self.match_token(&TokenKind::And) {
            self.advance(); // 消费 AND
            operands.push(self.parse_not_expression()?);
        }

        Ok(combine(LogicalKind::And, operands))
    }

    /// 解析NOT表达式 (较高优先级)
    ///
    /// 语法: `NOT* primary`，允许 NOT 链式嵌套
    fn parse_not_expression(&mut self) -> Result<Expr> {
        if self.match_token(&TokenKind::Not) {
            let not_span = self.advance().span;
            let inner = self.parse_not_expression()?;
            let span = not_span.cover(inner.span());
            Ok(Expr::Logical { kind: LogicalKind::Not, operands: vec![inner], span })
        } else {
            self.parse_primary()
        }
    }

    /// 解析基础子句 (最高优先级)
    ///
    /// 支持的形式:
    /// - `(expression)` - 分组表达式
    /// - `field op value` - 比较
    /// - `field [NOT] IN (value, ...)` - 列表包含
    /// - `field IS [NOT] EMPTY` - 空值检查
    fn parse_primary(&mut self) -> Result<Expr> {
        if self.match_token(&TokenKind::LParen) {
            self.advance(); // 消费 (
            let expr = self.parse_or_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(expr);
        }

        let field = self.parse_field()?;

        if let Some(op) = self.comparison_operator() {
            self.advance(); // 消费运算符
            let value = self.parse_value()?;
            let span = field.span.cover(value.span());
            return Ok(Expr::Comparison { field, op, value, span });
        }

        if self.match_token(&TokenKind::In) {
            self.advance(); // 消费 IN
            return self.parse_in_list(field, false);
        }
        if self.match_token(&TokenKind::Not) {
            self.advance(); // 消费 NOT
            self.expect(TokenKind::In)?;
            return self.parse_in_list(field, true);
        }
        if self.match_token(&TokenKind::Is) {
            self.advance(); // 消费 IS
            let negated = if self.match_token(&TokenKind::Not) {
                self.advance();
                true
            } else {
                false
            };
            let end = self.expect(TokenKind::Empty)?.span;
            let span = field.span.cover(end);
            return Ok(Expr::Empty { field, negated, span });
        }

        let token = self.peek();
        let kind = if token.kind == TokenKind::Eof {
            DiagnosticKind::MissingToken
        } else {
            DiagnosticKind::UnexpectedToken
        };
        Err(Diagnostic::parse(
            kind,
            format!(
                "expected an operator after field '{}', found {}",
                field.name,
                token_name(&token.kind)
            ),
            token.span,
        ))
    }

    fn parse_field(&mut self) -> Result<FieldRef> {
        let token = self.peek();
        if let TokenKind::Identifier(name) = token.kind {
            let span = token.span;
            self.advance();
            Ok(FieldRef { name: name.to_string(), span })
        } else {
            Err(Diagnostic::parse(
                DiagnosticKind::UnexpectedToken,
                format!("expected a field name, found {}", token_name(&token.kind)),
                token.span,
            ))
        }
    }

    /// 解析 IN 值列表：`(value ("," value)*)`，至少一个值
    fn parse_in_list(&mut self, field: FieldRef, negated: bool) -> Result<Expr> {
        self.expect(TokenKind::LParen)?;
        let mut values = vec![self.parse_value()?];
        while self.match_token(&TokenKind::Comma) {
            self.advance(); // 消费逗号
            values.push(self.parse_value()?);
        }
        let end = self.expect(TokenKind::RParen)?.span;
        let span = field.span.cover(end);
        Ok(Expr::In { field, negated, values, span })
    }

    /// 解析值：字符串、数字、日期或函数调用。
    /// 不带引号的裸词只允许作为函数名出现。
    fn parse_value(&mut self) -> Result<Value> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::String(value) => {
                self.advance();
                Ok(Value::String { value, span: token.span })
            }
            TokenKind::Number(value) => {
                self.advance();
                Ok(Value::Number { value, span: token.span })
            }
            TokenKind::Date(raw) => {
                self.advance();
                Ok(Value::Date { raw: raw.to_string(), span: token.span })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.parse_function_call(name, token.span)
            }
            _ => Err(Diagnostic::parse(
                DiagnosticKind::UnexpectedToken,
                format!("expected a value, found {}", token_name(&token.kind)),
                token.span,
            )),
        }
    }

    /// 函数名已消费；解析 `(args...)`
    fn parse_function_call(&mut self, name: &str, name_span: Span) -> Result<Value> {
        if !self.match_token(&TokenKind::LParen) {
            let token = self.peek();
            return Err(Diagnostic::parse(
                DiagnosticKind::UnexpectedToken,
                format!(
                    "bare word '{}' is not a value; quote it or call a function, found {}",
                    name,
                    token_name(&token.kind)
                ),
                name_span,
            ));
        }
        self.advance(); // 消费 (

        let mut args = Vec::new();
        if !self.match_token(&TokenKind::RParen) {
            args.push(self.parse_value()?);
            while self.match_token(&TokenKind::Comma) {
                self.advance();
                args.push(self.parse_value()?);
            }
        }
        let end = self.expect(TokenKind::RParen)?.span;
        Ok(Value::Function {
            name: name.to_string(),
            args,
            span: name_span.cover(end),
        })
    }

    /// 解析排序键列表：`ORDER BY field [ASC|DESC] ("," field [ASC|DESC])*`
    fn parse_order_by(&mut self) -> Result<Vec<OrderBy>> {
        self.expect(TokenKind::Order)?;
        self.expect(TokenKind::By)?;

        let mut keys = Vec::new();
        loop {
            let field = self.parse_field()?;
            let (direction, end) = if self.match_token(&TokenKind::Asc) {
                (SortDirection::Asc, self.advance().span)
            } else if self.match_token(&TokenKind::Desc) {
                (SortDirection::Desc, self.advance().span)
            } else {
                (SortDirection::Asc, field.span)
            };
            let span = field.span.cover(end);
            keys.push(OrderBy { field, direction, span });

            if self.match_token(&TokenKind::Comma) {
                self.advance(); // 消费逗号
            } else {
                break;
            }
        }
        Ok(keys)
    }
}

/// 单操作数直接返回自身，多操作数合并为一个 n 元逻辑节点
fn combine(kind: LogicalKind, mut operands: Vec<Expr>) -> Expr {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        let span = operands
            .first()
            .map(|f| f.span())
            .unwrap_or_default()
            .cover(operands.last().map(|l| l.span()).unwrap_or_default());
        Expr::Logical { kind, operands, span }
    }
}

/// 诊断信息里的 token 描述
fn token_name(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Identifier(name) => format!("'{}'", name),
        TokenKind::String(_) => "a string".to_string(),
        TokenKind::Number(_) => "a number".to_string(),
        TokenKind::Date(_) => "a date".to_string(),
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::And => "'AND'".to_string(),
        TokenKind::Or => "'OR'".to_string(),
        TokenKind::Not => "'NOT'".to_string(),
        TokenKind::In => "'IN'".to_string(),
        TokenKind::Is => "'IS'".to_string(),
        TokenKind::Empty => "'EMPTY'".to_string(),
        TokenKind::Order => "'ORDER'".to_string(),
        TokenKind::By => "'BY'".to_string(),
        TokenKind::Asc => "'ASC'".to_string(),
        TokenKind::Desc => "'DESC'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Eq => "'='".to_string(),
        TokenKind::NotEq => "'!='".to_string(),
        TokenKind::Gt => "'>'".to_string(),
        TokenKind::Lt => "'<'".to_string(),
        TokenKind::Gte => "'>='".to_string(),
        TokenKind::Lte => "'<='".to_string(),
        TokenKind::Contains => "'~'".to_string(),
        TokenKind::NotContains => "'!~'".to_string(),
    }
}

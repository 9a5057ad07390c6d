//! 查询语言的抽象语法树
//!
//! 所有节点都是封闭的带标签变体并携带源区间，执行器、校验器和
//! 打印器各自对节点集合做穷举匹配（而不是在节点上挂虚方法）。
//! AST 构造完成后不可变。

use crate::token::Span;

/// AST 的根节点, 代表一个完整的查询语句
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 布尔过滤表达式；空查询匹配所有记录
    pub filter: Option<Expr>,
    /// ORDER BY 排序键列表，挂在根节点上而不是嵌进布尔逻辑里
    pub order_by: Vec<OrderBy>,
    /// 覆盖整个输入的区间
    pub span: Span,
}

/// 字段引用。字段名按大小写不敏感匹配，但原样保留用于显示
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    pub name: String,
    pub span: Span,
}

/// 过滤表达式树
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 基础比较, 例如 `status = "Open"`
    Comparison {
        field: FieldRef,
        op: CompOp,
        value: Value,
        span: Span,
    },
    /// 列表包含检查, 例如 `priority IN ("High", "Highest")`
    In {
        field: FieldRef,
        negated: bool,
        values: Vec<Value>,
        span: Span,
    },
    /// 空值检查, 例如 `labels IS EMPTY`
    Empty {
        field: FieldRef,
        negated: bool,
        span: Span,
    },
    /// 逻辑运算；AND/OR 为 n 元，NOT 恰有一个操作数
    Logical {
        kind: LogicalKind,
        operands: Vec<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalKind {
    And,
    Or,
    Not,
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CompOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "~")]
    Contains,
    #[serde(rename = "!~")]
    NotContains,
}

impl CompOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompOp::Eq => "=",
            CompOp::NotEq => "!=",
            CompOp::Gt => ">",
            CompOp::Lt => "<",
            CompOp::Gte => ">=",
            CompOp::Lte => "<=",
            CompOp::Contains => "~",
            CompOp::NotContains => "!~",
        }
    }

    /// 大小关系运算符，只对数字和日期字段合法
    pub fn is_ordering(&self) -> bool {
        matches!(self, CompOp::Gt | CompOp::Lt | CompOp::Gte | CompOp::Lte)
    }

    /// 文本包含运算符，只对字符串字段合法
    pub fn is_text_match(&self) -> bool {
        matches!(self, CompOp::Contains | CompOp::NotContains)
    }
}

/// 字面量值；函数调用只能作为值出现，不能作为顶层子句
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String { value: String, span: Span },
    Number { value: f64, span: Span },
    /// 日期字面量原文："2024-03-01" 或相对形式 "-1d"
    Date { raw: String, span: Span },
    Function { name: String, args: Vec<Value>, span: Span },
}

impl Value {
    pub fn span(&self) -> Span {
        match self {
            Value::String { span, .. }
            | Value::Number { span, .. }
            | Value::Date { span, .. }
            | Value::Function { span, .. } => *span,
        }
    }
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Comparison { span, .. }
            | Expr::In { span, .. }
            | Expr::Empty { span, .. }
            | Expr::Logical { span, .. } => *span,
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// 单个排序键
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: FieldRef,
    pub direction: SortDirection,
    pub span: Span,
}

/// 把 AST 打印成规范化的查询文本。
/// 打印结果重新解析后与原树结构相同（用于回显和往返测试）。
pub fn describe(query: &Query) -> String {
    let mut out = String::new();
    if let Some(expr) = &query.filter {
        write_expr(&mut out, expr);
    }
    if !query.order_by.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str("ORDER BY ");
        for (i, key) in query.order_by.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&key.field.name);
            match key.direction {
                SortDirection::Asc => out.push_str(" ASC"),
                SortDirection::Desc => out.push_str(" DESC"),
            }
        }
    }
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Comparison { field, op, value, .. } => {
            out.push_str(&field.name);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_value(out, value);
        }
        Expr::In { field, negated, values, .. } => {
            out.push_str(&field.name);
            if *negated {
                out.push_str(" NOT");
            }
            out.push_str(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, value);
            }
            out.push(')');
        }
        Expr::Empty { field, negated, .. } => {
            out.push_str(&field.name);
            if *negated {
                out.push_str(" IS NOT EMPTY");
            } else {
                out.push_str(" IS EMPTY");
            }
        }
        Expr::Logical { kind, operands, .. } => match kind {
            LogicalKind::Not => {
                out.push_str("NOT ");
                if let Some(inner) = operands.first() {
                    write_operand(out, inner, LogicalKind::Not);
                }
            }
            LogicalKind::And | LogicalKind::Or => {
                let joiner = if *kind == LogicalKind::And { " AND " } else { " OR " };
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        out.push_str(joiner);
                    }
                    write_operand(out, operand, *kind);
                }
            }
        },
    }
}

/// 子表达式在需要时加括号，保证打印结果重新解析出同一棵树
fn write_operand(out: &mut String, operand: &Expr, parent: LogicalKind) {
    let needs_parens = match operand {
        Expr::Logical { kind, .. } => match parent {
            // NOT 绑定最紧，任何逻辑子式都要括起来
            LogicalKind::Not => true,
            // AND 下的 AND/OR 只能来自括号
            LogicalKind::And => matches!(kind, LogicalKind::And | LogicalKind::Or),
            // OR 下的 OR 只能来自括号
            LogicalKind::Or => *kind == LogicalKind::Or,
        },
        _ => false,
    };
    if needs_parens {
        out.push('(');
        write_expr(out, operand);
        out.push(')');
    } else {
        write_expr(out, operand);
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::String { value, .. } => {
            out.push('"');
            for c in value.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    other => out.push(other),
                }
            }
            out.push('"');
        }
        Value::Number { value, .. } => {
            out.push_str(&value.to_string());
        }
        Value::Date { raw, .. } => {
            out.push_str(raw);
        }
        Value::Function { name, args, .. } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, arg);
            }
            out.push(')');
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&describe(self))
    }
}

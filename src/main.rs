//! 交互式查询REPL：加载schema和issue数据集，逐行解析并执行查询，
//! Tab补全由引擎的suggest提供。

use anyhow::Result;
use chrono::Utc;
use jql_engine::{
    config, describe, get_suggestions, parse_and_execute, parse_query, Diagnostic, EvalContext,
    Issue, Schema,
};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Editor, Helper};

/// rustyline补全适配器，把引擎的suggest接到Tab键上
struct JqlHelper {
    schema: Schema,
}

impl Completer for JqlHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let suggestions = get_suggestions(line, pos, &self.schema);
        // 光标落在单词里时从单词开头替换，否则从光标处插入
        let word_start = line[..pos]
            .rfind(|c: char| !(c.is_alphanumeric() || c == '_'))
            .map(|i| i + 1)
            .unwrap_or(0);
        // 值补全自带引号，未闭合的开引号一并替换
        let start = match line[..word_start].chars().last() {
            Some('"') | Some('\'') => word_start - 1,
            _ => word_start,
        };
        let pairs = suggestions
            .into_iter()
            .map(|s| Pair {
                display: match &s.detail {
                    Some(detail) => format!("{} ({})", s.text, detail),
                    None => s.text.clone(),
                },
                replacement: s.insert_text,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for JqlHelper {
    type Hint = String;
}

impl Highlighter for JqlHelper {}
impl Validator for JqlHelper {}
impl Helper for JqlHelper {}

/// 加载schema，优先使用JSON文件，失败时使用内置默认schema
fn load_schema_with_fallback(path: &str) -> Schema {
    match config::load_schema(path) {
        Ok(schema) => {
            println!("✅ 成功从 {} 加载 {} 个字段定义", path, schema.fields().len());
            schema
        }
        Err(e) => {
            println!("⚠️ 无法加载schema文件 ({}), 使用内置默认schema", e);
            config::default_schema()
        }
    }
}

/// 加载issue数据集，失败时使用内置示例数据
fn load_issues_with_fallback(path: &str) -> Vec<Issue> {
    match config::load_issues(path) {
        Ok(issues) => {
            println!("✅ 成功从 {} 加载 {} 条issue", path, issues.len());
            issues
        }
        Err(e) => {
            println!("⚠️ 无法加载issue文件 ({}), 使用内置示例数据", e);
            sample_issues()
        }
    }
}

/// 内置示例数据集
fn sample_issues() -> Vec<Issue> {
    let raw = r#"[
        {"key": "PROJ-1", "type": "Bug", "status": "Open", "assignee": "alice",
         "created": "2024-03-01T09:00:00Z", "updated": "2024-03-04T17:30:00Z",
         "fields": {"priority": "High", "summary": "Login crashes on empty password",
                    "storyPoints": 3, "labels": ["auth", "crash"]}},
        {"key": "PROJ-2", "type": "Task", "status": "In Progress", "assignee": "bob",
         "created": "2024-02-20T10:00:00Z", "updated": "2024-03-10T08:15:00Z",
         "fields": {"priority": "Medium", "summary": "Update onboarding docs",
                    "storyPoints": 2, "labels": []}},
        {"key": "PROJ-3", "type": "Bug", "status": "Done",
         "created": "2024-01-05T14:00:00Z", "updated": "2024-02-28T11:45:00Z",
         "fields": {"priority": "Highest", "summary": "Data loss when exporting",
                    "storyPoints": 8, "labels": ["export"]}}
    ]"#;
    serde_json::from_str(raw).expect("builtin sample dataset is valid")
}

/// 打印诊断：在出错的子串下画下划线
fn print_diagnostic(input: &str, diag: &Diagnostic) {
    println!("✗ 查询失败 [{}]: {}", diag.stage, diag.message);
    println!("  {}", input);
    let columns = input[..diag.span.start.min(input.len())].chars().count();
    let width = input[diag.span.start.min(input.len())..diag.span.end.min(input.len())]
        .chars()
        .count()
        .max(1);
    println!("  {}{}", " ".repeat(columns), "^".repeat(width));
}

fn run_query(input: &str, issues: &[Issue], schema: &Schema, ctx: &EvalContext) {
    match parse_and_execute(input, issues, schema, ctx) {
        Ok(results) => {
            println!("✓ 匹配 {} / {} 条issue", results.len(), issues.len());
            for issue in &results {
                let assignee = issue.assignee.as_deref().unwrap_or("-");
                println!(
                    "  {:<10} {:<12} {:<10} {}",
                    issue.key, issue.status, assignee, issue.updated.format("%Y-%m-%d")
                );
            }
        }
        Err(diag) => print_diagnostic(input, &diag),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("--- JQL查询引擎 交互式REPL ---");

    let args: Vec<String> = std::env::args().collect();
    let schema_path = args.get(1).map(String::as_str).unwrap_or("schema.json");
    let issues_path = args.get(2).map(String::as_str).unwrap_or("issues.json");

    let schema = load_schema_with_fallback(schema_path);
    let issues = load_issues_with_fallback(issues_path);

    let current_user = std::env::var("JQL_USER")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "admin".to_string());
    let ctx = EvalContext { now: Utc::now(), current_user };
    println!("当前用户: {} (currentUser() 将解析为此值)", ctx.current_user);
    println!("输入查询并回车执行；Tab补全；:describe <查询> 查看规范形式；:quit 退出\n");

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut rl: Editor<JqlHelper, DefaultHistory> = Editor::with_config(rl_config)?;
    rl.set_helper(Some(JqlHelper { schema: schema.clone() }));

    loop {
        match rl.readline("jql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if line == ":quit" || line == ":exit" {
                    break;
                }
                if let Some(rest) = line.strip_prefix(":describe ") {
                    match parse_query(rest, Some(&schema)) {
                        Ok(query) => println!("{}", describe(&query)),
                        Err(diag) => print_diagnostic(rest, &diag),
                    }
                    continue;
                }

                run_query(line, &issues, &schema, &ctx);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    println!("再见!");
    Ok(())
}

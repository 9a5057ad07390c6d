use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use jql_engine::executor::{execute, EvalContext, FieldValue, Issue};
use jql_engine::lexer::tokenize;
use jql_engine::parser::Parser;
use jql_engine::schema::validate;
use jql_engine::{config, get_suggestions, parse_and_execute};
use std::collections::HashMap;
use std::hint::black_box;

// 构造基准测试用的issue数据集
fn build_issues(count: usize) -> Vec<Issue> {
    let statuses = ["Open", "In Progress", "In Review", "Done"];
    let priorities = ["Highest", "High", "Medium", "Low"];
    let users = ["alice", "bob", "carol"];
    (0..count)
        .map(|i| {
            let mut fields = HashMap::new();
            fields.insert(
                "priority".to_string(),
                FieldValue::String(priorities[i % priorities.len()].to_string()),
            );
            fields.insert("storyPoints".to_string(), FieldValue::Number((i % 13) as f64));
            fields.insert(
                "labels".to_string(),
                FieldValue::List(if i % 5 == 0 {
                    vec![]
                } else {
                    vec![format!("team-{}", i % 7)]
                }),
            );
            Issue {
                key: format!("PROJ-{}", i + 1),
                issue_type: "Task".to_string(),
                status: statuses[i % statuses.len()].to_string(),
                assignee: if i % 4 == 0 {
                    None
                } else {
                    Some(users[i % users.len()].to_string())
                },
                created: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
                updated: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours((i * 3) as i64),
                fields,
            }
        })
        .collect()
}

fn eval_context() -> EvalContext {
    EvalContext {
        now: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
        current_user: "alice".to_string(),
    }
}

const TEST_CASES: &[(&str, &str)] = &[
    ("simple", r#"status = "Open""#),
    (
        "medium",
        r#"status = "Open" AND priority IN ("High", "Highest") AND assignee = currentUser()"#,
    ),
    (
        "complex",
        r#"(status = "Open" OR status = "In Progress") AND storyPoints >= 3 AND labels IS NOT EMPTY AND updated > -2w ORDER BY updated DESC, key ASC"#,
    ),
];

// 基准测试：词法分析性能
fn benchmark_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_performance");

    for &(name, query) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("tokenize", name), &query, |b, &query| {
            b.iter(|| {
                let tokens = tokenize(black_box(query)).expect("词法分析应该成功");
                black_box(tokens)
            })
        });
    }

    group.finish();
}

// 基准测试：语法分析性能
fn benchmark_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_performance");

    for &(name, query) in TEST_CASES {
        // 预先词法分析
        let tokens = tokenize(query).expect("词法分析应该成功");

        group.bench_with_input(BenchmarkId::new("parse", name), &tokens, |b, tokens| {
            b.iter(|| {
                let mut parser = Parser::new(black_box(tokens));
                match parser.parse() {
                    Ok(query) => black_box(query),
                    Err(_) => panic!("解析失败"),
                }
            })
        });
    }

    group.finish();
}

// 基准测试：执行性能（1000条issue）
fn benchmark_executor(c: &mut Criterion) {
    let schema = config::default_schema();
    let issues = build_issues(1000);
    let ctx = eval_context();

    let mut group = c.benchmark_group("executor_performance");

    for &(name, query_str) in TEST_CASES {
        // 预处理：词法分析、语法分析和校验
        let tokens = tokenize(query_str).expect("词法分析应该成功");
        let query = Parser::new(&tokens).parse().expect("解析应该成功");
        validate(&query, &schema).expect("校验应该成功");

        group.bench_with_input(BenchmarkId::new("execute", name), &query, |b, query| {
            b.iter(|| {
                let results = execute(black_box(query), &issues, &schema, &ctx)
                    .expect("执行应该成功");
                black_box(results)
            })
        });
    }

    group.finish();
}

// 基准测试：自动补全性能（每次按键都会调用）
fn benchmark_suggest(c: &mut Criterion) {
    let schema = config::default_schema();
    let inputs = [
        ("field_prefix", "statu"),
        ("operator_position", "storyPoints "),
        ("value_position", r#"status = "#),
        ("keyword_position", r#"status = "Open" "#),
    ];

    let mut group = c.benchmark_group("suggest_performance");

    for (name, input) in inputs {
        group.bench_with_input(BenchmarkId::new("suggest", name), &input, |b, &input| {
            b.iter(|| {
                let suggestions =
                    get_suggestions(black_box(input), input.len(), &schema);
                black_box(suggestions)
            })
        });
    }

    group.finish();
}

// 基准测试：完整的端到端处理
fn benchmark_end_to_end(c: &mut Criterion) {
    let schema = config::default_schema();
    let issues = build_issues(1000);
    let ctx = eval_context();

    let mut group = c.benchmark_group("end_to_end_performance");

    for &(name, query) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("full_pipeline", name), &query, |b, &query| {
            b.iter(|| {
                let results = parse_and_execute(black_box(query), &issues, &schema, &ctx)
                    .expect("查询应该成功");
                black_box(results)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_lexer,
    benchmark_parser,
    benchmark_executor,
    benchmark_suggest,
    benchmark_end_to_end
);
criterion_main!(benches);

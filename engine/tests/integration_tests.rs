//! Integration tests for the logsql engine.
//!
//! These tests run query text end to end over hand-built rows, the way the CLI drives
//! the engine after ingesting log files.

use engine::config::ComparisonConfig;
use engine::models::{Row, Value};
use engine::query::{
    parse_query, run_query, Executor, LexError, OutputRow, ParseError, Predicate, QueryError,
};

const COLUMNS: [&str; 4] = ["timestamp", "level", "service", "message"];

/// Builds a row from `(timestamp, level, service, message)`.
fn log_row(timestamp: &str, level: &str, service: &str, message: &str) -> Row {
    Row::new()
        .with_field("timestamp", timestamp)
        .with_field("level", level)
        .with_field("service", service)
        .with_field("message", message)
}

fn sample_logs() -> Vec<Row> {
    vec![
        log_row("2024-01-01 10:00:00", "info", "api", "Startup complete"),
        log_row("2024-01-01 10:00:05", "error", "db", "Database error"),
        log_row("2024-01-01 10:00:07", "warn", "db", "Slow query"),
        log_row("2024-01-01 10:00:09", "error", "api", "API timeout"),
        log_row("2024-01-01 10:00:12", "fatal", "payment", "Out of memory"),
    ]
}

/// Helper to collect one column of the result as strings.
fn column(rows: &[OutputRow], name: &str) -> Vec<String> {
    rows.iter()
        .map(|row| row.get(name).map(ToString::to_string).unwrap_or_default())
        .collect()
}

fn query_rows(text: &str, rows: Vec<Row>) -> Vec<OutputRow> {
    run_query(text, COLUMNS, rows).unwrap().collect()
}

// ============================================================================
// FILTER TESTS
// ============================================================================

#[test]
fn test_query_with_where_clause() {
    let result = run_query("SELECT * FROM logs WHERE level = 'error'", COLUMNS, sample_logs())
        .unwrap();
    assert_eq!(result.total_count(), 2);

    let rows: Vec<_> = result.collect();
    assert!(rows
        .iter()
        .all(|r| r.get("level") == Some(&Value::from("error"))));
}

#[test]
fn test_query_with_grouping_and_not() {
    let rows = query_rows(
        "SELECT message WHERE (level = 'error' OR level = 'fatal') AND NOT service = 'db'",
        sample_logs(),
    );
    assert_eq!(column(&rows, "message"), vec!["API timeout", "Out of memory"]);
}

#[test]
fn test_precedence_and_binds_tighter_than_or() {
    let rows = vec![
        Row::new().with_field("a", "1").with_field("b", "0"),
        Row::new().with_field("a", "2").with_field("b", "0"),
        Row::new().with_field("a", "2").with_field("b", "3"),
    ];
    let result = run_query("SELECT a, b WHERE a=1 OR a=2 AND b=3", ["a", "b"], rows).unwrap();
    let rows: Vec<_> = result.collect();

    assert_eq!(column(&rows, "a"), vec!["1", "2"]);
    assert_eq!(column(&rows, "b"), vec!["0", "3"]);

    let query = parse_query("SELECT * WHERE a=1 OR a=2 AND b=3").unwrap();
    assert!(matches!(
        query.where_clause,
        Some(Predicate::Combined { .. })
    ));
    assert_eq!(
        query.to_string(),
        "SELECT * WHERE a = 1 OR a = 2 AND b = 3"
    );
}

#[test]
fn test_missing_column_semantics() {
    let rows = sample_logs();

    let equal = query_rows("SELECT * WHERE host = 'x'", rows.clone());
    assert!(equal.is_empty());

    let not_equal = query_rows("SELECT * WHERE host != 'x'", rows);
    assert_eq!(not_equal.len(), 5);
}

#[test]
fn test_multiline_field_matches_joined_literal() {
    let rows = vec![
        Row::new()
            .with_field("level", "error")
            .with_lines("message", ["error: x", "  at y"]),
        Row::new()
            .with_field("level", "error")
            .with_field("message", "error: x"),
    ];

    let result = run_query(
        "SELECT level WHERE message = 'error: x\\n  at y'",
        ["level", "message"],
        rows,
    )
    .unwrap();
    assert_eq!(result.total_count(), 1);
}

#[test]
fn test_case_insensitive_execution() {
    let query = parse_query("SELECT * WHERE level = 'ERROR'").unwrap();
    let executor = Executor::new(query, COLUMNS).with_config(ComparisonConfig::case_insensitive());

    let result = executor.execute(sample_logs()).unwrap();
    assert_eq!(result.total_count(), 2);
}

// ============================================================================
// SORT AND PAGING TESTS
// ============================================================================

#[test]
fn test_stable_multi_key_sort() {
    let rows = vec![
        Row::new().with_field("a", "1").with_field("b", "2"),
        Row::new().with_field("a", "1").with_field("b", "1"),
        Row::new().with_field("a", "2").with_field("b", "0"),
    ];

    let result = run_query("SELECT a, b ORDER BY a, b DESC", ["a", "b"], rows).unwrap();
    let rows: Vec<_> = result.collect();

    assert_eq!(column(&rows, "a"), vec!["1", "1", "2"]);
    assert_eq!(column(&rows, "b"), vec!["2", "1", "0"]);
}

#[test]
fn test_sort_numbers_before_text() {
    let rows: Vec<Row> = ["123a", "9", "1a", "10", "123", "b", "9a"]
        .into_iter()
        .map(|v| Row::new().with_field("v", v))
        .collect();

    let result = run_query("SELECT v ORDER BY v", ["v"], rows).unwrap();
    let rows: Vec<_> = result.collect();
    assert_eq!(
        column(&rows, "v"),
        vec!["9", "10", "123", "123a", "1a", "9a", "b"]
    );
}

#[test]
fn test_select_all_without_known_columns() {
    let result = run_query("SELECT * WHERE level = 'error'", Vec::<String>::new(), sample_logs())
        .unwrap();
    assert_eq!(result.columns(), &COLUMNS);
    assert_eq!(result.count(), 2);
}

#[test]
fn test_sort_ties_keep_input_order() {
    let rows = query_rows("SELECT message ORDER BY service", sample_logs());
    assert_eq!(
        column(&rows, "message"),
        vec![
            "Startup complete",
            "API timeout",
            "Database error",
            "Slow query",
            "Out of memory",
        ]
    );
}

#[test]
fn test_numeric_sort() {
    let rows: Vec<Row> = ["10", "9", "100", "-1"]
        .into_iter()
        .map(|n| Row::new().with_field("n", n))
        .collect();

    let result = run_query("SELECT n ORDER BY n", ["n"], rows).unwrap();
    let rows: Vec<_> = result.collect();
    assert_eq!(column(&rows, "n"), vec!["-1", "9", "10", "100"]);
}

#[test]
fn test_paging() {
    let rows: Vec<Row> = (0..10)
        .map(|i| Row::new().with_field("i", i.to_string()))
        .collect();

    let result = run_query("SELECT i LIMIT 3 OFFSET 5", ["i"], rows).unwrap();
    assert_eq!(result.total_count(), 10);

    let rows: Vec<_> = result.collect();
    assert_eq!(column(&rows, "i"), vec!["5", "6", "7"]);
}

#[test]
fn test_full_pipeline() {
    let rows = query_rows(
        "SELECT timestamp AS ts, message FROM logs WHERE level != 'info' \
         ORDER BY timestamp DESC LIMIT 2 OFFSET 1",
        sample_logs(),
    );

    assert_eq!(column(&rows, "ts"), vec!["2024-01-01 10:00:09", "2024-01-01 10:00:07"]);
    assert_eq!(column(&rows, "message"), vec!["API timeout", "Slow query"]);
}

// ============================================================================
// PROJECTION TESTS
// ============================================================================

#[test]
fn test_wildcard_uses_schema_order() {
    let result = run_query("SELECT *", ["message", "level"], sample_logs()).unwrap();
    assert_eq!(result.columns(), &["message", "level"]);

    let rows: Vec<_> = result.collect();
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0].cells()[0].0, "message");
}

#[test]
fn test_alias_defaulting() {
    let result = run_query("SELECT level, service AS svc", COLUMNS, sample_logs()).unwrap();
    assert_eq!(result.columns(), &["level", "svc"]);
}

#[test]
fn test_json_output_shape() {
    let rows = query_rows("SELECT level, host LIMIT 1", sample_logs());
    let json = serde_json::to_value(&rows).unwrap();
    assert_eq!(json, serde_json::json!([{ "level": "info", "host": null }]));
}

// ============================================================================
// ERROR TESTS
// ============================================================================

#[test]
fn test_wildcard_exclusivity() {
    for text in ["SELECT *, col1", "SELECT col1, *"] {
        let result = run_query(text, COLUMNS, sample_logs());
        assert!(
            matches!(
                result,
                Err(QueryError::Parse(ParseError::WildcardWithColumns { .. }))
            ),
            "Expected wildcard error for {text}"
        );
    }
}

#[test]
fn test_lex_error_reports_position() {
    let err = run_query("SELECT * WHERE level = 'error' # comment", COLUMNS, sample_logs())
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::Parse(ParseError::Lex(LexError::IllegalCharacter {
            position: 31,
            character: '#',
        }))
    );
    assert!(err.to_string().contains("position 31"));
}

#[test]
fn test_parse_error_reports_expected_and_found() {
    let err = run_query("SELECT * ORDER timestamp", COLUMNS, sample_logs()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("position 15"), "{message}");
    assert!(message.contains("BY"), "{message}");
    assert!(message.contains("'timestamp'"), "{message}");
}

#[test]
fn test_render_round_trip() {
    let texts = [
        "SELECT * FROM logs WHERE level = 'error' AND service = 'api'",
        "SELECT message AS m WHERE NOT (level = 'info' OR level = 'debug') LIMIT 5",
        "SELECT * WHERE message = 'it''s' ORDER BY timestamp DESC, level OFFSET 3",
    ];

    for text in texts {
        let query = parse_query(text).unwrap();
        let again = parse_query(&query.to_string()).unwrap();
        assert_eq!(query, again, "{text}");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// Largest integer a double-backed display layer can represent exactly
/// (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Materialized rows of one executed query.
///
/// Rows are column-name to scalar-value maps; `columns` preserves the
/// catalog order the row maps cannot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
}

impl QueryResult {
    /// Build a result, narrowing every out-of-range integer for display.
    pub fn new(columns: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        let rows: Vec<Map<String, Value>> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(name, value)| (name, narrow_for_display(value)))
                    .collect()
            })
            .collect();
        let row_count = rows.len();

        Self {
            columns,
            rows,
            row_count,
        }
    }
}

/// Coerce integers wider than the display layer's safe range to f64.
///
/// The engine may return 64-bit integers that exceed 2^53 - 1; this
/// conversion is lossy by design so the presentation layer only ever
/// sees standard doubles.
pub(crate) fn narrow_for_display(value: Value) -> Value {
    let Value::Number(number) = value else {
        return value;
    };

    if let Some(v) = number.as_i64() {
        if v.unsigned_abs() > MAX_SAFE_INTEGER as u64 {
            return Number::from_f64(v as f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
        }
    } else if let Some(v) = number.as_u64() {
        if v > MAX_SAFE_INTEGER as u64 {
            return Number::from_f64(v as f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
        }
    }

    Value::Number(number)
}

/// One prompt submission: the generated SQL and the rows it produced.
///
/// The pair is created atomically by the orchestrator so a result is
/// never displayed next to a query from a different submission. It is
/// held only until a newer submission supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub prompt: String,
    pub generated_sql: String,
    pub result: QueryResult,
    pub execution_time_ms: u64,
    pub executed_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        prompt: String,
        generated_sql: String,
        result: QueryResult,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompt,
            generated_sql,
            result,
            execution_time_ms,
            executed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub credential: String,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("v".to_string(), value);
        row
    }

    #[test]
    fn test_safe_integers_pass_through_exactly() {
        let result = QueryResult::new(vec!["v".to_string()], vec![row(json!(MAX_SAFE_INTEGER))]);
        assert_eq!(result.rows[0]["v"], json!(MAX_SAFE_INTEGER));
        assert_eq!(result.row_count, 1);
    }

    #[test]
    fn test_wide_integers_are_narrowed_to_f64() {
        let wide: i64 = MAX_SAFE_INTEGER + 3;
        let result = QueryResult::new(vec!["v".to_string()], vec![row(json!(wide))]);
        let narrowed = result.rows[0]["v"].as_f64().expect("narrowed to f64");
        assert_eq!(narrowed, wide as f64);
    }

    #[test]
    fn test_negative_and_unsigned_wide_integers_are_narrowed() {
        let result = QueryResult::new(
            vec!["v".to_string()],
            vec![row(json!(i64::MIN)), row(json!(u64::MAX))],
        );
        assert!(result.rows[0]["v"].is_f64());
        assert!(result.rows[1]["v"].is_f64());
    }

    #[test]
    fn test_non_numeric_values_are_untouched() {
        assert_eq!(narrow_for_display(json!("text")), json!("text"));
        assert_eq!(narrow_for_display(Value::Null), Value::Null);
        assert_eq!(narrow_for_display(json!(1.25)), json!(1.25));
    }
}

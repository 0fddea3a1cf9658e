use serde::{Deserialize, Serialize};

use crate::models::QueryResult;

/// The interchangeable chart renderings offered over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
    Scatter,
    Pie,
}

pub const CHART_KINDS: [ChartKind; 5] = [
    ChartKind::Line,
    ChartKind::Bar,
    ChartKind::Area,
    ChartKind::Scatter,
    ChartKind::Pie,
];

/// Chart view over a query result.
///
/// The category axis is always the first column in catalog order; the
/// numeric series are every column whose displayed value is numeric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartModel {
    pub category_column: String,
    pub numeric_columns: Vec<String>,
    pub kinds: Vec<ChartKind>,
}

impl ChartModel {
    /// Build the chart view, or `None` when the result has no numeric
    /// columns (the chart is hidden entirely in that case).
    pub fn from_result(result: &QueryResult) -> Option<Self> {
        let first_row = result.rows.first()?;
        let category_column = result.columns.first()?.clone();

        let numeric_columns: Vec<String> = result
            .columns
            .iter()
            .filter(|col| first_row.get(col.as_str()).is_some_and(|v| v.is_number()))
            .cloned()
            .collect();

        if numeric_columns.is_empty() {
            return None;
        }

        Some(Self {
            category_column,
            numeric_columns,
            kinds: CHART_KINDS.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn result(columns: &[&str], values: &[Value]) -> QueryResult {
        let mut row = Map::new();
        for (col, value) in columns.iter().zip(values) {
            row.insert(col.to_string(), value.clone());
        }
        QueryResult::new(columns.iter().map(|c| c.to_string()).collect(), vec![row])
    }

    #[test]
    fn test_absent_when_no_numeric_columns() {
        let result = result(&["city", "country"], &[json!("Oslo"), json!("NO")]);
        assert!(ChartModel::from_result(&result).is_none());
    }

    #[test]
    fn test_absent_for_empty_results() {
        let result = QueryResult::new(vec!["amount".to_string()], vec![]);
        assert!(ChartModel::from_result(&result).is_none());
    }

    #[test]
    fn test_offers_exactly_five_chart_kinds() {
        let result = result(&["city", "pop"], &[json!("Oslo"), json!(700_000)]);
        let chart = ChartModel::from_result(&result).expect("chart present");
        assert_eq!(chart.kinds.len(), 5);
        assert_eq!(
            chart.kinds,
            vec![
                ChartKind::Line,
                ChartKind::Bar,
                ChartKind::Area,
                ChartKind::Scatter,
                ChartKind::Pie,
            ]
        );
    }

    #[test]
    fn test_category_is_first_column_even_when_numeric() {
        let result = result(&["id", "amount"], &[json!(1), json!(10.5)]);
        let chart = ChartModel::from_result(&result).expect("chart present");
        assert_eq!(chart.category_column, "id");
        assert_eq!(chart.numeric_columns, vec!["id", "amount"]);
    }

    #[test]
    fn test_chart_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChartKind::Scatter).unwrap(), "\"scatter\"");
    }
}

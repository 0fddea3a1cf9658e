use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::QueryResult;

/// Fixed page size of the result table.
pub const PAGE_SIZE: usize = 10;

/// One page of a query result, with enough bookkeeping for the client
/// to render navigation controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage {
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub row_count: usize,
    pub rows: Vec<Map<String, Value>>,
}

/// Total page count for `row_count` rows: ceil(row_count / PAGE_SIZE).
pub fn total_pages(row_count: usize) -> usize {
    row_count.div_ceil(PAGE_SIZE)
}

/// Clamp a requested page into `[1, total_pages]`.
///
/// An empty result has zero pages but still renders as page 1 of 1.
pub fn clamp_page(requested: usize, total_pages: usize) -> usize {
    requested.clamp(1, total_pages.max(1))
}

/// Slice the requested page out of a result, clamping the page number.
pub fn paginate(result: &QueryResult, requested: usize) -> ResultPage {
    let total = total_pages(result.row_count);
    let page = clamp_page(requested, total);
    let start = (page - 1) * PAGE_SIZE;
    let rows = result
        .rows
        .iter()
        .skip(start)
        .take(PAGE_SIZE)
        .cloned()
        .collect();

    ResultPage {
        page,
        total_pages: total,
        page_size: PAGE_SIZE,
        row_count: result.row_count,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_with_rows(n: usize) -> QueryResult {
        let rows = (0..n)
            .map(|i| {
                let mut row = Map::new();
                row.insert("id".to_string(), json!(i));
                row
            })
            .collect();
        QueryResult::new(vec!["id".to_string()], rows)
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(8), 1);
        assert_eq!(total_pages(10), 1);
        assert_eq!(total_pages(11), 2);
        assert_eq!(total_pages(95), 10);
    }

    #[test]
    fn test_page_zero_and_overflow_clamp_into_range() {
        let result = result_with_rows(25);
        assert_eq!(paginate(&result, 0).page, 1);
        assert_eq!(paginate(&result, 99).page, 3);
        assert_eq!(paginate(&result, 2).page, 2);
    }

    #[test]
    fn test_eight_rows_fit_on_a_single_page() {
        let result = result_with_rows(8);
        let page = paginate(&result, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.rows.len(), 8);
    }

    #[test]
    fn test_last_page_holds_the_remainder() {
        let result = result_with_rows(25);
        let page = paginate(&result, 3);
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.rows[0]["id"], json!(20));
    }

    #[test]
    fn test_empty_result_still_renders_page_one() {
        let result = result_with_rows(0);
        let page = paginate(&result, 5);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.rows.is_empty());
    }
}

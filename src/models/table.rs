use serde::{Deserialize, Serialize};

/// A column as reported by the engine's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared scalar type, e.g. "Int64" or "Utf8".
    pub data_type: String,
}

/// The session's record of the one currently loaded dataset.
///
/// Created once per successful upload and immutable thereafter. A later
/// upload supersedes it wholesale; handles are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableHandle {
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableHandle {
    pub fn new(table_name: String, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table_name,
            columns,
        }
    }

    /// Comma-joined "name (type)" rendering of every column, used to
    /// describe the schema to the translation endpoint.
    pub fn describe_columns(&self) -> String {
        self.columns
            .iter()
            .map(|col| format!("{} ({})", col.name, col.data_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Derive a table name from an uploaded file name: the extension is
/// stripped and every non-alphanumeric character becomes an underscore.
///
/// A file name that is nothing but an extension (e.g. ".env") keeps its
/// full name as the stem so the derived name is never empty for a
/// non-empty input.
pub fn derive_table_name(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };

    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_table_name_strips_extension_and_spaces() {
        assert_eq!(derive_table_name("sales data.csv"), "sales_data");
        assert_eq!(derive_table_name("report.2024.csv"), "report_2024");
        assert_eq!(derive_table_name("plain"), "plain");
    }

    #[test]
    fn test_derive_table_name_only_alphanumerics_and_underscores() {
        for input in ["über-daten.csv", "a b%c!.csv", "名前.csv", "x.y.z.csv"] {
            let name = derive_table_name(input);
            assert!(!name.is_empty(), "empty name for {input}");
            assert!(
                name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                "bad characters in {name}"
            );
        }
    }

    #[test]
    fn test_derive_table_name_nonempty_for_extension_only_names() {
        assert_eq!(derive_table_name(".env"), "_env");
        assert!(!derive_table_name(".").is_empty());
    }

    #[test]
    fn test_describe_columns_rendering() {
        let handle = TableHandle::new(
            "sales_data".to_string(),
            vec![
                ColumnDescriptor {
                    name: "id".to_string(),
                    data_type: "Int64".to_string(),
                },
                ColumnDescriptor {
                    name: "amount".to_string(),
                    data_type: "Float64".to_string(),
                },
            ],
        );
        assert_eq!(handle.describe_columns(), "id (Int64), amount (Float64)");
    }
}

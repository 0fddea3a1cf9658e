// Tabular engine adapter
//
// Owns the single embedded DataFusion instance for the process. Uploaded
// CSV bytes are registered with an in-memory object store and turned into
// a permanent table; arbitrary read queries run against the same shared
// context.

use bytes::Bytes;
use datafusion::arrow::array::StringArray;
use datafusion::arrow::json::writer::JsonArray;
use datafusion::arrow::json::WriterBuilder;
use datafusion::prelude::*;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::time::timeout;
use url::Url;

use crate::api::middleware::AppError;
use crate::models::{derive_table_name, ColumnDescriptor, QueryResult, TableHandle};

/// Mount point of the store holding raw uploaded files.
const UPLOAD_STORE_URL: &str = "mem://uploads/";

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Number of partitions for parallel execution
    pub target_partitions: usize,
    /// Rows sampled when inferring a CSV schema
    pub schema_infer_max_records: usize,
    /// Bound on a single statement's execution time
    pub query_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            schema_infer_max_records: 1000,
            query_timeout: Duration::from_secs(30),
        }
    }
}

/// The single owning reference to the embedded analytical database.
///
/// The underlying `SessionContext` is created lazily on first use;
/// initialization is idempotent, so every later call sees the same
/// instance. Tables created by superseded uploads are not dropped; their
/// growth is bounded by the process lifetime.
pub struct TabularEngine {
    settings: EngineSettings,
    store: Arc<InMemory>,
    ctx: OnceCell<SessionContext>,
}

impl TabularEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            store: Arc::new(InMemory::new()),
            ctx: OnceCell::new(),
        }
    }

    /// The shared context, initializing it on first call.
    async fn context(&self) -> Result<&SessionContext, AppError> {
        self.ctx
            .get_or_try_init(|| async {
                let config = SessionConfig::new()
                    .with_batch_size(self.settings.batch_size)
                    .with_target_partitions(self.settings.target_partitions)
                    .with_information_schema(true);
                let ctx = SessionContext::new_with_config(config);

                let url = Url::parse(UPLOAD_STORE_URL)
                    .map_err(|e| AppError::Internal(format!("invalid upload store url: {}", e)))?;
                ctx.register_object_store(&url, self.store.clone());

                tracing::info!("initialized embedded analytical engine");
                Ok(ctx)
            })
            .await
    }

    /// Load an uploaded CSV file as a permanent table.
    ///
    /// The table name is derived from the file name; the raw bytes are
    /// registered with the engine; a one-row preview over a permissive
    /// scan probes the column set; the permanent table selects every
    /// probed column (quoted individually, so spaces and punctuation
    /// survive); the handle's columns come from the engine catalog.
    ///
    /// On failure no partial table is left queryable under the derived
    /// name, and a table already registered under it survives unchanged.
    pub async fn ingest(&self, filename: &str, contents: Vec<u8>) -> Result<TableHandle, AppError> {
        let table_name = derive_table_name(filename);
        if table_name.is_empty() {
            return Err(AppError::Ingest("file has no usable name".to_string()));
        }

        let ctx = self.context().await?;
        let existed = ctx.table_exist(table_name.as_str()).unwrap_or(false);

        // Register the raw bytes under a normalized object name.
        let object_name = format!("{}.csv", table_name);
        let object_path = ObjectPath::from(object_name.clone());
        self.store
            .put(&object_path, PutPayload::from(Bytes::from(contents)))
            .await
            .map_err(|e| AppError::Ingest(format!("could not register file: {}", e)))?;

        let staging = format!("{}_staging", table_name);
        let options = CsvReadOptions::new()
            .has_header(true)
            .schema_infer_max_records(self.settings.schema_infer_max_records);
        ctx.register_csv(
            staging.as_str(),
            format!("{}{}", UPLOAD_STORE_URL, object_name),
            options,
        )
            .await
            .map_err(|e| AppError::Ingest(e.to_string()))?;

        let outcome = self.create_table(ctx, &table_name, &staging).await;

        // The staging scan is transient regardless of the outcome. A
        // failed creation must not leave the derived name queryable when
        // it was free before this upload; when a table already held that
        // name, it stays in place untouched.
        let _ = ctx.deregister_table(staging.as_str());
        if outcome.is_err() && !existed {
            let _ = ctx.deregister_table(table_name.as_str());
        }

        outcome
    }

    async fn create_table(
        &self,
        ctx: &SessionContext,
        table_name: &str,
        staging: &str,
    ) -> Result<TableHandle, AppError> {
        // One-row preview to probe the column set and force a real parse.
        let preview = ctx
            .sql(&format!("SELECT * FROM {} LIMIT 1", quote_ident(staging)))
            .await
            .map_err(|e| AppError::Ingest(e.to_string()))?;
        let probed: Vec<String> = preview
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        preview
            .collect()
            .await
            .map_err(|e| AppError::Ingest(e.to_string()))?;

        if probed.is_empty() {
            return Err(AppError::Ingest("no columns detected".to_string()));
        }

        let column_list = probed
            .iter()
            .map(|name| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");
        let ctas = format!(
            "CREATE OR REPLACE TABLE {} AS SELECT {} FROM {}",
            quote_ident(table_name),
            column_list,
            quote_ident(staging)
        );
        ctx.sql(&ctas)
            .await
            .map_err(|e| AppError::Ingest(e.to_string()))?
            .collect()
            .await
            .map_err(|e| AppError::Ingest(e.to_string()))?;

        let columns = self.catalog_columns(ctx, table_name).await?;
        if columns.is_empty() {
            return Err(AppError::Ingest(format!(
                "table '{}' missing from the catalog after creation",
                table_name
            )));
        }

        tracing::info!(
            table = table_name,
            columns = columns.len(),
            "loaded uploaded file as table"
        );
        Ok(TableHandle::new(table_name.to_string(), columns))
    }

    /// Read (column_name, data_type) pairs for a table from the catalog.
    async fn catalog_columns(
        &self,
        ctx: &SessionContext,
        table_name: &str,
    ) -> Result<Vec<ColumnDescriptor>, AppError> {
        let sql = format!(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_name = '{}' ORDER BY ordinal_position",
            table_name.replace('\'', "''")
        );
        let batches = ctx
            .sql(&sql)
            .await
            .map_err(|e| AppError::Ingest(e.to_string()))?
            .collect()
            .await
            .map_err(|e| AppError::Ingest(e.to_string()))?;

        let mut columns = Vec::new();
        for batch in &batches {
            let names = batch
                .column(0)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| AppError::Internal("unexpected catalog layout".to_string()))?;
            let types = batch
                .column(1)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| AppError::Internal("unexpected catalog layout".to_string()))?;
            for i in 0..batch.num_rows() {
                columns.push(ColumnDescriptor {
                    name: names.value(i).to_string(),
                    data_type: types.value(i).to_string(),
                });
            }
        }

        Ok(columns)
    }

    /// Execute one SQL statement and materialize every row.
    ///
    /// The statement runs under a bounded timeout; expiry and engine
    /// rejections both surface as a `QueryError` carrying the engine's
    /// message. This is the sole safety net for generated SQL.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult, AppError> {
        let ctx = self.context().await?;
        let started = Instant::now();

        let df = ctx
            .sql(sql)
            .await
            .map_err(|e| AppError::Query(e.to_string()))?;
        let columns: Vec<String> = df
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();

        let batches = timeout(self.settings.query_timeout, df.collect())
            .await
            .map_err(|_| {
                AppError::Query(format!(
                    "query did not complete within {}s",
                    self.settings.query_timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::Query(e.to_string()))?;

        let rows = batches_to_rows(&batches).map_err(AppError::Query)?;
        let result = QueryResult::new(columns, rows);

        tracing::debug!(
            rows = result.row_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "executed statement"
        );
        Ok(result)
    }
}

/// Double-quote an identifier, escaping embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert Arrow record batches into column-name to value maps.
fn batches_to_rows(
    batches: &[datafusion::arrow::record_batch::RecordBatch],
) -> Result<Vec<Map<String, Value>>, String> {
    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    for batch in batches {
        writer.write(batch).map_err(|e| e.to_string())?;
    }
    writer.finish().map_err(|e| e.to_string())?;

    let buf = writer.into_inner();
    if buf.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&buf).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csv() -> Vec<u8> {
        b"id,unit price,city\n1,10.5,Oslo\n2,20.0,Bergen\n3,7.25,Oslo\n".to_vec()
    }

    #[tokio::test]
    async fn test_ingest_derives_table_name_and_catalog_columns() {
        let engine = TabularEngine::new(EngineSettings::default());
        let handle = engine
            .ingest("sales data.csv", sample_csv())
            .await
            .expect("ingest succeeds");

        assert_eq!(handle.table_name, "sales_data");
        let names: Vec<&str> = handle.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "unit price", "city"]);
        assert!(handle.columns.iter().all(|c| !c.data_type.is_empty()));
    }

    #[tokio::test]
    async fn test_execute_materializes_all_rows() {
        let engine = TabularEngine::new(EngineSettings::default());
        engine
            .ingest("sales data.csv", sample_csv())
            .await
            .expect("ingest succeeds");

        let result = engine
            .execute("SELECT \"id\", \"unit price\" FROM \"sales_data\" ORDER BY \"id\"")
            .await
            .expect("query succeeds");
        assert_eq!(result.row_count, 3);
        assert_eq!(result.columns, vec!["id", "unit price"]);
        assert_eq!(result.rows[0]["id"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn test_execute_surfaces_engine_errors() {
        let engine = TabularEngine::new(EngineSettings::default());
        let err = engine
            .execute("SELECT * FROM \"no_such_table\"")
            .await
            .expect_err("missing table must fail");
        assert!(matches!(err, AppError::Query(_)));
    }

    #[tokio::test]
    async fn test_failed_ingest_leaves_no_table_behind() {
        let engine = TabularEngine::new(EngineSettings::default());
        let err = engine.ingest("broken.csv", Vec::new()).await;
        assert!(err.is_err());
        assert!(engine.execute("SELECT * FROM \"broken\"").await.is_err());
    }

    #[tokio::test]
    async fn test_reingest_replaces_table_contents() {
        let engine = TabularEngine::new(EngineSettings::default());
        engine
            .ingest("data.csv", b"a\n1\n2\n".to_vec())
            .await
            .expect("first ingest");
        let handle = engine
            .ingest("data.csv", b"a,b\n9,8\n".to_vec())
            .await
            .expect("second ingest");

        assert_eq!(handle.columns.len(), 2);
        let result = engine
            .execute("SELECT * FROM \"data\"")
            .await
            .expect("query replacement table");
        assert_eq!(result.row_count, 1);
    }

    #[tokio::test]
    async fn test_failed_reingest_keeps_the_existing_table_queryable() {
        let engine = TabularEngine::new(EngineSettings::default());
        engine
            .ingest("data.csv", b"a,b\n1,2\n".to_vec())
            .await
            .expect("first ingest");

        // Same name, but a row past the inference sample breaks the
        // inferred numeric type, so the full scan fails mid-creation.
        let mut replacement = String::from("a,b\n");
        for i in 0..1000 {
            replacement.push_str(&format!("{},{}\n", i, i));
        }
        replacement.push_str("1001,not_a_number\n");
        let err = engine.ingest("data.csv", replacement.into_bytes()).await;
        assert!(err.is_err());

        let result = engine
            .execute("SELECT * FROM \"data\"")
            .await
            .expect("original table still answers");
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0]["a"], serde_json::json!(1));
    }

    #[test]
    fn test_quote_ident_escapes_embedded_quotes() {
        assert_eq!(quote_ident("unit price"), "\"unit price\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}

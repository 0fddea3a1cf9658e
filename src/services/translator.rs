use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;

use crate::api::middleware::AppError;
use crate::config::Config;
use crate::models::TableHandle;

/// Message shown for every translation failure. Details go to the log;
/// the caller only learns that no SQL could be produced.
const TRANSLATION_FAILED: &str = "Failed to generate query";

/// Bound on the external generation call, which offers no implicit one.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns a natural-language prompt plus a table schema into one SQL
/// statement.
///
/// Implementations never validate that the returned text is SQL; the
/// engine's execution step is the sole safety net.
#[async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(&self, prompt: &str, table: &TableHandle) -> Result<String, AppError>;
}

/// Client for a hosted `generateContent`-style text-generation endpoint.
pub struct GenerationClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_output_tokens: u32,
    http_client: HttpClient,
}

impl GenerationClient {
    pub fn new(config: &Config) -> Self {
        Self {
            endpoint: config.translator.endpoint.clone(),
            model: config.translator.model.clone(),
            api_key: config.translator.api_key.clone(),
            max_output_tokens: config.translator.max_output_tokens,
            http_client: HttpClient::new(),
        }
    }

    /// Build the instruction sent to the endpoint: table name, the
    /// "name (type)" column rendering, the user's prompt, and the fixed
    /// formatting rules (no implicit row-limiting beyond what the user
    /// asks for; bracket-quote column names containing spaces).
    fn build_instruction(prompt: &str, table: &TableHandle) -> String {
        format!(
            "Given these columns in table '{table}': {columns}\n\n\
             Generate a SQL query for: {prompt}\n\n\
             Return only the SQL query, nothing else. For prompts like \"top 15 rows\" or \
             \"top 5 data\", do not add WHERE or ORDER BY clauses; simply return the first N \
             rows, where N is the number the user asked for. When a column name contains \
             spaces, enclose it in square brackets so the whole text reads as one column name.",
            table = table.table_name,
            columns = table.describe_columns(),
            prompt = prompt
        )
    }

    /// First candidate's first content part, if any.
    fn extract_text(body: &Value) -> Option<&str> {
        body["candidates"][0]["content"]["parts"][0]["text"].as_str()
    }

    fn strip_code_fences(text: &str) -> String {
        text.replace("```sql", "").replace("```", "").trim().to_string()
    }
}

#[async_trait]
impl QueryTranslator for GenerationClient {
    async fn translate(&self, prompt: &str, table: &TableHandle) -> Result<String, AppError> {
        let instruction = Self::build_instruction(prompt, table);
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );

        let mut request = self
            .http_client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "contents": [
                    { "parts": [ { "text": instruction } ] }
                ],
                "generationConfig": {
                    "temperature": 0,
                    "topK": 1,
                    "topP": 1,
                    "maxOutputTokens": self.max_output_tokens,
                },
            }));
        if let Some(api_key) = &self.api_key {
            request = request.query(&[("key", api_key.as_str())]);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("translation endpoint unreachable: {}", e);
            AppError::Translation(TRANSLATION_FAILED.to_string())
        })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "translation endpoint returned an error");
            return Err(AppError::Translation(TRANSLATION_FAILED.to_string()));
        }

        let body: Value = response.json().await.map_err(|e| {
            tracing::warn!("could not parse translation response: {}", e);
            AppError::Translation(TRANSLATION_FAILED.to_string())
        })?;

        let text = Self::extract_text(&body).ok_or_else(|| {
            tracing::warn!("translation response carried no text");
            AppError::Translation(TRANSLATION_FAILED.to_string())
        })?;

        let sql = Self::strip_code_fences(text);
        if sql.is_empty() {
            return Err(AppError::Translation(TRANSLATION_FAILED.to_string()));
        }

        tracing::info!(sql = %sql, "generated SQL from prompt");
        Ok(sql)
    }
}

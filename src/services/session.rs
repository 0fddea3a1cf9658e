// Session orchestrator
//
// Sole writer of session state. Everything the HTTP handlers do flows
// through here: sign-in gating, feeding uploads to the engine, feeding
// prompts and the loaded schema to the translator, and handing generated
// SQL back to the engine.

use std::sync::Arc;
use std::time::Instant;

use crate::api::middleware::AppError;
use crate::models::{Submission, TableHandle, UserProfile};
use crate::services::auth::IdentityService;
use crate::services::engine::TabularEngine;
use crate::services::translator::QueryTranslator;

enum SessionState {
    Unauthenticated,
    Authenticated {
        profile: UserProfile,
        table: Option<TableHandle>,
    },
}

/// State machine over `Unauthenticated -> Authenticated(no table) ->
/// Authenticated(table loaded)`.
///
/// The orchestrator is held behind an async mutex by the HTTP layer, so
/// at most one ingest, translation, or execution is in flight at a time;
/// callers that cannot take the lock are rejected as busy rather than
/// interleaved against the same table handle.
pub struct SessionOrchestrator {
    identity: IdentityService,
    engine: Arc<TabularEngine>,
    translator: Arc<dyn QueryTranslator>,
    state: SessionState,
    last_submission: Option<Submission>,
}

impl SessionOrchestrator {
    pub fn new(
        identity: IdentityService,
        engine: Arc<TabularEngine>,
        translator: Arc<dyn QueryTranslator>,
    ) -> Self {
        Self {
            identity,
            engine,
            translator,
            state: SessionState::Unauthenticated,
            last_submission: None,
        }
    }

    /// Exchange a sign-in credential for an authenticated session.
    ///
    /// A failed decode leaves the session exactly as it was.
    pub fn login(&mut self, credential: &str) -> Result<UserProfile, AppError> {
        let profile = self.identity.decode_profile(credential)?;
        tracing::info!(subject = %profile.subject, "user signed in");
        self.state = SessionState::Authenticated {
            profile: profile.clone(),
            table: None,
        };
        self.last_submission = None;
        Ok(profile)
    }

    /// Return unconditionally to `Unauthenticated`, discarding the
    /// profile, the table handle, and any displayed result.
    pub fn logout(&mut self) {
        if let SessionState::Authenticated { profile, .. } = &self.state {
            tracing::info!(subject = %profile.subject, "user signed out");
        }
        self.state = SessionState::Unauthenticated;
        self.last_submission = None;
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::Authenticated { profile, .. } => Some(profile),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn table(&self) -> Option<&TableHandle> {
        match &self.state {
            SessionState::Authenticated { table, .. } => table.as_ref(),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn last_submission(&self) -> Option<&Submission> {
        self.last_submission.as_ref()
    }

    /// Load an uploaded file, replacing any previously active table.
    ///
    /// A failed ingest keeps the prior handle. A successful one clears
    /// the displayed result, so stale rows are never shown against a new
    /// schema.
    pub async fn ingest(&mut self, filename: &str, contents: Vec<u8>) -> Result<TableHandle, AppError> {
        if self.profile().is_none() {
            return Err(AppError::Auth("sign in before uploading a file".to_string()));
        }

        let handle = self.engine.ingest(filename, contents).await?;
        if let SessionState::Authenticated { table, .. } = &mut self.state {
            *table = Some(handle.clone());
        }
        self.last_submission = None;
        Ok(handle)
    }

    /// Translate a prompt against the loaded schema and execute the
    /// generated SQL, pairing the two in one submission.
    ///
    /// With no loaded table the prompt is rejected immediately, before
    /// the translator is contacted. A failed execution keeps the
    /// previous successful submission on display until a newer one
    /// supersedes it.
    pub async fn submit(&mut self, prompt: &str) -> Result<&Submission, AppError> {
        let table = match &self.state {
            SessionState::Unauthenticated => {
                return Err(AppError::Auth("sign in before running queries".to_string()));
            }
            SessionState::Authenticated { table: None, .. } => {
                return Err(AppError::Validation(
                    "Please upload a CSV file first".to_string(),
                ));
            }
            SessionState::Authenticated {
                table: Some(table), ..
            } => table.clone(),
        };

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::Validation("Question cannot be empty".to_string()));
        }

        let started = Instant::now();
        let generated_sql = self.translator.translate(prompt, &table).await?;
        let result = self.engine.execute(&generated_sql).await?;

        let submission = Submission::new(
            prompt.to_string(),
            generated_sql,
            result,
            started.elapsed().as_millis() as u64,
        );
        Ok(self.last_submission.insert(submission))
    }
}

//! Query endpoint handler
//!
//! Handles POST /api/v1/ai/query: admission, classification, dispatch and
//! usage accounting for one user query.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::service::MAX_QUERY_CHARS;
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Deserializer, Serialize};

/// Longest accepted session id, in characters
const MAX_SESSION_ID_CHARS: usize = 255;

/// Query request from client
///
/// Validation is enforced during deserialization; invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    query: String,
    user_id: u64,
    session_id: String,
}

impl QueryRequest {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl<'de> Deserialize<'de> for QueryRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawQueryRequest {
            query: String,
            user_id: u64,
            session_id: String,
        }

        let raw = RawQueryRequest::deserialize(deserializer)?;

        if raw.query.trim().is_empty() {
            return Err(serde::de::Error::custom(
                "query cannot be empty or contain only whitespace",
            ));
        }

        let char_count = raw.query.chars().count();
        if char_count > MAX_QUERY_CHARS {
            return Err(serde::de::Error::custom(format!(
                "query exceeds maximum length of {} characters (got {})",
                MAX_QUERY_CHARS, char_count
            )));
        }

        if raw.user_id == 0 {
            return Err(serde::de::Error::custom("user_id must be greater than 0"));
        }

        let session_chars = raw.session_id.chars().count();
        if session_chars == 0 || session_chars > MAX_SESSION_ID_CHARS {
            return Err(serde::de::Error::custom(format!(
                "session_id must be 1 to {} characters (got {})",
                MAX_SESSION_ID_CHARS, session_chars
            )));
        }

        Ok(QueryRequest {
            query: raw.query,
            user_id: raw.user_id,
            session_id: raw.session_id,
        })
    }
}

/// Query response to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub model_used: String,
    pub tokens_used: u64,
    pub cost_usd: f64,
    /// Seconds spent in the provider call that produced `response`
    pub processing_time: f64,
    pub session_id: String,
    pub remaining_queries: u64,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> AppResult<Json<QueryResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(
            request_id = %request_id,
            error = %rejection.body_text(),
            "Rejected malformed query request"
        );
        AppError::Validation(rejection.body_text())
    })?;

    tracing::debug!(
        request_id = %request_id,
        user_id = request.user_id(),
        session_id = %request.session_id(),
        query_length = request.query().chars().count(),
        "Received query request"
    );

    let outcome = state
        .service()
        .handle_query_for_user(request.query(), request.user_id(), request.session_id())
        .await
        .map_err(|e| {
            tracing::info!(request_id = %request_id, user_id = request.user_id(), error = %e, "Query failed");
            AppError::from(e)
        })?;

    tracing::info!(
        request_id = %request_id,
        user_id = request.user_id(),
        plan = %outcome.plan,
        category = outcome.classification.category.as_str(),
        complexity = outcome.classification.complexity.as_str(),
        classification_source = outcome.classification.source.as_str(),
        model_used = %outcome.result.model_used,
        tokens_used = outcome.result.tokens_used,
        cost_usd = outcome.result.cost_usd,
        remaining_queries = outcome.remaining_queries,
        "Query answered"
    );

    Ok(Json(QueryResponse {
        response: outcome.result.response_text,
        model_used: outcome.result.model_used,
        tokens_used: outcome.result.tokens_used,
        cost_usd: outcome.result.cost_usd,
        processing_time: outcome.result.processing_time_seconds,
        session_id: request.session_id,
        remaining_queries: outcome.remaining_queries,
    }))
}

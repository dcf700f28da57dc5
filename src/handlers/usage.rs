//! Usage endpoint
//!
//! GET /api/v1/ai/usage/{user_id} reports today's query count, the remaining
//! daily quota and the requests left in the current rate window.

use crate::accounts::PlanTier;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::service::QueryError;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageResponse {
    pub user_id: u64,
    pub plan_type: PlanTier,
    pub daily_query_count: u64,
    pub remaining_queries: u64,
    pub remaining_requests: u64,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<u64>,
) -> AppResult<Json<UsageResponse>> {
    let service = state.service();
    let accounts = service.accounts();

    let plan = accounts
        .get_plan_tier(user_id)
        .await
        .map_err(|e| AppError::from(QueryError::from(e)))?;
    let daily_query_count = accounts
        .get_daily_query_count(user_id)
        .await
        .map_err(|e| AppError::from(QueryError::from(e)))?;
    let remaining_requests = service
        .admission()
        .remaining(user_id, plan)
        .await
        .map_err(|e| AppError::from(QueryError::from(e)))?;
    let remaining_queries = service.get_remaining_quota(user_id, plan, daily_query_count);

    tracing::debug!(
        request_id = %request_id,
        user_id = user_id,
        plan = %plan,
        daily_query_count,
        remaining_queries,
        remaining_requests,
        "Usage requested"
    );

    Ok(Json(UsageResponse {
        user_id,
        plan_type: plan,
        daily_query_count,
        remaining_queries,
        remaining_requests,
    }))
}

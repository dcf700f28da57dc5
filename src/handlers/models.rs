//! Model catalog endpoint
//!
//! GET /api/v1/ai/models lists the supported models with pricing and the
//! selection policy in human-readable form.

use crate::handlers::AppState;
use crate::models::{ModelCatalog, ModelId, ModelInfo};
use axum::{Json, extract::State};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: BTreeMap<ModelId, ModelInfo>,
    pub selection_logic: BTreeMap<&'static str, &'static str>,
    pub fallback_model: ModelId,
}

pub async fn handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.catalog().all().clone(),
        selection_logic: ModelCatalog::selection_logic(),
        fallback_model: state.config().routing.fallback_model,
    })
}

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Form;
use serde::Deserialize;

use crate::engine::FixtureEngine;
use crate::error::{ServerError, ServerResult};
use crate::http::response::{ApiResponse, QueryData};
use crate::metadata::MetricMetadata;

pub type AppState = Arc<FixtureEngine>;

#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetadataParams {
    pub metric: Option<String>,
    pub limit: Option<i64>,
}

/// `GET|POST /api/v1/query`
///
/// `time` is accepted and ignored; queries always run at the configured
/// evaluation time.
pub async fn query(
    State(engine): State<AppState>,
    params: Result<Form<QueryParams>, FormRejection>,
) -> ServerResult<ApiResponse<QueryData>> {
    let Form(params) = params.map_err(|e| ServerError::BadData(e.body_text()))?;
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ServerError::BadData("missing query parameter".to_string()))?;

    let samples = tokio::task::spawn_blocking(move || engine.exec(&query)).await??;
    Ok(ApiResponse::success(QueryData::vector(samples)))
}

/// `GET /api/v1/labels`
pub async fn labels(State(engine): State<AppState>) -> ApiResponse<Vec<String>> {
    let names = engine.labels().names().into_iter().map(String::from).collect();
    ApiResponse::success(names)
}

/// `GET /api/v1/label/{name}/values`
pub async fn label_values(
    State(engine): State<AppState>,
    Path(name): Path<String>,
) -> ApiResponse<Vec<String>> {
    let values = engine
        .labels()
        .values(&name)
        .into_iter()
        .map(String::from)
        .collect();
    ApiResponse::success(values)
}

/// `GET /api/v1/metadata`
pub async fn metadata(
    State(engine): State<AppState>,
    params: Result<Query<MetadataParams>, QueryRejection>,
) -> ServerResult<ApiResponse<BTreeMap<String, Vec<MetricMetadata>>>> {
    let Query(params) = params.map_err(|e| ServerError::BadData(e.body_text()))?;
    let metric = params.metric.as_deref().filter(|m| !m.is_empty());
    let limit = params.limit.filter(|l| *l > 0).map(|l| l as usize);

    let data = engine
        .metadata()
        .query(metric, limit)
        .into_iter()
        .map(|(name, md)| (name.to_string(), md.to_vec()))
        .collect();
    Ok(ApiResponse::success(data))
}

// api/handlers/responses.rs — sub-result generation, adjustments, previews.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error_response;
use crate::AppContext;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

pub async fn get_response(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let response = ctx.asking.get_response(id).await.map_err(error_response)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

pub async fn rerun(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let query_id = ctx
        .asking
        .rerun_asking_task(id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "query_id": query_id })))
}

pub async fn generate_breakdown(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let response = ctx
        .asking
        .generate_thread_response_breakdown(id)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

pub async fn generate_answer(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let response = ctx
        .asking
        .generate_thread_response_answer(id)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

pub async fn generate_chart(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let response = ctx
        .asking
        .generate_thread_response_chart(id)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

#[derive(Deserialize)]
pub struct AdjustChartParams {
    pub adjustment_option: Value,
}

pub async fn adjust_chart(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(params): Json<AdjustChartParams>,
) -> ApiResult<Json<Value>> {
    let response = ctx
        .asking
        .adjust_thread_response_chart(id, params.adjustment_option)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

#[derive(Deserialize)]
pub struct AdjustSqlParams {
    pub sql: String,
}

pub async fn adjust_sql(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(params): Json<AdjustSqlParams>,
) -> ApiResult<Json<Value>> {
    let response = ctx
        .asking
        .adjust_thread_response_with_sql(id, &params.sql)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

#[derive(Deserialize)]
pub struct AdjustAnswerParams {
    pub tweaks: Vec<String>,
}

pub async fn adjust_answer(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(params): Json<AdjustAnswerParams>,
) -> ApiResult<Json<Value>> {
    let response = ctx
        .asking
        .adjust_thread_response_answer(id, params.tweaks)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

#[derive(Deserialize)]
pub struct PreviewParams {
    pub limit: Option<u64>,
}

pub async fn preview_data(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Query(params): Query<PreviewParams>,
) -> ApiResult<Json<Value>> {
    let rows = ctx
        .asking
        .preview_data(id, params.limit)
        .await
        .map_err(error_response)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct BreakdownPreviewParams {
    pub step: Option<usize>,
    pub limit: Option<u64>,
}

pub async fn preview_breakdown(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Query(params): Query<BreakdownPreviewParams>,
) -> ApiResult<Json<Value>> {
    let rows = ctx
        .asking
        .preview_breakdown_data(id, params.step, params.limit)
        .await
        .map_err(error_response)?;
    Ok(Json(rows))
}

// api/handlers/threads.rs — thread CRUD + recommendation trigger.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error_response;
use crate::asking::{CreateThreadInput, CreateThreadResponseInput};
use crate::AppContext;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

#[derive(Deserialize)]
pub struct ListParams {
    pub project_id: i64,
}

pub async fn list_threads(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Value>> {
    let threads = ctx
        .asking
        .list_threads(params.project_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "threads": threads })))
}

pub async fn create_thread(
    State(ctx): State<Arc<AppContext>>,
    Json(input): Json<CreateThreadInput>,
) -> ApiResult<Json<Value>> {
    let thread = ctx.asking.create_thread(input).await.map_err(error_response)?;
    Ok(Json(serde_json::to_value(thread).unwrap_or_default()))
}

pub async fn get_thread(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let thread = ctx.asking.get_thread(id).await.map_err(error_response)?;
    let responses = ctx
        .asking
        .list_thread_responses(id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "thread": thread, "responses": responses })))
}

#[derive(Deserialize)]
pub struct UpdateThreadParams {
    pub summary: String,
}

pub async fn update_thread(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(params): Json<UpdateThreadParams>,
) -> ApiResult<Json<Value>> {
    let thread = ctx
        .asking
        .update_thread_summary(id, &params.summary)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(thread).unwrap_or_default()))
}

pub async fn delete_thread(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    ctx.asking.delete_thread(id).await.map_err(error_response)?;
    Ok(Json(json!({})))
}

pub async fn create_response(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(input): Json<CreateThreadResponseInput>,
) -> ApiResult<Json<Value>> {
    let response = ctx
        .asking
        .create_thread_response(id, input)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(response).unwrap_or_default()))
}

pub async fn generate_recommendations(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    ctx.asking
        .generate_thread_recommendation_questions(id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({})))
}

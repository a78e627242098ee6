// api/handlers/asking.rs — asking-task routes.

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error_response;
use crate::asking::CreateAskingTaskInput;
use crate::AppContext;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(input): Json<CreateAskingTaskInput>,
) -> ApiResult<Json<Value>> {
    let query_id = ctx
        .asking
        .create_asking_task(input)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "query_id": query_id })))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let result = ctx.asking.get_asking_task(&id).await.map_err(error_response)?;
    Ok(Json(json!({
        "status": result.status,
        "error": result.error,
        "candidates": result.candidates,
    })))
}

pub async fn cancel_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    ctx.asking
        .cancel_asking_task(&id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({})))
}

/// Proxy the AI service's incremental result stream to the client.
pub async fn stream_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let stream = ctx
        .ai_client
        .stream_ask_result(&id)
        .await
        .map_err(error_response)?;
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(stream))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

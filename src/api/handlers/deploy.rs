// api/handlers/deploy.rs — semantics deployment.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error_response;
use crate::AppContext;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

#[derive(Deserialize)]
pub struct DeployParams {
    pub manifest: Value,
    pub deploy_id: String,
}

/// Submit the manifest and wait (bounded) for the deployment to settle.
/// Always returns a terminal status — exhaustion comes back as FAILED.
pub async fn deploy(
    State(ctx): State<Arc<AppContext>>,
    Json(params): Json<DeployParams>,
) -> ApiResult<Json<Value>> {
    ctx.deploy
        .deploy(params.manifest, &params.deploy_id)
        .await
        .map_err(error_response)?;
    let result = ctx.deploy.wait_for_deployment(&params.deploy_id).await;
    Ok(Json(json!({
        "status": result.status,
        "error": result.error,
    })))
}

// api/mod.rs — Public REST API server.
//
// Thin axum surface over the orchestration services. Handlers deserialize
// parameters, call the service, and serialize the result; every error maps
// to a status code through `error_response`.

pub mod handlers;

use anyhow::Result;
use axum::http::StatusCode;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::ServiceError;
use crate::AppContext;

pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let shutdown = ctx.shutdown.clone();
    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(handlers::health::health))
        // Asking tasks
        .route("/api/v1/asks", post(handlers::asking::create_task))
        .route("/api/v1/asks/{id}", get(handlers::asking::get_task))
        .route("/api/v1/asks/{id}/cancel", post(handlers::asking::cancel_task))
        .route("/api/v1/asks/{id}/stream", get(handlers::asking::stream_task))
        // Threads
        .route(
            "/api/v1/threads",
            get(handlers::threads::list_threads).post(handlers::threads::create_thread),
        )
        .route(
            "/api/v1/threads/{id}",
            get(handlers::threads::get_thread)
                .patch(handlers::threads::update_thread)
                .delete(handlers::threads::delete_thread),
        )
        .route(
            "/api/v1/threads/{id}/responses",
            post(handlers::threads::create_response),
        )
        .route(
            "/api/v1/threads/{id}/recommendation-questions",
            post(handlers::threads::generate_recommendations),
        )
        // Thread responses
        .route("/api/v1/responses/{id}", get(handlers::responses::get_response))
        .route("/api/v1/responses/{id}/rerun", post(handlers::responses::rerun))
        .route(
            "/api/v1/responses/{id}/breakdown",
            post(handlers::responses::generate_breakdown),
        )
        .route(
            "/api/v1/responses/{id}/answer",
            post(handlers::responses::generate_answer),
        )
        .route(
            "/api/v1/responses/{id}/chart",
            post(handlers::responses::generate_chart),
        )
        .route(
            "/api/v1/responses/{id}/chart-adjustment",
            post(handlers::responses::adjust_chart),
        )
        .route(
            "/api/v1/responses/{id}/sql-adjustment",
            post(handlers::responses::adjust_sql),
        )
        .route(
            "/api/v1/responses/{id}/answer-adjustment",
            post(handlers::responses::adjust_answer),
        )
        .route(
            "/api/v1/responses/{id}/preview",
            get(handlers::responses::preview_data),
        )
        .route(
            "/api/v1/responses/{id}/breakdown-preview",
            get(handlers::responses::preview_breakdown),
        )
        // Deployments
        .route("/api/v1/deploy", post(handlers::deploy::deploy))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Map a service error to an HTTP status + JSON body.
pub(crate) fn error_response(e: ServiceError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        ServiceError::NotFound(..) | ServiceError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::AiService { .. } | ServiceError::Engine(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({ "code": e.code(), "error": e.to_string() })),
    )
}

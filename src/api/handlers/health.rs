use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppContext;

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let db_ok = sqlx::query("SELECT 1")
        .execute(&ctx.storage.pool())
        .await
        .is_ok();
    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "uptime_secs": ctx.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "trackers": {
            "breakdown": ctx.trackers.breakdown.len(),
            "text_answer": ctx.trackers.text_answer.len(),
            "chart": ctx.trackers.chart.len(),
            "chart_adjustment": ctx.trackers.chart_adjustment.len(),
            "recommendation": ctx.trackers.recommendation.len(),
            "feedback_adjustment": ctx.trackers.feedback_adjustment.len(),
        },
    }))
}

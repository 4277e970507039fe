//! Health check

use axum::extract::State;
use axum::response::Json;
use serde_json::json;
use std::sync::Arc;

use crate::api::server::WalletServer;

pub async fn health_check(State(state): State<Arc<WalletServer>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "pending_approvals": state.approvals.pending_count(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

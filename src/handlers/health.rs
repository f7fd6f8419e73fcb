// Health check endpoint

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_health = state.store.ping().await;
    let rpc_health = state.chain.ping().await;

    let status = if store_health && rpc_health {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(serde_json::json!({
        "status": status,
        "store": if store_health { "up" } else { "down" },
        "suiRpc": if rpc_health { "up" } else { "down" },
    }))
}

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, voice};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP router: health check and telephony webhooks
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/incoming-call", post(voice::incoming_call))
        .route("/hangup", post(voice::hangup))
        .layer(TraceLayer::new_for_http())
}

//! HTTP 入口: `POST /` で出荷依頼を受け付けてキューに載せる
//!
//! - 202: キュー投入済み `{"status":"Queued for shipping"}`
//! - 400: ボディが ShippingRequest として読めない
//! - 500: キュー投入に失敗

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use courier_core::app::{IngressError, ShippingIngress};

pub fn router(ingress: ShippingIngress) -> Router {
    Router::new()
        .route("/", post(submit_shipping))
        .route("/health", get(health))
        .with_state(ingress)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

async fn submit_shipping(State(ingress): State<ShippingIngress>, body: Bytes) -> Response {
    match ingress.submit_bytes(&body).await {
        Ok(ack) => (StatusCode::ACCEPTED, Json(ack)).into_response(),
        Err(IngressError::InvalidPayload(e)) => {
            tracing::warn!(error = %e, "rejected shipping request");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid payload"})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to enqueue shipping request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to enqueue"})),
            )
                .into_response()
        }
    }
}

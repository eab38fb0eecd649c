//! HTTP handlers for the payment webhook ingress.
//!
//! Response policy: 2xx acknowledges the event whether or not it changed
//! state (idempotent acknowledgement stops provider retry storms); 4xx
//! tells the provider the request itself is bad and will never succeed;
//! 5xx is the only class providers should redeliver.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::application::handlers::billing::{
    ProcessWebhookCommand, ProcessWebhookError, ProcessWebhookHandler, ProcessWebhookResult,
};
use crate::ports::WebhookRequest;

use super::super::ErrorResponse;

/// Shared state for the webhook router.
#[derive(Clone)]
pub struct WebhookAppState {
    pub handler: Arc<ProcessWebhookHandler>,
}

/// Acknowledgement body for accepted events.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// POST /webhooks/payment/:gateway - inbound provider callback.
pub async fn handle_payment_webhook(
    State(state): State<WebhookAppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let remote_addr = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());

    let cmd = ProcessWebhookCommand {
        gateway,
        request: WebhookRequest::new(header_map(&headers), body.to_vec(), remote_addr),
    };

    match state.handler.handle(cmd).await {
        Ok(
            ProcessWebhookResult::Applied { .. }
            | ProcessWebhookResult::Duplicate
            | ProcessWebhookResult::Unresolvable,
        ) => (StatusCode::OK, Json(WebhookAck { status: "ok" })).into_response(),

        Err(ProcessWebhookError::UnknownGateway(name)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "UNKNOWN_GATEWAY",
                format!("'{}' is not a supported gateway", name),
            )),
        )
            .into_response(),

        Err(ProcessWebhookError::InvalidSignature) => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "INVALID_SIGNATURE",
                "Webhook signature verification failed",
            )),
        )
            .into_response(),

        Err(ProcessWebhookError::MalformedPayload(message)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("MALFORMED_PAYLOAD", message)),
        )
            .into_response(),

        Err(ProcessWebhookError::Storage(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("STORAGE_ERROR", err.to_string())),
        )
            .into_response(),
    }
}

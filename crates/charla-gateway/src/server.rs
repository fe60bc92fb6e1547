// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface: health probe, webhook handshake, webhook delivery.
//!
//! The delivery endpoint always answers 200. The provider interprets
//! anything else as "retry later", so a parsing or logic bug must not
//! turn one bad payload into an endless redelivery storm.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use charla_flow::FlowRouter;
use charla_storage::queries::integrations;
use charla_storage::Database;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::autoclose::{AutoCloseScheduler, AutoCloseSettings};
use crate::ingest::{self, ClientFactory};

/// Shared state behind every handler.
pub struct AppState {
    pub db: Database,
    pub flows: FlowRouter,
    pub clients: Arc<dyn ClientFactory>,
    pub autoclose: AutoCloseScheduler,
}

impl AppState {
    pub fn new(
        db: Database,
        clients: Arc<dyn ClientFactory>,
        autoclose: AutoCloseSettings,
    ) -> Self {
        Self {
            db,
            flows: FlowRouter::new(),
            clients,
            autoclose: AutoCloseScheduler::new(autoclose),
        }
    }
}

/// Build the gateway router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/{routing_id}", get(handshake).post(deliver))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Provider subscription handshake parameters.
#[derive(Debug, Deserialize)]
struct HandshakeParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET handshake: echo the challenge iff mode is "subscribe" and the
/// token matches the active integration for this routing id.
async fn handshake(
    State(state): State<Arc<AppState>>,
    Path(routing_id): Path<String>,
    Query(params): Query<HandshakeParams>,
) -> impl IntoResponse {
    let subscribe = params.mode.as_deref() == Some("subscribe");
    let verified = match params.verify_token.as_deref() {
        Some(token) if subscribe => {
            integrations::verify_handshake(&state.db, &routing_id, token)
                .await
                .unwrap_or(false)
        }
        _ => false,
    };
    if verified {
        let challenge = params.challenge.unwrap_or_default();
        debug!(routing_id, "handshake verified");
        (StatusCode::OK, challenge)
    } else {
        (StatusCode::FORBIDDEN, "forbidden".to_string())
    }
}

/// POST delivery: parse leniently, process, and answer 200 no matter
/// what happened internally.
async fn deliver(
    State(state): State<Arc<AppState>>,
    Path(routing_id): Path<String>,
    body: axum::body::Bytes,
) -> StatusCode {
    match serde_json::from_slice(&body) {
        Ok(payload) => ingest::process_delivery(&state, payload).await,
        Err(e) => warn!(routing_id, error = %e, "unparseable webhook body"),
    }
    StatusCode::OK
}

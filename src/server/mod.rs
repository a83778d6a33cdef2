// SPDX-License-Identifier: MIT

//! HTTP surface for one editing session
//!
//! The editor pushes graph and scenario changes here; the coordinator
//! behind it decides when to persist them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::coordinator::{BroadcastReporter, SaveCoordinator, SaveStatus};
use crate::error::FlowError;
use crate::flow::{FlowGraph, FlowId, FlowMeta, FlowRecord, SaveResponse, Scenario};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: SaveCoordinator,
    pub events: BroadcastReporter,
}

type ApiError = (StatusCode, Json<Value>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/flow/status", get(status))
        .route("/api/flow/user", put(set_user))
        .route("/api/flow/graph", put(set_graph))
        .route("/api/flow/scenario", put(set_scenario))
        .route("/api/flow/autosave", put(set_auto_save))
        .route("/api/flow/save", post(save_flow))
        .route("/api/flow/open/{flow_id}", post(open_flow))
        .route("/api/flow/events", get(events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(
    port: u16,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(err: &FlowError) -> ApiError {
    let status = match err {
        FlowError::MissingIdentity => StatusCode::BAD_REQUEST,
        FlowError::Api { .. } | FlowError::Http(_) | FlowError::InvalidResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(state): State<AppState>) -> Json<SaveStatus> {
    Json(state.coordinator.status().await)
}

#[derive(Deserialize)]
struct UserRequest {
    user_id: Option<String>,
}

async fn set_user(
    State(state): State<AppState>,
    Json(payload): Json<UserRequest>,
) -> Json<SaveStatus> {
    let user_id = payload.user_id.filter(|u| !u.is_empty());
    state.coordinator.set_user(user_id).await;
    Json(state.coordinator.status().await)
}

async fn set_graph(
    State(state): State<AppState>,
    Json(graph): Json<FlowGraph>,
) -> Json<SaveStatus> {
    log::debug!(
        "Graph update: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    state.coordinator.set_graph(graph).await;
    Json(state.coordinator.status().await)
}

async fn set_scenario(
    State(state): State<AppState>,
    Json(scenario): Json<Scenario>,
) -> Json<SaveStatus> {
    state.coordinator.set_scenario(scenario).await;
    Json(state.coordinator.status().await)
}

#[derive(Deserialize)]
struct AutoSaveRequest {
    enabled: bool,
}

async fn set_auto_save(
    State(state): State<AppState>,
    Json(payload): Json<AutoSaveRequest>,
) -> Json<SaveStatus> {
    state.coordinator.set_auto_save(payload.enabled).await;
    Json(state.coordinator.status().await)
}

async fn save_flow(
    State(state): State<AppState>,
    Json(meta): Json<FlowMeta>,
) -> Result<Json<SaveResponse>, ApiError> {
    state
        .coordinator
        .save_flow(&meta)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn open_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
) -> Result<Json<FlowRecord>, ApiError> {
    state
        .coordinator
        .open_flow(FlowId::from(flow_id))
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(state.events.subscribe())
        .filter_map(|item| item.ok())
        .map(|event| Event::default().json_data(event));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{extract::State, routing::get, Json, Router};

use crate::{
    server_types::{ServiceInfo, TurnRequest, TurnResponse},
    Engine, TurnHandler,
};

struct AppState<E> {
    handler: TurnHandler<E>,
    info: ServiceInfo,
}

/// `GET /` describes the service, `POST /` takes one turn.
pub fn serve_turns<E: Engine + 'static>(handler: TurnHandler<E>, info: ServiceInfo) -> Router {
    Router::new()
        .route("/", get(get_info).post(handle_turn))
        .with_state(Arc::new(AppState { handler, info }))
}

async fn get_info<E: Engine>(State(state): State<Arc<AppState<E>>>) -> Json<ServiceInfo> {
    Json(state.info.clone())
}

async fn handle_turn<E: Engine>(
    State(state): State<Arc<AppState<E>>>,
    Json(request): Json<TurnRequest>,
) -> Json<TurnResponse> {
    Json(state.handler.handle(&request, epoch_millis()).await)
}

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

//! Serial port listing

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PortsResponse {
    pub ok: bool,
    pub ports: Vec<String>,
}

/// GET /ports
pub async fn list_ports(State(state): State<AppState>) -> Json<PortsResponse> {
    Json(PortsResponse {
        ok: true,
        ports: state.ports().list().await,
    })
}

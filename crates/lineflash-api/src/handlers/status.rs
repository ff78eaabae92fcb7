//! Polled job state

use axum::extract::State;
use axum::Json;
use lineflash_core::{JobStatus, ManifestInfo};
use serde::Serialize;

use crate::state::AppState;

/// Status badge shown by the console
#[derive(Debug, Serialize)]
pub struct StatusInfo {
    pub code: JobStatus,
    pub message: String,
}

/// Response for the state query
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub status: StatusInfo,
    pub busy: bool,
    /// Job log joined with newlines
    pub logs: String,
    pub manifest: ManifestInfo,
    pub flow_version: String,
    pub flow_revision: String,
}

/// GET /state
pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let snapshot = state.orchestrator().state();
    let build = state.build_info();

    Json(StateResponse {
        status: StatusInfo {
            code: snapshot.status,
            message: snapshot.message,
        },
        busy: snapshot.busy,
        logs: snapshot.logs,
        manifest: build.manifest.clone(),
        flow_version: build.flow_version.clone(),
        flow_revision: build.flow_revision.clone(),
    })
}

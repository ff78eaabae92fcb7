//! Flash start handler

use axum::extract::State;
use axum::{Form, Json};
use lineflash_core::FLASH_STARTED;
use serde::Serialize;

use crate::error::ApiError;
use crate::handlers::UnitParams;
use crate::state::AppState;

/// Response for an accepted flash
#[derive(Debug, Serialize)]
pub struct StartFlashResponse {
    pub ok: bool,
    pub message: String,
}

/// POST /flash
///
/// Starts a flash and returns at once. Progress and the outcome are only
/// visible through `GET /state`.
pub async fn start_flash(
    State(state): State<AppState>,
    Form(params): Form<UnitParams>,
) -> Result<Json<StartFlashResponse>, ApiError> {
    let request = params.unit_request()?;

    state.orchestrator().start(&request, params.port())?;

    tracing::info!(
        batch = request.batch,
        serial = request.serial_number,
        port = params.port().unwrap_or("auto"),
        "Flash request accepted"
    );

    Ok(Json(StartFlashResponse {
        ok: true,
        message: FLASH_STARTED.to_string(),
    }))
}

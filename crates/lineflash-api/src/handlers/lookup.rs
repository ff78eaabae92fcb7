//! Unit identity lookup

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::handlers::UnitParams;
use crate::state::AppState;

/// Derived identity of a unit
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub ok: bool,
    pub batch: i64,
    pub year: u8,
    pub month: u8,
    pub serial_number: u8,
    /// Printed serial
    pub serial: String,
    /// Network name, same value as `serial`
    pub ssid: String,
    pub password: String,
}

/// GET /lookup?batch=&serial=&year=&month=
pub async fn lookup_unit(
    State(state): State<AppState>,
    Query(params): Query<UnitParams>,
) -> Result<Json<LookupResponse>, ApiError> {
    let request = params.unit_request()?;
    let unit = state.credentials().lookup(&request)?;

    Ok(Json(LookupResponse {
        ok: true,
        batch: unit.batch,
        year: unit.year,
        month: unit.month,
        serial_number: unit.serial_number,
        serial: unit.identifier.clone(),
        ssid: unit.identifier,
        password: unit.password,
    }))
}

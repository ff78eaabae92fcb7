//! HTTP request handlers for the flasher API
//!
//! Thin adapters over the orchestrator, credential directory and port
//! enumerator held in [`AppState`](crate::state::AppState).

pub mod flash;
pub mod lookup;
pub mod ports;
pub mod status;

use serde::Deserialize;

use lineflash_core::UnitRequest;

use crate::error::{ApiError, NOT_INTEGERS};

/// Unit fields as sent by the console, either as a query string or a form
#[derive(Debug, Default, Deserialize)]
pub struct UnitParams {
    pub batch: Option<String>,
    pub serial: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
    pub port: Option<String>,
}

impl UnitParams {
    /// Parse the numeric fields; range checks happen in the core.
    pub fn unit_request(&self) -> Result<UnitRequest, ApiError> {
        Ok(UnitRequest::new(
            parse_int(&self.batch)?,
            parse_int(&self.serial)?,
            parse_int(&self.year)?,
            parse_int(&self.month)?,
        ))
    }

    /// Port override, `None` when absent or blank
    pub fn port(&self) -> Option<&str> {
        self.port
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

fn parse_int(value: &Option<String>) -> Result<i64, ApiError> {
    value
        .as_deref()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ApiError::BadRequest(NOT_INTEGERS.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(batch: &str, serial: &str, year: &str, month: &str) -> UnitParams {
        UnitParams {
            batch: Some(batch.to_string()),
            serial: Some(serial.to_string()),
            year: Some(year.to_string()),
            month: Some(month.to_string()),
            port: None,
        }
    }

    #[test]
    fn test_parses_zero_padded_fields() {
        let request = params("01", "007", "24", "06").unit_request().unwrap();
        assert_eq!(request, UnitRequest::new(1, 7, 24, 6));
    }

    #[test]
    fn test_rejects_non_integers() {
        assert!(params("1", "x", "24", "06").unit_request().is_err());
        assert!(UnitParams::default().unit_request().is_err());
    }

    #[test]
    fn test_blank_port_is_none() {
        let mut p = params("1", "1", "24", "6");
        p.port = Some("  ".to_string());
        assert_eq!(p.port(), None);
        p.port = Some(" COM4 ".to_string());
        assert_eq!(p.port(), Some("COM4"));
    }
}

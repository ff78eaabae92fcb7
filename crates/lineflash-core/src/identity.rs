//! Unit identity models
//!
//! A unit is identified by its batch, build date (two-digit year and month)
//! and its serial number within the batch. The broadcast network name and the
//! printed serial are the same derived identifier.

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::error::ValidationError;

/// Prefix of every derived identifier
pub const IDENTIFIER_PREFIX: &str = "FP";

/// Valid inter-batch serial numbers
pub const SERIAL_RANGE: RangeInclusive<i64> = 1..=100;
/// Valid two-digit build years
pub const YEAR_RANGE: RangeInclusive<i64> = 0..=99;
/// Valid build months
pub const MONTH_RANGE: RangeInclusive<i64> = 1..=12;

/// Operator-entered unit fields, not yet validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRequest {
    pub batch: i64,
    pub serial_number: i64,
    pub year: i64,
    pub month: i64,
}

impl UnitRequest {
    pub fn new(batch: i64, serial_number: i64, year: i64, month: i64) -> Self {
        Self {
            batch,
            serial_number,
            year,
            month,
        }
    }

    /// Check every field against its range, batch first.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch <= 0 {
            return Err(ValidationError::Batch);
        }
        if !SERIAL_RANGE.contains(&self.serial_number) {
            return Err(ValidationError::Serial);
        }
        if !YEAR_RANGE.contains(&self.year) {
            return Err(ValidationError::Year);
        }
        if !MONTH_RANGE.contains(&self.month) {
            return Err(ValidationError::Month);
        }
        Ok(())
    }
}

/// Format the identifier `FP{batch:02}-{year:02}{month:02}{serial:04}`.
pub fn format_identifier(batch: i64, year: u8, month: u8, serial_number: u8) -> String {
    format!(
        "{}{:02}-{:02}{:02}{:04}",
        IDENTIFIER_PREFIX, batch, year, month, serial_number
    )
}

/// Derived, immutable identity of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitIdentity {
    pub batch: i64,
    pub year: u8,
    pub month: u8,
    pub serial_number: u8,
    /// Printed serial and network name
    pub identifier: String,
    pub password: String,
}

impl UnitIdentity {
    /// Start banner written as the first log line of a job
    pub fn banner(&self) -> String {
        format!(
            "Starting flash for batch {:02} serial {:04} ({:02}/{:02})",
            self.batch, self.serial_number, self.year, self.month
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_identifier_pads_fields() {
        assert_eq!(format_identifier(1, 24, 6, 1), "FP01-24060001");
        assert_eq!(format_identifier(7, 3, 11, 100), "FP07-03110100");
        assert_eq!(format_identifier(123, 0, 1, 42), "FP123-00010042");
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(UnitRequest::new(1, 1, 0, 1).validate().is_ok());
        assert!(UnitRequest::new(99, 100, 99, 12).validate().is_ok());
    }

    #[test]
    fn test_validate_names_failing_field() {
        assert_eq!(
            UnitRequest::new(0, 1, 24, 6).validate(),
            Err(ValidationError::Batch)
        );
        assert_eq!(
            UnitRequest::new(1, 0, 24, 6).validate(),
            Err(ValidationError::Serial)
        );
        assert_eq!(
            UnitRequest::new(1, 101, 24, 6).validate(),
            Err(ValidationError::Serial)
        );
        assert_eq!(
            UnitRequest::new(1, 1, 100, 6).validate(),
            Err(ValidationError::Year)
        );
        assert_eq!(
            UnitRequest::new(1, 1, 24, 13).validate(),
            Err(ValidationError::Month)
        );
        assert_eq!(
            UnitRequest::new(1, 1, 24, 0).validate(),
            Err(ValidationError::Month)
        );
    }

    #[test]
    fn test_banner() {
        let unit = UnitIdentity {
            batch: 3,
            year: 24,
            month: 6,
            serial_number: 7,
            identifier: format_identifier(3, 24, 6, 7),
            password: "12345678".to_string(),
        };
        assert_eq!(unit.banner(), "Starting flash for batch 03 serial 0007 (24/06)");
    }
}

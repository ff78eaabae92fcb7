//! Error types for credential loading, request validation and flash dispatch

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised while loading the password override table.
///
/// These are startup errors: the daemon refuses to serve when any of them
/// occurs.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The table exists but could not be read
    #[error("Failed to read password table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The table is not valid CSV
    #[error("Malformed password table {path}: {source}")]
    Malformed { path: PathBuf, source: csv::Error },

    /// The header row lacks one of the required columns
    #[error("Password CSV must contain batch,serial,password columns.")]
    MissingColumns,

    /// A batch or serial cell is not an integer
    #[error("Invalid batch/serial value in {path}: batch={batch:?} serial={serial:?}")]
    InvalidNumber {
        path: PathBuf,
        batch: String,
        serial: String,
    },

    /// Serial outside the supported range
    #[error("Serial {serial} out of supported range {min}-{max}.")]
    SerialOutOfRange { serial: i64, min: i64, max: i64 },

    /// Password shorter than 8 or longer than 63 characters
    #[error("Password for batch {batch} serial {serial} violates length constraints.")]
    PasswordLength { batch: i64, serial: i64 },

    /// Two rows share the same (batch, serial) key
    #[error("Duplicate password entry for batch {batch} serial {serial:04}.")]
    Duplicate { batch: i64, serial: i64 },
}

/// Request validation failure for a unit lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Batch number must be positive.")]
    Batch,

    #[error("Serial must be between 1 and 100.")]
    Serial,

    #[error("Year must be between 00 and 99.")]
    Year,

    #[error("Month must be between 01 and 12.")]
    Month,
}

/// Errors building the platform-specific flash command
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The flashing script is not present in the installation directory
    #[error("Flash script not found: {}", path.display())]
    ScriptMissing { path: PathBuf },

    /// Neither PowerShell executable is on the search path
    #[error("Neither pwsh nor powershell was found on PATH.")]
    InterpreterNotFound,

    /// Host operating system has no flashing tool
    #[error("Unsupported operating system: {os}")]
    UnsupportedPlatform { os: String },
}

/// Synchronous rejection of a flash request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// Unit fields failed validation
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Another job has not reached a terminal state yet
    #[error("Flash already in progress.")]
    Busy,
}

/// Serial port enumeration failure. Logged, never returned to clients.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Invalid device pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error(transparent)]
    Interpreter(#[from] DispatchError),

    #[error("Port query failed: {0}")]
    Io(#[from] std::io::Error),
}

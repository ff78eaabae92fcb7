//! Credential directory
//!
//! Loads the optional `passwords.csv` override table and derives the identity
//! and SoftAP password of a unit. Every unit without an override uses the
//! default password. The directory is read-only after loading and can be
//! shared between request handlers without locking.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{CredentialError, ValidationError};
use crate::identity::{format_identifier, UnitIdentity, UnitRequest, SERIAL_RANGE};

/// Password used by every unit without an override
pub const DEFAULT_PASSWORD: &str = "12345678";

/// Minimum accepted password length (WPA2 passphrase)
pub const PASSWORD_MIN_LEN: usize = 8;
/// Maximum accepted password length (WPA2 passphrase)
pub const PASSWORD_MAX_LEN: usize = 63;

const REQUIRED_COLUMNS: [&str; 3] = ["batch", "serial", "password"];

/// One override row of the password table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub batch: i64,
    pub serial_number: i64,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    batch: String,
    serial: String,
    password: String,
}

/// Per-unit password overrides plus the default fallback
#[derive(Debug, Clone)]
pub struct CredentialDirectory {
    entries: HashMap<(i64, i64), String>,
    default_password: String,
    source: Option<PathBuf>,
}

impl Default for CredentialDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD)
    }
}

impl CredentialDirectory {
    /// Create a directory with no overrides
    pub fn new(default_password: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            default_password: default_password.into(),
            source: None,
        }
    }

    /// Load overrides from a CSV file.
    ///
    /// A missing file is not an error: the directory is returned empty and a
    /// warning names the default password every unit will use.
    pub fn load(
        path: impl AsRef<Path>,
        default_password: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        let mut directory = Self::new(default_password);

        if !path.exists() {
            warn!(
                path = %path.display(),
                default_password = %directory.default_password,
                "No password table found, defaulting every unit to the default password"
            );
            return Ok(directory);
        }

        let file = std::fs::File::open(path).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        directory.read_csv(file, path)?;
        directory.source = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            overrides = directory.entries.len(),
            "Loaded password overrides"
        );
        Ok(directory)
    }

    /// Build a directory from already-parsed entries, applying the same
    /// checks as [`CredentialDirectory::load`].
    pub fn from_entries(
        entries: impl IntoIterator<Item = CredentialEntry>,
        default_password: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let mut directory = Self::new(default_password);
        for entry in entries {
            directory.insert(entry)?;
        }
        Ok(directory)
    }

    fn read_csv<R: Read>(&mut self, reader: R, path: &Path) -> Result<(), CredentialError> {
        let malformed = |source| CredentialError::Malformed {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers().map_err(malformed)?;
        if !REQUIRED_COLUMNS
            .iter()
            .all(|column| headers.iter().any(|h| h == *column))
        {
            return Err(CredentialError::MissingColumns);
        }

        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(malformed)?;
            let (batch, serial_number) =
                match (row.batch.trim().parse(), row.serial.trim().parse()) {
                    (Ok(batch), Ok(serial)) => (batch, serial),
                    _ => {
                        return Err(CredentialError::InvalidNumber {
                            path: path.to_path_buf(),
                            batch: row.batch,
                            serial: row.serial,
                        })
                    }
                };
            self.insert(CredentialEntry {
                batch,
                serial_number,
                password: row.password.trim().to_string(),
            })?;
        }
        Ok(())
    }

    fn insert(&mut self, entry: CredentialEntry) -> Result<(), CredentialError> {
        let CredentialEntry {
            batch,
            serial_number,
            password,
        } = entry;

        if !SERIAL_RANGE.contains(&serial_number) {
            return Err(CredentialError::SerialOutOfRange {
                serial: serial_number,
                min: *SERIAL_RANGE.start(),
                max: *SERIAL_RANGE.end(),
            });
        }
        let len = password.chars().count();
        if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
            return Err(CredentialError::PasswordLength {
                batch,
                serial: serial_number,
            });
        }
        if self.entries.contains_key(&(batch, serial_number)) {
            return Err(CredentialError::Duplicate {
                batch,
                serial: serial_number,
            });
        }
        self.entries.insert((batch, serial_number), password);
        Ok(())
    }

    /// Validate the unit fields and derive its identity.
    pub fn lookup(&self, request: &UnitRequest) -> Result<UnitIdentity, ValidationError> {
        request.validate()?;

        let batch = request.batch;
        // Ranges were checked above, the narrowing cannot truncate.
        let year = request.year as u8;
        let month = request.month as u8;
        let serial_number = request.serial_number as u8;

        let password = self
            .entries
            .get(&(request.batch, request.serial_number))
            .unwrap_or(&self.default_password)
            .clone();

        Ok(UnitIdentity {
            batch,
            year,
            month,
            serial_number,
            identifier: format_identifier(batch, year, month, serial_number),
            password,
        })
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the overrides came from a file on disk
    pub fn loaded_from_disk(&self) -> bool {
        self.source.is_some()
    }

    pub fn default_password(&self) -> &str {
        &self.default_password
    }
}

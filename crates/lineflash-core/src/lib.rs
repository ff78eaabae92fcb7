//! lineflash-core - Provisioning core for the production-line flasher
//!
//! Derives a unit's identifier and SoftAP password from its batch, build date
//! and serial number, builds the platform-specific flashing command, and runs
//! at most one flash job at a time while collecting the tool's output.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use lineflash_core::{
//!     CredentialDirectory, Dispatcher, FlashOrchestrator, OrchestratorConfig, SystemLauncher,
//!     UnitRequest, DEFAULT_PASSWORD,
//! };
//!
//! let credentials = CredentialDirectory::load("passwords.csv", DEFAULT_PASSWORD)?;
//! let orchestrator = FlashOrchestrator::new(
//!     Arc::new(credentials),
//!     Dispatcher::for_host("."),
//!     Arc::new(SystemLauncher),
//!     OrchestratorConfig::default(),
//! );
//! orchestrator.start(&UnitRequest::new(1, 1, 24, 6), None)?;
//! ```

pub mod build_info;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod job;
pub mod launcher;
pub mod log_buffer;
pub mod ports;
pub mod testing;

pub use build_info::{detect_revision, BuildInfo, ManifestInfo};
pub use credentials::{CredentialDirectory, CredentialEntry, DEFAULT_PASSWORD};
pub use dispatch::{Dispatcher, FlashCommand, InterpreterResolver, PathResolver, Platform};
pub use error::{CredentialError, DispatchError, PortError, StartError, ValidationError};
pub use identity::{format_identifier, UnitIdentity, UnitRequest};
pub use job::{FlashOrchestrator, JobSnapshot, JobStatus, OrchestratorConfig, FLASH_STARTED};
pub use launcher::{ExitOutcome, ProcessLauncher, RunningProcess, SystemLauncher};
pub use log_buffer::{sanitize_line, LogBuffer, LOG_CAPACITY};
pub use ports::PortEnumerator;

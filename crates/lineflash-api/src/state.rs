//! Application state for the flasher API

use std::sync::Arc;

use lineflash_core::{BuildInfo, CredentialDirectory, FlashOrchestrator, PortEnumerator};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    orchestrator: FlashOrchestrator,
    ports: PortEnumerator,
    build_info: Arc<BuildInfo>,
}

impl AppState {
    pub fn new(orchestrator: FlashOrchestrator, ports: PortEnumerator, build_info: BuildInfo) -> Self {
        Self {
            orchestrator,
            ports,
            build_info: Arc::new(build_info),
        }
    }

    pub fn orchestrator(&self) -> &FlashOrchestrator {
        &self.orchestrator
    }

    /// Credential directory the orchestrator derives identities from
    pub fn credentials(&self) -> &CredentialDirectory {
        self.orchestrator.credentials()
    }

    pub fn ports(&self) -> &PortEnumerator {
        &self.ports
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.build_info
    }
}

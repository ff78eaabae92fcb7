//! Build metadata shown next to the job status
//!
//! The release bundle ships a `manifest.json` with its version and build time;
//! the flow revision is the short git hash of the installation directory.

use std::path::Path;
use std::process::Command;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const UNKNOWN: &str = "unknown";

/// Release bundle manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestInfo {
    pub version: String,
    pub built_at: String,
}

impl Default for ManifestInfo {
    fn default() -> Self {
        Self {
            version: UNKNOWN.to_string(),
            built_at: UNKNOWN.to_string(),
        }
    }
}

impl ManifestInfo {
    /// Read the manifest, falling back to "unknown" for anything missing.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Release manifest not found");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read release manifest");
                return Self::default();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Failed to parse release manifest");
            Self::default()
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        let data: Value = serde_json::from_str(content)?;
        Ok(Self {
            version: field(&data, "version"),
            built_at: field(&data, "built_at"),
        })
    }
}

fn field(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// Short git revision of `dir`, or "unknown"
pub fn detect_revision(dir: impl AsRef<Path>) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir.as_ref())
        .args(["rev-parse", "--short", "HEAD"])
        .output();
    match output {
        Ok(output) if output.status.success() => {
            let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if revision.is_empty() {
                UNKNOWN.to_string()
            } else {
                revision
            }
        }
        Ok(output) => {
            debug!(status = %output.status, "git rev-parse failed");
            UNKNOWN.to_string()
        }
        Err(e) => {
            debug!(error = %e, "git not available for revision detection");
            UNKNOWN.to_string()
        }
    }
}

/// Static version information computed once at startup
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub flow_version: String,
    pub flow_revision: String,
    pub manifest: ManifestInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let info =
            ManifestInfo::parse(r#"{"version": "1.4.2", "built_at": "2024-06-01T10:00:00Z"}"#)
                .unwrap();
        assert_eq!(info.version, "1.4.2");
        assert_eq!(info.built_at, "2024-06-01T10:00:00Z");
    }

    #[test]
    fn test_missing_fields_default_to_unknown() {
        let info = ManifestInfo::parse(r#"{"version": 7}"#).unwrap();
        assert_eq!(info.version, "7");
        assert_eq!(info.built_at, "unknown");
    }

    #[test]
    fn test_load_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            ManifestInfo::load(dir.path().join("manifest.json")),
            ManifestInfo::default()
        );

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(ManifestInfo::load(&path), ManifestInfo::default());
    }

    #[test]
    fn test_revision_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_revision(dir.path()), "unknown");
    }
}

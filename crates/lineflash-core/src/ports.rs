//! Serial port enumeration
//!
//! Lists candidate device connections for the operator to pick from. Failures
//! are logged and produce an empty list; the port override is free text
//! anyway.

use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::dispatch::{find_powershell, InterpreterResolver, Platform};
use crate::error::PortError;

/// USB serial adapters as they appear on macOS
pub const MACOS_PATTERNS: [&str; 4] = [
    "/dev/cu.usbserial-*",
    "/dev/cu.SLAB_USB*",
    "/dev/cu.usbmodem*",
    "/dev/cu.wchusbserial*",
];

/// USB serial adapters as they appear on Linux
pub const LINUX_PATTERNS: [&str; 2] = ["/dev/ttyUSB*", "/dev/ttyACM*"];

const WINDOWS_QUERY: &str =
    "Get-CimInstance Win32_SerialPort | Select-Object -ExpandProperty DeviceID";

/// Lists serial ports for one platform
#[derive(Clone)]
pub struct PortEnumerator {
    platform: Platform,
    resolver: Arc<dyn InterpreterResolver>,
}

impl PortEnumerator {
    pub fn new(platform: Platform, resolver: Arc<dyn InterpreterResolver>) -> Self {
        Self { platform, resolver }
    }

    /// Ports in discovery order without duplicates. Never fails.
    pub async fn list(&self) -> Vec<String> {
        let result = match &self.platform {
            Platform::MacOs => glob_unique(&MACOS_PATTERNS),
            Platform::Windows => self.query_windows().await,
            Platform::Unsupported(_) => glob_unique(&LINUX_PATTERNS),
        };
        match result {
            Ok(ports) => {
                debug!(count = ports.len(), "Enumerated serial ports");
                ports
            }
            Err(e) => {
                warn!(error = %e, "Failed to enumerate serial ports");
                Vec::new()
            }
        }
    }

    async fn query_windows(&self) -> Result<Vec<String>, PortError> {
        let shell = find_powershell(self.resolver.as_ref())?;
        let output = Command::new(shell)
            .args(["-NoProfile", "-Command", WINDOWS_QUERY])
            .stdin(Stdio::null())
            .output()
            .await?;
        Ok(dedup_lines(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Expand `patterns` in order, keeping the first occurrence of every path.
pub fn glob_unique(patterns: &[&str]) -> Result<Vec<String>, PortError> {
    let mut seen = HashSet::new();
    let mut ports = Vec::new();
    for pattern in patterns {
        let paths = glob::glob(pattern).map_err(|source| PortError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        // Unreadable entries are skipped, not fatal
        for path in paths.flatten() {
            let port = path.display().to_string();
            if seen.insert(port.clone()) {
                ports.push(port);
            }
        }
    }
    Ok(ports)
}

fn dedup_lines(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::testing::StaticResolver;

    #[test]
    fn test_glob_unique_keeps_first_seen_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ttyUSB1", "ttyUSB0", "ttyACM0", "other"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let base = dir.path().display().to_string();
        let usb = format!("{}/ttyUSB*", base);
        let acm = format!("{}/ttyACM*", base);
        let all_tty = format!("{}/tty*", base);

        let ports = glob_unique(&[usb.as_str(), acm.as_str(), all_tty.as_str()]).unwrap();
        assert_eq!(
            ports,
            vec![
                format!("{}/ttyUSB0", base),
                format!("{}/ttyUSB1", base),
                format!("{}/ttyACM0", base),
            ]
        );
    }

    #[test]
    fn test_glob_invalid_pattern_is_error() {
        let err = glob_unique(&["/dev/[tty"]).unwrap_err();
        assert!(matches!(&err, PortError::Pattern { pattern, .. } if pattern == "/dev/[tty"));
        assert!(err.to_string().starts_with("Invalid device pattern /dev/[tty"));
    }

    #[test]
    fn test_dedup_lines() {
        assert_eq!(
            dedup_lines("COM3\r\n\r\nCOM4\r\n  COM3 \r\n"),
            vec!["COM3".to_string(), "COM4".to_string()]
        );
    }

    #[tokio::test]
    async fn test_windows_query_without_powershell_reports_interpreter() {
        let enumerator = PortEnumerator::new(Platform::Windows, Arc::new(StaticResolver::none()));
        let err = enumerator.query_windows().await.unwrap_err();
        assert!(matches!(
            err,
            PortError::Interpreter(DispatchError::InterpreterNotFound)
        ));
    }

    #[tokio::test]
    async fn test_windows_without_powershell_is_empty() {
        let enumerator = PortEnumerator::new(Platform::Windows, Arc::new(StaticResolver::none()));
        assert!(enumerator.list().await.is_empty());
    }
}

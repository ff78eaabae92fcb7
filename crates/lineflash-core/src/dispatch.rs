//! Platform dispatcher
//!
//! Builds the external flashing command for the host operating system. The
//! dispatcher only checks that files exist and resolves the interpreter; it
//! never launches anything itself.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::DispatchError;
use crate::identity::UnitIdentity;

/// Flashing script used on macOS
pub const MACOS_SCRIPT: &str = "flash_flex_plus.sh";
/// Flashing script used on Windows
pub const WINDOWS_SCRIPT: &str = "flash_flex_plus.ps1";
/// PowerShell executables, in order of preference
pub const POWERSHELL_CANDIDATES: [&str; 2] = ["pwsh", "powershell"];
/// Replaces the password in anything that gets logged
pub const REDACTED: &str = "******";

/// Host operating system family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    /// Anything else, carrying the detected OS name
    Unsupported(String),
}

impl Platform {
    /// Detect the platform this binary runs on
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            other => Platform::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOs => write!(f, "macos"),
            Platform::Windows => write!(f, "windows"),
            Platform::Unsupported(os) => write!(f, "{}", os),
        }
    }
}

/// Locates executables on the search path
pub trait InterpreterResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Resolver backed by the `PATH` environment variable
#[derive(Debug, Default, Clone, Copy)]
pub struct PathResolver;

impl InterpreterResolver for PathResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Find the first available PowerShell executable
pub fn find_powershell(resolver: &dyn InterpreterResolver) -> Result<PathBuf, DispatchError> {
    POWERSHELL_CANDIDATES
        .iter()
        .find_map(|name| resolver.resolve(name))
        .ok_or(DispatchError::InterpreterNotFound)
}

/// A fully built external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashCommand {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    pub working_dir: PathBuf,
    /// Index in `argv` holding the password
    secret_index: Option<usize>,
}

impl FlashCommand {
    pub fn new(argv: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            working_dir: working_dir.into(),
            secret_index: None,
        }
    }

    /// Mark the argument following `flag` as secret
    fn with_secret_after(mut self, flag: &str) -> Self {
        self.secret_index = self
            .argv
            .iter()
            .position(|arg| arg == flag)
            .map(|i| i + 1)
            .filter(|i| *i < self.argv.len());
        self
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Shell-quoted command line with the password redacted
    pub fn display_redacted(&self) -> String {
        let parts = self.argv.iter().enumerate().map(|(i, arg)| {
            if Some(i) == self.secret_index {
                REDACTED
            } else {
                arg.as_str()
            }
        });
        shell_words::join(parts)
    }
}

/// Builds flash commands for one platform and installation directory
#[derive(Clone)]
pub struct Dispatcher {
    platform: Platform,
    install_dir: PathBuf,
    resolver: Arc<dyn InterpreterResolver>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("platform", &self.platform)
            .field("install_dir", &self.install_dir)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        platform: Platform,
        install_dir: impl Into<PathBuf>,
        resolver: Arc<dyn InterpreterResolver>,
    ) -> Self {
        Self {
            platform,
            install_dir: install_dir.into(),
            resolver,
        }
    }

    /// Dispatcher for the host platform resolving interpreters on `PATH`
    pub fn for_host(install_dir: impl Into<PathBuf>) -> Self {
        Self::new(Platform::detect(), install_dir, Arc::new(PathResolver))
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn resolver(&self) -> &dyn InterpreterResolver {
        self.resolver.as_ref()
    }

    /// Build the flash command for `unit`, forwarding `port` when non-empty.
    pub fn build(
        &self,
        unit: &UnitIdentity,
        port: Option<&str>,
    ) -> Result<FlashCommand, DispatchError> {
        let port = port.map(str::trim).filter(|p| !p.is_empty());
        match &self.platform {
            Platform::MacOs => self.build_macos(unit, port),
            Platform::Windows => self.build_windows(unit, port),
            Platform::Unsupported(os) => {
                Err(DispatchError::UnsupportedPlatform { os: os.clone() })
            }
        }
    }

    fn script(&self, name: &str) -> Result<PathBuf, DispatchError> {
        let path = self.install_dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(DispatchError::ScriptMissing { path })
        }
    }

    fn build_macos(
        &self,
        unit: &UnitIdentity,
        port: Option<&str>,
    ) -> Result<FlashCommand, DispatchError> {
        let script = self.script(MACOS_SCRIPT)?;
        let mut argv = vec![
            "/bin/bash".to_string(),
            script.display().to_string(),
            "--serial".to_string(),
            unit.identifier.clone(),
            "--password".to_string(),
            unit.password.clone(),
        ];
        if let Some(port) = port {
            argv.extend(["--port".to_string(), port.to_string()]);
        }
        Ok(FlashCommand::new(argv, &self.install_dir).with_secret_after("--password"))
    }

    fn build_windows(
        &self,
        unit: &UnitIdentity,
        port: Option<&str>,
    ) -> Result<FlashCommand, DispatchError> {
        let script = self.script(WINDOWS_SCRIPT)?;
        let shell = find_powershell(self.resolver.as_ref())?;
        let mut argv: Vec<String> = vec![
            shell.display().to_string(),
            "-NoLogo".into(),
            "-NoProfile".into(),
            "-ExecutionPolicy".into(),
            "Bypass".into(),
            "-File".into(),
            script.display().to_string(),
            "-Serial".into(),
            unit.identifier.clone(),
            "-Password".into(),
            unit.password.clone(),
        ];
        if let Some(port) = port {
            argv.extend(["-Port".to_string(), port.to_string()]);
        }
        Ok(FlashCommand::new(argv, &self.install_dir).with_secret_after("-Password"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticResolver;

    fn unit() -> UnitIdentity {
        UnitIdentity {
            batch: 1,
            year: 24,
            month: 6,
            serial_number: 1,
            identifier: "FP01-24060001".to_string(),
            password: "secretpw1".to_string(),
        }
    }

    fn install_dir_with(script: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(script), "#!/bin/sh\n").unwrap();
        dir
    }

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(
            Platform::from_os("linux"),
            Platform::Unsupported("linux".to_string())
        );
    }

    #[test]
    fn test_macos_command() {
        let dir = install_dir_with(MACOS_SCRIPT);
        let dispatcher =
            Dispatcher::new(Platform::MacOs, dir.path(), Arc::new(StaticResolver::none()));

        let command = dispatcher.build(&unit(), None).unwrap();
        let script = dir.path().join(MACOS_SCRIPT).display().to_string();
        assert_eq!(
            command.argv,
            vec![
                "/bin/bash",
                script.as_str(),
                "--serial",
                "FP01-24060001",
                "--password",
                "secretpw1"
            ]
        );
        assert_eq!(command.working_dir, dir.path());
        assert_eq!(command.program(), "/bin/bash");
    }

    #[test]
    fn test_macos_command_with_port() {
        let dir = install_dir_with(MACOS_SCRIPT);
        let dispatcher =
            Dispatcher::new(Platform::MacOs, dir.path(), Arc::new(StaticResolver::none()));

        let command = dispatcher
            .build(&unit(), Some("/dev/cu.usbserial-10"))
            .unwrap();
        assert_eq!(
            &command.argv[6..],
            &["--port".to_string(), "/dev/cu.usbserial-10".to_string()]
        );

        // Blank overrides are dropped
        let command = dispatcher.build(&unit(), Some("  ")).unwrap();
        assert_eq!(command.argv.len(), 6);
    }

    #[test]
    fn test_macos_script_missing() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher =
            Dispatcher::new(Platform::MacOs, dir.path(), Arc::new(StaticResolver::none()));

        let err = dispatcher.build(&unit(), None).unwrap_err();
        assert!(matches!(err, DispatchError::ScriptMissing { .. }));
    }

    #[test]
    fn test_windows_prefers_pwsh() {
        let dir = install_dir_with(WINDOWS_SCRIPT);
        let resolver = StaticResolver::new([
            ("pwsh", "C:/Program Files/PowerShell/7/pwsh.exe"),
            ("powershell", "C:/Windows/powershell.exe"),
        ]);
        let dispatcher = Dispatcher::new(Platform::Windows, dir.path(), Arc::new(resolver));

        let command = dispatcher.build(&unit(), Some("COM3")).unwrap();
        assert_eq!(command.program(), "C:/Program Files/PowerShell/7/pwsh.exe");
        assert_eq!(
            &command.args()[..5],
            &["-NoLogo", "-NoProfile", "-ExecutionPolicy", "Bypass", "-File"]
        );
        assert_eq!(
            &command.args()[6..],
            &["-Serial", "FP01-24060001", "-Password", "secretpw1", "-Port", "COM3"]
        );
    }

    #[test]
    fn test_windows_falls_back_to_powershell() {
        let dir = install_dir_with(WINDOWS_SCRIPT);
        let resolver = StaticResolver::new([("powershell", "C:/Windows/powershell.exe")]);
        let dispatcher = Dispatcher::new(Platform::Windows, dir.path(), Arc::new(resolver));

        let command = dispatcher.build(&unit(), None).unwrap();
        assert_eq!(command.program(), "C:/Windows/powershell.exe");
        assert!(!command.argv.iter().any(|a| a == "-Port"));
    }

    #[test]
    fn test_windows_interpreter_not_found() {
        let dir = install_dir_with(WINDOWS_SCRIPT);
        let dispatcher =
            Dispatcher::new(Platform::Windows, dir.path(), Arc::new(StaticResolver::none()));

        let err = dispatcher.build(&unit(), None).unwrap_err();
        assert!(matches!(err, DispatchError::InterpreterNotFound));
    }

    #[test]
    fn test_unsupported_platform() {
        let dispatcher = Dispatcher::new(
            Platform::Unsupported("linux".to_string()),
            ".",
            Arc::new(StaticResolver::none()),
        );

        let err = dispatcher.build(&unit(), None).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported operating system: linux");
    }

    #[test]
    fn test_display_redacts_password_before_port() {
        let dir = install_dir_with(MACOS_SCRIPT);
        let dispatcher =
            Dispatcher::new(Platform::MacOs, dir.path(), Arc::new(StaticResolver::none()));

        let command = dispatcher.build(&unit(), Some("/dev/ttyUSB0")).unwrap();
        let shown = command.display_redacted();
        assert!(!shown.contains("secretpw1"));
        assert!(shown.contains("--password '******'") || shown.contains("--password ******"));
        assert!(shown.ends_with("--port /dev/ttyUSB0"));
    }
}

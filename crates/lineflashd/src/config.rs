//! Daemon configuration
//!
//! Settings come from built-in defaults, an optional TOML file and the command
//! line, in increasing order of precedence.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use lineflash_core::DEFAULT_PASSWORD;
use serde::Deserialize;

const DEFAULT_LISTEN: &str = "127.0.0.1:0";
const PASSWORD_TABLE: &str = "passwords.csv";
const MANIFEST: &str = "release/manifest.json";

#[derive(Parser, Debug, Default)]
#[command(name = "lineflashd")]
#[command(about = "Production-line flasher: derives unit credentials and drives the flashing tool")]
pub struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, env = "LINEFLASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to serve the operator console on
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Directory holding the flashing scripts
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Password override table (CSV with batch,serial,password columns)
    #[arg(long)]
    pub passwords: Option<PathBuf>,

    /// Release manifest (JSON with version and built_at)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Kill the flashing tool after this many seconds
    #[arg(long, value_name = "SECS")]
    pub flash_timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Contents of the TOML configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listen: Option<SocketAddr>,
    pub install_dir: Option<PathBuf>,
    pub passwords: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub flash_timeout_secs: Option<u64>,
    pub default_password: Option<String>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }
}

/// Fully resolved daemon settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub listen: SocketAddr,
    pub install_dir: PathBuf,
    pub passwords: PathBuf,
    pub manifest: PathBuf,
    pub flash_timeout: Option<Duration>,
    pub default_password: String,
}

impl Settings {
    /// Merge command-line arguments over the optional config file
    pub fn resolve(args: &Args) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: &Args, file: FileConfig) -> anyhow::Result<Self> {
        let listen = match args.listen.or(file.listen) {
            Some(addr) => addr,
            None => DEFAULT_LISTEN.parse()?,
        };
        let install_dir = match args.install_dir.clone().or(file.install_dir) {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine working directory")?,
        };
        let passwords = args
            .passwords
            .clone()
            .or(file.passwords)
            .unwrap_or_else(|| install_dir.join(PASSWORD_TABLE));
        let manifest = args
            .manifest
            .clone()
            .or(file.manifest)
            .unwrap_or_else(|| install_dir.join(MANIFEST));
        let flash_timeout = args
            .flash_timeout
            .or(file.flash_timeout_secs)
            .map(Duration::from_secs);
        let default_password = file
            .default_password
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

        Ok(Self {
            listen,
            install_dir,
            passwords,
            manifest,
            flash_timeout,
            default_password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_derive_from_install_dir() {
        let args = Args {
            install_dir: Some(PathBuf::from("/opt/flasher")),
            ..Default::default()
        };
        let settings = Settings::merge(&args, FileConfig::default()).unwrap();

        assert_eq!(settings.listen, "127.0.0.1:0".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.passwords, PathBuf::from("/opt/flasher/passwords.csv"));
        assert_eq!(
            settings.manifest,
            PathBuf::from("/opt/flasher/release/manifest.json")
        );
        assert_eq!(settings.flash_timeout, None);
        assert_eq!(settings.default_password, DEFAULT_PASSWORD);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineflash.toml");
        std::fs::write(
            &path,
            r#"
listen = "0.0.0.0:8080"
install_dir = "/srv/flasher"
flash_timeout_secs = 300
default_password = "factorypw"
"#,
        )
        .unwrap();

        let args = Args {
            config: Some(path),
            listen: Some("127.0.0.1:9000".parse().unwrap()),
            ..Default::default()
        };
        let settings = Settings::resolve(&args).unwrap();

        assert_eq!(settings.listen, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.install_dir, PathBuf::from("/srv/flasher"));
        assert_eq!(settings.flash_timeout, Some(Duration::from_secs(300)));
        assert_eq!(settings.default_password, "factorypw");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineflash.toml");
        std::fs::write(&path, "listen_port = 8080\n").unwrap();

        assert!(FileConfig::load(&path).is_err());
    }
}

//! Configuration management for `livewatch.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── watch      # [watch]
//! │   ├── notify     # [notify]
//! │   └── client     # [client]
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # Config file lookup
//! └── mod.rs         # LiveConfig (this file)
//! ```
//!
//! The config file is optional: without one, defaults apply and relative
//! paths resolve against the current directory. Command-line options
//! override the file.

pub mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{ClientConfig, NotifyConfig, WatchConfig, WatchEvent};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use util::find_config_file;

use crate::cli::{Cli, Commands, ListenArgs, ServeArgs};
use crate::utils::path::resolve_path;
use crate::{debug, log};

/// Root configuration structure representing livewatch.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Absolute path to the config file, when one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory relative config paths resolve against (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

impl LiveConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = Some(path);
                config
            }
            None => {
                debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    root: cwd.clone(),
                    ..Self::default()
                }
            }
        };

        config.normalize_paths();
        config.apply_command_options(cli, &cwd);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli, cwd: &Path) {
        match &cli.command {
            Commands::Serve { args } => self.apply_serve_args(args, cwd),
            Commands::Listen { args } => self.apply_listen_args(args),
        }
    }

    /// Roots given on the command line replace configured roots and resolve
    /// against cwd.
    fn apply_serve_args(&mut self, args: &ServeArgs, cwd: &Path) {
        if !args.roots.is_empty() {
            self.watch.roots = args.roots.iter().map(|p| resolve_path(p, cwd)).collect();
        }
        Self::update_option(&mut self.notify.interface, args.interface.as_ref());
        Self::update_option(&mut self.notify.port, args.port.as_ref());
        Self::update_option(&mut self.notify.mount, args.mount.as_ref());
        Self::update_option(&mut self.watch.debounce_ms, args.debounce_ms.as_ref());
        Self::update_option(&mut self.notify.heartbeat_ms, args.heartbeat_ms.as_ref());
    }

    fn apply_listen_args(&mut self, args: &ListenArgs) {
        Self::update_option(&mut self.client.url, args.url.as_ref());
        Self::update_option(&mut self.client.reconnect_ms, args.reconnect_ms.as_ref());
        if args.exec.is_some() {
            self.client.command = args.exec.clone();
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    fn normalize_paths(&mut self) {
        let root = self.root.clone();
        self.watch.roots = self
            .watch
            .roots
            .iter()
            .map(|p| resolve_path(p, &root))
            .collect();
        self.watch.roots.dedup();
    }

    // ========================================================================
    // validation
    // ========================================================================

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if self.watch.roots.is_empty() {
            diag.error("watch.roots", "at least one root is required");
        }
        if self.watch.events.is_empty() {
            diag.error("watch.events", "at least one event kind is required");
        }
        for (field, value) in [
            ("watch.debounce_ms", self.watch.debounce_ms),
            ("notify.heartbeat_ms", self.notify.heartbeat_ms),
            ("notify.retry_ms", self.notify.retry_ms),
            ("client.reconnect_ms", self.client.reconnect_ms),
        ] {
            if value == 0 {
                diag.error(field, "must be greater than 0");
            }
        }
        if !self.notify.mount.starts_with('/') {
            diag.error(
                "notify.mount",
                format!("`{}` must start with `/`", self.notify.mount),
            );
        }
        if !(self.client.url.starts_with("http://") || self.client.url.starts_with("https://")) {
            diag.error(
                "client.url",
                format!("`{}` is not an http(s) URL", self.client.url),
            );
        }

        diag.into_result()
    }
}

#[cfg(test)]
pub fn test_parse_config(content: &str) -> LiveConfig {
    let (parsed, ignored) = LiveConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(LiveConfig::from_str("[watch\nroots = []").is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        let mut config = LiveConfig {
            root: PathBuf::from("/srv/site"),
            ..LiveConfig::default()
        };
        config.normalize_paths();
        config.validate().unwrap();
        assert_eq!(config.watch.roots, vec![PathBuf::from("/srv/site/html")]);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[watch]\ndebounce_ms = 10\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = LiveConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.watch.debounce_ms, 10);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let config = test_parse_config(
            "[watch]\ndebounce_ms = 0\nevents = []\n[notify]\nmount = \"heartBeat\"",
        );
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("[watch.debounce_ms]"));
        assert!(err.contains("[watch.events]"));
        assert!(err.contains("[notify.mount]"));
    }

    #[test]
    fn test_serve_args_override_file() {
        let cli = Cli::parse_from([
            "livewatch",
            "serve",
            "/tmp/a",
            "/tmp/b",
            "-p",
            "9001",
            "--debounce-ms",
            "50",
        ]);
        let mut config = test_parse_config("[notify]\nport = 7000\n[watch]\ndebounce_ms = 300");
        config.apply_command_options(&cli, Path::new("/"));

        assert_eq!(config.notify.port, 9001);
        assert_eq!(config.watch.debounce_ms, 50);
        assert_eq!(config.watch.roots.len(), 2);
        assert!(config.watch.roots[0].ends_with("a"));
    }

    #[test]
    fn test_listen_args_override_file() {
        let cli = Cli::parse_from([
            "livewatch",
            "listen",
            "http://localhost:9001/events",
            "--exec",
            "echo reloaded",
        ]);
        let mut config = test_parse_config("[client]\ncommand = \"true\"");
        config.apply_command_options(&cli, Path::new("/"));

        assert_eq!(config.client.url, "http://localhost:9001/events");
        assert_eq!(config.client.command.as_deref(), Some("echo reloaded"));
    }
}

//! Configuration module for sftp-ingest.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Every section is optional in the file; missing keys fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `sftp.password`.
pub const PASSWORD_ENV_VAR: &str = "SFTP_INGEST_PASSWORD";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for sftp-ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sftp: SftpConfig,
    pub sync: SyncConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Connection parameters for the SFTP server.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SftpConfig {
    pub server_address: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Seconds allowed for the TCP connect and for each SSH operation after it.
    pub connect_timeout_secs: u64,
}

/// What to scan and where to put it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote folders scanned on every pass, in this order.
    pub remote_folder_paths: Vec<String>,
    /// Local directory that receives downloaded files.
    pub local_folder_path: PathBuf,
    /// Seconds to wait between the end of one pass and the start of the next.
    pub poll_interval: u64,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/sftp-ingest/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("sftp-ingest")
            .join("config.yaml")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_password_override(std::env::var(PASSWORD_ENV_VAR).ok());
    }

    /// Replace the password when an override value is present and non-empty.
    pub fn apply_password_override(&mut self, value: Option<String>) {
        if let Some(password) = value.filter(|p| !p.is_empty()) {
            self.sftp.password = password;
        }
    }
}

impl SyncConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

impl SftpConfig {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("sftp-ingest")
}

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            server_address: "localhost".to_string(),
            port: 22,
            username: String::new(),
            password: String::new(),
            connect_timeout_secs: 30,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_folder_paths: Vec::new(),
            local_folder_path: data_dir().join("inbox"),
            poll_interval: 60,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("ingest.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// The password never appears in logs.
impl std::fmt::Debug for SftpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpConfig")
            .field("server_address", &self.server_address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sftp ---
        if self.sftp.server_address.trim().is_empty() {
            errors.push(ValidationError {
                field: "sftp.server_address".into(),
                message: "must not be empty".into(),
            });
        }
        if self.sftp.port == 0 {
            errors.push(ValidationError {
                field: "sftp.port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sftp.username.trim().is_empty() {
            errors.push(ValidationError {
                field: "sftp.username".into(),
                message: "must not be empty".into(),
            });
        }
        if self.sftp.connect_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "sftp.connect_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- sync ---
        if self.sync.remote_folder_paths.is_empty() {
            errors.push(ValidationError {
                field: "sync.remote_folder_paths".into(),
                message: "at least one remote folder is required".into(),
            });
        }
        for (idx, folder) in self.sync.remote_folder_paths.iter().enumerate() {
            if folder.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("sync.remote_folder_paths[{idx}]"),
                    message: "must not be empty".into(),
                });
            } else if self.sync.remote_folder_paths[..idx].contains(folder) {
                errors.push(ValidationError {
                    field: format!("sync.remote_folder_paths[{idx}]"),
                    message: format!("duplicate folder '{folder}'"),
                });
            }
        }
        if self.sync.local_folder_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sync.local_folder_path".into(),
                message: "must not be empty".into(),
            });
        }
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- database ---
        if self.database.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use ingest_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sftp_server("sftp.example.com", 22)
///     .sftp_credentials("ingest", "secret")
///     .remote_folder("/outgoing")
///     .local_folder_path(PathBuf::from("/srv/inbox"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sftp ---

    pub fn sftp_server(mut self, address: impl Into<String>, port: u16) -> Self {
        self.config.sftp.server_address = address.into();
        self.config.sftp.port = port;
        self
    }

    pub fn sftp_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.sftp.username = username.into();
        self.config.sftp.password = password.into();
        self
    }

    pub fn sftp_connect_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.sftp.connect_timeout_secs = seconds;
        self
    }

    // --- sync ---

    pub fn remote_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.sync.remote_folder_paths.push(folder.into());
        self
    }

    pub fn local_folder_path(mut self, path: PathBuf) -> Self {
        self.config.sync.local_folder_path = path;
        self
    }

    pub fn poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    // --- database ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

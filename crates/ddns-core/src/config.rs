//! Configuration types for the DDNS agent
//!
//! Configuration is assembled from up to two layers:
//!
//! 1. A JSON config file: the explicit `--config` path, or else the first
//!    existing file from [`default_search_paths`]
//! 2. Command-line overrides, applied on top of the file values
//!
//! [`AgentConfig::from_layers`] performs the merge and validates that every
//! credential field ends up present.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::scheduler::SchedulePolicy;

/// File name looked up in each search directory
pub const CONFIG_FILE_NAME: &str = "ddnsd.json";

/// Longest accepted check interval (30 days)
pub const MAX_CHECK_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

/// Longest accepted refresh interval plus jitter window (30 days)
pub const MAX_REFRESH_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Account and host settings for the dynamic-DNS provider
///
/// Immutable for the process lifetime. The `Debug` implementation never
/// exposes the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Provider account name
    pub username: String,
    /// Provider account password
    /// ⚠️ NEVER log this value
    pub password: String,
    /// Hostname to keep pointed at this machine
    pub hostname: String,
    /// Contact address sent in the User-Agent header
    pub email: String,
}

impl Credentials {
    /// Create a new set of credentials
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            hostname: hostname.into(),
            email: email.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("hostname", &self.hostname)
            .field("email", &self.email)
            .finish()
    }
}

/// Raw contents of a JSON config file
///
/// Every field is optional so a partial file can be completed from the
/// command line. Unknown keys are ignored.
#[derive(Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default, alias = "Username")]
    pub username: Option<String>,

    #[serde(default, alias = "Password")]
    pub password: Option<String>,

    #[serde(default, alias = "Hostname")]
    pub hostname: Option<String>,

    #[serde(default, alias = "Email")]
    pub email: Option<String>,

    /// Seconds between address checks
    #[serde(default)]
    pub check_interval_secs: Option<u64>,

    /// Base seconds between unconditional refreshes
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,

    /// Upper bound of the random delay added to each refresh
    #[serde(default)]
    pub refresh_jitter_secs: Option<u64>,

    /// IP-echo endpoint
    #[serde(default)]
    pub checkip_url: Option<String>,

    /// Provider update endpoint (hostname is appended)
    #[serde(default)]
    pub update_url: Option<String>,
}

impl fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("hostname", &self.hostname)
            .field("email", &self.email)
            .field("check_interval_secs", &self.check_interval_secs)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("refresh_jitter_secs", &self.refresh_jitter_secs)
            .field("checkip_url", &self.checkip_url)
            .field("update_url", &self.update_url)
            .finish()
    }
}

impl FileConfig {
    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        Self::parse(&content).map_err(|e| {
            Error::config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })
    }

    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Values supplied on the command line
///
/// Empty strings are treated as "not given" so they never blank out a
/// value from the file.
#[derive(Clone, Default)]
pub struct ConfigOverrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub hostname: Option<String>,
    pub email: Option<String>,
}

impl fmt::Debug for ConfigOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOverrides")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("hostname", &self.hostname)
            .field("email", &self.email)
            .finish()
    }
}

/// Timer settings for the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Seconds between address checks
    pub check_interval_secs: u64,

    /// Base seconds between unconditional refreshes
    pub refresh_interval_secs: u64,

    /// Upper bound (exclusive) of the random delay added to each refresh
    pub refresh_jitter_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            refresh_jitter_secs: default_refresh_jitter_secs(),
        }
    }
}

impl ScheduleConfig {
    /// Validate the timer settings
    ///
    /// See [`SchedulePolicy::validate`] for the rules.
    pub fn validate(&self) -> Result<()> {
        SchedulePolicy::from(self).validate()
    }

    /// Interval between address checks
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Base interval between refreshes
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Jitter window added to each refresh
    pub fn refresh_jitter(&self) -> Duration {
        Duration::from_secs(self.refresh_jitter_secs)
    }
}

fn default_check_interval_secs() -> u64 {
    60 * 60
}

fn default_refresh_interval_secs() -> u64 {
    6 * 24 * 60 * 60
}

fn default_refresh_jitter_secs() -> u64 {
    (23 * 60 + 59) * 60
}

/// Fully merged agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Provider credentials
    pub credentials: Credentials,

    /// Timer settings
    pub schedule: ScheduleConfig,

    /// IP-echo endpoint override
    pub checkip_url: Option<String>,

    /// Update endpoint override
    pub update_url: Option<String>,
}

impl AgentConfig {
    /// Merge the file layer and command-line overrides, then validate
    ///
    /// Command-line values win over file values. Every credential field is
    /// mandatory after the merge.
    pub fn from_layers(file: Option<FileConfig>, overrides: &ConfigOverrides) -> Result<Self> {
        let file = file.unwrap_or_default();

        let credentials = Credentials {
            username: require("username", &overrides.username, file.username)?,
            password: require("password", &overrides.password, file.password)?,
            hostname: require("hostname", &overrides.hostname, file.hostname)?,
            email: require("email", &overrides.email, file.email)?,
        };

        let defaults = ScheduleConfig::default();
        let schedule = ScheduleConfig {
            check_interval_secs: file
                .check_interval_secs
                .unwrap_or(defaults.check_interval_secs),
            refresh_interval_secs: file
                .refresh_interval_secs
                .unwrap_or(defaults.refresh_interval_secs),
            refresh_jitter_secs: file
                .refresh_jitter_secs
                .unwrap_or(defaults.refresh_jitter_secs),
        };

        let config = Self {
            credentials,
            schedule,
            checkip_url: non_empty(file.checkip_url),
            update_url: non_empty(file.update_url),
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("username", &self.credentials.username),
            ("password", &self.credentials.password),
            ("hostname", &self.credentials.hostname),
            ("email", &self.credentials.email),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::config(format!("Missing a value for: {field}")));
            }
        }

        for url in [&self.checkip_url, &self.update_url].into_iter().flatten() {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config(format!(
                    "Endpoint URL must use HTTP or HTTPS scheme. Got: {url}"
                )));
            }
        }

        self.schedule.validate()
    }
}

fn require(field: &str, cli: &Option<String>, file: Option<String>) -> Result<String> {
    non_empty(cli.clone())
        .or_else(|| non_empty(file))
        .ok_or_else(|| Error::config(format!("Missing a value for: {field}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Config file locations tried when no explicit path is given, in order:
/// working directory, system config directory, user home directory
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(CONFIG_FILE_NAME),
        Path::new("/etc/ddnsd").join(CONFIG_FILE_NAME),
    ];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".ddnsd").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Load the file layer
///
/// An explicit path must load successfully. Otherwise the first existing
/// file in `search` is loaded; a broken file there is still an error.
/// Returns `None` when no file applies.
pub fn load_file_layer(
    explicit: Option<&Path>,
    search: &[PathBuf],
) -> Result<Option<(PathBuf, FileConfig)>> {
    if let Some(path) = explicit {
        return FileConfig::load(path).map(|file| Some((path.to_path_buf(), file)));
    }

    match search.iter().find(|path| path.exists()) {
        Some(path) => FileConfig::load(path).map(|file| Some((path.clone(), file))),
        None => Ok(None),
    }
}

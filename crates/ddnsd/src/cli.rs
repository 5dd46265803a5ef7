//! Command-line interface
//!
//! Every credential flag is optional here; missing values are filled from
//! the config file and the merged result is validated in `ddns-core`.

use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use ddns_core::ConfigOverrides;
use tracing::Level;

/// dy.fi dynamic DNS update agent
///
/// Points a dy.fi hostname at this machine's public IPv4 address. Without
/// `--daemon` a single update is performed and the process exits.
#[derive(Parser)]
#[command(name = "ddnsd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// dy.fi account username
    #[arg(long)]
    pub username: Option<String>,

    /// dy.fi account password
    #[arg(long)]
    pub password: Option<String>,

    /// Hostname to update, e.g. home.dy.fi
    #[arg(long)]
    pub hostname: Option<String>,

    /// Contact email sent to dy.fi in the User-Agent header
    #[arg(long)]
    pub email: Option<String>,

    /// Keep running and refresh the address on a schedule
    #[arg(long)]
    pub daemon: bool,

    /// Path to a JSON configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long = "log-level",
        env = "DDNS_LOG_LEVEL",
        default_value = "info",
        value_parser = parse_log_level
    )]
    pub log_level: Level,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("hostname", &self.hostname)
            .field("email", &self.email)
            .field("daemon", &self.daemon)
            .field("config", &self.config)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Cli {
    /// Credential values given on the command line
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            username: self.username.clone(),
            password: self.password.clone(),
            hostname: self.hostname.clone(),
            email: self.email.clone(),
        }
    }
}

fn parse_log_level(value: &str) -> Result<Level, String> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "'{}' is not valid. Valid levels: trace, debug, info, warn, error",
            value
        )),
    }
}

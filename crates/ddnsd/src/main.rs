// # ddnsd - dy.fi Update Agent
//
// This binary is a THIN integration layer:
// 1. Parsing the command line
// 2. Loading and merging configuration (file, then CLI)
// 3. Initializing logging and the runtime
// 4. Wiring the HTTP resolver and the dy.fi publisher into the scheduler
//
// All update policy lives in ddns-core.
//
// ## Configuration
//
// Credentials come from a JSON file, command-line flags, or both (flags
// win). The file is the `--config` path if given, otherwise the first of:
//
// - `./ddnsd.json`
// - `/etc/ddnsd/ddnsd.json`
// - `~/.ddnsd/ddnsd.json`
//
// ## Example
//
// ```bash
// ddnsd --username me --password secret --hostname home.dy.fi \
//       --email me@example.com --daemon
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use ddns_core::config::{default_search_paths, load_file_layer};
use ddns_core::{AgentConfig, SchedulePolicy, UpdateScheduler};
use ddns_ip_http::HttpAddressResolver;
use ddns_provider_dyfi::DyfiPublisher;
use std::process::ExitCode;
use tracing::{debug, error, info, trace};
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: One-shot update done, or clean daemon shutdown
/// - 1: Configuration error
/// - 2: Startup update failed, or runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error
    ConfigError = 1,
    /// Startup failure or runtime error
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                DdnsExitCode::ConfigError.into()
            } else {
                DdnsExitCode::CleanShutdown.into()
            };
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!("Starting ddnsd for {}", config.credentials.hostname);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_agent(config, cli.daemon).await {
            error!("{:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Merge the config file layer with the command line
fn load_config(cli: &Cli) -> Result<AgentConfig> {
    let search = default_search_paths();

    let file = match load_file_layer(cli.config.as_deref(), &search)? {
        Some((path, file)) => {
            info!("Using config file {}", path.display());
            Some(file)
        }
        None => {
            debug!("No config file found, using command-line values only");
            None
        }
    };

    Ok(AgentConfig::from_layers(file, &cli.overrides())?)
}

/// Perform the startup update, then optionally run the daemon loop
async fn run_agent(config: AgentConfig, daemon: bool) -> Result<()> {
    let resolver = match &config.checkip_url {
        Some(url) => HttpAddressResolver::with_url(url)?,
        None => HttpAddressResolver::new()?,
    };
    let publisher = match &config.update_url {
        Some(url) => DyfiPublisher::with_base_url(url)?,
        None => DyfiPublisher::new()?,
    };

    let policy = SchedulePolicy::from(&config.schedule);
    let (mut scheduler, mut events) = UpdateScheduler::new(
        Box::new(resolver),
        Box::new(publisher),
        config.credentials,
        policy,
    );

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            trace!("Scheduler event: {:?}", event);
        }
    });

    scheduler
        .startup()
        .await
        .context("Initial update failed, not continuing")?;

    if !daemon {
        info!("Update done. Use --daemon to keep the address up to date.");
        return Ok(());
    }

    let signals = ShutdownSignals::install()?;
    scheduler
        .run_until(async move {
            let signal = signals.recv().await;
            info!("Received shutdown signal: {}", signal);
        })
        .await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Process termination signals (SIGTERM, SIGINT)
///
/// Installed before the daemon loop starts so a failure to register the
/// handlers is reported instead of silently disabling shutdown.
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

        Ok(Self { sigterm, sigint })
    }

    /// Wait for either signal and return its name
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Ctrl-C only, for non-Unix platforms
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}

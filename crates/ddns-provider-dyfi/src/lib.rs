// # dy.fi Update Publisher
//
// This crate implements the dy.fi update protocol for the DDNS agent.
//
// ## Protocol
//
// - `GET https://www.dy.fi/nic/update?hostname=<hostname>`
// - HTTP Basic authentication with the account username and password
// - `User-Agent: <product>/<version> (<contact email>)`, required by the
//   provider's abuse policy
// - The address is never sent; dy.fi uses the address of the connecting client
// - The response body is a single status word (see [`DyfiStatus`])
//
// ## Constraints
//
// - ONE HTTP request per publish call, no retries (the scheduler's fixed
//   schedule is the retry mechanism)
// - No connection reuse: the client keeps no idle connections and every
//   request carries `Connection: close`
// - Credentials NEVER appear in logs or `Debug` output
//
// ## API Reference
//
// - https://www.dy.fi/page/clients

use async_trait::async_trait;
use ddns_core::traits::{ResolvedAddress, UpdateOutcome, UpdatePublisher};
use ddns_core::{Credentials, Error, Result};
use reqwest::header::{CONNECTION, USER_AGENT};
use std::time::Duration;

/// Default update endpoint; the hostname is appended verbatim
pub const DEFAULT_UPDATE_URL: &str = "https://www.dy.fi/nic/update?hostname=";

/// Product token sent in the User-Agent header
pub const PRODUCT_TOKEN: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Default HTTP timeout for update requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Status words returned by the dy.fi update endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DyfiStatus {
    Good,
    NoChange,
    NoHost,
    NoFqdn,
    BadIp,
    DnsError,
    Abuse,
}

impl DyfiStatus {
    /// Every status word, in protocol order
    pub const ALL: [DyfiStatus; 7] = [
        Self::Good,
        Self::NoChange,
        Self::NoHost,
        Self::NoFqdn,
        Self::BadIp,
        Self::DnsError,
        Self::Abuse,
    ];

    /// Parse a status word; anything outside the vocabulary is `None`
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "good" => Some(Self::Good),
            "nochg" => Some(Self::NoChange),
            "nohost" => Some(Self::NoHost),
            "nofqdn" => Some(Self::NoFqdn),
            "badip" => Some(Self::BadIp),
            "dnserr" => Some(Self::DnsError),
            "abuse" => Some(Self::Abuse),
            _ => None,
        }
    }

    /// Status word as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::NoChange => "nochg",
            Self::NoHost => "nohost",
            Self::NoFqdn => "nofqdn",
            Self::BadIp => "badip",
            Self::DnsError => "dnserr",
            Self::Abuse => "abuse",
        }
    }

    /// Operator-facing explanation of the status
    pub fn message(&self) -> &'static str {
        match self {
            Self::Good => {
                "The request was valid and processed successfully, and caused the hostname to be pointed to the IP address returned."
            }
            Self::NoChange => {
                "The request was valid and processed, but did not cause a change in the DNS information since the information had not changed since last update (the client IP address had not changed)."
            }
            Self::NoHost => {
                "No 'hostname' CGI parameter given in the request, or the hostname is not allocated for the user."
            }
            Self::NoFqdn => "The given hostname is not a valid .dy.fi FQDN.",
            Self::BadIp => {
                "The client IP address is not a valid IP address, or is not registered to a Finnish organisation."
            }
            Self::DnsError => "The request failed due to a technical problem at the dy.fi service.",
            Self::Abuse => {
                "The request was denied because of abuse (too many requests in a short time)."
            }
        }
    }

    /// Classify the status
    pub fn outcome(&self) -> UpdateOutcome {
        let explained = || format!("{} ({})", self.message(), self.as_str());
        match self {
            Self::Good => UpdateOutcome::Accepted,
            Self::NoChange => UpdateOutcome::Unchanged,
            Self::NoHost | Self::NoFqdn | Self::BadIp | Self::Abuse => {
                UpdateOutcome::Rejected(explained())
            }
            Self::DnsError => UpdateOutcome::TransientFailure(explained()),
        }
    }
}

/// Map a complete update response to an outcome
///
/// `body` is the trimmed response body.
pub fn classify_response(status: reqwest::StatusCode, body: &str) -> UpdateOutcome {
    if !status.is_success() {
        return UpdateOutcome::ProtocolError(format!(
            "Requesting IP update failed. Server returned: {} ({})",
            body, status
        ));
    }

    match DyfiStatus::parse(body) {
        Some(code) => code.outcome(),
        None => UpdateOutcome::ProtocolError(format!(
            "Unknown status message returned by the server: {} ({})",
            body, status
        )),
    }
}

/// User-Agent value for a contact email
pub fn user_agent(email: &str) -> String {
    format!("{} ({})", PRODUCT_TOKEN, email)
}

/// dy.fi update publisher
///
/// Stateless and single-shot: one request per [`UpdatePublisher::publish`]
/// call. Credentials are passed in per call and never stored.
pub struct DyfiPublisher {
    /// Update endpoint prefix, hostname is appended
    base_url: String,

    /// HTTP client without connection pooling
    client: reqwest::Client,
}

impl std::fmt::Debug for DyfiPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DyfiPublisher")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl DyfiPublisher {
    /// Create a publisher for the public dy.fi endpoint
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_UPDATE_URL)
    }

    /// Create a publisher for a custom endpoint prefix
    ///
    /// The prefix must end where the hostname goes, e.g.
    /// `http://127.0.0.1:8080/nic/update?hostname=`.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Full update URL for a hostname
    pub fn update_url(&self, hostname: &str) -> String {
        format!("{}{}", self.base_url, hostname)
    }
}

#[async_trait]
impl UpdatePublisher for DyfiPublisher {
    /// Send one update request and classify the answer
    ///
    /// Only transport failures are returned as `Err`. Every HTTP answer,
    /// including refusals, is an [`UpdateOutcome`].
    async fn publish(
        &self,
        credentials: &Credentials,
        address: &ResolvedAddress,
    ) -> Result<UpdateOutcome> {
        let url = self.update_url(&credentials.hostname);

        tracing::info!("Updating {} to {}...", credentials.hostname, address);

        let response = self
            .client
            .get(&url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header(USER_AGENT, user_agent(&credentials.email))
            .header(CONNECTION, "close")
            .send()
            .await
            .map_err(|e| Error::network(format!("Update request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read update response: {}", e)))?;
        let body = body.trim();

        let outcome = classify_response(status, body);
        match DyfiStatus::parse(body) {
            Some(code) if outcome.is_success() => tracing::info!("{}", code.message()),
            _ => tracing::debug!("dy.fi answered {} ({})", status, outcome),
        }

        Ok(outcome)
    }

    fn provider_name(&self) -> &'static str {
        "dy.fi"
    }
}

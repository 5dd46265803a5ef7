// # HTTP Address Resolver
//
// This crate provides the HTTP IP-echo address resolver for the DDNS agent.
//
// ## Behavior
//
// - One GET request per call to the echo service (`http://checkip.dy.fi/` by default)
// - The body is free-form text or HTML; the first dotted-quad token is the
//   address, and the response is rejected if that token is not valid IPv4
// - No caching and no retries: the scheduler calls again on the next tick
//
// ## Errors
//
// - Transport failure, timeout or non-2xx status: `Error::Network`
// - No dotted-quad token, or an invalid first token: `Error::Parse`, carrying
//   the raw body

use ddns_core::traits::{AddressResolver, ResolvedAddress};
use ddns_core::{Error, Result};

use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;

/// Default IP-echo endpoint
pub const DEFAULT_CHECKIP_URL: &str = "http://checkip.dy.fi/";

/// Timeout for a single lookup
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Candidate dotted-quad tokens; range checking happens in `Ipv4Addr::from_str`
static IPV4_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}").unwrap());

/// Resolves the public IPv4 address through an HTTP echo service
pub struct HttpAddressResolver {
    /// URL to fetch the address from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a resolver for the default dy.fi echo service
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_CHECKIP_URL)
    }

    /// Create a resolver for a custom echo endpoint
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Endpoint this resolver queries
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw response body
    async fn fetch_body(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!(
                "IP lookup returned HTTP {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))
    }
}

#[async_trait::async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn resolve(&self) -> Result<ResolvedAddress> {
        tracing::debug!("Requesting current address from {}", self.url);

        let body = self.fetch_body().await?;
        let address = extract_ipv4(&body)?;

        tracing::debug!("Echo service reported {}", address);
        Ok(ResolvedAddress::new(address))
    }
}

/// Extract the address from a response body
///
/// Only the first dotted-quad token is considered. If it has an octet above
/// 255 the whole response is rejected; later tokens are never tried.
pub fn extract_ipv4(body: &str) -> Result<Ipv4Addr> {
    let token = IPV4_TOKEN
        .find(body)
        .ok_or_else(|| Error::parse("no IPv4 address found in the response", body.trim()))?;

    token.as_str().parse::<Ipv4Addr>().map_err(|_| {
        Error::parse(
            format!("'{}' is not a valid IPv4 address", token.as_str()),
            body.trim(),
        )
    })
}

// # Address Resolver Trait
//
// Defines the interface for discovering the caller's current public IPv4
// address.
//
// ## Implementations
//
// - HTTP IP-echo service: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::AddressResolver;
//
// #[tokio::main]
// async fn main() -> ddns_core::Result<()> {
//     let resolver = /* AddressResolver implementation */;
//
//     let resolved = resolver.resolve().await?;
//     println!("Current address: {}", resolved.address());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::Ipv4Addr;

/// A validated public IPv4 address and the instant it was observed
///
/// Values are never mutated: each check produces a new instance.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAddress {
    address: Ipv4Addr,
    observed_at: DateTime<Utc>,
}

impl ResolvedAddress {
    /// Create a resolved address observed now
    pub fn new(address: Ipv4Addr) -> Self {
        Self::observed_at(address, Utc::now())
    }

    /// Create a resolved address with an explicit observation time
    pub fn observed_at(address: Ipv4Addr, observed_at: DateTime<Utc>) -> Self {
        Self {
            address,
            observed_at,
        }
    }

    /// The IPv4 address
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// When the address was observed
    pub fn observed(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Octet-wise comparison, ignoring observation time
    pub fn same_address(&self, other: &ResolvedAddress) -> bool {
        self.address.octets() == other.address.octets()
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.address.fmt(f)
    }
}

/// Trait for address resolver implementations
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform one request to the lookup endpoint per call
/// - ✅ Parse and validate the response
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by `UpdateScheduler`)
/// - ❌ Cache addresses between calls (the scheduler owns the last-known value)
/// - ❌ Decide whether a DNS update is needed
///
/// A failed lookup is returned as is; the next check tick tries again.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(ResolvedAddress)`: The validated address
    /// - `Err(Error::Network)`: The lookup endpoint could not be reached
    /// - `Err(Error::Parse)`: The response contained no valid IPv4 address
    async fn resolve(&self) -> Result<ResolvedAddress, crate::Error>;
}

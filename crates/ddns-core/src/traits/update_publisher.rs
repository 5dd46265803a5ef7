// # Update Publisher Trait
//
// Defines the interface for pushing an address update to the dynamic-DNS
// provider.
//
// ## Implementations
//
// - dy.fi: `ddns-provider-dyfi` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::UpdatePublisher;
//
// #[tokio::main]
// async fn main() -> ddns_core::Result<()> {
//     let publisher = /* UpdatePublisher implementation */;
//
//     let outcome = publisher.publish(&credentials, &resolved).await?;
//     outcome.into_result()?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;

use crate::config::Credentials;
use crate::error::Error;
use crate::traits::ResolvedAddress;

/// Classified result of a single publish attempt
///
/// Only [`UpdateOutcome::Accepted`] and [`UpdateOutcome::Unchanged`] are
/// successes. The remaining variants carry a human-readable explanation so
/// operators can diagnose without the provider's documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The provider applied the address
    Accepted,
    /// The address was already correct, no DNS change was made
    Unchanged,
    /// The provider refused the request (bad hostname, bad address, abuse)
    Rejected(String),
    /// The provider hit a technical problem on its side
    TransientFailure(String),
    /// The response violated the provider contract
    ProtocolError(String),
}

impl UpdateOutcome {
    /// Whether the provider confirmed the address
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Accepted | Self::Unchanged)
    }

    /// Convert failure outcomes into the matching caller-visible error
    pub fn into_result(self) -> Result<UpdateOutcome, Error> {
        match self {
            Self::Accepted | Self::Unchanged => Ok(self),
            Self::Rejected(reason) => Err(Error::rejected(reason)),
            Self::TransientFailure(reason) => Err(Error::transient(reason)),
            Self::ProtocolError(reason) => Err(Error::protocol(reason)),
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::TransientFailure(reason) => write!(f, "transient failure: {reason}"),
            Self::ProtocolError(reason) => write!(f, "protocol error: {reason}"),
        }
    }
}

/// Trait for update publisher implementations
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform exactly one HTTP request to the provider's update endpoint
/// - ✅ Classify the provider's response into an [`UpdateOutcome`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by `UpdateScheduler`)
/// - ❌ Track the last published address
/// - ❌ Spawn tasks or reuse connections across calls
/// - ❌ Log credentials
#[async_trait]
pub trait UpdatePublisher: Send + Sync {
    /// Publish the current address for the hostname in `credentials`
    ///
    /// The provider may infer the address from the connecting client; the
    /// `address` argument is what the caller believes it is publishing.
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateOutcome)`: The provider answered; the outcome classifies it
    /// - `Err(Error::Network)`: The provider could not be reached
    async fn publish(
        &self,
        credentials: &Credentials,
        address: &ResolvedAddress,
    ) -> Result<UpdateOutcome, Error>;

    /// Get the provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

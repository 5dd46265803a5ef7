//! Core traits for the DDNS agent
//!
//! This module defines the abstract interfaces the scheduler drives.
//!
//! - [`AddressResolver`]: Discover the current public IPv4 address
//! - [`UpdatePublisher`]: Push an update to the dynamic-DNS provider

pub mod address_resolver;
pub mod update_publisher;

pub use address_resolver::{AddressResolver, ResolvedAddress};
pub use update_publisher::{UpdateOutcome, UpdatePublisher};

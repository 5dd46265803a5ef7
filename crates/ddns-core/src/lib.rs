// # ddns-core
//
// Core library for the dy.fi dynamic DNS update agent.
//
// ## Architecture Overview
//
// - **AddressResolver**: Trait for discovering the current public IPv4 address
// - **UpdatePublisher**: Trait for pushing an update to the provider and
//   classifying its answer
// - **UpdateScheduler**: Owns the last-known address and decides when to
//   check and when to publish
// - **AgentConfig**: Typed, layered configuration (file, then CLI overrides)
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Policy lives in the scheduler, I/O in the implementations
// 2. **Single Source of Truth**: Only the scheduler holds the last-known address
// 3. **Schedule as Retry**: No component retries on its own; the next tick does
// 4. **Library-First**: The daemon is a thin shell over this crate

pub mod traits;
pub mod scheduler;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{AddressResolver, ResolvedAddress, UpdateOutcome, UpdatePublisher};
pub use scheduler::{
    CheckReport, PublishTrigger, SchedulePolicy, SchedulerEvent, SchedulerState, UpdateScheduler,
};
pub use config::{AgentConfig, ConfigOverrides, Credentials, FileConfig, ScheduleConfig};
pub use error::{Error, Result};

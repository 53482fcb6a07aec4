//! Fluent builder API for creating registries.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chainregistry_core::source::MemoryLogSource;
//! use chainregistry_evm::RegistryBuilder;
//!
//! # async fn run() -> Result<(), chainregistry_core::RegistryError> {
//! let registry = RegistryBuilder::new()
//!     .window_size(1000)
//!     .window_delay_ms(250)
//!     .confirmation_depth(12)
//!     .connect(Arc::new(MemoryLogSource::new(19_000_000)))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chainregistry_core::config::{ContractConfig, RegistryConfig};
use chainregistry_core::error::RegistryError;
use chainregistry_core::source::LogSource;

use crate::registry::Registry;

/// Fluent builder for `RegistryConfig`.
#[derive(Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            config: RegistryConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: RegistryConfig) -> Self {
        Self { config }
    }

    /// Set the id registry contract (`Register` events).
    pub fn id_registry(mut self, contract: ContractConfig) -> Self {
        self.config.id_registry = contract;
        self
    }

    /// Set the name registry contract (`Transfer` events).
    pub fn name_registry(mut self, contract: ContractConfig) -> Self {
        self.config.name_registry = contract;
        self
    }

    /// Set the starting block of both streams.
    pub fn deployment_block(mut self, block: u64) -> Self {
        self.config.id_registry.deployment_block = block;
        self.config.name_registry.deployment_block = block;
        self
    }

    /// Set the number of blocks per `eth_getLogs` window.
    pub fn window_size(mut self, size: u64) -> Self {
        self.config.window_size = size;
        self
    }

    /// Set the pause between windows in milliseconds.
    pub fn window_delay_ms(mut self, ms: u64) -> Self {
        self.config.window_delay_ms = ms;
        self
    }

    /// Set confirmation depth (blocks behind head before merging).
    pub fn confirmation_depth(mut self, depth: u64) -> Self {
        self.config.confirmation_depth = depth;
        self
    }

    /// Set the background refresh interval in milliseconds.
    pub fn refresh_interval_ms(mut self, ms: u64) -> Self {
        self.config.refresh_interval_ms = ms;
        self
    }

    /// Build the `RegistryConfig`.
    pub fn build_config(self) -> RegistryConfig {
        self.config
    }

    /// Build the config and run the initial sync against `source`.
    pub async fn connect(self, source: Arc<dyn LogSource>) -> Result<Registry, RegistryError> {
        Registry::connect(self.config, source).await
    }
}

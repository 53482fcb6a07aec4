//! Registry configuration: contract identities and scan tuning.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{address, b256, Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Farcaster IdRegistry on Ethereum mainnet.
pub const ID_REGISTRY_ADDRESS: Address = address!("da107a1caf36d198b12c16c7b6a1d1c795978c42");
/// Farcaster NameRegistry on Ethereum mainnet.
pub const NAME_REGISTRY_ADDRESS: Address = address!("e3be01d99baa8db9905b33a3ca391238234b79d1");
/// `Register(address,uint256,address,string)` signature hash.
pub const REGISTER_TOPIC: B256 =
    b256!("3cd6a0ffcc37406d9958e09bba79ff19d8237819eb2e1911f9edbce656499c87");
/// `Transfer(address,address,uint256)` signature hash.
pub const TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
/// Block both registries were deployed in.
pub const REGISTRY_DEPLOYMENT_BLOCK: u64 = 7_648_795;

/// One registry contract and the event it is scanned for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Contract address.
    pub address: Address,
    /// `topic0` of the event to scan for.
    pub topic: B256,
    /// First block that can contain events; the initial cursor.
    pub deployment_block: u64,
}

impl ContractConfig {
    pub fn new(address: Address, topic: B256, deployment_block: u64) -> Self {
        Self {
            address,
            topic,
            deployment_block,
        }
    }

    /// Build from hex strings, e.g. values read from the environment.
    pub fn parse(address: &str, topic: &str, deployment_block: u64) -> Result<Self, RegistryError> {
        let address = Address::from_str(address)
            .map_err(|e| RegistryError::Config(format!("bad contract address '{address}': {e}")))?;
        let topic = B256::from_str(topic)
            .map_err(|e| RegistryError::Config(format!("bad event topic '{topic}': {e}")))?;
        Ok(Self::new(address, topic, deployment_block))
    }
}

/// Configuration for a registry sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Contract emitting `Register` events (fid → address).
    pub id_registry: ContractConfig,
    /// Contract emitting `Transfer` events (fname → address).
    pub name_registry: ContractConfig,
    /// Blocks per `eth_getLogs` window.
    pub window_size: u64,
    /// Fixed pause between windows (milliseconds).
    pub window_delay_ms: u64,
    /// Blocks to stay behind the head. 0 = highest block wins.
    pub confirmation_depth: u64,
    /// Interval of the background refresh task (milliseconds).
    pub refresh_interval_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_registry: ContractConfig::new(
                ID_REGISTRY_ADDRESS,
                REGISTER_TOPIC,
                REGISTRY_DEPLOYMENT_BLOCK,
            ),
            name_registry: ContractConfig::new(
                NAME_REGISTRY_ADDRESS,
                TRANSFER_TOPIC,
                REGISTRY_DEPLOYMENT_BLOCK,
            ),
            window_size: 2000,
            window_delay_ms: 100,
            confirmation_depth: 0,
            refresh_interval_ms: 60_000,
        }
    }
}

impl RegistryConfig {
    pub fn window_delay(&self) -> Duration {
        Duration::from_millis(self.window_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Reject configurations that would scan nothing or scan the same stream twice.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.window_size == 0 {
            return Err(RegistryError::Config("window_size must be at least 1".into()));
        }
        if self.refresh_interval_ms == 0 {
            return Err(RegistryError::Config("refresh_interval_ms must be at least 1".into()));
        }
        let ids = &self.id_registry;
        let names = &self.name_registry;
        if ids.address == names.address && ids.topic == names.topic {
            return Err(RegistryError::Config(
                "id and name registries point at the same contract and topic".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_mainnet_registries() {
        let cfg = RegistryConfig::default();
        assert_eq!(cfg.window_size, 2000);
        assert_eq!(cfg.window_delay(), Duration::from_millis(100));
        assert_eq!(cfg.id_registry.deployment_block, 7_648_795);
        assert_eq!(
            format!("{:?}", cfg.name_registry.address).to_lowercase(),
            "0xe3be01d99baa8db9905b33a3ca391238234b79d1"
        );
        cfg.validate().unwrap();
    }

    #[test]
    fn parse_contract() {
        let c = ContractConfig::parse(
            "0xDA107A1CAF36D198B12C16C7B6A1D1C795978C42",
            "0x3cd6a0ffcc37406d9958e09bba79ff19d8237819eb2e1911f9edbce656499c87",
            1,
        )
        .unwrap();
        assert_eq!(c.address, ID_REGISTRY_ADDRESS);
        assert_eq!(c.topic, REGISTER_TOPIC);

        assert!(ContractConfig::parse("0x12", "0x00", 1).is_err());
    }

    #[test]
    fn validate_rejects_zero_window() {
        let cfg = RegistryConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(RegistryError::Config(_))));
    }

    #[test]
    fn validate_rejects_duplicate_streams() {
        let mut cfg = RegistryConfig::default();
        cfg.name_registry = cfg.id_registry.clone();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = RegistryConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RegistryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}

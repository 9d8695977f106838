//! Deployment configuration
//!
//! Loaded from TOML. Addresses are base58 strings and large amounts are
//! decimal strings, since TOML integers stop at i64.
//!
//! ```toml
//! owner = "4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi"
//! treasury = "8qbHbw2BbbTHBW1sbeqakYXVKRQM8Ne7pLK7m6CVfeR"
//! reward_asset = "CiDwVBFgWV9E5MvXWoLgnEgn2hK7rJikbvfWavzAQz3"
//! wrapped_native = "GcdayuLaLyrdmUu324nahyv33G5poQdLUEZ1nEytDeP"
//! start_block = 1000
//! reward_per_block = "25728640000000000000"
//! withdraw_fee_bps = 1000
//!
//! [split]
//! buy_and_burn_pct = 16
//! relationship_reward_pct = 39
//! vaults_saving_pct = 45
//!
//! [emission]
//! decay_interval_blocks = 20
//! coefficient = "985000000000"
//! max_decay_steps = 3
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math;
use crate::Address;

/// Percentages applied to every vault deposit. They must sum to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub buy_and_burn_pct: u8,
    pub relationship_reward_pct: u8,
    pub vaults_saving_pct: u8,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            buy_and_burn_pct: 16,
            relationship_reward_pct: 39,
            vaults_saving_pct: 45,
        }
    }
}

/// Emission decay parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionConfig {
    #[serde(default = "default_decay_interval")]
    pub decay_interval_blocks: u64,
    /// Scaled by 1e12
    #[serde(default = "default_coefficient", with = "decimal")]
    pub coefficient: u128,
    /// `None` disables the cap. An absent TOML key means the default of 3.
    #[serde(default = "default_max_decays")]
    pub max_decay_steps: Option<u32>,
}

fn default_decay_interval() -> u64 {
    20
}

fn default_coefficient() -> u128 {
    985_000_000_000
}

fn default_max_decays() -> Option<u32> {
    Some(3)
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            decay_interval_blocks: default_decay_interval(),
            coefficient: default_coefficient(),
            max_decay_steps: default_max_decays(),
        }
    }
}

impl EmissionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.decay_interval_blocks == 0 {
            return Err(ConfigError::Invalid("decay interval must be positive"));
        }
        if self.coefficient > math::COEFFICIENT_SCALE {
            return Err(ConfigError::Invalid("decay coefficient must not exceed 1e12"));
        }
        Ok(())
    }
}

/// Vault bank configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConfig {
    #[serde(with = "base58_address")]
    pub owner: Address,
    #[serde(with = "base58_address")]
    pub treasury: Address,
    #[serde(with = "base58_address")]
    pub reward_asset: Address,
    /// Want of the reserved native pool 0
    #[serde(with = "base58_address")]
    pub wrapped_native: Address,
    pub start_block: u64,
    #[serde(with = "decimal")]
    pub reward_per_block: u128,
    #[serde(default)]
    pub withdraw_fee_bps: u16,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub emission: EmissionConfig,
}

impl BankConfig {
    /// Config with default split, fee and emission parameters
    pub fn new(
        owner: Address,
        treasury: Address,
        reward_asset: Address,
        wrapped_native: Address,
        start_block: u64,
        reward_per_block: u128,
    ) -> Self {
        Self {
            owner,
            treasury,
            reward_asset,
            wrapped_native,
            start_block,
            reward_per_block,
            withdraw_fee_bps: 0,
            split: SplitConfig::default(),
            emission: EmissionConfig::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.split;
        let sum = s.buy_and_burn_pct as u16 + s.relationship_reward_pct as u16 + s.vaults_saving_pct as u16;
        if sum != 100 {
            return Err(ConfigError::Invalid("deposit split must sum to 100"));
        }
        if self.withdraw_fee_bps as u128 > math::BPS_DENOMINATOR {
            return Err(ConfigError::Invalid("withdraw fee must not exceed 10000 bps"));
        }
        self.emission.validate()
    }
}

/// Farming configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmingConfig {
    #[serde(with = "base58_address")]
    pub owner: Address,
    #[serde(with = "base58_address")]
    pub reward_asset: Address,
    pub start_block: u64,
    #[serde(with = "decimal")]
    pub reward_per_block: u128,
    #[serde(default)]
    pub emission: EmissionConfig,
}

impl FarmingConfig {
    pub fn new(owner: Address, reward_asset: Address, start_block: u64, reward_per_block: u128) -> Self {
        Self {
            owner,
            reward_asset,
            start_block,
            reward_per_block,
            emission: EmissionConfig::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.emission.validate()
    }
}

/// Decode a base58 string into a 32-byte address.
pub fn parse_address(s: &str) -> Result<Address, ConfigError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|_| ConfigError::Invalid("address is not valid base58"))?;
    Address::try_from(bytes.as_slice()).map_err(|_| ConfigError::Invalid("address must decode to 32 bytes"))
}

pub fn format_address(addr: &Address) -> String {
    bs58::encode(addr).into_string()
}

mod base58_address {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::Address;

    pub fn serialize<S: Serializer>(addr: &Address, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_address(addr))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
        let text = String::deserialize(d)?;
        super::parse_address(&text).map_err(de::Error::custom)
    }
}

mod decimal {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let text = String::deserialize(d)?;
        text.trim().replace('_', "").parse::<u128>().map_err(de::Error::custom)
    }
}

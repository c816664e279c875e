// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::app::config::EngineSettings;
use crate::common::parsing::parse_amount;
use crate::domain::error::{AppError, EngineError};
use crate::engine::claims::root_slot;
use crate::engine::context::Contract;
use crate::engine::ledger::Asset;
use crate::engine::world::{EngineConfig, World};
use alloy::primitives::{Address, B256, U256};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Amount as written in genesis files: decimal or 0x-hex string, or a plain integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenesisAmount(pub U256);

impl<'de> Deserialize<'de> for GenesisAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct AmountVisitor;

        impl Visitor<'_> for AmountVisitor {
            type Value = GenesisAmount;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a non-negative integer or a decimal/0x-hex string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                parse_amount(v)
                    .map(GenesisAmount)
                    .ok_or_else(|| E::custom(format!("invalid amount '{v}'")))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Ok(GenesisAmount(U256::from(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                u64::try_from(v)
                    .map(|v| GenesisAmount(U256::from(v)))
                    .map_err(|_| E::custom(format!("negative amount {v}")))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenesisAsset {
    pub symbol: String,
    pub address: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenesisAccount {
    #[serde(default)]
    pub label: Option<String>,
    pub address: Address,
    #[serde(default)]
    pub balances: BTreeMap<String, GenesisAmount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenesisForwarder {
    pub forwarder: Address,
    #[serde(default)]
    pub targets: Vec<Address>,
}

/// Initial accounts and balances a world is seeded with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Genesis {
    #[serde(default)]
    pub assets: Vec<GenesisAsset>,
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    #[serde(default)]
    pub forwarders: Vec<GenesisForwarder>,
}

impl Genesis {
    /// Load a genesis file; format follows the extension (toml, json, yaml).
    pub fn load(path: &str) -> Result<Self, AppError> {
        let p = Path::new(path);
        if !p.exists() {
            return Err(AppError::Genesis(format!("genesis file {path} not found")));
        }
        let genesis: Genesis = Config::builder()
            .add_source(File::from(p).required(true))
            .build()?
            .try_deserialize()?;
        genesis.validate()?;
        Ok(genesis)
    }

    pub fn from_toml(raw: &str) -> Result<Self, AppError> {
        let genesis: Genesis = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        genesis.validate()?;
        Ok(genesis)
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut symbols = HashSet::new();
        for asset in &self.assets {
            let symbol = asset.symbol.trim().to_ascii_uppercase();
            if symbol.is_empty() {
                return Err(AppError::Validation {
                    field: "assets.symbol".into(),
                    message: format!("empty symbol for {}", asset.address),
                });
            }
            if asset.address.is_zero() {
                return Err(AppError::InvalidAddress(format!(
                    "{} (zero address is reserved for the native asset)",
                    asset.symbol
                )));
            }
            if !symbols.insert(symbol.clone()) {
                return Err(AppError::Genesis(format!("duplicate asset symbol {symbol}")));
            }
        }
        Ok(())
    }
}

/// Setup-time access to a world. Minting, burning and deployment only exist
/// here; `build` seals the world.
#[derive(Debug)]
pub struct WorldBuilder {
    world: World,
}

impl WorldBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            world: World::new(config),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.engine_config())
    }

    /// Register assets, labels, balances and forwarder trust from `genesis`.
    pub fn from_genesis(config: EngineConfig, genesis: &Genesis) -> Result<Self, AppError> {
        let mut builder = Self::new(config);
        for asset in &genesis.assets {
            builder = builder.asset(Asset::Token(asset.address), &asset.symbol);
        }
        for account in &genesis.accounts {
            if let Some(label) = &account.label {
                builder = builder.label(account.address, label);
            }
            for (symbol, amount) in &account.balances {
                let asset = builder
                    .world
                    .ledger
                    .asset_by_symbol(symbol)
                    .ok_or_else(|| {
                        AppError::Genesis(format!(
                            "account {} holds unknown asset '{symbol}'",
                            account.address
                        ))
                    })?;
                builder = builder.mint(account.address, asset, amount.0)?;
            }
        }
        for entry in &genesis.forwarders {
            for target in &entry.targets {
                builder = builder.trust_forwarder(*target, entry.forwarder);
            }
        }
        tracing::info!(
            target: "engine",
            assets = genesis.assets.len(),
            accounts = genesis.accounts.len(),
            "Genesis applied"
        );
        Ok(builder)
    }

    pub fn asset(mut self, asset: Asset, symbol: &str) -> Self {
        self.world.ledger.register_asset(asset, symbol);
        self
    }

    pub fn label(mut self, account: Address, name: &str) -> Self {
        self.world.labels.insert(account, name.to_string());
        self
    }

    pub fn mint(mut self, to: Address, asset: Asset, amount: U256) -> Result<Self, EngineError> {
        self.world.ledger.mint(to, asset, amount)?;
        Ok(self)
    }

    pub fn burn(mut self, from: Address, asset: Asset, amount: U256) -> Result<Self, EngineError> {
        self.world.ledger.burn(from, asset, amount)?;
        Ok(self)
    }

    pub fn approve(mut self, owner: Address, spender: Address, asset: Asset, amount: U256) -> Self {
        self.world.ledger.set_allowance(owner, spender, asset, amount);
        self
    }

    pub fn deploy(mut self, address: Address, contract: impl Contract + 'static) -> Self {
        self.world.contracts.insert(address, Arc::new(contract));
        self
    }

    /// Let `target` honour sender suffixes appended by `forwarder`.
    pub fn trust_forwarder(mut self, target: Address, forwarder: Address) -> Self {
        self.world
            .trusted_forwarders
            .entry(target)
            .or_default()
            .insert(forwarder);
        self
    }

    pub fn storage(mut self, address: Address, slot: B256, value: U256) -> Self {
        if value.is_zero() {
            self.world.storage.remove(&(address, slot));
        } else {
            self.world.storage.insert((address, slot), value);
        }
        self
    }

    /// Seed the distribution root of `batch` for the claim ledger at `distributor`.
    pub fn claim_root(self, distributor: Address, batch: u64, root: B256) -> Self {
        self.storage(distributor, root_slot(batch), U256::from_be_bytes(root.0))
    }

    pub fn build(self) -> World {
        tracing::debug!(target: "engine", world = ?self.world, "World sealed");
        self.world
    }
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::parsing::parse_amount;
use crate::domain::constants;
use crate::domain::error::AppError;
use crate::engine::flash_loan::FeePolicy;
use crate::engine::world::{EngineConfig, RollbackMode};
use alloy::primitives::U256;
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct EngineSettings {
    // General
    #[serde(default = "default_debug")]
    pub debug: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    // Execution
    #[serde(default)]
    pub rollback_mode: RollbackMode,
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    #[serde(default)]
    pub genesis_timestamp: u64,
    pub genesis_path: Option<String>,

    // Meta-transactions
    #[serde(default = "default_forwarder_name")]
    pub forwarder_name: String,
    #[serde(default = "default_forwarder_version")]
    pub forwarder_version: String,

    // Flash loans
    #[serde(default)]
    pub flash_fee_bps: u64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub flash_fee_fixed: U256,
    #[serde(default = "default_false")]
    pub require_callback_ack: bool,
}

fn default_debug() -> bool {
    false
}
fn default_false() -> bool {
    false
}
fn default_log_level() -> String {
    constants::DEFAULT_LOG_LEVEL.to_string()
}
fn default_chain_id() -> u64 {
    constants::DEFAULT_CHAIN_ID
}
fn default_max_call_depth() -> usize {
    constants::DEFAULT_MAX_CALL_DEPTH
}
fn default_forwarder_name() -> String {
    constants::DEFAULT_FORWARDER_NAME.to_string()
}
fn default_forwarder_version() -> String {
    constants::DEFAULT_FORWARDER_VERSION.to_string()
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{Error, Visitor};
    use std::fmt;

    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = U256;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a non-negative integer or a decimal/0x-hex string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            parse_amount(v).ok_or_else(|| E::custom(format!("invalid amount '{v}'")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(U256::from(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u64::try_from(v)
                .map(U256::from)
                .map_err(|_| E::custom(format!("negative amount {v}")))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

impl EngineSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let selected_config = resolve_config_path(path);
        let mut builder = Config::builder();

        if let Some(ref selected_path) = selected_config {
            builder = builder.add_source(File::from(Path::new(selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Deterministic precedence: CLI (in main) > env/.env > selected profile file.
        builder = builder.add_source(Environment::default());

        let settings: EngineSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_call_depth == 0 {
            return Err(AppError::Config(
                "MAX_CALL_DEPTH must be at least 1".to_string(),
            ));
        }
        if self.flash_fee_bps > constants::BPS_DENOMINATOR {
            return Err(AppError::Config(format!(
                "FLASH_FEE_BPS {} exceeds {}",
                self.flash_fee_bps,
                constants::BPS_DENOMINATOR
            )));
        }
        if self.flash_fee_bps > 0 && !self.flash_fee_fixed.is_zero() {
            return Err(AppError::Config(
                "FLASH_FEE_BPS and FLASH_FEE_FIXED are mutually exclusive".to_string(),
            ));
        }
        if self.forwarder_name.trim().is_empty() {
            return Err(AppError::Config("FORWARDER_NAME is empty".to_string()));
        }
        if self.log_level.trim().is_empty() {
            return Err(AppError::Config("LOG_LEVEL is empty".to_string()));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            rollback_mode: self.rollback_mode,
            max_call_depth: self.max_call_depth,
            chain_id: self.chain_id,
            genesis_timestamp: self.genesis_timestamp,
        }
    }

    pub fn fee_policy(&self) -> FeePolicy {
        if !self.flash_fee_fixed.is_zero() {
            FeePolicy::Fixed(self.flash_fee_fixed)
        } else if self.flash_fee_bps > 0 {
            FeePolicy::BasisPoints(self.flash_fee_bps)
        } else {
            FeePolicy::Zero
        }
    }

    /// Effective log filter; `debug = true` bumps a bare `info` to `debug`.
    pub fn effective_log_level(&self) -> String {
        let level = self.log_level.trim();
        if self.debug && level.eq_ignore_ascii_case("info") {
            "debug".to_string()
        } else {
            level.to_string()
        }
    }

    pub fn genesis_path(&self) -> Option<String> {
        std::env::var("GENESIS_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.genesis_path
                    .as_ref()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
    }
}

fn resolve_config_path(path: Option<&str>) -> Option<String> {
    if let Some(path) = path {
        return Some(path.to_string());
    }
    detect_active_config_file()
}

fn detect_active_config_file() -> Option<String> {
    let priority_files = [
        "config.dev.toml",
        "config.example.toml",
        "config.toml",
    ];

    for file in priority_files.iter() {
        if let Some(true) = config_has_active_flag(file) {
            return Some((*file).to_string());
        }
    }

    // Fallback: scan current dir for config.*.toml with THIS_ACTIVE = true
    if let Ok(entries) = fs::read_dir(".") {
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && name.starts_with("config.")
                && name.ends_with(".toml")
                && let Some(true) = config_has_active_flag(name)
            {
                return Some(name.to_string());
            }
        }
    }

    None
}

fn config_has_active_flag(path: &str) -> Option<bool> {
    let p = Path::new(path);
    if !p.exists() {
        return None;
    }

    Config::builder()
        .add_source(File::from(p))
        .build()
        .ok()?
        .get_bool("THIS_ACTIVE")
        .ok()
}

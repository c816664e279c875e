// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::engine::ledger::Asset;
use alloy::primitives::{Address, U256};
use thiserror::Error;

/// Failures raised by the execution engine. Every variant aborts the enclosing
/// outer call; what survives of its effects depends on the world's rollback mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Insufficient {asset} balance for {account}. Required: {required}, Available: {available}")]
    InsufficientBalance {
        account: Address,
        asset: Asset,
        required: U256,
        available: U256,
    },

    #[error(
        "Insufficient {asset} allowance from {owner} to {spender}. Required: {required}, Available: {available}"
    )]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        asset: Asset,
        required: U256,
        available: U256,
    },

    #[error("Flash loan not repaid: pool {pool} holds {actual} {asset}, required {required}")]
    RepaymentNotMet {
        pool: Address,
        asset: Asset,
        required: U256,
        actual: U256,
    },

    #[error("Call into {target} failed: {reason}")]
    CallbackFailed { target: Address, reason: String },

    #[error("Call depth {depth} exceeds configured maximum {max}")]
    ReentrancyDepthExceeded { depth: usize, max: usize },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Request expired: deadline {deadline}, now {now}")]
    ExpiredRequest { deadline: U256, now: u64 },

    #[error("Nonce replay for {signer}: expected {expected}, got {got}")]
    NonceReplay {
        signer: Address,
        expected: U256,
        got: U256,
    },

    #[error("Claim already consumed: batch {batch}, index {index}")]
    AlreadyClaimed { batch: u64, index: u64 },

    #[error("Merkle proof rejected for {claimant} in batch {batch}")]
    InvalidProof { claimant: Address, batch: u64 },

    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(Asset),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Genesis error: {0}")]
    Genesis(String),

    #[error("Validation failed for field {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Address {0} is invalid")]
    InvalidAddress(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

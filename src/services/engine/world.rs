// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::{DEFAULT_CHAIN_ID, DEFAULT_MAX_CALL_DEPTH};
use crate::domain::error::EngineError;
use crate::engine::context::{CallContext, Contract};
use crate::engine::journal::{Checkpoint, Journal, JournalEntry};
use crate::engine::ledger::{Asset, Ledger, LedgerSnapshot};
use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub type ContractRef = Arc<dyn Contract>;

/// What a failing frame leaves behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackMode {
    /// Each frame is transactional: a failure undoes everything the frame wrote.
    #[default]
    Strict,
    /// Nothing is undone; effects before the failure point persist.
    Naive,
}

impl FromStr for RollbackMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" | "revert" | "transactional" => Ok(Self::Strict),
            "naive" | "partial" | "none" => Ok(Self::Naive),
            other => Err(format!("unknown rollback mode `{other}` (expected strict|naive)")),
        }
    }
}

impl fmt::Display for RollbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackMode::Strict => f.write_str("strict"),
            RollbackMode::Naive => f.write_str("naive"),
        }
    }
}

impl<'de> Deserialize<'de> for RollbackMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub rollback_mode: RollbackMode,
    pub max_call_depth: usize,
    pub chain_id: u64,
    pub genesis_timestamp: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rollback_mode: RollbackMode::Strict,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            chain_id: DEFAULT_CHAIN_ID,
            genesis_timestamp: 0,
        }
    }
}

/// One level of the call stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFrame {
    pub caller: Address,
    pub target: Address,
    pub input: Bytes,
    pub value: U256,
    pub depth: usize,
    /// Signer verified by a forwarder; set only by forwarder dispatch.
    pub forwarded_signer: Option<Address>,
}

/// Slot for a named storage variable.
pub fn named_slot(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

/// Slot for `mapping[key]` rooted at `base`, Solidity layout.
pub fn mapping_slot(base: B256, key: &[u8]) -> B256 {
    let mut preimage = Vec::with_capacity(key.len() + 32);
    preimage.extend_from_slice(key);
    preimage.extend_from_slice(base.as_slice());
    keccak256(preimage)
}

#[derive(Clone, Debug, Serialize)]
pub struct AssetSupply {
    pub symbol: String,
    pub token: Address,
    pub total_supply: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AccountBalances {
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub balances: BTreeMap<String, String>,
}

/// Serializable view of every non-zero balance, amounts as decimal strings.
#[derive(Clone, Debug, Serialize)]
pub struct BalanceReport {
    pub chain_id: u64,
    pub timestamp: u64,
    pub rollback_mode: RollbackMode,
    pub conserved: bool,
    pub assets: Vec<AssetSupply>,
    pub accounts: Vec<AccountBalances>,
}

/// The simulated chain: ledger, contract storage, deployed handlers and the
/// live call stack. Built once by `WorldBuilder`; afterwards only the
/// journaled entry points below mutate it.
pub struct World {
    pub(crate) config: EngineConfig,
    pub(crate) ledger: Ledger,
    pub(crate) storage: HashMap<(Address, B256), U256>,
    pub(crate) contracts: HashMap<Address, ContractRef>,
    pub(crate) trusted_forwarders: HashMap<Address, HashSet<Address>>,
    pub(crate) labels: HashMap<Address, String>,
    pub(crate) timestamp: u64,
    journal: Journal,
    frames: Vec<CallFrame>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("contracts", &self.contracts.len())
            .field("storage_slots", &self.storage.len())
            .field("depth", &self.frames.len())
            .field("open_checkpoints", &self.journal.depth())
            .field("journal_entries", &self.journal.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl World {
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ledger: Ledger::new(),
            storage: HashMap::new(),
            contracts: HashMap::new(),
            trusted_forwarders: HashMap::new(),
            labels: HashMap::new(),
            timestamp: config.genesis_timestamp,
            journal: Journal::default(),
            frames: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rollback_mode(&self) -> RollbackMode {
        self.config.rollback_mode
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn now(&self) -> u64 {
        self.timestamp
    }

    /// Move the clock forward. Time never runs backwards.
    pub fn warp(&mut self, timestamp: u64) {
        self.timestamp = self.timestamp.max(timestamp);
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn label(&self, account: Address) -> Option<&str> {
        self.labels.get(&account).map(String::as_str)
    }

    pub fn has_code(&self, account: Address) -> bool {
        self.contracts.contains_key(&account)
    }

    pub fn is_trusted_forwarder(&self, target: Address, forwarder: Address) -> bool {
        self.trusted_forwarders
            .get(&target)
            .is_some_and(|set| set.contains(&forwarder))
    }

    pub fn balance_of(&self, account: Address, asset: Asset) -> U256 {
        self.ledger.balance_of(account, asset)
    }

    pub fn total_supply(&self, asset: Asset) -> U256 {
        self.ledger.total_supply(asset)
    }

    pub fn allowance(&self, owner: Address, spender: Address, asset: Asset) -> U256 {
        self.ledger.allowance(owner, spender, asset)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    pub fn report(&self) -> BalanceReport {
        let snapshot = self.ledger.snapshot();
        let assets = self
            .ledger
            .assets()
            .map(|(asset, symbol)| AssetSupply {
                symbol: symbol.to_string(),
                token: asset.token_address(),
                total_supply: self.ledger.total_supply(asset).to_string(),
            })
            .collect();

        let mut accounts: BTreeMap<Address, AccountBalances> = BTreeMap::new();
        for (address, asset, amount) in snapshot.entries() {
            let symbol = self
                .ledger
                .symbol(asset)
                .map(str::to_string)
                .unwrap_or_else(|| asset.to_string());
            accounts
                .entry(address)
                .or_insert_with(|| AccountBalances {
                    address,
                    label: self.labels.get(&address).cloned(),
                    balances: BTreeMap::new(),
                })
                .balances
                .insert(symbol, amount.to_string());
        }

        BalanceReport {
            chain_id: self.config.chain_id,
            timestamp: self.timestamp,
            rollback_mode: self.config.rollback_mode,
            conserved: snapshot.is_conserved(),
            assets,
            accounts: accounts.into_values().collect(),
        }
    }

    pub fn sload(&self, address: Address, slot: B256) -> U256 {
        self.storage
            .get(&(address, slot))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn sstore(&mut self, address: Address, slot: B256, value: U256) {
        let previous = self.sload(address, slot);
        if previous == value {
            return;
        }
        self.journal.record(JournalEntry::Storage {
            address,
            slot,
            previous,
        });
        self.write_slot(address, slot, value);
    }

    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), EngineError> {
        let from_before = self.ledger.balance_of(from, asset);
        let to_before = self.ledger.balance_of(to, asset);
        self.ledger.transfer(from, to, asset, amount)?;
        if from != to && !amount.is_zero() {
            self.journal.record(JournalEntry::Balance {
                account: from,
                asset,
                previous: from_before,
            });
            self.journal.record(JournalEntry::Balance {
                account: to,
                asset,
                previous: to_before,
            });
        }
        tracing::trace!(target: "ledger", %from, %to, %asset, %amount, "transfer");
        Ok(())
    }

    pub fn approve(
        &mut self,
        owner: Address,
        spender: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), EngineError> {
        self.ledger.ensure_supported(asset)?;
        let previous = self.ledger.allowance(owner, spender, asset);
        self.journal.record(JournalEntry::Allowance {
            owner,
            spender,
            asset,
            previous,
        });
        self.ledger.set_allowance(owner, spender, asset, amount);
        Ok(())
    }

    /// ERC-20 style pull: `spender` moves `from`'s funds within its allowance.
    /// `U256::MAX` allowances are never decremented.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), EngineError> {
        let allowed = self.ledger.allowance(from, spender, asset);
        if spender != from && allowed < amount {
            return Err(EngineError::InsufficientAllowance {
                owner: from,
                spender,
                asset,
                required: amount,
                available: allowed,
            });
        }
        self.transfer(from, to, asset, amount)?;
        if spender != from && allowed != U256::MAX {
            self.journal.record(JournalEntry::Allowance {
                owner: from,
                spender,
                asset,
                previous: allowed,
            });
            self.ledger
                .set_allowance(from, spender, asset, allowed - amount);
        }
        Ok(())
    }

    /// Execute a call as its own frame: move `value` of the native asset to
    /// `target`, run its handler and pop the frame whatever the outcome.
    /// Accounts without a handler accept the value and return nothing.
    pub fn invoke(
        &mut self,
        caller: Address,
        target: Address,
        input: impl Into<Bytes>,
        value: U256,
    ) -> Result<Bytes, EngineError> {
        self.enter(caller, target, input.into(), value, None)
    }

    pub(crate) fn invoke_forwarded(
        &mut self,
        forwarder: Address,
        target: Address,
        input: Bytes,
        value: U256,
        signer: Address,
    ) -> Result<Bytes, EngineError> {
        self.enter(forwarder, target, input, value, Some(signer))
    }

    /// Run `op` as one outer call. On error the configured rollback mode decides
    /// whether its writes are undone.
    pub fn atomic<T, F>(&mut self, op: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut World) -> Result<T, EngineError>,
    {
        let checkpoint = self.journal.checkpoint();
        let result = op(self);
        self.settle(checkpoint, &result);
        result
    }

    fn enter(
        &mut self,
        caller: Address,
        target: Address,
        input: Bytes,
        value: U256,
        forwarded_signer: Option<Address>,
    ) -> Result<Bytes, EngineError> {
        let depth = self.frames.len() + 1;
        if depth > self.config.max_call_depth {
            tracing::warn!(
                target: "engine",
                %caller,
                callee = %target,
                depth,
                max = self.config.max_call_depth,
                "Call depth limit hit"
            );
            return Err(EngineError::ReentrancyDepthExceeded {
                depth,
                max: self.config.max_call_depth,
            });
        }

        let frame = CallFrame {
            caller,
            target,
            input,
            value,
            depth,
            forwarded_signer,
        };
        tracing::debug!(
            target: "engine",
            %caller,
            callee = %target,
            %value,
            depth,
            forwarded = forwarded_signer.is_some(),
            "call enter"
        );

        let checkpoint = self.journal.checkpoint();
        self.frames.push(frame.clone());
        let result = self.run_frame(frame);
        self.frames.pop();
        self.settle(checkpoint, &result);

        match &result {
            Ok(out) => tracing::debug!(
                target: "engine",
                callee = %target,
                depth,
                returned = out.len(),
                "call exit"
            ),
            Err(err) => tracing::debug!(
                target: "engine",
                callee = %target,
                depth,
                error = %err,
                "call failed"
            ),
        }
        result
    }

    fn run_frame(&mut self, frame: CallFrame) -> Result<Bytes, EngineError> {
        if !frame.value.is_zero() {
            self.transfer(frame.caller, frame.target, Asset::Native, frame.value)?;
        }
        let Some(handler) = self.contracts.get(&frame.target).cloned() else {
            return Ok(Bytes::new());
        };
        let forwarded = frame.forwarded_signer.is_some()
            && self.is_trusted_forwarder(frame.target, frame.caller);
        let mut ctx = CallContext::new(self, frame, forwarded);
        let input = Bytes::copy_from_slice(ctx.msg_data());
        handler.call(&mut ctx, &input)
    }

    fn settle<T>(&mut self, checkpoint: Checkpoint, result: &Result<T, EngineError>) {
        match (result, self.config.rollback_mode) {
            (Err(err), RollbackMode::Strict) => {
                let undone = self.journal.revert(checkpoint);
                let entries = undone.len();
                for entry in undone {
                    self.undo(entry);
                }
                if entries > 0 {
                    tracing::warn!(
                        target: "engine",
                        error = %err,
                        entries,
                        depth = self.frames.len(),
                        "Rolled back failed call"
                    );
                }
            }
            (Err(err), RollbackMode::Naive) => {
                tracing::debug!(
                    target: "engine",
                    error = %err,
                    depth = self.frames.len(),
                    "Failed call effects retained (naive mode)"
                );
                self.journal.commit(checkpoint);
            }
            (Ok(_), _) => self.journal.commit(checkpoint),
        }
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Balance {
                account,
                asset,
                previous,
            } => self.ledger.set_balance(account, asset, previous),
            JournalEntry::Allowance {
                owner,
                spender,
                asset,
                previous,
            } => self.ledger.set_allowance(owner, spender, asset, previous),
            JournalEntry::Storage {
                address,
                slot,
                previous,
            } => self.write_slot(address, slot, previous),
        }
    }

    fn write_slot(&mut self, address: Address, slot: B256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(address, slot));
        } else {
            self.storage.insert((address, slot), value);
        }
    }
}

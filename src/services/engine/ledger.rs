// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::NATIVE_SYMBOL;
use crate::domain::error::EngineError;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A fungible unit tracked by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Token(Address),
}

impl Asset {
    /// ABI representation: the zero address stands for the native asset.
    pub fn token_address(&self) -> Address {
        match self {
            Asset::Native => Address::ZERO,
            Asset::Token(addr) => *addr,
        }
    }

    pub fn from_token_address(addr: Address) -> Self {
        if addr.is_zero() {
            Asset::Native
        } else {
            Asset::Token(addr)
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str("native"),
            Asset::Token(addr) => write!(f, "token {addr}"),
        }
    }
}

/// Balances, allowances and supply for every registered asset.
///
/// Mutation goes through `World`, which journals each write; the raw setters
/// here are crate-private so nothing outside the engine can bypass the journal.
#[derive(Debug, Clone)]
pub struct Ledger {
    assets: BTreeMap<Asset, String>,
    balances: HashMap<(Address, Asset), U256>,
    allowances: HashMap<(Address, Address, Asset), U256>,
    supply: HashMap<Asset, U256>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        let mut assets = BTreeMap::new();
        assets.insert(Asset::Native, NATIVE_SYMBOL.to_string());
        Self {
            assets,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            supply: HashMap::new(),
        }
    }

    pub(crate) fn register_asset(&mut self, asset: Asset, symbol: &str) {
        self.assets
            .insert(asset, symbol.trim().to_ascii_uppercase());
    }

    pub fn is_supported(&self, asset: Asset) -> bool {
        self.assets.contains_key(&asset)
    }

    pub fn ensure_supported(&self, asset: Asset) -> Result<(), EngineError> {
        if self.is_supported(asset) {
            Ok(())
        } else {
            Err(EngineError::UnsupportedAsset(asset))
        }
    }

    pub fn symbol(&self, asset: Asset) -> Option<&str> {
        self.assets.get(&asset).map(String::as_str)
    }

    /// Case-insensitive symbol lookup.
    pub fn asset_by_symbol(&self, symbol: &str) -> Option<Asset> {
        let wanted = symbol.trim();
        self.assets
            .iter()
            .find(|(_, s)| s.eq_ignore_ascii_case(wanted))
            .map(|(asset, _)| *asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = (Asset, &str)> {
        self.assets.iter().map(|(a, s)| (*a, s.as_str()))
    }

    pub fn balance_of(&self, account: Address, asset: Asset) -> U256 {
        self.balances
            .get(&(account, asset))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self, asset: Asset) -> U256 {
        self.supply.get(&asset).copied().unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, owner: Address, spender: Address, asset: Asset) -> U256 {
        self.allowances
            .get(&(owner, spender, asset))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Debit `from` and credit `to`. Both writes happen after every check, so a
    /// failing transfer leaves the ledger untouched.
    pub(crate) fn transfer(
        &mut self,
        from: Address,
        to: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), EngineError> {
        self.ensure_supported(asset)?;
        let available = self.balance_of(from, asset);
        if available < amount {
            return Err(EngineError::InsufficientBalance {
                account: from,
                asset,
                required: amount,
                available,
            });
        }
        if from == to || amount.is_zero() {
            return Ok(());
        }
        let credited = self
            .balance_of(to, asset)
            .checked_add(amount)
            .ok_or_else(|| EngineError::Overflow(format!("credit of {amount} {asset} to {to}")))?;
        self.set_balance(from, asset, available - amount);
        self.set_balance(to, asset, credited);
        Ok(())
    }

    pub(crate) fn mint(
        &mut self,
        to: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), EngineError> {
        self.ensure_supported(asset)?;
        let supply = self
            .total_supply(asset)
            .checked_add(amount)
            .ok_or_else(|| EngineError::Overflow(format!("supply of {asset}")))?;
        // Supply bounds every balance, so the credit cannot overflow once supply fits.
        let balance = self.balance_of(to, asset) + amount;
        self.supply.insert(asset, supply);
        self.set_balance(to, asset, balance);
        Ok(())
    }

    pub(crate) fn burn(
        &mut self,
        from: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), EngineError> {
        self.ensure_supported(asset)?;
        let available = self.balance_of(from, asset);
        if available < amount {
            return Err(EngineError::InsufficientBalance {
                account: from,
                asset,
                required: amount,
                available,
            });
        }
        let supply = self.total_supply(asset) - amount;
        self.supply.insert(asset, supply);
        self.set_balance(from, asset, available - amount);
        Ok(())
    }

    pub(crate) fn set_balance(&mut self, account: Address, asset: Asset, value: U256) {
        if value.is_zero() {
            self.balances.remove(&(account, asset));
        } else {
            self.balances.insert((account, asset), value);
        }
    }

    pub(crate) fn set_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        asset: Asset,
        value: U256,
    ) {
        if value.is_zero() {
            self.allowances.remove(&(owner, spender, asset));
        } else {
            self.allowances.insert((owner, spender, asset), value);
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balances: self
                .balances
                .iter()
                .map(|(key, value)| (*key, *value))
                .collect(),
            supply: self.supply.iter().map(|(a, v)| (*a, *v)).collect(),
        }
    }
}

/// Immutable copy of every non-zero balance, used by invariant predicates and reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    balances: BTreeMap<(Address, Asset), U256>,
    supply: BTreeMap<Asset, U256>,
}

impl LedgerSnapshot {
    pub fn balance_of(&self, account: Address, asset: Asset) -> U256 {
        self.balances
            .get(&(account, asset))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self, asset: Asset) -> U256 {
        self.supply.get(&asset).copied().unwrap_or(U256::ZERO)
    }

    /// Sum of all account balances of `asset`; saturates instead of wrapping.
    pub fn sum_balances(&self, asset: Asset) -> U256 {
        self.balances
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .fold(U256::ZERO, |acc, (_, v)| acc.saturating_add(*v))
    }

    /// True when the recorded supply of every asset equals the sum of its balances.
    pub fn is_conserved(&self) -> bool {
        self.supply
            .iter()
            .all(|(asset, supply)| self.sum_balances(*asset) == *supply)
    }

    pub fn entries(&self) -> impl Iterator<Item = (Address, Asset, U256)> + '_ {
        self.balances.iter().map(|((acct, asset), v)| (*acct, *asset, *v))
    }
}

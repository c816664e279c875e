// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::app::config::EngineSettings;
use crate::data::abi::IERC3156FlashBorrower;
use crate::domain::constants::{BPS_DENOMINATOR, FLASH_CALLBACK_TAG};
use crate::domain::error::EngineError;
use crate::engine::invariants::{BalanceDelta, LoanInvariant};
use crate::engine::ledger::Asset;
use crate::engine::world::World;
use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy::sol_types::SolCall;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Value a borrower returns from `onFlashLoan` to acknowledge the loan.
pub fn flash_ack() -> B256 {
    keccak256(FLASH_CALLBACK_TAG.as_bytes())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeePolicy {
    #[default]
    Zero,
    /// Flat fee regardless of amount.
    Fixed(U256),
    BasisPoints(u64),
}

impl FeePolicy {
    pub fn fee_for(&self, amount: U256) -> Result<U256, EngineError> {
        match self {
            FeePolicy::Zero => Ok(U256::ZERO),
            FeePolicy::Fixed(fee) => Ok(*fee),
            FeePolicy::BasisPoints(bps) => amount
                .checked_mul(U256::from(*bps))
                .map(|scaled| scaled / U256::from(BPS_DENOMINATOR))
                .ok_or_else(|| EngineError::Overflow(format!("fee on {amount} at {bps} bps"))),
        }
    }
}

/// One loan in flight. Lives for the duration of `flash_loan`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashLoanSession {
    pub initiator: Address,
    pub pool: Address,
    pub borrower: Address,
    pub asset: Asset,
    pub amount: U256,
    pub fee: U256,
    pub balance_before: U256,
}

impl FlashLoanSession {
    /// Minimum pool balance once the borrower returns.
    pub fn required_balance(&self) -> Result<U256, EngineError> {
        self.balance_before
            .checked_add(self.fee)
            .ok_or_else(|| EngineError::Overflow(format!("repayment for pool {}", self.pool)))
    }
}

#[derive(Clone)]
pub struct FlashLoanEngine {
    fee: FeePolicy,
    require_ack: bool,
    supported: Option<BTreeSet<Asset>>,
    invariant: Arc<dyn LoanInvariant>,
}

impl Default for FlashLoanEngine {
    fn default() -> Self {
        Self::new(FeePolicy::Zero)
    }
}

impl std::fmt::Debug for FlashLoanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashLoanEngine")
            .field("fee", &self.fee)
            .field("require_ack", &self.require_ack)
            .field("supported", &self.supported)
            .field("invariant", &self.invariant.name())
            .finish()
    }
}

impl FlashLoanEngine {
    pub fn new(fee: FeePolicy) -> Self {
        Self {
            fee,
            require_ack: false,
            supported: None,
            invariant: Arc::new(BalanceDelta),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.fee_policy()).with_ack(settings.require_callback_ack)
    }

    /// Demand the ERC-3156 acknowledgement from the borrower.
    pub fn with_ack(mut self, require_ack: bool) -> Self {
        self.require_ack = require_ack;
        self
    }

    pub fn with_supported_assets(mut self, assets: impl IntoIterator<Item = Asset>) -> Self {
        self.supported = Some(assets.into_iter().collect());
        self
    }

    pub fn with_invariant(mut self, invariant: impl LoanInvariant + 'static) -> Self {
        self.invariant = Arc::new(invariant);
        self
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.fee
    }

    pub fn fee_for(&self, amount: U256) -> Result<U256, EngineError> {
        self.fee.fee_for(amount)
    }

    pub fn supports(&self, asset: Asset) -> bool {
        self.supported
            .as_ref()
            .is_none_or(|set| set.contains(&asset))
    }

    /// Largest amount `pool` can lend right now.
    pub fn max_flash_loan(&self, world: &World, pool: Address, asset: Asset) -> U256 {
        if !self.supports(asset) || !world.ledger().is_supported(asset) {
            return U256::ZERO;
        }
        world.balance_of(pool, asset)
    }

    /// Lend `amount` of `asset` from `pool` to `borrower`, call its
    /// `onFlashLoan` and check the configured invariant once it returns.
    pub fn flash_loan(
        &self,
        world: &mut World,
        initiator: Address,
        pool: Address,
        borrower: Address,
        asset: Asset,
        amount: U256,
        data: impl Into<Bytes>,
    ) -> Result<FlashLoanSession, EngineError> {
        let data = data.into();
        world.atomic(|world| {
            if !self.supports(asset) {
                return Err(EngineError::UnsupportedAsset(asset));
            }
            world.ledger().ensure_supported(asset)?;

            let session = FlashLoanSession {
                initiator,
                pool,
                borrower,
                asset,
                amount,
                fee: self.fee_for(amount)?,
                balance_before: world.balance_of(pool, asset),
            };
            tracing::debug!(
                target: "flash_loan",
                %pool,
                %borrower,
                %asset,
                %amount,
                fee = %session.fee,
                invariant = self.invariant.name(),
                "Flash loan start"
            );

            self.invariant.pre_loan(world, &session)?;
            world.transfer(pool, borrower, asset, amount)?;

            let calldata = IERC3156FlashBorrower::onFlashLoanCall {
                initiator,
                token: asset.token_address(),
                amount,
                fee: session.fee,
                data,
            }
            .abi_encode();
            let returned = world.invoke(pool, borrower, calldata, U256::ZERO)?;

            if self.require_ack && !is_ack(&returned) {
                return Err(EngineError::CallbackFailed {
                    target: borrower,
                    reason: "onFlashLoan did not return the ERC-3156 acknowledgement".into(),
                });
            }

            if let Err(err) = self.invariant.post_callback(world, &session) {
                tracing::warn!(
                    target: "flash_loan",
                    %pool,
                    %borrower,
                    error = %err,
                    "Flash loan invariant violated"
                );
                return Err(err);
            }
            tracing::info!(
                target: "flash_loan",
                %pool,
                %borrower,
                %amount,
                fee = %session.fee,
                "Flash loan settled"
            );
            Ok(session)
        })
    }
}

fn is_ack(returned: &[u8]) -> bool {
    returned.len() == 32 && B256::from_slice(returned) == flash_ack()
}

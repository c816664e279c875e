// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

pub mod claims;
pub mod context;
pub mod flash_loan;
pub mod forwarder;
pub mod genesis;
pub mod invariants;
pub(crate) mod journal;
pub mod ledger;
pub mod multicall;
pub mod world;

pub mod prelude {
    pub use super::claims::{Claim, ClaimLedger};
    pub use super::context::{CallContext, Contract, handler};
    pub use super::flash_loan::{FeePolicy, FlashLoanEngine, FlashLoanSession, flash_ack};
    pub use super::forwarder::MetaTxForwarder;
    pub use super::genesis::{Genesis, WorldBuilder};
    pub use super::invariants::{AllOf, BalanceDelta, CustomInvariant, LoanInvariant};
    pub use super::ledger::{Asset, LedgerSnapshot};
    pub use super::multicall::{Batcher, CallResult};
    pub use super::world::{BalanceReport, CallFrame, EngineConfig, RollbackMode, World};
    pub use crate::data::abi::ForwardRequest;
    pub use crate::domain::error::EngineError;
}

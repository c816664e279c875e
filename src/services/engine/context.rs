// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::FORWARDED_SENDER_SUFFIX_LEN;
use crate::domain::error::EngineError;
use crate::engine::ledger::Asset;
use crate::engine::world::{CallFrame, World};
use alloy::primitives::{Address, B256, Bytes, U256};

/// Behaviour attached to an address. Scenario contracts implement this; the
/// world calls it once per frame targeting that address.
pub trait Contract: Send + Sync {
    fn call(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, EngineError>;
}

/// Closure-backed contract, see [`handler`].
pub struct FnContract<F>(F);

impl<F> Contract for FnContract<F>
where
    F: Fn(&mut CallContext<'_>, &[u8]) -> Result<Bytes, EngineError> + Send + Sync,
{
    fn call(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, EngineError> {
        (self.0)(ctx, input)
    }
}

pub fn handler<F>(f: F) -> FnContract<F>
where
    F: Fn(&mut CallContext<'_>, &[u8]) -> Result<Bytes, EngineError> + Send + Sync,
{
    FnContract(f)
}

/// View of the world from inside a running frame.
pub struct CallContext<'w> {
    world: &'w mut World,
    frame: CallFrame,
    forwarded: bool,
}

impl<'w> CallContext<'w> {
    pub(crate) fn new(world: &'w mut World, frame: CallFrame, forwarded: bool) -> Self {
        Self {
            world,
            frame,
            forwarded,
        }
    }

    /// Address of the contract being executed.
    pub fn address(&self) -> Address {
        self.frame.target
    }

    /// Immediate caller of this frame.
    pub fn caller(&self) -> Address {
        self.frame.caller
    }

    pub fn value(&self) -> U256 {
        self.frame.value
    }

    pub fn depth(&self) -> usize {
        self.frame.depth
    }

    pub fn frame(&self) -> &CallFrame {
        &self.frame
    }

    /// Calldata exactly as received, including any forwarder suffix.
    pub fn raw_input(&self) -> &[u8] {
        &self.frame.input
    }

    /// True when a trusted forwarder dispatched this frame after verifying a signature.
    pub fn is_forwarded(&self) -> bool {
        self.forwarded
    }

    /// Effective sender. The signer appended by a forwarder is honoured only
    /// when the immediate caller is a forwarder this contract trusts and the
    /// frame came out of `MetaTxForwarder::execute`; trailing bytes from any
    /// other caller are just calldata.
    pub fn msg_sender(&self) -> Address {
        match self.frame.forwarded_signer {
            Some(signer) if self.forwarded => signer,
            _ => self.frame.caller,
        }
    }

    pub fn msg_data(&self) -> &[u8] {
        let input = &self.frame.input[..];
        if self.forwarded && input.len() >= FORWARDED_SENDER_SUFFIX_LEN {
            &input[..input.len() - FORWARDED_SENDER_SUFFIX_LEN]
        } else {
            input
        }
    }

    pub fn now(&self) -> u64 {
        self.world.now()
    }

    pub fn balance_of(&self, account: Address, asset: Asset) -> U256 {
        self.world.balance_of(account, asset)
    }

    pub fn self_balance(&self, asset: Asset) -> U256 {
        self.world.balance_of(self.address(), asset)
    }

    /// Send funds held by this contract.
    pub fn transfer(&mut self, to: Address, asset: Asset, amount: U256) -> Result<(), EngineError> {
        let from = self.address();
        self.world.transfer(from, to, asset, amount)
    }

    /// Pull funds from `from` using this contract's allowance.
    pub fn transfer_from(
        &mut self,
        from: Address,
        to: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), EngineError> {
        let spender = self.address();
        self.world.transfer_from(spender, from, to, asset, amount)
    }

    pub fn approve(
        &mut self,
        spender: Address,
        asset: Asset,
        amount: U256,
    ) -> Result<(), EngineError> {
        let owner = self.address();
        self.world.approve(owner, spender, asset, amount)
    }

    pub fn sload(&self, slot: B256) -> U256 {
        self.world.sload(self.address(), slot)
    }

    pub fn sstore(&mut self, slot: B256, value: U256) {
        let address = self.address();
        self.world.sstore(address, slot, value);
    }

    /// Call out as this contract. Nested frames see every effect made so far.
    pub fn call(
        &mut self,
        target: Address,
        input: impl Into<Bytes>,
        value: U256,
    ) -> Result<Bytes, EngineError> {
        let caller = self.address();
        self.world.invoke(caller, target, input, value)
    }

    /// Full world access, for handlers driving engine primitives (flash loans,
    /// multicalls) from inside a frame.
    pub fn world(&mut self) -> &mut World {
        &mut *self.world
    }

    /// Failure raised by this contract.
    pub fn revert(&self, reason: impl Into<String>) -> EngineError {
        EngineError::CallbackFailed {
            target: self.address(),
            reason: reason.into(),
        }
    }
}

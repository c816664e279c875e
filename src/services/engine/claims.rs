// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::{CLAIM_BITMAP_NAMESPACE, CLAIM_ROOT_NAMESPACE, CLAIM_WORD_BITS};
use crate::domain::error::EngineError;
use crate::engine::ledger::Asset;
use crate::engine::world::{World, mapping_slot, named_slot};
use alloy::primitives::{Address, B256, U256, keccak256};

/// Word and mask for claim `index` inside its batch bitmap.
pub fn bitmap_position(index: u64) -> (u64, U256) {
    let word = index / CLAIM_WORD_BITS;
    let mask = U256::from(1u64) << (index % CLAIM_WORD_BITS) as usize;
    (word, mask)
}

/// Leaf committed in a distribution tree:
/// `keccak256(abi.encodePacked(uint256 index, claimant, amount))`.
pub fn leaf(index: u64, claimant: Address, amount: U256) -> B256 {
    let mut packed = [0u8; 84];
    packed[..32].copy_from_slice(&U256::from(index).to_be_bytes::<32>());
    packed[32..52].copy_from_slice(claimant.as_slice());
    packed[52..].copy_from_slice(&amount.to_be_bytes::<32>());
    keccak256(packed)
}

/// Commutative node hash; children are sorted before hashing.
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

pub fn verify_proof(root: B256, leaf: B256, proof: &[B256]) -> bool {
    proof.iter().fold(leaf, |acc, node| hash_pair(acc, *node)) == root
}

pub fn root_slot(batch: u64) -> B256 {
    mapping_slot(named_slot(CLAIM_ROOT_NAMESPACE), &U256::from(batch).to_be_bytes::<32>())
}

/// `bitmaps[claimant][batch][word]`
fn bitmap_slot(claimant: Address, batch: u64, word: u64) -> B256 {
    let claimant_base = mapping_slot(
        named_slot(CLAIM_BITMAP_NAMESPACE),
        claimant.into_word().as_slice(),
    );
    let batch_base = mapping_slot(claimant_base, &U256::from(batch).to_be_bytes::<32>());
    mapping_slot(batch_base, &U256::from(word).to_be_bytes::<32>())
}

/// One entry for `ClaimLedger::claim_many`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    pub batch: u64,
    pub index: u64,
    pub asset: Asset,
    pub amount: U256,
    pub proof: Vec<B256>,
}

/// Exactly-once reward claims. Bitmaps, roots and the reward pool all live
/// under `address`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimLedger {
    address: Address,
}

impl ClaimLedger {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_claimed(&self, world: &World, claimant: Address, batch: u64, index: u64) -> bool {
        let (word, mask) = bitmap_position(index);
        !(world.sload(self.address, bitmap_slot(claimant, batch, word)) & mask).is_zero()
    }

    pub fn root(&self, world: &World, batch: u64) -> B256 {
        B256::from(world.sload(self.address, root_slot(batch)))
    }

    pub fn publish_root(&self, world: &mut World, batch: u64, root: B256) {
        world.sstore(self.address, root_slot(batch), U256::from_be_bytes(root.0));
        tracing::info!(target: "claims", batch, %root, "Published distribution root");
    }

    /// Pay `amount` of `asset` to `claimant` for (`batch`, `index`) unless it
    /// was already consumed. The bit is checked, the payout made and the bit
    /// set with no external call in between.
    pub fn try_consume(
        &self,
        world: &mut World,
        claimant: Address,
        asset: Asset,
        batch: u64,
        index: u64,
        amount: U256,
    ) -> Result<bool, EngineError> {
        world.atomic(|world| self.consume(world, claimant, asset, batch, index, amount))
    }

    /// `try_consume` gated on a merkle proof against the batch root. The
    /// leaf commits to `index`, so a proof only unlocks its own coordinate.
    pub fn claim(
        &self,
        world: &mut World,
        claimant: Address,
        asset: Asset,
        batch: u64,
        index: u64,
        amount: U256,
        proof: &[B256],
    ) -> Result<bool, EngineError> {
        world.atomic(|world| {
            self.check_proof(world, claimant, batch, index, amount, proof)?;
            self.consume(world, claimant, asset, batch, index, amount)
        })
    }

    /// Process a list of claims as one outer call.
    pub fn claim_many(
        &self,
        world: &mut World,
        claimant: Address,
        claims: &[Claim],
    ) -> Result<usize, EngineError> {
        world.atomic(|world| {
            for c in claims {
                self.check_proof(world, claimant, c.batch, c.index, c.amount, &c.proof)?;
                self.consume(world, claimant, c.asset, c.batch, c.index, c.amount)?;
            }
            Ok(claims.len())
        })
    }

    fn check_proof(
        &self,
        world: &World,
        claimant: Address,
        batch: u64,
        index: u64,
        amount: U256,
        proof: &[B256],
    ) -> Result<(), EngineError> {
        if verify_proof(self.root(world, batch), leaf(index, claimant, amount), proof) {
            Ok(())
        } else {
            Err(EngineError::InvalidProof { claimant, batch })
        }
    }

    fn consume(
        &self,
        world: &mut World,
        claimant: Address,
        asset: Asset,
        batch: u64,
        index: u64,
        amount: U256,
    ) -> Result<bool, EngineError> {
        let (word, mask) = bitmap_position(index);
        let slot = bitmap_slot(claimant, batch, word);
        let bits = world.sload(self.address, slot);
        if !(bits & mask).is_zero() {
            tracing::debug!(target: "claims", %claimant, batch, index, "Replay rejected");
            return Err(EngineError::AlreadyClaimed { batch, index });
        }
        world.transfer(self.address, claimant, asset, amount)?;
        world.sstore(self.address, slot, bits | mask);
        tracing::debug!(target: "claims", %claimant, batch, index, %amount, "Claim consumed");
        Ok(true)
    }
}

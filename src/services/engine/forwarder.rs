// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::app::config::EngineSettings;
use crate::data::abi::ForwardRequest;
use crate::domain::constants::NONCE_NAMESPACE;
use crate::domain::error::EngineError;
use crate::engine::ledger::Asset;
use crate::engine::world::{World, mapping_slot, named_slot};
use alloy::primitives::{Address, B256, Bytes, Signature, U256};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{Eip712Domain, SolStruct};
use std::borrow::Cow;

/// ERC-2771 style forwarder: verifies an EIP-712 signed `ForwardRequest`
/// and dispatches it with the signer appended to the calldata.
#[derive(Clone, Debug)]
pub struct MetaTxForwarder {
    address: Address,
    domain: Eip712Domain,
}

impl MetaTxForwarder {
    pub fn new(
        address: Address,
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        let domain = Eip712Domain::new(
            Some(Cow::Owned(name.into())),
            Some(Cow::Owned(version.into())),
            Some(U256::from(chain_id)),
            Some(address),
            None,
        );
        Self { address, domain }
    }

    pub fn from_settings(address: Address, settings: &EngineSettings) -> Self {
        Self::new(
            address,
            settings.forwarder_name.clone(),
            settings.forwarder_version.clone(),
            settings.chain_id,
        )
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    pub fn digest(&self, request: &ForwardRequest) -> B256 {
        request.eip712_signing_hash(&self.domain)
    }

    /// Next nonce the forwarder will accept from `signer`.
    pub fn nonce(&self, world: &World, signer: Address) -> U256 {
        world.sload(self.address, nonce_slot(signer))
    }

    /// Harness helper: sign `request` with a local key.
    pub fn sign_request(
        &self,
        signer: &PrivateKeySigner,
        request: &ForwardRequest,
    ) -> Result<Bytes, EngineError> {
        let hash = self.digest(request);
        let sig = signer
            .sign_hash_sync(&hash)
            .map_err(|e| EngineError::InvalidSignature(e.to_string()))?;
        Ok(Bytes::copy_from_slice(&sig.as_bytes()))
    }

    /// Recover the signer of `request` from a 65-byte signature.
    pub fn recover(
        &self,
        request: &ForwardRequest,
        signature: &[u8],
    ) -> Result<Address, EngineError> {
        let sig = Signature::try_from(signature)
            .map_err(|e| EngineError::InvalidSignature(format!("malformed signature: {e}")))?;
        sig.recover_address_from_prehash(&self.digest(request))
            .map_err(|e| EngineError::InvalidSignature(format!("unrecoverable signature: {e}")))
    }

    /// Verify and dispatch a signed request on behalf of `request.from`.
    /// `relayer` pays `request.value` and submits the transaction.
    pub fn execute(
        &self,
        world: &mut World,
        relayer: Address,
        request: &ForwardRequest,
        signature: &[u8],
    ) -> Result<Bytes, EngineError> {
        let signer = self.recover(request, signature)?;
        if signer != request.from {
            tracing::warn!(target: "forwarder", %signer, from = %request.from, "Signer mismatch");
            return Err(EngineError::InvalidSignature(format!(
                "recovered {signer}, request claims {}",
                request.from
            )));
        }
        let now = world.now();
        if U256::from(now) > request.deadline {
            return Err(EngineError::ExpiredRequest {
                deadline: request.deadline,
                now,
            });
        }

        world.atomic(|world| {
            let expected = self.nonce(world, signer);
            if request.nonce != expected {
                return Err(EngineError::NonceReplay {
                    signer,
                    expected,
                    got: request.nonce,
                });
            }
            let next = expected
                .checked_add(U256::from(1u64))
                .ok_or_else(|| EngineError::Overflow(format!("nonce of {signer}")))?;
            world.sstore(self.address, nonce_slot(signer), next);

            if !request.value.is_zero() {
                world.transfer(relayer, self.address, Asset::Native, request.value)?;
            }

            let mut calldata = Vec::with_capacity(request.data.len() + 20);
            calldata.extend_from_slice(&request.data);
            calldata.extend_from_slice(signer.as_slice());

            tracing::debug!(
                target: "forwarder",
                %signer,
                callee = %request.target,
                nonce = %expected,
                %relayer,
                "Dispatching forwarded request"
            );
            world.invoke_forwarded(
                self.address,
                request.target,
                Bytes::from(calldata),
                request.value,
                signer,
            )
        })
    }
}

fn nonce_slot(signer: Address) -> B256 {
    mapping_slot(named_slot(NONCE_NAMESPACE), signer.into_word().as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(from: Address) -> ForwardRequest {
        ForwardRequest {
            from,
            target: Address::repeat_byte(0x42),
            value: U256::ZERO,
            nonce: U256::ZERO,
            data: Bytes::from_static(b"ping"),
            deadline: U256::from(1_000u64),
        }
    }

    #[test]
    fn signature_round_trips_to_signer() {
        let signer = PrivateKeySigner::random();
        let fwd = MetaTxForwarder::new(Address::repeat_byte(0xf0), "BasicForwarder", "1", 31_337);
        let req = request(signer.address());

        let sig = fwd.sign_request(&signer, &req).unwrap();
        assert_eq!(fwd.recover(&req, &sig).unwrap(), signer.address());
    }

    #[test]
    fn digest_is_bound_to_the_forwarder_address() {
        let req = request(Address::repeat_byte(1));
        let a = MetaTxForwarder::new(Address::repeat_byte(0xf0), "BasicForwarder", "1", 1);
        let b = MetaTxForwarder::new(Address::repeat_byte(0xf1), "BasicForwarder", "1", 1);
        assert_ne!(a.digest(&req), b.digest(&req));
    }

    #[test]
    fn short_signature_is_rejected() {
        let fwd = MetaTxForwarder::new(Address::repeat_byte(0xf0), "BasicForwarder", "1", 1);
        let err = fwd.recover(&request(Address::ZERO), &[0u8; 64]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSignature(_)));
    }
}

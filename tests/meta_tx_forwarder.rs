use alloy::primitives::{Address, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use oxidity_arena::prelude::*;

const FORWARDER: Address = Address::repeat_byte(0xf0);
const VAULT: Address = Address::repeat_byte(0x40);
const RELAYER: Address = Address::repeat_byte(0x0e);

/// Vault that records the effective sender and the calldata it saw.
fn vault() -> impl Contract {
    handler(|ctx, _input| {
        let sender = ctx.msg_sender();
        let mut out = sender.to_vec();
        out.extend_from_slice(ctx.msg_data());
        Ok(Bytes::from(out))
    })
}

fn setup(trusted: bool) -> (World, MetaTxForwarder) {
    let mut builder = WorldBuilder::new(EngineConfig {
        genesis_timestamp: 100,
        ..EngineConfig::default()
    })
    .mint(RELAYER, Asset::Native, U256::from(1_000u64))
    .unwrap()
    .deploy(VAULT, vault());
    if trusted {
        builder = builder.trust_forwarder(VAULT, FORWARDER);
    }
    let world = builder.build();
    let fwd = MetaTxForwarder::new(FORWARDER, "BasicForwarder", "1", world.config().chain_id);
    (world, fwd)
}

fn request(from: Address, nonce: u64, deadline: u64) -> ForwardRequest {
    ForwardRequest {
        from,
        target: VAULT,
        value: U256::ZERO,
        nonce: U256::from(nonce),
        data: Bytes::from_static(b"withdraw"),
        deadline: U256::from(deadline),
    }
}

#[test]
fn trusted_target_sees_the_signer() {
    let (mut world, fwd) = setup(true);
    let alice = PrivateKeySigner::random();
    let req = request(alice.address(), 0, 1_000);
    let sig = fwd.sign_request(&alice, &req).unwrap();

    let out = fwd.execute(&mut world, RELAYER, &req, &sig).unwrap();

    assert_eq!(Address::from_slice(&out[..20]), alice.address());
    assert_eq!(&out[20..], b"withdraw");
    assert_eq!(fwd.nonce(&world, alice.address()), U256::from(1u64));
}

#[test]
fn untrusted_target_sees_the_forwarder() {
    let (mut world, fwd) = setup(false);
    let alice = PrivateKeySigner::random();
    let req = request(alice.address(), 0, 1_000);
    let sig = fwd.sign_request(&alice, &req).unwrap();

    let out = fwd.execute(&mut world, RELAYER, &req, &sig).unwrap();

    assert_eq!(Address::from_slice(&out[..20]), FORWARDER);
    // Suffix stays part of the calldata for targets that do not trust the forwarder.
    assert_eq!(out.len(), 20 + b"withdraw".len() + 20);
}

#[test]
fn replayed_request_is_rejected() {
    let (mut world, fwd) = setup(true);
    let alice = PrivateKeySigner::random();
    let req = request(alice.address(), 0, 1_000);
    let sig = fwd.sign_request(&alice, &req).unwrap();

    fwd.execute(&mut world, RELAYER, &req, &sig).unwrap();
    let err = fwd.execute(&mut world, RELAYER, &req, &sig).unwrap_err();

    assert_eq!(
        err,
        EngineError::NonceReplay {
            signer: alice.address(),
            expected: U256::from(1u64),
            got: U256::ZERO,
        }
    );
}

#[test]
fn signature_from_someone_else_is_rejected() {
    let (mut world, fwd) = setup(true);
    let alice = PrivateKeySigner::random();
    let mallory = PrivateKeySigner::random();
    let req = request(alice.address(), 0, 1_000);
    let forged = fwd.sign_request(&mallory, &req).unwrap();

    let err = fwd.execute(&mut world, RELAYER, &req, &forged).unwrap_err();

    assert!(matches!(err, EngineError::InvalidSignature(_)));
    assert_eq!(fwd.nonce(&world, alice.address()), U256::ZERO);
}

#[test]
fn tampered_request_does_not_verify() {
    let (mut world, fwd) = setup(true);
    let alice = PrivateKeySigner::random();
    let req = request(alice.address(), 0, 1_000);
    let sig = fwd.sign_request(&alice, &req).unwrap();

    let mut tampered = req.clone();
    tampered.data = Bytes::from_static(b"drain");

    assert!(matches!(
        fwd.execute(&mut world, RELAYER, &tampered, &sig),
        Err(EngineError::InvalidSignature(_))
    ));
}

#[test]
fn expired_request_is_rejected() {
    let (mut world, fwd) = setup(true);
    let alice = PrivateKeySigner::random();
    let req = request(alice.address(), 0, 150);
    let sig = fwd.sign_request(&alice, &req).unwrap();
    world.warp(151);

    let err = fwd.execute(&mut world, RELAYER, &req, &sig).unwrap_err();

    assert_eq!(
        err,
        EngineError::ExpiredRequest {
            deadline: U256::from(150u64),
            now: 151
        }
    );
}

#[test]
fn value_is_paid_by_the_relayer() {
    let (mut world, fwd) = setup(true);
    let alice = PrivateKeySigner::random();
    let mut req = request(alice.address(), 0, 1_000);
    req.value = U256::from(25u64);
    let sig = fwd.sign_request(&alice, &req).unwrap();

    fwd.execute(&mut world, RELAYER, &req, &sig).unwrap();

    assert_eq!(world.balance_of(RELAYER, Asset::Native), U256::from(975u64));
    assert_eq!(world.balance_of(VAULT, Asset::Native), U256::from(25u64));
    assert_eq!(world.balance_of(FORWARDER, Asset::Native), U256::ZERO);
}

#[test]
fn failed_dispatch_keeps_nonce_in_strict_mode() {
    let mut world = WorldBuilder::new(EngineConfig::default())
        .deploy(VAULT, handler(|ctx, _| Err(ctx.revert("nope"))))
        .trust_forwarder(VAULT, FORWARDER)
        .build();
    let fwd = MetaTxForwarder::new(FORWARDER, "BasicForwarder", "1", world.config().chain_id);
    let alice = PrivateKeySigner::random();
    let req = request(alice.address(), 0, u64::MAX);
    let sig = fwd.sign_request(&alice, &req).unwrap();

    assert!(fwd.execute(&mut world, RELAYER, &req, &sig).is_err());
    assert_eq!(fwd.nonce(&world, alice.address()), U256::ZERO);
}

#[test]
fn direct_call_with_forged_suffix_is_not_trusted() {
    let (mut world, _fwd) = setup(true);
    let victim = Address::repeat_byte(0x77);
    let mut calldata = b"withdraw".to_vec();
    calldata.extend_from_slice(victim.as_slice());

    // Even the forwarder address itself cannot spoof by calling directly.
    let out = world.invoke(FORWARDER, VAULT, calldata, U256::ZERO).unwrap();

    assert_eq!(Address::from_slice(&out[..20]), FORWARDER);
}

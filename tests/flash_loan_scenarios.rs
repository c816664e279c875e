use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy::sol_types::SolCall;
use oxidity_arena::data::abi::IERC3156FlashBorrower;
use oxidity_arena::prelude::*;

const POOL: Address = Address::repeat_byte(0x10);
const ATTACKER: Address = Address::repeat_byte(0xa0);
const RECEIVER: Address = Address::repeat_byte(0xb0);
const DVT_ADDR: Address = Address::repeat_byte(0xd0);

fn dvt() -> Asset {
    Asset::Token(DVT_ADDR)
}

fn units(n: u64) -> U256 {
    U256::from(n)
}

fn base(mode: RollbackMode) -> WorldBuilder {
    WorldBuilder::new(EngineConfig {
        rollback_mode: mode,
        ..EngineConfig::default()
    })
    .asset(dvt(), "DVT")
    .mint(POOL, dvt(), units(1_000))
    .unwrap()
}

/// Borrower that pays back `amount + fee` from the funds it holds.
fn repaying_borrower() -> impl Contract {
    handler(|ctx, input| {
        let call = IERC3156FlashBorrower::onFlashLoanCall::abi_decode(input)
            .map_err(|e| ctx.revert(e.to_string()))?;
        let asset = Asset::from_token_address(call.token);
        let pool = ctx.caller();
        ctx.transfer(pool, asset, call.amount + call.fee)?;
        Ok(Bytes::copy_from_slice(flash_ack().as_slice()))
    })
}

#[test]
fn unrepaid_loan_reverts_and_leaves_balances_unchanged() {
    let mut world = base(RollbackMode::Strict).build();
    let engine = FlashLoanEngine::default();

    let err = engine
        .flash_loan(&mut world, ATTACKER, POOL, ATTACKER, dvt(), units(1_000), Bytes::new())
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::RepaymentNotMet { required, actual, .. }
            if required == units(1_000) && actual == U256::ZERO
    ));
    assert_eq!(world.balance_of(POOL, dvt()), units(1_000));
    assert_eq!(world.balance_of(ATTACKER, dvt()), U256::ZERO);
}

#[test]
fn naive_mode_lets_the_borrower_keep_the_loan() {
    let mut world = base(RollbackMode::Naive).build();
    let engine = FlashLoanEngine::default();

    let res = engine.flash_loan(
        &mut world,
        ATTACKER,
        POOL,
        ATTACKER,
        dvt(),
        units(1_000),
        Bytes::new(),
    );

    assert!(matches!(res, Err(EngineError::RepaymentNotMet { .. })));
    assert_eq!(world.balance_of(ATTACKER, dvt()), units(1_000));
    assert!(world.snapshot().is_conserved());
}

#[test]
fn repaid_loan_collects_fixed_fee() {
    let mut world = base(RollbackMode::Strict)
        .mint(RECEIVER, dvt(), units(10))
        .unwrap()
        .deploy(RECEIVER, repaying_borrower())
        .build();
    let engine = FlashLoanEngine::new(FeePolicy::Fixed(units(1))).with_ack(true);

    let session = engine
        .flash_loan(&mut world, RECEIVER, POOL, RECEIVER, dvt(), units(500), Bytes::new())
        .unwrap();

    assert_eq!(session.fee, units(1));
    assert_eq!(session.balance_before, units(1_000));
    assert_eq!(world.balance_of(POOL, dvt()), units(1_001));
    assert_eq!(world.balance_of(RECEIVER, dvt()), units(9));
}

#[test]
fn anyone_can_drain_a_receiver_through_fixed_fees() {
    let mut world = base(RollbackMode::Strict)
        .mint(RECEIVER, dvt(), units(10))
        .unwrap()
        .deploy(RECEIVER, repaying_borrower())
        .build();
    let engine = FlashLoanEngine::new(FeePolicy::Fixed(units(1)));

    world
        .atomic(|w| {
            for _ in 0..10 {
                engine.flash_loan(w, ATTACKER, POOL, RECEIVER, dvt(), U256::ZERO, Bytes::new())?;
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(world.balance_of(RECEIVER, dvt()), U256::ZERO);
    assert_eq!(world.balance_of(POOL, dvt()), units(1_010));
}

#[test]
fn missing_acknowledgement_fails_when_required() {
    let mut world = base(RollbackMode::Strict)
        .deploy(
            RECEIVER,
            handler(|ctx, input| {
                let call = IERC3156FlashBorrower::onFlashLoanCall::abi_decode(input)
                    .map_err(|e| ctx.revert(e.to_string()))?;
                let pool = ctx.caller();
                ctx.transfer(pool, Asset::from_token_address(call.token), call.amount)?;
                Ok(Bytes::from(B256::ZERO.to_vec()))
            }),
        )
        .build();
    let engine = FlashLoanEngine::default().with_ack(true);

    let err = engine
        .flash_loan(&mut world, RECEIVER, POOL, RECEIVER, dvt(), units(100), Bytes::new())
        .unwrap_err();

    assert!(matches!(err, EngineError::CallbackFailed { target, .. } if target == RECEIVER));
    assert_eq!(world.balance_of(POOL, dvt()), units(1_000));
}

#[test]
fn restricted_engine_rejects_other_assets() {
    let mut world = base(RollbackMode::Strict)
        .mint(POOL, Asset::Native, units(5))
        .unwrap()
        .build();
    let engine = FlashLoanEngine::default().with_supported_assets([dvt()]);

    let err = engine
        .flash_loan(&mut world, ATTACKER, POOL, ATTACKER, Asset::Native, units(1), Bytes::new())
        .unwrap_err();

    assert_eq!(err, EngineError::UnsupportedAsset(Asset::Native));
    assert_eq!(engine.max_flash_loan(&world, POOL, Asset::Native), U256::ZERO);
    assert_eq!(engine.max_flash_loan(&world, POOL, dvt()), units(1_000));
}

#[test]
fn callback_sees_the_loan_and_may_reenter_the_pool() {
    // The borrower hands the loan back as a "deposit", which satisfies the
    // balance check while the pool books a credit for it.
    let credit = keccak256("deposits");
    let mut world = base(RollbackMode::Strict)
        .deploy(
            POOL,
            handler(move |ctx, input| {
                if input == b"deposit" {
                    let held = ctx.self_balance(dvt());
                    ctx.sstore(credit, held);
                }
                Ok(Bytes::new())
            }),
        )
        .deploy(
            ATTACKER,
            handler(|ctx, _| {
                let pool = ctx.caller();
                assert_eq!(ctx.self_balance(dvt()), units(1_000));
                assert_eq!(ctx.depth(), 1);
                ctx.transfer(pool, dvt(), units(1_000))?;
                ctx.call(pool, b"deposit".to_vec(), U256::ZERO)?;
                Ok(Bytes::new())
            }),
        )
        .build();

    FlashLoanEngine::default()
        .flash_loan(&mut world, ATTACKER, POOL, ATTACKER, dvt(), units(1_000), Bytes::new())
        .unwrap();

    assert_eq!(world.balance_of(POOL, dvt()), units(1_000));
    assert_eq!(world.sload(POOL, credit), units(1_000));
}

#[test]
fn custom_invariant_can_halt_the_pool() {
    // Share accounting that breaks once someone donates directly to the pool.
    let mut world = base(RollbackMode::Strict)
        .mint(ATTACKER, dvt(), units(1))
        .unwrap()
        .build();
    world.transfer(ATTACKER, POOL, dvt(), units(1)).unwrap();

    let supply_shares = units(1_000);
    let engine = FlashLoanEngine::default().with_invariant(
        AllOf::new()
            .with(CustomInvariant::new("shares-match-assets").before(move |w, s| {
                if w.balance_of(s.pool, s.asset) != supply_shares {
                    return Err(EngineError::CallbackFailed {
                        target: s.pool,
                        reason: "share/asset mismatch".into(),
                    });
                }
                Ok(())
            }))
            .with(BalanceDelta),
    );

    let err = engine
        .flash_loan(&mut world, RECEIVER, POOL, RECEIVER, dvt(), units(10), Bytes::new())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::CallbackFailed { reason, .. } if reason.contains("mismatch")
    ));
}

use alloy::primitives::{Address, Bytes, U256};
use oxidity_arena::prelude::*;
use proptest::prelude::*;

const ACCOUNTS: [Address; 4] = [
    Address::repeat_byte(0x01),
    Address::repeat_byte(0x02),
    Address::repeat_byte(0x03),
    Address::repeat_byte(0x04),
];
const POOL: Address = Address::repeat_byte(0x10);
const TOKEN: Address = Address::repeat_byte(0xd0);

fn token() -> Asset {
    Asset::Token(TOKEN)
}

fn arb_mode() -> impl Strategy<Value = RollbackMode> {
    prop_oneof![Just(RollbackMode::Strict), Just(RollbackMode::Naive)]
}

fn arb_transfer() -> impl Strategy<Value = (usize, usize, u64)> {
    (0..ACCOUNTS.len(), 0..ACCOUNTS.len(), 0u64..400)
}

fn seeded(mode: RollbackMode, balances: &[u64]) -> World {
    let mut builder = WorldBuilder::new(EngineConfig {
        rollback_mode: mode,
        ..EngineConfig::default()
    })
    .asset(token(), "TKN");
    for (account, amount) in ACCOUNTS.iter().zip(balances) {
        builder = builder.mint(*account, token(), U256::from(*amount)).unwrap();
    }
    builder.build()
}

proptest! {
    #[test]
    fn prop_transfers_conserve_supply(
        mode in arb_mode(),
        balances in proptest::collection::vec(0u64..500, ACCOUNTS.len()),
        ops in proptest::collection::vec(arb_transfer(), 1..40),
    ) {
        let mut world = seeded(mode, &balances);
        let supply = world.total_supply(token());

        for (from, to, amount) in ops {
            let before = world.balance_of(ACCOUNTS[from], token());
            let res = world.transfer(ACCOUNTS[from], ACCOUNTS[to], token(), U256::from(amount));
            prop_assert_eq!(res.is_err(), before < U256::from(amount));
            prop_assert!(world.snapshot().is_conserved());
            prop_assert_eq!(world.total_supply(token()), supply);
        }
    }

    #[test]
    fn prop_failed_strict_loans_restore_every_balance(
        balances in proptest::collection::vec(0u64..500, ACCOUNTS.len()),
        amount in 0u64..500,
        repay in 0u64..500,
    ) {
        let mut builder = WorldBuilder::new(EngineConfig::default())
            .asset(token(), "TKN")
            .mint(POOL, token(), U256::from(500u64))
            .unwrap()
            .deploy(ACCOUNTS[0], handler(move |ctx, _| {
                let pool = ctx.caller();
                let pay = U256::from(repay).min(ctx.self_balance(token()));
                ctx.transfer(pool, token(), pay)?;
                Ok(Bytes::new())
            }));
        for (account, amount) in ACCOUNTS.iter().zip(&balances) {
            builder = builder.mint(*account, token(), U256::from(*amount)).unwrap();
        }
        let mut world = builder.build();
        let before = world.snapshot();

        let res = FlashLoanEngine::default().flash_loan(
            &mut world,
            ACCOUNTS[0],
            POOL,
            ACCOUNTS[0],
            token(),
            U256::from(amount),
            Bytes::new(),
        );

        match res {
            Ok(_) => prop_assert!(world.balance_of(POOL, token()) >= U256::from(500u64)),
            Err(_) => prop_assert_eq!(world.snapshot(), before),
        }
        prop_assert!(world.snapshot().is_conserved());
    }

    #[test]
    fn prop_claims_pay_at_most_once(indices in proptest::collection::vec(0u64..600, 1..30)) {
        let distributor = Address::repeat_byte(0xd1);
        let mut world = WorldBuilder::new(EngineConfig::default())
            .asset(token(), "TKN")
            .mint(distributor, token(), U256::from(10_000u64))
            .unwrap()
            .build();
        let claims = ClaimLedger::new(distributor);
        let mut seen = std::collections::HashSet::new();

        for index in indices {
            let one = U256::from(1u64);
            let res = claims.try_consume(&mut world, ACCOUNTS[0], token(), 0, index, one);
            prop_assert_eq!(res.is_ok(), seen.insert(index));
        }
        prop_assert_eq!(world.balance_of(ACCOUNTS[0], token()), U256::from(seen.len() as u64));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_forwarder_nonces_only_move_forward(
        nonces in proptest::collection::vec(0u64..6, 1..12),
    ) {
        use alloy::signers::local::PrivateKeySigner;

        let target = Address::repeat_byte(0x40);
        let forwarder = Address::repeat_byte(0xf0);
        let mut world = WorldBuilder::new(EngineConfig::default())
            .trust_forwarder(target, forwarder)
            .build();
        let fwd = MetaTxForwarder::new(forwarder, "BasicForwarder", "1", world.config().chain_id);
        let signer = PrivateKeySigner::random();
        let mut expected = 0u64;

        for nonce in nonces {
            let req = ForwardRequest {
                from: signer.address(),
                target,
                value: U256::ZERO,
                nonce: U256::from(nonce),
                data: Bytes::new(),
                deadline: U256::MAX,
            };
            let sig = fwd.sign_request(&signer, &req).unwrap();
            let res = fwd.execute(&mut world, ACCOUNTS[0], &req, &sig);

            prop_assert_eq!(res.is_ok(), nonce == expected);
            if nonce == expected {
                expected += 1;
            }
            prop_assert_eq!(fwd.nonce(&world, signer.address()), U256::from(expected));
        }
    }
}

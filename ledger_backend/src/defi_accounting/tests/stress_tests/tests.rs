use super::generators::{generate_random_op, operation_sequence};
use super::operations::{principal, SLOTS_PER_USER, USER_COUNT};
use super::*;
use crate::config::LedgerConfig;
use crate::defi_accounting::tests::admin;
use crate::defi_accounting::vault::Vault;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn risky_config() -> LedgerConfig {
    // Big wagers relative to the pool make losses deep enough to wipe positions
    LedgerConfig { max_risk_bps: 5_000, ..LedgerConfig::default() }
}

// ============================================
// CATEGORY 1: CONSERVATION UNDER RANDOM OPERATIONS
// ============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_invariants_hold_after_every_op(ops in operation_sequence(60)) {
        let mut system = System::new(LedgerConfig::default());

        for (i, op) in ops.into_iter().enumerate() {
            let _ = system.execute(op);
            system.check_invariants()
                .map_err(|e| TestCaseError::fail(format!("Op {}: {}", i, e)))?;
        }
        system.settle_all().map_err(TestCaseError::fail)?;
    }

    #[test]
    fn test_invariants_hold_with_high_risk_limit(ops in operation_sequence(60)) {
        let mut system = System::new(risky_config());

        for (i, op) in ops.into_iter().enumerate() {
            let _ = system.execute(op);
            system.check_invariants()
                .map_err(|e| TestCaseError::fail(format!("Op {}: {}", i, e)))?;
        }
        system.settle_all().map_err(TestCaseError::fail)?;
    }

    #[test]
    fn test_withdrawal_never_pays_more_than_redeemable(ops in operation_sequence(40), user in 0u8..5, slot in 0u8..3) {
        let mut system = System::new(risky_config());
        for op in ops {
            let _ = system.execute(op);
        }
        let who = principal(user);
        let preview = system.ledger.lp_position(who, u64::from(slot)).unwrap();
        let wallet_before = system.ledger.vault().wallet(who);
        match system.ledger.withdraw_liquidity(who, who, u64::from(slot)) {
            Ok(withdrawal) => {
                let preview = preview.expect("withdrawn position had no preview");
                // Less than the preview only when other positions had to be liquidated first
                prop_assert!(withdrawal.payout <= preview.redeemable);
                prop_assert_eq!(system.ledger.vault().wallet(who), wallet_before + withdrawal.payout);
            }
            Err(_) => prop_assert_eq!(system.ledger.vault().wallet(who), wallet_before),
        }
    }
}

// ============================================
// CATEGORY 2: SEEDED LONG RUNS
// ============================================

// Deterministic regression test (reproducible with seed)
#[test]
fn test_deterministic_5k_operations() {
    let mut rng = ChaCha8Rng::seed_from_u64(12345);
    let mut system = System::new(risky_config());
    let mut successes = 0u64;

    for i in 0..5_000 {
        let op = generate_random_op(&mut rng);
        if system.execute(op).is_success() {
            successes += 1;
        }
        if i % 50 == 0 {
            system.check_invariants().unwrap_or_else(|e| panic!("Failed at op {}: {}", i, e));
        }
    }

    assert!(successes > 500, "only {} operations succeeded", successes);
    system.check_invariants().expect("Final invariant check failed");
    system.settle_all().expect("Final settlement failed");
}

// Five users, thirty random steps of LP deposits, play deposits, even-odds
// wagers and play withdrawals, then everyone closes out
#[test]
fn test_mixed_five_users() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut system = System::new(LedgerConfig::default());
    let mut next_slot = [0u8; USER_COUNT as usize];

    for _ in 0..30 {
        let user = rng.gen_range(0..USER_COUNT);
        let op = match rng.gen_range(0..4) {
            0 => {
                let slot = next_slot[user as usize] % SLOTS_PER_USER;
                next_slot[user as usize] += 1;
                Operation::ProvideLiquidity { user, slot, amount: 200_000 }
            }
            1 => Operation::DepositFunds { user, amount: 20_000 },
            2 => Operation::ResolveWager { user, wager: 5_000, chance: 2, random: rng.gen_range(0..1_000) },
            _ => Operation::WithdrawFunds { user, amount: 5_000 },
        };
        let _ = system.execute(op);
        system.check_invariants().unwrap();
    }

    system.settle_all().unwrap();
    let vault = system.ledger.vault().balance();
    let surplus = system.ledger.global_state().unwrap().last_bankroll;
    assert_eq!(vault, crate::defi_accounting::tests::RENT_RESERVE + surplus);
    println!("house surplus after settlement: {}", surplus);
}

// ============================================
// CATEGORY 3: EDGE CASE STRESS
// ============================================

#[test]
fn test_wager_storm_against_single_lp() {
    let mut system = System::new(LedgerConfig::default());
    assert!(system.execute(Operation::ProvideLiquidity { user: 0, slot: 0, amount: 500_000 }).is_success());
    assert!(system.execute(Operation::DepositFunds { user: 1, amount: 500_000 }).is_success());

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..2_000 {
        let chance = rng.gen_range(2..=50);
        let max_bet = system.ledger.max_bet(chance).unwrap();
        if max_bet == 0 {
            continue;
        }
        let wager = rng.gen_range(1..=max_bet);
        let _ = system.execute(Operation::ResolveWager { user: 1, wager, chance, random: rng.gen() });
    }
    system.check_invariants().unwrap();
    assert!(system.ledger.global_state().unwrap().wager_count > 0);
    system.settle_all().unwrap();
}

#[test]
fn test_rejected_wager_leaves_no_trace() {
    let mut system = System::new(LedgerConfig::default());
    system.execute(Operation::ProvideLiquidity { user: 0, slot: 0, amount: 10_000 });
    system.execute(Operation::DepositFunds { user: 1, amount: 10_000 });

    let before = system.snapshot();
    let result = system.execute(Operation::ResolveWager { user: 1, wager: 10_000, chance: 2, random: 2 });
    assert!(matches!(result, OpResult::Rejected(crate::error::LedgerError::BetTooBig { .. })));
    assert_eq!(system.snapshot(), before);
    assert!(system.ledger.admin_health_check(admin()).unwrap().is_healthy);
}

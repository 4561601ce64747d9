//! Authorization Attack Tests
//!
//! Callers acting on records they do not own, or on admin-only operations.
//! Every rejected attempt must leave records, vault and wallets untouched.

use crate::defi_accounting::tests::*;
use crate::error::LedgerError;

#[test]
fn attack_non_admin_resolves_wager() {
    println!("\n🔴 ATTACK: Player resolves their own wager with a winning number");
    let alice = user(10);
    let player = user(20);
    let (mut ledger, _) = default_setup(&[(alice, 10_000), (player, 100)]);
    ledger.provide_liquidity(alice, alice, 0, 10_000, None).unwrap();
    ledger.deposit_funds(player, player, 100).unwrap();

    let before = snapshot(&ledger);
    let result = ledger.resolve_wager(player, player, 50, 2, 2);
    println!("  Result: {:?}", result);

    assert_eq!(result, Err(LedgerError::Unauthorized { caller: player }));
    assert_eq!(snapshot(&ledger), before, "🔥 EXPLOIT SUCCEEDED: rejected wager mutated state");
}

#[test]
fn attack_withdraw_someone_elses_play_balance() {
    println!("\n🔴 ATTACK: Mallory withdraws the victim's play balance to her own wallet");
    let victim = user(10);
    let mallory = user(66);
    let (mut ledger, _) = default_setup(&[(victim, 500)]);
    ledger.deposit_funds(victim, victim, 500).unwrap();

    let before = snapshot(&ledger);
    let result = ledger.withdraw_funds(mallory, victim, 500);
    println!("  Result: {:?}", result);

    assert_eq!(result, Err(LedgerError::ConstraintSeeds { caller: mallory }));
    assert_eq!(ledger.vault().wallet(mallory), 0, "🔥 EXPLOIT SUCCEEDED: value moved to attacker");
    assert_eq!(ledger.balance_of(victim), 500);
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn attack_withdraw_someone_elses_liquidity() {
    println!("\n🔴 ATTACK: Mallory closes the victim's liquidity position");
    let victim = user(10);
    let mallory = user(66);
    let (mut ledger, _) = default_setup(&[(victim, 1_000)]);
    ledger.provide_liquidity(victim, victim, 0, 1_000, None).unwrap();

    let before = snapshot(&ledger);
    assert_eq!(
        ledger.withdraw_liquidity(mallory, victim, 0),
        Err(LedgerError::ConstraintSeeds { caller: mallory })
    );
    // Her own (empty) slot at the same index is a different record
    assert_eq!(
        ledger.withdraw_liquidity(mallory, mallory, 0),
        Err(LedgerError::PositionNotFound { owner: mallory, slot: 0 })
    );
    assert_eq!(snapshot(&ledger), before);
    assert_eq!(ledger.vault().wallet(mallory), 0);
}

#[test]
fn attack_deposit_into_someone_elses_records() {
    println!("\n🔴 ATTACK: Mallory credits deposits to records she does not own");
    let victim = user(10);
    let mallory = user(66);
    let (mut ledger, _) = default_setup(&[(victim, 1_000), (mallory, 1_000)]);

    let before = snapshot(&ledger);
    assert_eq!(
        ledger.deposit_funds(mallory, victim, 10),
        Err(LedgerError::ConstraintSeeds { caller: mallory })
    );
    assert_eq!(
        ledger.provide_liquidity(mallory, victim, 0, 10, None),
        Err(LedgerError::ConstraintSeeds { caller: mallory })
    );
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn attack_double_withdrawal() {
    println!("\n🔴 ATTACK: Withdraw the same position twice");
    let alice = user(10);
    let (mut ledger, _) = default_setup(&[(alice, 1_000)]);
    ledger.provide_liquidity(alice, alice, 0, 1_000, None).unwrap();

    let first = ledger.withdraw_liquidity(alice, alice, 0).unwrap();
    assert_eq!(first.payout, 1_000);

    let before = snapshot(&ledger);
    let second = ledger.withdraw_liquidity(alice, alice, 0);
    println!("  Second withdrawal: {:?}", second);
    assert_eq!(second, Err(LedgerError::PositionNotFound { owner: alice, slot: 0 }));
    assert_eq!(ledger.vault().wallet(alice), 1_000, "🔥 EXPLOIT SUCCEEDED: double payout");
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn attack_reinitialize_to_seize_admin() {
    println!("\n🔴 ATTACK: Re-initialize the ledger with the attacker as admin");
    let mallory = user(66);
    let player = user(20);
    let (mut ledger, _) = default_setup(&[(player, 100)]);
    ledger.deposit_funds(player, player, 100).unwrap();

    let before = snapshot(&ledger);
    assert_eq!(ledger.initialize(mallory), Err(LedgerError::AlreadyInitialized));
    assert_eq!(snapshot(&ledger), before);
    assert_eq!(ledger.global_state().unwrap().admin, admin());
    assert!(matches!(
        ledger.resolve_wager(mallory, player, 1, 2, 2),
        Err(LedgerError::Unauthorized { .. })
    ));
}

#[test]
fn attack_admin_queries_without_admin() {
    println!("\n🔴 ATTACK: Enumerate every balance and position without admin rights");
    let mallory = user(66);
    let (ledger, _) = default_setup(&[]);

    assert!(matches!(ledger.admin_health_check(mallory), Err(LedgerError::Unauthorized { .. })));
    assert!(matches!(
        ledger.admin_get_all_balances(mallory, 0, 10),
        Err(LedgerError::Unauthorized { .. })
    ));
    assert!(matches!(
        ledger.admin_get_all_lp_positions(mallory, 0, 10),
        Err(LedgerError::Unauthorized { .. })
    ));
    assert!(ledger.admin_health_check(admin()).unwrap().is_healthy);
}

use proptest::prelude::*;
use rand::Rng;

use super::operations::{Operation, SLOTS_PER_USER, USER_COUNT};

pub fn user_index() -> impl Strategy<Value = u8> {
    0..USER_COUNT
}

pub fn slot() -> impl Strategy<Value = u8> {
    0..SLOTS_PER_USER
}

// Small amounts dominate; occasional large ones exercise the risk limit
pub fn amount() -> impl Strategy<Value = u64> {
    prop_oneof![
        6 => 1u64..1_000,
        3 => 1_000u64..50_000,
        1 => 50_000u64..300_000,
    ]
}

pub fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (user_index(), slot(), amount())
            .prop_map(|(user, slot, amount)| Operation::ProvideLiquidity { user, slot, amount }),
        2 => (user_index(), slot()).prop_map(|(user, slot)| Operation::WithdrawLiquidity { user, slot }),
        3 => (user_index(), amount()).prop_map(|(user, amount)| Operation::DepositFunds { user, amount }),
        2 => (user_index(), amount()).prop_map(|(user, amount)| Operation::WithdrawFunds { user, amount }),
        6 => (user_index(), 1u64..5_000, 2u64..=50, any::<u64>())
            .prop_map(|(user, wager, chance, random)| Operation::ResolveWager { user, wager, chance, random }),
        1 => (user_index(), user_index(), slot())
            .prop_map(|(user, target, slot)| Operation::Liquidate { user, target, slot }),
        1 => (user_index(), 1u64..1_000).prop_map(|(user, amount)| Operation::Donate { user, amount }),
    ]
}

pub fn operation_sequence(len: usize) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation(), 1..=len)
}

/// Same operation mix, drawn from a seeded RNG for reproducible long runs.
pub fn generate_random_op<R: Rng>(rng: &mut R) -> Operation {
    let user = rng.gen_range(0..USER_COUNT);
    match rng.gen_range(0..18u32) {
        0..=2 => Operation::ProvideLiquidity {
            user,
            slot: rng.gen_range(0..SLOTS_PER_USER),
            amount: rng.gen_range(1..50_000),
        },
        3..=4 => Operation::WithdrawLiquidity { user, slot: rng.gen_range(0..SLOTS_PER_USER) },
        5..=7 => Operation::DepositFunds { user, amount: rng.gen_range(1..20_000) },
        8..=9 => Operation::WithdrawFunds { user, amount: rng.gen_range(1..20_000) },
        10..=15 => Operation::ResolveWager {
            user,
            wager: rng.gen_range(1..5_000),
            chance: rng.gen_range(2..=50),
            random: rng.gen(),
        },
        16 => Operation::Liquidate {
            user,
            target: rng.gen_range(0..USER_COUNT),
            slot: rng.gen_range(0..SLOTS_PER_USER),
        },
        _ => Operation::Donate { user, amount: rng.gen_range(1..1_000) },
    }
}

use candid::Principal;

use crate::defi_accounting::tests::{admin, setup, user, Snapshot, snapshot, RENT_RESERVE};
use crate::defi_accounting::vault::Vault;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::ledger::Ledger;

pub const USER_COUNT: u8 = 5;
pub const SLOTS_PER_USER: u8 = 3;
pub const STARTING_WALLET: u64 = 1_000_000;
const FIRST_USER_ID: u8 = 10;

#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    ProvideLiquidity { user: u8, slot: u8, amount: u64 },
    WithdrawLiquidity { user: u8, slot: u8 },
    DepositFunds { user: u8, amount: u64 },
    WithdrawFunds { user: u8, amount: u64 },
    ResolveWager { user: u8, wager: u64, chance: u64, random: u64 },
    Liquidate { user: u8, target: u8, slot: u8 },
    Donate { user: u8, amount: u64 },
}

#[derive(Debug, PartialEq)]
pub enum OpResult {
    Success,
    Rejected(LedgerError),
}

impl OpResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OpResult::Success)
    }
}

impl<T> From<Result<T, LedgerError>> for OpResult {
    fn from(result: Result<T, LedgerError>) -> Self {
        match result {
            Ok(_) => OpResult::Success,
            Err(e) => OpResult::Rejected(e),
        }
    }
}

pub fn principal(user_index: u8) -> Principal {
    user(FIRST_USER_ID + user_index % USER_COUNT)
}

/// A ledger plus the bookkeeping needed to check it after every step.
pub struct System {
    pub ledger: Ledger,
    pub initial_value: u128,
    pub operation_count: u64,
    // A donation leaves the bankroll stale until the next committed operation
    unsynced: bool,
}

impl System {
    pub fn new(config: LedgerConfig) -> Self {
        let wallets: Vec<(Principal, u64)> = (0..USER_COUNT).map(|i| (principal(i), STARTING_WALLET)).collect();
        let (ledger, _) = setup(config, &wallets);
        let initial_value = ledger.vault().total_value();
        Self {
            ledger,
            initial_value,
            operation_count: 0,
            unsynced: false,
        }
    }

    pub fn execute(&mut self, op: Operation) -> OpResult {
        self.operation_count += 1;
        let before = snapshot(&self.ledger);
        let result: OpResult = match op {
            Operation::ProvideLiquidity { user, slot, amount } => {
                let who = principal(user);
                self.ledger.provide_liquidity(who, who, u64::from(slot), amount, None).into()
            }
            Operation::WithdrawLiquidity { user, slot } => {
                let who = principal(user);
                self.ledger.withdraw_liquidity(who, who, u64::from(slot)).into()
            }
            Operation::DepositFunds { user, amount } => {
                let who = principal(user);
                self.ledger.deposit_funds(who, who, amount).into()
            }
            Operation::WithdrawFunds { user, amount } => {
                let who = principal(user);
                self.ledger.withdraw_funds(who, who, amount).into()
            }
            Operation::ResolveWager { user, wager, chance, random } => {
                self.ledger.resolve_wager(admin(), principal(user), wager, chance, random).into()
            }
            Operation::Liquidate { user, target, slot } => {
                self.ledger.liquidate_position(principal(user), principal(target), u64::from(slot)).into()
            }
            Operation::Donate { user, amount } => {
                let result = self.ledger.vault_mut().donate(principal(user), amount);
                if result.is_ok() {
                    self.unsynced = true;
                }
                result.map_err(LedgerError::from).into()
            }
        };
        if let OpResult::Rejected(LedgerError::InsufficientOutput { payout, available }) = &result {
            panic!("{:?} refused for lack of bankroll: payout {} available {}", op, payout, available);
        }
        match &result {
            OpResult::Success => {
                if !matches!(op, Operation::Donate { .. }) {
                    self.unsynced = false;
                }
            }
            OpResult::Rejected(_) => {
                let after = snapshot(&self.ledger);
                if after != before {
                    panic!("rejected {:?} mutated state:\n before {:?}\n after {:?}", op, before, after);
                }
            }
        }
        result
    }

    /// Value conservation and ledger self-consistency.
    pub fn check_invariants(&self) -> Result<(), String> {
        let total = self.ledger.vault().total_value();
        if total != self.initial_value {
            return Err(format!("value created or destroyed: {} != {}", total, self.initial_value));
        }

        let report = self.ledger.audit_balances().map_err(|e| e.to_string())?;

        let state = self.ledger.global_state().ok_or("ledger not initialized")?;
        if !self.unsynced {
            let accounted = u128::from(RENT_RESERVE) + u128::from(state.user_funds) + u128::from(state.last_bankroll);
            if accounted != u128::from(self.ledger.vault().balance()) {
                return Err(format!(
                    "vault {} != rent {} + player funds {} + bankroll {}",
                    self.ledger.vault().balance(),
                    RENT_RESERVE,
                    state.user_funds,
                    state.last_bankroll
                ));
            }
        }
        if report.total_shares > 0 && u128::from(report.deposits) < report.total_shares {
            return Err(format!(
                "principal pool {} below share count {}",
                report.deposits, report.total_shares
            ));
        }
        Ok(())
    }

    /// Closes every position in store order, then pays out every play
    /// balance. No closing order is required: a withdrawal that does not fit
    /// the bankroll liquidates the underwater positions first.
    pub fn settle_all(&mut self) -> Result<(), String> {
        loop {
            let next = self.ledger.store().liquidity_positions().next();
            let Some(position) = next else {
                break;
            };
            let (owner, slot) = (position.owner, position.slot);
            self.ledger
                .withdraw_liquidity(owner, owner, slot)
                .map_err(|e| format!("closing {} slot {}: {}", owner, slot, e))?;
            self.unsynced = false;
            self.check_invariants()?;
        }

        let balances: Vec<_> = self.ledger.store().user_balances().filter(|b| b.balance > 0).collect();
        for balance in balances {
            self.ledger
                .withdraw_funds(balance.owner, balance.owner, balance.balance)
                .map_err(|e| e.to_string())?;
        }

        let state = self.ledger.global_state().ok_or("ledger not initialized")?;
        if state.total_shares != 0 || state.deposits != 0 || state.user_funds != 0 {
            return Err(format!("ledger not empty after settlement: {:?}", state));
        }
        self.check_invariants()
    }

    pub fn snapshot(&self) -> Snapshot {
        snapshot(&self.ledger)
    }
}

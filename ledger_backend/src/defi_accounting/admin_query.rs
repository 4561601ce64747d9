use candid::Principal;
use ic_stable_structures::Memory;
use tracing::error;

use super::liquidity_pool::position_value;
use super::types::{ConservationReport, HealthCheck, UserBalance, UserLiquidity};
use super::vault::Vault;
use crate::error::LedgerError;
use crate::ledger::Ledger;

const MAX_PAGINATION_LIMIT: u64 = 100;

impl<M: Memory, V: Vault> Ledger<M, V> {
    fn require_admin(&self, caller: Principal) -> Result<(), LedgerError> {
        let state = self.load_global()?;
        if caller != state.admin {
            return Err(LedgerError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Recomputes every aggregate from the individual records and checks
    /// that value is conserved:
    /// - play balances sum to `user_funds`
    /// - position shares sum to `total_shares`
    /// - the vault covers rent reserve plus player funds
    /// - open positions never claim more than the bankroll holds
    pub fn audit_balances(&self) -> Result<ConservationReport, LedgerError> {
        let (state, _) = self.load_synced()?;

        let sum_of_balances = self
            .store
            .user_balances()
            .try_fold(0u64, |acc, b| acc.checked_add(b.balance))
            .ok_or(LedgerError::Overflow)?;
        if sum_of_balances != state.user_funds {
            return Err(self.violation(format!(
                "play balances sum to {} but user_funds is {}",
                sum_of_balances, state.user_funds
            )));
        }

        let mut sum_of_shares: u128 = 0;
        let mut lp_claims: i128 = 0;
        let mut position_count: u64 = 0;
        for position in self.store.liquidity_positions() {
            let (principal, profit) = position_value(&state, &position)?;
            sum_of_shares = sum_of_shares.checked_add(position.shares).ok_or(LedgerError::Overflow)?;
            lp_claims = lp_claims
                .checked_add(i128::from(principal) + profit)
                .ok_or(LedgerError::Overflow)?;
            position_count += 1;
        }
        if sum_of_shares != state.total_shares {
            return Err(self.violation(format!(
                "positions hold {} shares but total_shares is {}",
                sum_of_shares, state.total_shares
            )));
        }

        let tolerance = i128::from(self.config.rounding_tolerance) * i128::from(position_count);
        if lp_claims > i128::from(state.last_bankroll) + tolerance {
            return Err(self.violation(format!(
                "liquidity claims {} exceed bankroll {}",
                lp_claims, state.last_bankroll
            )));
        }

        Ok(ConservationReport {
            vault_balance: self.vault.balance(),
            rent_reserve: self.vault.rent_reserve(),
            user_funds: state.user_funds,
            sum_of_balances,
            bankroll: state.last_bankroll,
            total_shares: state.total_shares,
            sum_of_shares,
            deposits: state.deposits,
            lp_claims,
            position_count,
        })
    }

    fn violation(&self, message: String) -> LedgerError {
        error!(%message, "conservation audit failed");
        LedgerError::InvariantViolation(message)
    }

    pub fn admin_health_check(&self, caller: Principal) -> Result<HealthCheck, LedgerError> {
        self.require_admin(caller)?;
        let (report, health_status) = match self.audit_balances() {
            Ok(report) => (report, "HEALTHY".to_string()),
            Err(LedgerError::InvariantViolation(message)) => {
                (self.unchecked_report()?, format!("CRITICAL: {}", message))
            }
            Err(e) => return Err(e),
        };
        let excess = i128::from(report.bankroll) - report.lp_claims;
        let is_healthy = health_status == "HEALTHY";
        Ok(HealthCheck {
            unique_players: self.store.balance_count(),
            unique_lps: self.store.position_count(),
            audit_log_len: self.store.audit_log_len(),
            report,
            excess,
            is_healthy,
            health_status,
            timestamp: self.now(),
        })
    }

    // Same figures as the audit, without failing on a broken invariant
    fn unchecked_report(&self) -> Result<ConservationReport, LedgerError> {
        let state = self.load_global()?;
        let bankroll = self.bankroll(&state).unwrap_or(0);
        let mut report = ConservationReport {
            vault_balance: self.vault.balance(),
            rent_reserve: self.vault.rent_reserve(),
            user_funds: state.user_funds,
            sum_of_balances: self.store.user_balances().map(|b| b.balance).fold(0u64, u64::saturating_add),
            bankroll,
            total_shares: state.total_shares,
            sum_of_shares: 0,
            deposits: state.deposits,
            lp_claims: 0,
            position_count: 0,
        };
        for position in self.store.liquidity_positions() {
            report.sum_of_shares = report.sum_of_shares.saturating_add(position.shares);
            if let Ok((principal, profit)) = position_value(&state, &position) {
                report.lp_claims = report.lp_claims.saturating_add(i128::from(principal) + profit);
            }
            report.position_count += 1;
        }
        Ok(report)
    }

    pub fn admin_get_all_balances(
        &self,
        caller: Principal,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<UserBalance>, LedgerError> {
        self.require_admin(caller)?;
        let limit = limit.min(MAX_PAGINATION_LIMIT) as usize;
        Ok(self.store.user_balances().skip(offset as usize).take(limit).collect())
    }

    pub fn admin_get_all_lp_positions(
        &self,
        caller: Principal,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<UserLiquidity>, LedgerError> {
        self.require_admin(caller)?;
        let limit = limit.min(MAX_PAGINATION_LIMIT) as usize;
        Ok(self.store.liquidity_positions().skip(offset as usize).take(limit).collect())
    }
}

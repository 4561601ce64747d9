use candid::{CandidType, Deserialize};
use serde::Serialize;

use crate::error::LedgerError;
use crate::types::{BPS_DENOMINATOR, DEFAULT_MAX_CHANCE, DEFAULT_MAX_RISK_BPS, HOUSE_EDGE_MODULUS, MIN_CHANCE};

/// Tunable ledger policy. Every field has a default matching the deployed
/// house, so a partial JSON document only overrides what it names.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Largest accepted chance denominator.
    pub max_chance: u64,
    /// Max house exposure per wager, in basis points of the bankroll.
    pub max_risk_bps: u64,
    /// Modulus of the default fairness policy's house edge.
    pub house_edge_modulus: u64,
    /// Cooldown between a liquidity deposit and its withdrawal. 0 disables it.
    pub liquidity_lock_nanos: u64,
    /// Rounding slack allowed per open position by the conservation audit.
    pub rounding_tolerance: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_chance: DEFAULT_MAX_CHANCE,
            max_risk_bps: DEFAULT_MAX_RISK_BPS,
            house_edge_modulus: HOUSE_EDGE_MODULUS,
            liquidity_lock_nanos: 0,
            rounding_tolerance: 1,
        }
    }
}

impl LedgerConfig {
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_chance < MIN_CHANCE {
            return Err(LedgerError::InvalidConfig(format!(
                "max_chance {} is below the minimum chance {}",
                self.max_chance, MIN_CHANCE
            )));
        }
        if self.max_risk_bps == 0 || self.max_risk_bps > BPS_DENOMINATOR {
            return Err(LedgerError::InvalidConfig(format!(
                "max_risk_bps must be in 1..={}, got {}",
                BPS_DENOMINATOR, self.max_risk_bps
            )));
        }
        if self.house_edge_modulus < MIN_CHANCE {
            return Err(LedgerError::InvalidConfig(format!(
                "house_edge_modulus must be at least {}, got {}",
                MIN_CHANCE, self.house_edge_modulus
            )));
        }
        Ok(())
    }
}

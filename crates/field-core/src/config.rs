//! Simulation configuration.

use crate::error::{EngineError, EngineResult};
use crate::roles::Role;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub project_name: String,
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    /// Starting endowment in USD.
    pub initial_budget: Decimal,
    /// Roles present on the team; the size drives gate quorum.
    pub team: Vec<Role>,
    /// Simulate each well individually instead of aggregate decline.
    pub individual_wells: bool,
    /// Calendar date of first oil.
    pub start_date: NaiveDate,
    /// Simulated days per scheduler period.
    pub tick_days: u16,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            project_name: "Prospect Alpha".to_string(),
            rng_seed: 42,
            initial_budget: Decimal::new(150_000_000, 0),
            team: Role::ALL.to_vec(),
            individual_wells: true,
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap_or(NaiveDate::MIN),
            tick_days: 1,
        }
    }
}

impl SimConfig {
    /// Parse from YAML; missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> EngineResult<Self> {
        let cfg: SimConfig =
            serde_yaml::from_str(text).map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.initial_budget <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(
                "initial budget must be positive".into(),
            ));
        }
        if self.tick_days == 0 {
            return Err(EngineError::InvalidInput("tick_days must be > 0".into()));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = self.team.iter().find(|r| !seen.insert(**r)) {
            return Err(EngineError::InvalidInput(format!(
                "role {} appears twice in the team",
                dup.as_str()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg = SimConfig::from_yaml_str("rng_seed: 7\nteam: [geologist, finance_analyst]\n").unwrap();
        assert_eq!(cfg.rng_seed, 7);
        assert_eq!(cfg.team, vec![Role::Geologist, Role::FinanceAnalyst]);
        assert_eq!(cfg.initial_budget, Decimal::new(150_000_000, 0));
        assert!(cfg.individual_wells);
    }

    #[test]
    fn zero_budget_is_rejected() {
        assert!(SimConfig::from_yaml_str("initial_budget: 0\n").is_err());
    }

    #[test]
    fn duplicate_roles_are_rejected() {
        let err = SimConfig::from_yaml_str("team: [geologist, geologist]\n").unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidInput("role geologist appears twice in the team".into())
        );
    }
}

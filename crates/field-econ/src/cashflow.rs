//! Daily revenue, royalty, OPEX and tax.

use crate::EconError;
use field_core::{EconomicTables, EngineError, EngineResult, Project, RoyaltyTerms};
use serde::Serialize;

/// Daily operating cost drivers. Amounts are USD.
#[derive(Clone, Debug, PartialEq)]
pub struct OpexInputs {
    /// Fixed field cost after geology, concept and risk multipliers.
    pub fixed_daily: f64,
    pub variable_per_bbl: f64,
    pub per_well_daily: f64,
    pub active_wells: u32,
    pub standby_daily: f64,
    pub shut_in_wells: u32,
    /// Team multiplier applied to the whole bill.
    pub reduction: f64,
}

impl OpexInputs {
    /// Total OPEX for a day producing `output` barrels.
    pub fn daily(&self, output: f64) -> f64 {
        let base = self.fixed_daily
            + self.variable_per_bbl * output
            + self.per_well_daily * f64::from(self.active_wells)
            + self.standby_daily * f64::from(self.shut_in_wells);
        base * self.reduction
    }
}

/// One day of field economics in USD.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DailyCashFlow {
    pub output: f64,
    pub price: f64,
    pub gross: f64,
    pub royalty_rate: f64,
    pub royalty: f64,
    pub opex: f64,
    pub tax: f64,
    /// Net revenue minus OPEX minus tax; applied to the budget.
    pub net_cash: f64,
}

/// Compute one day's cash flow. Tax is charged only on positive profit.
pub fn daily_cash_flow(
    output: f64,
    price: f64,
    royalty: &RoyaltyTerms,
    opex: &OpexInputs,
    tax_rate: f64,
) -> Result<DailyCashFlow, EconError> {
    if !output.is_finite() || output < 0.0 || !price.is_finite() || price <= 0.0 {
        return Err(EconError::InvalidPrice);
    }
    let royalty_rate = royalty.rate_at(price);
    if !(0.0..=1.0).contains(&royalty_rate) {
        return Err(EconError::InvalidRate(royalty_rate));
    }
    let gross = output * price;
    let royalty_amount = gross * royalty_rate;
    let net_revenue = gross - royalty_amount;
    let opex_amount = opex.daily(output);
    let profit = net_revenue - opex_amount;
    let tax = profit.max(0.0) * tax_rate;
    let net_cash = net_revenue - opex_amount - tax;
    if !net_cash.is_finite() {
        return Err(EconError::NonFinite);
    }
    Ok(DailyCashFlow {
        output,
        price,
        gross,
        royalty_rate,
        royalty: royalty_amount,
        opex: opex_amount,
        tax,
        net_cash,
    })
}

/// Fixed daily OPEX for the project's geology, concept and risks, before
/// team reductions.
pub fn fixed_opex_daily(project: &Project, tables: &EconomicTables) -> EngineResult<f64> {
    let geology = project.geology.as_ref().map(|g| g.opex_multiplier).unwrap_or(1.0);
    let concept = match &project.feed {
        Some(id) => tables.feed(id)?.opex_multiplier,
        None => 1.0,
    };
    let risk = (1.0 + project.risk_modifiers.opex_modifier).max(0.0);
    Ok(tables.costs.fixed_opex_daily * geology * concept * risk)
}

/// Product of the team's OPEX reductions.
pub fn opex_reduction(project: &Project, tables: &EconomicTables) -> f64 {
    tables.team_multiplier(&project.team, |b| b.opex_reduction)
}

/// Royalty terms of the secured lease.
pub fn royalty_terms<'a>(
    project: &Project,
    tables: &'a EconomicTables,
) -> EngineResult<&'a RoyaltyTerms> {
    let id = project
        .lease
        .as_deref()
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["lease not secured".into()]))?;
    Ok(&tables.lease(id)?.royalty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_core::{Role, SimConfig};

    fn flat(rate: f64) -> RoyaltyTerms {
        RoyaltyTerms::Flat { rate }
    }

    fn opex(fixed: f64, variable: f64) -> OpexInputs {
        OpexInputs {
            fixed_daily: fixed,
            variable_per_bbl: variable,
            per_well_daily: 0.0,
            active_wells: 0,
            standby_daily: 0.0,
            shut_in_wells: 0,
            reduction: 1.0,
        }
    }

    #[test]
    fn profitable_day() {
        let cf = daily_cash_flow(10_000.0, 80.0, &flat(0.125), &opex(20_000.0, 9.0), 0.30).unwrap();
        assert!((cf.gross - 800_000.0).abs() < 1e-6);
        assert!((cf.royalty - 100_000.0).abs() < 1e-6);
        assert!((cf.opex - 110_000.0).abs() < 1e-6);
        assert!((cf.tax - 0.30 * 590_000.0).abs() < 1e-6);
        assert!((cf.net_cash - 413_000.0).abs() < 1e-6);
    }

    #[test]
    fn losses_are_not_taxed() {
        let cf = daily_cash_flow(0.0, 50.0, &flat(0.1), &opex(20_000.0, 9.0), 0.30).unwrap();
        assert_eq!(cf.tax, 0.0);
        assert!((cf.net_cash + 20_000.0).abs() < 1e-9);
    }

    #[test]
    fn idle_wells_cost_standby() {
        let mut inputs = opex(0.0, 0.0);
        inputs.per_well_daily = 1_000.0;
        inputs.active_wells = 3;
        inputs.standby_daily = 400.0;
        inputs.shut_in_wells = 2;
        inputs.reduction = 0.9;
        assert!((inputs.daily(0.0) - 3_420.0).abs() < 1e-9);
    }

    #[test]
    fn bad_price_is_rejected() {
        assert_eq!(
            daily_cash_flow(100.0, f64::NAN, &flat(0.1), &opex(0.0, 0.0), 0.3),
            Err(EconError::InvalidPrice)
        );
        assert!(daily_cash_flow(-1.0, 70.0, &flat(0.1), &opex(0.0, 0.0), 0.3).is_err());
    }

    #[test]
    fn fixed_opex_stacks_multipliers() {
        let tables = EconomicTables::standard();
        let mut project = Project::new(&SimConfig::default());
        project.geology = Some(tables.geology("carbonate").unwrap().clone());
        project.feed = Some("subsea_tieback".into());
        project.risk_modifiers.opex_modifier = 0.15;
        let fixed = fixed_opex_daily(&project, &tables).unwrap();
        assert!((fixed - 20_000.0 * 1.15 * 1.15 * 1.15).abs() < 1e-6);

        project.team = vec![Role::ProductionEngineer];
        assert!((opex_reduction(&project, &tables) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn royalty_requires_lease() {
        let tables = EconomicTables::standard();
        let mut project = Project::new(&SimConfig::default());
        assert!(royalty_terms(&project, &tables).is_err());
        project.lease = Some("standard".into());
        assert_eq!(royalty_terms(&project, &tables).unwrap(), &flat(0.125));
    }
}

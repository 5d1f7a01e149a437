//! Development cost and discounted field valuation.
//!
//! The same [`project_npv`] backs the development plan preview and the
//! sanction hurdle check, so both see identical numbers for identical state.

use crate::cashflow::{fixed_opex_daily, opex_reduction, royalty_terms};
use crate::{scale_money, to_f64, to_money, EconError};
use field_core::{EconomicTables, EngineError, EngineResult, Project, RoyaltyTerms};
use rust_decimal::Decimal;
use serde::Serialize;

/// Capital needed to sanction a development.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DevelopmentCost {
    pub concept: Decimal,
    pub wells: Decimal,
    pub facility: Decimal,
    /// Smallest tier able to carry the planned rate.
    pub facility_id: String,
    pub facility_capacity: f64,
    pub total: Decimal,
}

/// Inputs of the annual projection.
#[derive(Clone, Debug, PartialEq)]
pub struct NpvInputs {
    pub reserves_bbl: f64,
    pub well_count: u32,
    /// Plateau field rate in barrels per day.
    pub daily_production: f64,
    pub price: f64,
    pub royalty: RoyaltyTerms,
    pub decline_rate: f64,
    pub fixed_opex_daily: f64,
    pub variable_opex_per_bbl: f64,
    pub per_well_opex_daily: f64,
    /// Team OPEX multiplier.
    pub opex_reduction: f64,
    pub tax_rate: f64,
    pub discount_rate: f64,
    pub years: u32,
    pub development_cost: Decimal,
    /// Decommissioning, paid at the end of the horizon.
    pub abandonment_cost: Decimal,
    /// Sunk spend deducted from the valuation.
    pub spent_to_date: Decimal,
}

/// Net present value of an annual projection, in USD rounded to cents.
///
/// Year `y` produces at `daily * (1 - d)^(y - 1)` for 365 days, capped by
/// the reserves left. OPEX stops once the reserves are gone.
pub fn calculate_npv(inputs: &NpvInputs) -> Result<Decimal, EconError> {
    if !inputs.price.is_finite() || inputs.price <= 0.0 {
        return Err(EconError::InvalidPrice);
    }
    if inputs.reserves_bbl < 0.0 || inputs.daily_production < 0.0 {
        return Err(EconError::InvalidPrice);
    }
    if !(0.0..1.0).contains(&inputs.decline_rate) {
        return Err(EconError::InvalidRate(inputs.decline_rate));
    }
    if inputs.discount_rate <= -1.0 {
        return Err(EconError::InvalidRate(inputs.discount_rate));
    }
    let royalty_rate = inputs.royalty.rate_at(inputs.price);
    let mut remaining = inputs.reserves_bbl;
    let mut present_value = 0.0;
    for year in 1..=inputs.years {
        if remaining <= 0.0 {
            break;
        }
        let rate = inputs.daily_production * (1.0 - inputs.decline_rate).powi(year as i32 - 1);
        let volume = (rate * 365.0).min(remaining);
        remaining -= volume;

        let gross = volume * inputs.price;
        let net_revenue = gross * (1.0 - royalty_rate);
        let fixed = (inputs.fixed_opex_daily
            + inputs.per_well_opex_daily * f64::from(inputs.well_count))
            * 365.0;
        let opex = (fixed + inputs.variable_opex_per_bbl * volume) * inputs.opex_reduction;
        let profit = net_revenue - opex;
        let tax = profit.max(0.0) * inputs.tax_rate;
        let cash = net_revenue - opex - tax;
        present_value += cash / (1.0 + inputs.discount_rate).powi(year as i32);
    }
    let abandonment = to_f64(inputs.abandonment_cost)?
        / (1.0 + inputs.discount_rate).powi(inputs.years as i32);
    let npv = present_value
        - to_f64(inputs.development_cost)?
        - abandonment
        - to_f64(inputs.spent_to_date)?;
    to_money(npv)
}

/// Expected field rate for `well_count` wells: the mean IP of the geology
/// adjusted for interpreted risks.
pub fn estimated_field_rate(project: &Project, well_count: u32) -> EngineResult<f64> {
    let geology = project
        .geology
        .as_ref()
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["geology not selected".into()]))?;
    let mean_ip = (geology.ip_min_bpd + geology.ip_max_bpd) / 2.0;
    let modifier = (1.0 + project.risk_modifiers.production_modifier).max(0.0);
    Ok(f64::from(well_count) * mean_ip * modifier)
}

/// Concept, wells and minimum facility cost for `well_count` wells, after
/// geology multipliers and team reductions.
pub fn development_cost(
    project: &Project,
    tables: &EconomicTables,
    well_count: u32,
) -> EngineResult<DevelopmentCost> {
    let rate = estimated_field_rate(project, well_count)?;
    let drilling_multiplier = project
        .geology
        .as_ref()
        .map(|g| g.drilling_cost_multiplier)
        .unwrap_or(1.0);
    let drilling_reduction = tables.team_multiplier(&project.team, |b| b.drilling_cost_reduction);
    let facility_reduction = tables.team_multiplier(&project.team, |b| b.facility_cost_reduction);

    let tier = tables.minimum_facility(rate).ok_or_else(|| {
        EngineError::PreconditionNotMet(vec![format!("no facility tier can carry {rate:.0} bpd")])
    })?;
    let concept = match &project.feed {
        Some(id) => scale_money(tables.feed(id)?.cost, facility_reduction)?,
        None => Decimal::ZERO,
    };
    let wells = scale_money(
        tables.costs.development_well * Decimal::from(well_count),
        drilling_multiplier * drilling_reduction,
    )?;
    let facility = scale_money(tier.cost, facility_reduction)?;
    Ok(DevelopmentCost {
        concept,
        wells,
        facility,
        facility_id: tier.id.clone(),
        facility_capacity: tier.capacity_bpd,
        total: concept + wells + facility,
    })
}

/// Gather projection inputs from the project state.
pub fn npv_inputs(
    project: &Project,
    tables: &EconomicTables,
    well_count: u32,
) -> EngineResult<NpvInputs> {
    let reserves = project
        .reserves
        .as_ref()
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["no reserve estimate".into()]))?;
    let geology = project
        .geology
        .as_ref()
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["geology not selected".into()]))?;
    let cost = development_cost(project, tables, well_count)?;
    let rate = estimated_field_rate(project, well_count)?.min(cost.facility_capacity);
    let price = project
        .market
        .as_ref()
        .map(|m| m.current)
        .unwrap_or(tables.fiscal.planning_price);
    let decline = (geology.decline_rate_annual * (1.0 + project.risk_modifiers.decline_rate_bonus))
        .clamp(0.0, 0.99);
    let abandonment = tables.costs.well_abandonment * Decimal::from(well_count)
        + scale_money(cost.facility, tables.costs.facility_abandonment_fraction)?;
    Ok(NpvInputs {
        reserves_bbl: reserves.p50_bbl,
        well_count,
        daily_production: rate,
        price,
        royalty: royalty_terms(project, tables)?.clone(),
        decline_rate: decline,
        fixed_opex_daily: fixed_opex_daily(project, tables)?,
        variable_opex_per_bbl: tables.costs.variable_opex_per_bbl,
        per_well_opex_daily: tables.costs.per_well_opex_daily,
        opex_reduction: opex_reduction(project, tables),
        tax_rate: tables.fiscal.tax_rate,
        discount_rate: tables.fiscal.discount_rate,
        years: tables.fiscal.projection_years,
        development_cost: cost.total,
        abandonment_cost: abandonment,
        spent_to_date: project.total_spent,
    })
}

/// NPV of developing the field with `well_count` wells from the current state.
pub fn project_npv(
    project: &Project,
    tables: &EconomicTables,
    well_count: u32,
) -> EngineResult<Decimal> {
    let inputs = npv_inputs(project, tables, well_count)?;
    Ok(calculate_npv(&inputs)?)
}

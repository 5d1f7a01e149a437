//! Production tick engine: one call advances the field by one day.

use crate::exploration::discovered_volume;
use chrono::{Days, NaiveDate};
use field_core::{
    AggregateProduction, EconomicTables, EngineError, EngineResult, FinancialHistoryEntry,
    MarketPrice, MonthlyAccumulator, Phase, Project, ProjectStatus, Well, WellStatus,
};
use field_econ::{
    daily_cash_flow, fixed_opex_daily, opex_reduction, royalty_terms, step_price, to_money,
    DailyCashFlow, OpexInputs,
};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of one simulated day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DayReport {
    pub day: u32,
    pub price: f64,
    pub shock: Option<String>,
    /// Barrels produced.
    pub output: f64,
    pub cash_flow: DailyCashFlow,
    /// Net cash applied to the budget, in cents.
    pub net_cash: Decimal,
    /// `(well id, event id)` pairs fired today.
    pub well_events: Vec<(u32, String)>,
    pub history_flushed: bool,
    /// Set on the day the engine stops.
    pub halted: Option<String>,
}

/// Create the aggregate production record and the price process when the
/// field comes on stream.
pub fn start_production(project: &mut Project, tables: &EconomicTables) -> EngineResult<()> {
    let facility_id = project
        .facility
        .as_deref()
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["facility selected".into()]))?;
    let capacity = tables.facility(facility_id)?.capacity_bpd;
    let reserves = discovered_volume(project)
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["no discovery to produce".into()]))?;
    let planned = if project.individual_wells {
        project.wells.iter().map(Well::potential_rate).sum::<f64>()
    } else {
        project
            .development_plan
            .as_ref()
            .map(|p| p.estimated_production)
            .unwrap_or(0.0)
    };
    let daily_output = planned.min(capacity);
    project.production = Some(AggregateProduction::new(daily_output, reserves, capacity));
    project.market = Some(MarketPrice::new(tables.market.initial_price));
    info!(daily_output, capacity, reserves, "first oil");
    Ok(())
}

/// Field decline rate for aggregate mode.
fn aggregate_decline(project: &Project) -> f64 {
    project
        .geology
        .as_ref()
        .map(|g| g.decline_rate_annual * (1.0 + project.risk_modifiers.decline_rate_bonus))
        .unwrap_or(0.0)
        .clamp(0.0, 0.99)
}

/// Choke applied to every producing well so the field respects facility
/// capacity and the remaining reserves.
fn well_choke(potential: f64, capacity: f64, remaining: f64) -> f64 {
    if potential <= 0.0 {
        return 1.0;
    }
    (capacity / potential).min(remaining / potential).clamp(0.0, 1.0)
}

struct Plan {
    output: f64,
    choke: f64,
    /// Today takes the last of the reserves.
    depleting: bool,
    opex: OpexInputs,
}

fn plan_day(project: &Project, production: &AggregateProduction, tables: &EconomicTables) -> EngineResult<Plan> {
    let remaining = production.remaining_reserves();
    let mut opex = OpexInputs {
        fixed_daily: fixed_opex_daily(project, tables)?,
        variable_per_bbl: tables.costs.variable_opex_per_bbl,
        per_well_daily: 0.0,
        active_wells: 0,
        standby_daily: 0.0,
        shut_in_wells: 0,
        reduction: opex_reduction(project, tables),
    };
    if project.individual_wells {
        let potential: f64 = project.wells.iter().map(Well::potential_rate).sum();
        let choke = well_choke(potential, production.facility_capacity, remaining);
        let output: f64 = project
            .wells
            .iter()
            .map(|w| (w.potential_rate() * choke).floor())
            .sum();
        opex.per_well_daily = tables.costs.per_well_opex_daily;
        opex.standby_daily = tables.costs.shut_in_standby_daily;
        opex.active_wells = project
            .wells
            .iter()
            .filter(|w| !w.is_retired() && w.status != WellStatus::ShutIn)
            .count() as u32;
        opex.shut_in_wells = project
            .wells
            .iter()
            .filter(|w| w.status == WellStatus::ShutIn)
            .count() as u32;
        Ok(Plan {
            output,
            choke,
            depleting: potential > 0.0 && remaining <= potential.min(production.facility_capacity),
            opex,
        })
    } else {
        let years = f64::from(production.days_elapsed) / 365.0;
        let rate = production.daily_output * (1.0 - aggregate_decline(project)).powf(years);
        let output = rate.min(production.facility_capacity).min(remaining).max(0.0).floor();
        Ok(Plan {
            output,
            choke: 1.0,
            depleting: rate > 0.0 && remaining <= rate.min(production.facility_capacity),
            opex,
        })
    }
}

/// Why the field has no productive capacity left, if it has none.
fn exhausted(project: &Project, production: &AggregateProduction, depleting: bool) -> Option<String> {
    if depleting || production.remaining_reserves() < 1.0 {
        return Some("reserves exhausted".to_string());
    }
    if project.individual_wells {
        if project.wells.iter().all(Well::is_retired) {
            return Some("no wells left in service".to_string());
        }
    } else if production.current_daily <= 0.0 {
        return Some("field rate declined to zero".to_string());
    }
    None
}

fn flush_month(production: &mut AggregateProduction, date: NaiveDate) {
    let month = std::mem::take(&mut production.monthly);
    production.history.push(FinancialHistoryEntry {
        day: production.days_elapsed,
        date,
        revenue: month.revenue,
        opex: month.opex,
        royalties: month.royalties,
        tax: month.tax,
    });
}

/// Advance the producing field by one day.
///
/// Order: market step, output, royalty, OPEX, tax, budget and totals, the
/// monthly flush, well events, then the halt checks. Returns `None` once
/// production has stopped.
pub fn advance_day<R: Rng + ?Sized>(
    project: &mut Project,
    tables: &EconomicTables,
    rng: &mut R,
) -> EngineResult<Option<DayReport>> {
    if project.status == ProjectStatus::Completed
        || project.production.as_ref().is_some_and(|p| p.halted)
    {
        return Ok(None);
    }
    project.ensure_phase(Phase::Production)?;
    let royalty = royalty_terms(project, tables)?.clone();
    let (Some(production), Some(market)) = (project.production.as_ref(), project.market.as_ref())
    else {
        return Err(EngineError::PreconditionNotMet(vec!["production not started".into()]));
    };
    let plan = plan_day(project, production, tables)?;
    let day = production.days_elapsed + 1;

    // Step the price on a copy of the current value so a failure below leaves
    // the market untouched.
    let mut next_market = MarketPrice {
        current: market.current,
        history: Vec::new(),
    };
    let step = step_price(&mut next_market, &tables.market, day, rng);
    let cash_flow = daily_cash_flow(plan.output, step.price, &royalty, &plan.opex, tables.fiscal.tax_rate)?;
    let gross = to_money(cash_flow.gross)?;
    let royalties = to_money(cash_flow.royalty)?;
    let opex = to_money(cash_flow.opex)?;
    let tax = to_money(cash_flow.tax)?;
    let net_cash = gross - royalties - opex - tax;

    if let Some(market) = project.market.as_mut() {
        market.current = next_market.current;
        market.history.append(&mut next_market.history);
    }
    let mut produced = plan.output;
    if project.individual_wells {
        produced = project
            .wells
            .iter_mut()
            .map(|w| f64::from(w.advance_day(plan.choke, &tables.wells)))
            .sum();
        debug_assert!((produced - plan.output).abs() < 1e-6);
    }
    project.budget += net_cash;
    project.revenue += gross;

    let date = project
        .start_date
        .checked_add_days(Days::new(u64::from(day)))
        .unwrap_or(project.start_date);
    let mut history_flushed = false;
    if let Some(p) = project.production.as_mut() {
        p.days_elapsed = day;
        p.current_daily = produced;
        p.cumulative_output += produced;
        p.total_revenue += gross;
        p.total_royalties += royalties;
        p.total_opex += opex;
        p.total_tax += tax;
        p.cumulative_net_cash += net_cash;
        p.monthly = MonthlyAccumulator {
            revenue: p.monthly.revenue + gross,
            opex: p.monthly.opex + opex,
            royalties: p.monthly.royalties + royalties,
            tax: p.monthly.tax + tax,
        };
        if day % tables.fiscal.history_interval_days == 0 {
            flush_month(p, date);
            history_flushed = true;
            debug!(day, "monthly financials recorded");
        }
    }

    let mut well_events = Vec::new();
    if project.individual_wells && day % tables.wells.event_interval_days == 0 {
        for well in project.wells.iter_mut() {
            for event in well.roll_events(&tables.wells.events, rng) {
                warn!(well = well.id, event = %event, "well event");
                well_events.push((well.id, event));
            }
        }
        for (id, event) in &well_events {
            project.record("well_event", Decimal::ZERO, format!("well {id}: {event}"));
        }
    }

    let halted = halt_reason(project, tables, day, plan.depleting);
    if let Some(reason) = &halted {
        if let Some(p) = project.production.as_mut() {
            p.halted = true;
            if !p.monthly.is_zero() {
                flush_month(p, date);
                history_flushed = true;
            }
        }
        project.status = ProjectStatus::Completed;
        project.record("production_halted", Decimal::ZERO, reason.clone());
        info!(day, reason = %reason, budget = %project.budget, "production halted");
    }

    Ok(Some(DayReport {
        day,
        price: step.price,
        shock: step.shock,
        output: produced,
        cash_flow,
        net_cash,
        well_events,
        history_flushed,
        halted,
    }))
}

fn halt_reason(project: &Project, tables: &EconomicTables, day: u32, depleting: bool) -> Option<String> {
    if day >= tables.fiscal.production_limit_days {
        return Some(format!("production limit of {day} days reached"));
    }
    project
        .production
        .as_ref()
        .and_then(|p| exhausted(project, p, depleting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_core::{DrillOutcome, RoyaltyTerms, SimConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn producing_project(tables: &EconomicTables, individual: bool, wells: usize) -> Project {
        let config = SimConfig {
            individual_wells: individual,
            ..SimConfig::default()
        };
        let mut p = Project::new(&config);
        p.phase_index = Phase::Production.index();
        p.geology = Some(tables.geology("sandstone").unwrap().clone());
        p.lease = Some("standard".into());
        p.facility = Some("medium".into());
        p.exploration.outcome = Some(DrillOutcome::Discovery {
            recoverable_bbl: 80e6,
        });
        p.development_plan = Some(field_core::DevelopmentPlan {
            well_count: wells as u32,
            estimated_production: 2_000.0 * wells as f64,
            npv: Decimal::ZERO,
        });
        if individual {
            p.wells = (1..=wells as u32).map(|id| Well::new(id, 2_000.0, 0.12)).collect();
        }
        start_production(&mut p, tables).unwrap();
        p
    }

    fn quiet_tables() -> EconomicTables {
        let mut t = EconomicTables::standard();
        t.wells.events.clear();
        t
    }

    #[test]
    fn history_flushes_every_thirty_days() {
        let tables = quiet_tables();
        let mut p = producing_project(&tables, true, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for day in 1..=95u32 {
            let report = advance_day(&mut p, &tables, &mut rng).unwrap().unwrap();
            assert_eq!(report.history_flushed, day % 30 == 0);
        }
        let prod = p.production.as_ref().unwrap();
        assert_eq!(prod.history.len(), 3);
        assert_eq!(prod.history.iter().map(|h| h.day).collect::<Vec<_>>(), vec![30, 60, 90]);
        let flushed: Decimal = prod.history.iter().map(|h| h.revenue).sum();
        assert_eq!(flushed + prod.monthly.revenue, prod.total_revenue);
        assert!(p.ledger_balanced());
    }

    #[test]
    fn facility_capacity_chokes_wells() {
        let tables = quiet_tables();
        let mut p = producing_project(&tables, true, 20);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let report = advance_day(&mut p, &tables, &mut rng).unwrap().unwrap();
        assert!(report.output <= 25_000.0);
        assert!(report.output > 24_000.0);
    }

    #[test]
    fn choked_field_produces_until_reserves_run_out() {
        let tables = quiet_tables();
        let mut p = producing_project(&tables, true, 20);
        p.production.as_mut().unwrap().recoverable_reserves = 30_000.0;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let first = advance_day(&mut p, &tables, &mut rng).unwrap().unwrap();
        assert!(first.output > 24_000.0 && first.output <= 25_000.0);
        assert!(first.halted.is_none());
        assert_eq!(p.status, ProjectStatus::Active);

        let second = advance_day(&mut p, &tables, &mut rng).unwrap().unwrap();
        assert!(second.output > 0.0);
        assert!(second.output <= 30_000.0 - first.output);
        assert!(second.halted.is_some());
        assert_eq!(p.status, ProjectStatus::Completed);
    }

    #[test]
    fn aggregate_mode_declines_and_caps() {
        let tables = quiet_tables();
        let mut p = producing_project(&tables, false, 5);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let first = advance_day(&mut p, &tables, &mut rng).unwrap().unwrap();
        assert_eq!(first.output, 10_000.0);
        for _ in 0..364 {
            advance_day(&mut p, &tables, &mut rng).unwrap();
        }
        let year_later = advance_day(&mut p, &tables, &mut rng).unwrap().unwrap();
        assert_eq!(year_later.output, (10_000.0f64 * 0.88).floor());
    }

    #[test]
    fn stops_at_the_production_limit() {
        let mut tables = quiet_tables();
        tables.fiscal.production_limit_days = 40;
        let mut p = producing_project(&tables, false, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut last = None;
        while let Some(report) = advance_day(&mut p, &tables, &mut rng).unwrap() {
            last = Some(report);
        }
        let last = last.unwrap();
        assert_eq!(last.day, 40);
        assert!(last.halted.is_some());
        assert_eq!(p.status, ProjectStatus::Completed);
        let prod = p.production.as_ref().unwrap();
        assert_eq!(prod.history.len(), 2);
        assert!(prod.monthly.is_zero());
        let booked: Decimal = prod.history.iter().map(|h| h.tax).sum();
        assert_eq!(booked, prod.total_tax);
        assert!(advance_day(&mut p, &tables, &mut rng).unwrap().is_none());
    }

    #[test]
    fn reserves_cap_halts_the_field() {
        let tables = quiet_tables();
        let mut p = producing_project(&tables, true, 2);
        if let Some(prod) = p.production.as_mut() {
            prod.recoverable_reserves = 5_000.0;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut days = 0;
        while advance_day(&mut p, &tables, &mut rng).unwrap().is_some() {
            days += 1;
        }
        let prod = p.production.as_ref().unwrap();
        assert!(prod.cumulative_output <= 5_000.0);
        assert!(days <= 3);
        assert_eq!(p.status, ProjectStatus::Completed);
    }

    #[test]
    fn all_wells_abandoned_halts() {
        let tables = quiet_tables();
        let mut p = producing_project(&tables, true, 2);
        for w in p.wells.iter_mut() {
            w.abandon().unwrap();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let report = advance_day(&mut p, &tables, &mut rng).unwrap().unwrap();
        assert_eq!(report.output, 0.0);
        assert!(report.halted.is_some());
        assert!(report.net_cash < Decimal::ZERO);
    }

    #[test]
    fn shut_in_wells_pay_standby() {
        let tables = quiet_tables();
        let mut p = producing_project(&tables, true, 3);
        p.wells[0].shut_in().unwrap();
        p.lease = Some("low_royalty".into());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let report = advance_day(&mut p, &tables, &mut rng).unwrap().unwrap();
        let reduction = tables.team_multiplier(&p.team, |b| b.opex_reduction);
        let expected = (20_000.0 + 9.0 * report.output + 2.0 * 1_500.0 + 400.0) * reduction;
        assert!((report.cash_flow.opex - expected).abs() < 1e-6);
        assert_eq!(
            royalty_terms(&p, &tables).unwrap(),
            &RoyaltyTerms::Flat { rate: 0.08 }
        );
    }

    #[test]
    fn ticks_outside_production_are_rejected() {
        let tables = quiet_tables();
        let mut p = Project::new(&SimConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert!(matches!(
            advance_day(&mut p, &tables, &mut rng),
            Err(EngineError::PreconditionNotMet(_))
        ));
    }
}
